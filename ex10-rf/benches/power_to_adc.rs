use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ex10_rf::calibration::TxConditions;
use ex10_rf::region::RfFilter;
use ex10_rf::register::RxGainControl;
use ex10_rf::Calibration;
use ex10_rf_test_data::v5_calibration_image;

pub fn criterion_benchmark(c: &mut Criterion) {
    let calibration = Calibration::init(&mut &v5_calibration_image()[..]).unwrap();
    let conditions = TxConditions {
        frequency_khz: 915_250,
        temperature_adc: Some(1300),
        rf_band: RfFilter::UpperBand,
    };

    let mut group = c.benchmark_group("Power Compensation");

    group.bench_function("Power to ADC", |b| {
        b.iter(|| calibration.power_to_adc(black_box(3000), &conditions))
    });
    group.bench_function("Reverse power to ADC", |b| {
        b.iter(|| calibration.reverse_power_to_adc(black_box(2740), &conditions))
    });
    group.bench_function("Coarse attenuation", |b| {
        b.iter(|| calibration.choose_coarse_atten(black_box(3000), &conditions))
    });
    group.bench_function("Compensated RSSI", |b| {
        let gains = RxGainControl::default();
        b.iter(|| {
            calibration.compensated_rssi(
                black_box(2500),
                146,
                &gains,
                1,
                RfFilter::UpperBand,
                1300,
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
