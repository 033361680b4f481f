use criterion::{criterion_group, criterion_main, Criterion};

use ex10_rf::Calibration;
use ex10_rf_test_data::{erased_calibration_image, v5_calibration_image};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Calibration Loading");

    group.bench_with_input("Version 5", &v5_calibration_image(), |b, image| {
        b.iter(|| Calibration::init(&mut &image[..]))
    });
    group.bench_with_input("Erased", &erased_calibration_image(), |b, image| {
        b.iter(|| Calibration::init(&mut &image[..]))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
