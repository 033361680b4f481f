// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Synthetic calibration images for the Ex10 calibration region.
//!
//! The values are not from a real board. They are picked so the expected results of the power and
//! RSSI calculations can be worked out by hand:
//!
//! * The coarse attenuation curve is `31 - index` dBm in both bands.
//! * Each power detector has a linear ADC curve, 250 codes per dB, centered on a different part of
//!   the attenuation range. Detector 2 is valid (200..=3800) for indices 0 through 13, detector 1
//!   for 10 through 23, and detector 0 for 20 through 30.
//! * All frequency compensation is zero at 915 MHz.

/// The size of the calibration region.
pub const CALIBRATION_LENGTH: usize = 2048;

pub const VERSION_OFFSET: usize = 0;
pub const CUSTOMER_VERSION_OFFSET: usize = 1;
pub const VALID_PDET_ADCS_OFFSET: usize = 30;
pub const UPPER_BAND_PDET_ADC_OFFSET: usize = 40;
pub const UPPER_BAND_COARSE_ATTENUATION_OFFSET: usize = 226;
pub const LOWER_BAND_PDET_ADC_OFFSET: usize = 456;
pub const LOWER_BAND_COARSE_ATTENUATION_OFFSET: usize = 642;
pub const DC_OFFSET_OFFSET: usize = 872;
pub const RSSI_RF_MODES_OFFSET: usize = 996;
pub const RSSI_RF_MODE_LUT_OFFSET: usize = 1060;

/// The number of coarse attenuation settings.
pub const NUM_ATTENUATIONS: usize = 31;

/// A calibration region that was never written.
pub fn erased_calibration_image() -> [u8; CALIBRATION_LENGTH] {
    [0xFF; CALIBRATION_LENGTH]
}

/// A version 5 calibration image with the values described in the crate docs.
pub fn v5_calibration_image() -> [u8; CALIBRATION_LENGTH] {
    let mut image = erased_calibration_image();
    let mut writer = ImageWriter::new(&mut image);

    writer.seek(VERSION_OFFSET);
    writer.u8(5);
    writer.seek(CUSTOMER_VERSION_OFFSET);
    writer.u8(0);
    // Version strings
    writer.seek(4);
    for value in [5, 1, 2, 1, 2, 1] {
        writer.u8(value);
    }
    // User board ID
    writer.u16(0x0807);
    // TX scalar
    writer.i16(1100);
    // RF filter limits, upper then lower band
    writer.f32(902.0);
    writer.f32(928.0);
    writer.f32(865.0);
    writer.f32(868.0);
    writer.seek(VALID_PDET_ADCS_OFFSET);
    writer.u16(200);
    writer.u16(3800);
    // Power control loop: gain divisor, error threshold, max iterations
    writer.u16(300);
    writer.u8(4);
    writer.u8(12);

    write_band(&mut writer, UPPER_BAND_PDET_ADC_OFFSET, [10, 0, 0, -10]);
    write_band(&mut writer, LOWER_BAND_PDET_ADC_OFFSET, [-6, 0, 0, 6]);

    writer.seek(DC_OFFSET_OFFSET);
    for index in 0..NUM_ATTENUATIONS as i32 {
        writer.i32(index * 10 - 150);
    }

    // RSSI modes are stored with their pre-2.0 firmware IDs: 146, 141, 185, 123, 124
    writer.seek(RSSI_RF_MODES_OFFSET);
    for index in 0..32 {
        writer.u16([7, 5, 13, 3, 1].get(index).copied().unwrap_or(0));
    }
    writer.seek(RSSI_RF_MODE_LUT_OFFSET);
    for index in 0..32 {
        writer.i16([1000, 1100, 900, 950, 1050].get(index).copied().unwrap_or(0));
    }
    // PGA1, PGA2, PGA3, mixer, and Rx attenuator gain tables
    for table in [
        [0, 10, 20, 30],
        [0, 10, 20, 30],
        [0, 10, 20, 30],
        [0, 5, 10, 15],
        [0, 30, 60, 90],
    ] {
        for value in table {
            writer.i16(value);
        }
    }
    // Antenna port to antenna table index
    for value in [0, 0, 1, 0, 0, 0, 0, 0] {
        writer.u8(value);
    }
    for value in [5, 25, 0, 0, 0, 0, 0, 0] {
        writer.i16(value);
    }
    // RSSI frequency shift, upper then lower band
    writer.i16(12);
    writer.i16(-8);
    // Reference point: -60 dBm reads as 1800
    writer.i16(-60);
    writer.i16(1800);
    // RSSI temperature slope and intercept
    writer.f32(-0.616);
    writer.u16(1200);

    image
}

/// Replace one entry of a coarse attenuation curve.
///
/// Setting an entry to 255.0 marks it as skipped during calibration.
pub fn set_coarse_attenuation(
    image: &mut [u8; CALIBRATION_LENGTH],
    curve_offset: usize,
    index: usize,
    dbm: f32,
) {
    let mut writer = ImageWriter::new(image);
    writer.seek(curve_offset + index * 4);
    writer.f32(dbm);
}

fn write_band(writer: &mut ImageWriter, base: usize, pdet_freq_shifts: [i16; 4]) {
    writer.seek(base);
    // Detector ADC curves, detector 0 first. Each is centered `10 * detector` indices further
    // into the attenuation range than the one above it.
    for center in [20, 10, 0] {
        for index in 0..NUM_ATTENUATIONS as i32 {
            let adc = (3600 - 250 * (index - center)).clamp(0, 4095);
            writer.u16(adc as u16);
        }
    }
    // Coarse attenuation curve
    for index in 0..NUM_ATTENUATIONS {
        writer.f32(31.0 - index as f32);
    }
    // Forward power temperature slope and calibration temperature
    writer.f32(0.01);
    writer.u16(1000);
    // Detector temperature slopes
    for _ in 0..3 {
        writer.f32(0.01);
    }
    // Detector frequency shifts
    for _ in 0..3 {
        for shift in pdet_freq_shifts {
            writer.i16(shift);
        }
    }
    // Frequencies the shifts were measured at, MHz
    for freq in [902.0, 910.0, 920.0, 928.0] {
        writer.f32(freq);
    }
    // Forward power frequency shifts are stored after a gap
    writer.seek(base + 384);
    for shift in [0.5, 0.0, 0.0, -0.5] {
        writer.f32(shift);
    }
}

/// Little-endian writer over a calibration image.
struct ImageWriter<'a> {
    image: &'a mut [u8],
    position: usize,
}

impl<'a> ImageWriter<'a> {
    fn new(image: &'a mut [u8]) -> Self {
        Self { image, position: 0 }
    }

    fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.image[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
    }

    fn u8(&mut self, value: u8) {
        self.bytes(&[value]);
    }

    fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }

    fn i16(&mut self, value: i16) {
        self.bytes(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.bytes(&value.to_le_bytes());
    }

    fn f32(&mut self, value: f32) {
        self.bytes(&value.to_le_bytes());
    }
}
