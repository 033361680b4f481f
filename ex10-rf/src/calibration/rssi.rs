// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Receive signal strength compensation.
//!
//! The receiver reports RSSI as a log2 magnitude ("RSSI log2" units, 128 per factor of two in
//! amplitude). Compensation removes the offsets from the receiver gain stages, the antenna port,
//! the band, the RF mode and the temperature, then converts the result to cdBm using the
//! calibrated reference point.
use log::warn;

use super::v5::{CalibrationParamsV5, RssiCalibration};
use super::Calibration;
use crate::interpolate::interpolate_i16;
use crate::region::RfFilter;
use crate::register::RxGainControl;
use crate::rf_mode::RfMode;

/// cdB per 10 RSSI log2 units, rounded (20 * log10(2) / 128 = 0.047035 dB per unit).
const CDB_PER_LOG2_X10: i32 = 470;

/// RSSI log2 units per 1000 temperature ADC codes.
const TEMP_SLOPE_LOG2_PER_KILO_ADC: i32 = -616;

fn log2_to_cdbm(rssi: &RssiCalibration, log2: u16) -> i16 {
    let reference_cdbm = i32::from(rssi.input_powers) * 100;
    let reference_log2 = i32::from(rssi.power_shifts);
    let cdbm = ((i32::from(log2) - reference_log2) * CDB_PER_LOG2_X10 + reference_cdbm * 100 + 50)
        / 100;
    cdbm as i16
}

fn cdbm_to_log2(rssi: &RssiCalibration, cdbm: i16) -> u16 {
    let reference_cdbm = i32::from(rssi.input_powers) * 100;
    let reference_log2 = i32::from(rssi.power_shifts);
    let log2 = ((i32::from(cdbm) - reference_cdbm) * 100 + CDB_PER_LOG2_X10 / 2) / CDB_PER_LOG2_X10
        + reference_log2;
    log2 as u16
}

fn temp_offset(rssi: &RssiCalibration, temp_adc: u16) -> i16 {
    // A reading of 0 means the temperature wasn't measured.
    if temp_adc == 0 {
        return 0;
    }
    let delta = i32::from(temp_adc) - i32::from(rssi.temp_intercept);
    ((TEMP_SLOPE_LOG2_PER_KILO_ADC * delta + 500) / 1000) as i16
}

impl Calibration {
    /// The sum of the receive chain gain offsets, in RSSI log2 units.
    fn gain_offset(
        params: &CalibrationParamsV5,
        rx_settings: &RxGainControl,
        antenna: u8,
        rf_band: RfFilter,
    ) -> i16 {
        let rssi = &params.rssi;
        let antenna_offset = rssi
            .antennas
            .get(antenna as usize)
            .and_then(|index| rssi.antenna_lut.get(*index as usize))
            .copied()
            .unwrap_or_else(|| {
                warn!("Antenna {} has no RSSI calibration, using 0 correction", antenna);
                0
            });
        let offset = i32::from(rssi.rx_att_gain_lut[rx_settings.rx_atten() as usize])
            + i32::from(rssi.pga1_lut[rx_settings.pga1_gain() as usize])
            + i32::from(rssi.pga2_lut[rx_settings.pga2_gain() as usize])
            + i32::from(rssi.pga3_lut[rx_settings.pga3_gain() as usize])
            + i32::from(rssi.mixer_gain_lut[rx_settings.mixer_gain() as usize])
            + i32::from(antenna_offset)
            + i32::from(params.band(rf_band).rssi_freq_shift);
        offset as i16
    }

    /// The analog offset for a signal at `baseband_freq_khz` through the chosen filter.
    fn analog_baseband_offset(&self, baseband_freq_khz: i16, drm: bool) -> i16 {
        let offsets = if drm {
            &self.drm_analog_offsets
        } else {
            &self.non_drm_analog_offsets
        };
        interpolate_i16(offsets.blf_khz(), offsets.offsets(), baseband_freq_khz)
    }

    /// The RSSI offset for receiving in `rf_mode` at a baseband frequency, in RSSI log2 units.
    ///
    /// Modes missing from the RSSI tables log a warning and have an offset of 0.
    pub fn mode_rssi_offset(&self, rf_mode: RfMode, baseband_freq_khz: i16) -> i16 {
        let baseband_freq_khz = baseband_freq_khz.saturating_abs();
        let correction = match self
            .lut
            .rx_mode(rf_mode)
            .and_then(|rx_mode| self.lut.correction(rx_mode))
        {
            Some(correction) => correction,
            None => {
                warn!(
                    "RF mode {} is not supported in the calibration table, using 0 correction",
                    rf_mode
                );
                return 0;
            }
        };
        let drm = self.baseband_filter.rf_mode_is_drm(rf_mode);
        self.analog_baseband_offset(baseband_freq_khz, drm)
            .wrapping_add(correction.digital_correction)
    }

    /// The baseband offset used for listen before talk measurements.
    ///
    /// LBT measures off-channel through the non-DRM filter at a fixed CORDIC shift.
    fn lbt_baseband_offset(&self) -> i16 {
        let shift = self.lut.lbt_cordic_freq_shift as i16;
        self.analog_baseband_offset(shift, false)
            .wrapping_add(self.lut.lbt_digital_correction)
    }

    fn compensate(
        &self,
        rssi_raw: u16,
        rx_settings: &RxGainControl,
        antenna: u8,
        rf_band: RfFilter,
        temp_adc: u16,
        baseband_offset: i16,
    ) -> i16 {
        let params = self.params();
        let gain_offset = Self::gain_offset(params, rx_settings, antenna, rf_band);
        let temp_offset = temp_offset(&params.rssi, temp_adc);
        let compensated = i32::from(rssi_raw)
            - i32::from(gain_offset)
            - i32::from(baseband_offset)
            - i32::from(temp_offset);
        log2_to_cdbm(&params.rssi, compensated as u16)
    }

    /// Convert a raw RSSI log2 reading into a calibrated power in cdBm.
    ///
    /// `temp_adc` is the temperature sensor reading, or 0 to skip temperature compensation. If
    /// the calibration isn't supported the raw value is returned as is.
    pub fn compensated_rssi(
        &self,
        rssi_raw: u16,
        rf_mode: RfMode,
        rx_settings: &RxGainControl,
        antenna: u8,
        rf_band: RfFilter,
        temp_adc: u16,
    ) -> i16 {
        if !self.is_supported() {
            return rssi_raw as i16;
        }
        let baseband_freq_khz = self.lut.rf_mode_blf_khz(rf_mode) as i16;
        let mode_offset = self.mode_rssi_offset(rf_mode, baseband_freq_khz);
        self.compensate(
            rssi_raw,
            rx_settings,
            antenna,
            rf_band,
            temp_adc,
            mode_offset,
        )
    }

    /// The inverse of [`compensated_rssi`][Calibration::compensated_rssi].
    ///
    /// Results at or below 0 are floored to 0, as is everything when the calibration isn't
    /// supported.
    pub fn rssi_log2(
        &self,
        rssi_cdbm: i16,
        rf_mode: RfMode,
        rx_settings: &RxGainControl,
        antenna: u8,
        rf_band: RfFilter,
        temp_adc: u16,
    ) -> u16 {
        if !self.is_supported() {
            return 0;
        }
        let params = self.params();
        let baseband_freq_khz = self.lut.rf_mode_blf_khz(rf_mode) as i16;
        let gain_offset = Self::gain_offset(params, rx_settings, antenna, rf_band);
        let mode_offset = self.mode_rssi_offset(rf_mode, baseband_freq_khz);
        let temp_offset = temp_offset(&params.rssi, temp_adc);
        let log2 = (i32::from(cdbm_to_log2(&params.rssi, rssi_cdbm) as i16)
            + i32::from(gain_offset)
            + i32::from(mode_offset)
            + i32::from(temp_offset)) as i16;
        if log2 <= 0 {
            0
        } else {
            log2 as u16
        }
    }

    /// Compensate an RSSI reading taken by the listen before talk op.
    pub fn compensated_lbt_rssi(
        &self,
        rssi_raw: u16,
        rx_settings: &RxGainControl,
        antenna: u8,
        rf_band: RfFilter,
        temp_adc: u16,
    ) -> i16 {
        if !self.is_supported() {
            return rssi_raw as i16;
        }
        self.compensate(
            rssi_raw,
            rx_settings,
            antenna,
            rf_band,
            temp_adc,
            self.lbt_baseband_offset(),
        )
    }
}
