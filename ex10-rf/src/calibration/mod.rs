// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Device calibration and the compensation math built on it.
//!
//! [`Calibration`] holds the parsed calibration image along with the RSSI tables derived from it.
//! Only version 5 images are understood. Any other version (including an erased region) leaves
//! the calibration in an uncalibrated state, where the power functions fall back to open loop
//! settings and RSSI values pass through unchanged.
use arrayvec::ArrayVec;
use log::{info, warn};

use crate::error::LibraryError;
use crate::protocol::CalibrationSource;
use crate::rf_mode::{convert_legacy_rf_mode, BasebandFilter};
use crate::rssi_lut::{CalMode, RssiCompensationLut, STANDARD_LUT};

mod power;
mod rssi;
pub mod v5;

pub use power::{AdcTarget, PowerConfigs, TxConditions, BOOST_RATIO_CDB};
pub use v5::CalibrationParamsV5;

/// The raw value returned for calibration lookups when the calibration version isn't supported.
pub const CAL_FUNC_NOT_SUPPORTED: u16 = 0xFFFF;

/// The most calibration modes a lookup table can list for each filter.
pub const MAX_CAL_MODES: usize = 8;

/// The calibration image version, from the first byte of the calibration region.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CalibrationVersion {
    /// The calibration region is erased.
    NotFound,
    V5,
    Unsupported(u8),
}

impl From<u8> for CalibrationVersion {
    fn from(raw: u8) -> Self {
        match raw {
            0xFF => Self::NotFound,
            5 => Self::V5,
            other => Self::Unsupported(other),
        }
    }
}

/// The analog part of the RSSI mode offset, measured at each calibration mode's BLF.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalogOffsets {
    blf_khz: ArrayVec<u16, MAX_CAL_MODES>,
    offsets: ArrayVec<i16, MAX_CAL_MODES>,
}

impl AnalogOffsets {
    /// The BLF of each calibration mode, ascending.
    pub fn blf_khz(&self) -> &[u16] {
        &self.blf_khz
    }

    /// The analog offset for each entry of [`blf_khz`][AnalogOffsets::blf_khz].
    pub fn offsets(&self) -> &[i16] {
        &self.offsets
    }

    /// Derive the offsets for `cal_modes` from the calibrated RSSI mode table.
    ///
    /// Returns `true` if at least one of the modes was found in the calibration. Modes that
    /// weren't calibrated keep an offset of 0.
    fn fill(
        &mut self,
        params: &CalibrationParamsV5,
        lut: &RssiCompensationLut,
        cal_modes: &[CalMode],
    ) -> Result<bool, LibraryError> {
        if cal_modes.len() > MAX_CAL_MODES {
            return Err(LibraryError::BadParamValue(
                "Too many calibration modes in the RSSI lookup table",
            ));
        }
        self.blf_khz.clear();
        self.offsets.clear();
        let mut found = false;
        for cal_mode in cal_modes {
            self.blf_khz.push(cal_mode.blf);
            let calibrated = params
                .rssi
                .rf_modes
                .iter()
                .zip(params.rssi.rf_mode_lut.iter())
                .find(|(mode, _)| convert_legacy_rf_mode(**mode) == cal_mode.mode_id);
            let digital_correction = lut
                .rx_mode(cal_mode.mode_id)
                .and_then(|rx_mode| lut.correction(rx_mode))
                .map(|correction| correction.digital_correction);
            let offset = match (calibrated, digital_correction) {
                (Some((_, calibrated_offset)), Some(digital_correction)) => {
                    found = true;
                    calibrated_offset.wrapping_sub(digital_correction)
                }
                _ => 0,
            };
            self.offsets.push(offset);
        }
        Ok(found)
    }
}

fn check_sorted_by_blf(cal_modes: &[CalMode]) -> bool {
    cal_modes.windows(2).all(|pair| pair[0].blf < pair[1].blf)
}

/// Calibration data for one device.
#[derive(Clone, Debug)]
pub struct Calibration {
    version: CalibrationVersion,
    customer_version: u8,
    params: CalibrationParamsV5,
    lut: &'static RssiCompensationLut,
    baseband_filter: BasebandFilter,
    drm_analog_offsets: AnalogOffsets,
    non_drm_analog_offsets: AnalogOffsets,
}

impl Calibration {
    /// Load the calibration using the reference design RSSI tables.
    pub fn init<S>(source: &mut S) -> Result<Self, S::Error>
    where
        S: CalibrationSource,
    {
        Self::init_with_lut(source, &STANDARD_LUT, BasebandFilter::default())
    }

    /// Load the calibration with a specific set of RSSI tables and baseband filter selection.
    ///
    /// Fails if the calibration modes in `lut` aren't strictly sorted by BLF, or if a version 5
    /// calibration has none of the modes needed for one of the filters.
    pub fn init_with_lut<S>(
        source: &mut S,
        lut: &'static RssiCompensationLut,
        baseband_filter: BasebandFilter,
    ) -> Result<Self, S::Error>
    where
        S: CalibrationSource,
    {
        let mut header = [0u8; 2];
        source.read_calibration(0, &mut header)?;
        let version = CalibrationVersion::from(header[0]);
        let customer_version = header[1];

        let params = match version {
            CalibrationVersion::V5 => {
                let mut image = [0u8; v5::V5_IMAGE_LENGTH];
                source.read_calibration(0, &mut image)?;
                CalibrationParamsV5::from_data(&image)?
            }
            CalibrationVersion::NotFound => {
                warn!("CALIBRATION NOT FOUND, DEFAULT SETTINGS WILL BE USED");
                CalibrationParamsV5::DEFAULT
            }
            CalibrationVersion::Unsupported(raw) => {
                warn!("Calibration version {} is not supported", raw);
                CalibrationParamsV5::DEFAULT
            }
        };
        if customer_version != 0 {
            info!("Customer calibration version: {}", customer_version);
        }

        let mut calibration = Self {
            version,
            customer_version,
            params,
            lut,
            baseband_filter,
            drm_analog_offsets: AnalogOffsets::default(),
            non_drm_analog_offsets: AnalogOffsets::default(),
        };
        calibration.init_analog_offsets()?;
        Ok(calibration)
    }

    /// Rebuild the analog RSSI offsets from the current lookup table.
    fn init_analog_offsets(&mut self) -> Result<(), LibraryError> {
        if !check_sorted_by_blf(self.lut.drm_cal_modes) {
            return Err(LibraryError::BadParamValue(
                "DRM calibration modes are not sorted by BLF",
            ));
        }
        if !check_sorted_by_blf(self.lut.non_drm_cal_modes) {
            return Err(LibraryError::BadParamValue(
                "Non-DRM calibration modes are not sorted by BLF",
            ));
        }
        self.drm_analog_offsets = AnalogOffsets::default();
        self.non_drm_analog_offsets = AnalogOffsets::default();
        if !self.is_supported() {
            return Ok(());
        }
        let params = &self.params;
        if !self
            .drm_analog_offsets
            .fill(params, self.lut, self.lut.drm_cal_modes)?
        {
            return Err(LibraryError::InvalidData(
                "No DRM calibration modes were found",
            ));
        }
        if !self
            .non_drm_analog_offsets
            .fill(params, self.lut, self.lut.non_drm_cal_modes)?
        {
            return Err(LibraryError::InvalidData(
                "No non-DRM calibration modes were found",
            ));
        }
        Ok(())
    }

    pub fn version(&self) -> CalibrationVersion {
        self.version
    }

    pub fn customer_version(&self) -> u8 {
        self.customer_version
    }

    /// Whether the calibration is a version this crate can use.
    pub fn is_supported(&self) -> bool {
        self.version == CalibrationVersion::V5
    }

    /// The calibration parameters, or the uncalibrated defaults if the version isn't supported.
    pub fn params(&self) -> &CalibrationParamsV5 {
        if self.is_supported() {
            &self.params
        } else {
            &CalibrationParamsV5::DEFAULT
        }
    }

    pub fn rssi_compensation_lut(&self) -> &'static RssiCompensationLut {
        self.lut
    }

    /// Switch to a different set of RSSI tables, rebuilding the analog offsets.
    ///
    /// On failure the previous tables are restored.
    pub fn set_rssi_compensation_lut(
        &mut self,
        lut: &'static RssiCompensationLut,
    ) -> Result<(), LibraryError> {
        let previous = self.lut;
        self.lut = lut;
        self.init_analog_offsets().map_err(|err| {
            self.lut = previous;
            // Rebuilding with the tables that were already accepted can't fail.
            let _ = self.init_analog_offsets();
            err
        })
    }

    pub fn baseband_filter(&self) -> &BasebandFilter {
        &self.baseband_filter
    }

    pub fn set_baseband_filter(&mut self, baseband_filter: BasebandFilter) {
        self.baseband_filter = baseband_filter;
    }

    pub fn drm_analog_offsets(&self) -> &AnalogOffsets {
        &self.drm_analog_offsets
    }

    pub fn non_drm_analog_offsets(&self) -> &AnalogOffsets {
        &self.non_drm_analog_offsets
    }
}
