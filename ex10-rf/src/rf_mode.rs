// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! RF mode identifiers and the receive baseband filter choice that goes with them.
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// An RF mode ID, the combination of link encoding and rate settings the reader uses.
pub type RfMode = u16;

/// Map RF mode IDs used by older firmware onto their current equivalents.
///
/// Devices calibrated with older firmware store the old IDs in their RSSI calibration tables.
/// Unknown IDs are returned unchanged.
pub fn convert_legacy_rf_mode(rf_mode: RfMode) -> RfMode {
    match rf_mode {
        1 => 124,
        3 => 123,
        5 => 141,
        7 => 146,
        11 => 102,
        12 => 125,
        13 => 185,
        15 => 147,
        other => other,
    }
}

/// Override for the dense reader mode filter selection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DrmStatus {
    /// Use the DRM filter for the modes the board was designed to use it with.
    Auto = 0,
    On = 1,
    Off = 2,
}

impl Default for DrmStatus {
    fn default() -> Self {
        Self::Auto
    }
}

/// The two receive baseband filters on the reference design.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BasebandFilterType {
    Highpass = 0,
    Bandpass = 1,
}

/// Modes that use the DRM filter when the status is [`DrmStatus::Auto`].
///
/// 241 and 244 duplicate modes 5 and 7.
const DRM_MODES: [RfMode; 13] = [
    5, 7, 141, 146, 186, 241, 244, 286, 342, 343, 383, 4141, 4146,
];

/// Extra Gen2X modes that use the DRM filter.
const GEN2X_DRM_MODES: [RfMode; 6] = [4141, 4146, 4241, 4244, 4342, 4343];

/// Which set of RF modes the board supports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModeSet {
    Standard,
    Gen2x,
}

/// Chooses the receive baseband filter for an RF mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasebandFilter {
    drm_status: DrmStatus,
    mode_set: ModeSet,
}

impl BasebandFilter {
    pub fn new(mode_set: ModeSet) -> Self {
        Self {
            drm_status: DrmStatus::default(),
            mode_set,
        }
    }

    pub fn drm_status(&self) -> DrmStatus {
        self.drm_status
    }

    pub fn set_drm_status(&mut self, status: DrmStatus) {
        self.drm_status = status;
    }

    pub fn mode_set(&self) -> ModeSet {
        self.mode_set
    }

    /// Whether `rf_mode` receives through the dense reader mode filter.
    pub fn rf_mode_is_drm(&self, rf_mode: RfMode) -> bool {
        match self.drm_status {
            DrmStatus::On => true,
            DrmStatus::Off => false,
            DrmStatus::Auto => {
                (self.mode_set == ModeSet::Gen2x && GEN2X_DRM_MODES.contains(&rf_mode))
                    || DRM_MODES.contains(&rf_mode)
            }
        }
    }

    pub fn choose(&self, rf_mode: RfMode) -> BasebandFilterType {
        if self.rf_mode_is_drm(rf_mode) {
            BasebandFilterType::Bandpass
        } else {
            BasebandFilterType::Highpass
        }
    }
}

impl Default for BasebandFilter {
    fn default() -> Self {
        Self::new(ModeSet::Standard)
    }
}
