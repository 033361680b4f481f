// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! The version 5 calibration image.
//!
//! The image lives in the 2048-byte calibration region of the device. Fields are little-endian
//! and sit at fixed offsets, with a few unused gaps between them:
//!
//! | Offset | Field |
//! |-------:|-------|
//! | 0 | calibration version |
//! | 1 | customer calibration version |
//! | 4 | calibration type strings (6 bytes) |
//! | 10 | user board ID |
//! | 12 | TX scalar |
//! | 14, 22 | RF filter limits (upper, lower band) |
//! | 30 | valid power detector ADC range |
//! | 34 | power control loop parameters |
//! | 40 | upper band tables (see below) |
//! | 456 | lower band tables |
//! | 872 | DC offset per attenuation |
//! | 996..1202 | RSSI tables |
//!
//! Each band's tables are laid out relative to the band's base offset:
//!
//! | Offset | Field |
//! |-------:|-------|
//! | 0 | power detector ADC curves (3 × 31 × u16) |
//! | 186 | coarse attenuation power curve (31 × f32) |
//! | 310 | forward power temperature slope |
//! | 314 | calibration temperature ADC |
//! | 316 | power detector temperature slopes (3 × f32) |
//! | 328 | power detector frequency shifts (3 × 4 × i16) |
//! | 352 | frequencies of the shifts in MHz (4 × f32) |
//! | 384 | forward power frequency shifts (4 × f32) |
use crate::error::LibraryError;
use crate::region::RfFilter;
use crate::util::Buffer;

/// The number of coarse attenuation settings.
pub const NUM_ATTENUATIONS: usize = 31;

/// The number of forward power detectors.
pub const NUM_POWER_DETECTORS: usize = 3;

/// The number of frequencies the frequency compensation tables are measured at.
pub const NUM_FREQUENCY_POINTS: usize = 4;

/// The number of RF modes the RSSI calibration can hold.
pub const NUM_RSSI_RF_MODES: usize = 32;

/// The number of entries in the RSSI antenna tables.
pub const NUM_RSSI_ANTENNAS: usize = 8;

/// The number of settings for each receiver gain stage.
pub const NUM_GAIN_SETTINGS: usize = 4;

/// The number of bytes of the calibration region a version 5 image uses.
pub const V5_IMAGE_LENGTH: usize = 1202;

/// The value stored for an attenuation that was skipped during calibration.
pub const UNPOPULATED_DBM: f32 = 255.0;

const UPPER_BAND_OFFSET: usize = 40;
const LOWER_BAND_OFFSET: usize = 456;
const DC_OFFSET_OFFSET: usize = 872;
const RSSI_OFFSET: usize = 996;
const RSSI_FREQ_SHIFT_OFFSET: usize = 1188;

/// Which procedure produced each part of the calibration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VersionStrings {
    pub power_detect_cal_type: u8,
    pub forward_power_cal_type: u8,
    pub power_detector_temp_comp_type: u8,
    pub forward_power_temp_comp_type: u8,
    pub power_detector_freq_comp_type: u8,
    pub forward_power_freq_comp_type: u8,
}

/// Frequency limits of a band's RF filter, in MHz.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RfFilterLimits {
    pub low_freq_limit: f32,
    pub high_freq_limit: f32,
}

/// Transmit power calibration for one RF band.
#[derive(Clone, Debug, PartialEq)]
pub struct BandCalibration {
    /// ADC readings of each power detector at every coarse attenuation setting.
    pub pdet_adc_lut: [[u16; NUM_ATTENUATIONS]; NUM_POWER_DETECTORS],

    /// The output power in dBm at each coarse attenuation setting.
    ///
    /// Settings too strong to measure during calibration are skipped, and are `None`.
    pub coarse_attn_cal: [Option<f32>; NUM_ATTENUATIONS],

    /// dB of forward power change per temperature ADC code.
    pub fwd_power_temp_slope: f32,

    /// The temperature ADC reading when the band was calibrated.
    pub cal_temp_adc: u16,

    /// dB of power detector change per temperature ADC code, per detector.
    pub lo_pdet_temp_slope: [f32; NUM_POWER_DETECTORS],

    /// Power detector shifts in cdB at each of `lo_pdet_freqs`, per detector.
    pub lo_pdet_freq_adc_shifts: [[i16; NUM_FREQUENCY_POINTS]; NUM_POWER_DETECTORS],

    /// MHz, ascending.
    pub lo_pdet_freqs: [f32; NUM_FREQUENCY_POINTS],

    /// Forward power shifts in dB at each of `lo_pdet_freqs`.
    pub fwd_pwr_shifts: [f32; NUM_FREQUENCY_POINTS],

    /// RSSI log2 offset for receiving in this band.
    pub rssi_freq_shift: i16,
}

impl BandCalibration {
    pub const DEFAULT: Self = Self {
        pdet_adc_lut: [[0; NUM_ATTENUATIONS]; NUM_POWER_DETECTORS],
        coarse_attn_cal: [Some(0.0); NUM_ATTENUATIONS],
        fwd_power_temp_slope: 0.0,
        cal_temp_adc: 0,
        lo_pdet_temp_slope: [0.0; NUM_POWER_DETECTORS],
        lo_pdet_freq_adc_shifts: [[0; NUM_FREQUENCY_POINTS]; NUM_POWER_DETECTORS],
        lo_pdet_freqs: [0.0; NUM_FREQUENCY_POINTS],
        fwd_pwr_shifts: [0.0; NUM_FREQUENCY_POINTS],
        rssi_freq_shift: 0,
    };

    /// The index of the first populated coarse attenuation among the first `limit` settings.
    pub fn first_populated_attenuation(&self, limit: usize) -> Option<usize> {
        self.coarse_attn_cal
            .iter()
            .take(limit)
            .position(Option::is_some)
    }

    /// The calibrated power at `index` for searches over the curve.
    ///
    /// Unpopulated settings sort above every real power, so they are never chosen as the closest
    /// match for a reachable target.
    pub(crate) fn attenuation_dbm(&self, index: usize) -> f32 {
        self.coarse_attn_cal[index].unwrap_or(UNPOPULATED_DBM)
    }

    fn from_buffer(buf: &mut &[u8]) -> Self {
        let mut pdet_adc_lut = [[0u16; NUM_ATTENUATIONS]; NUM_POWER_DETECTORS];
        for detector in pdet_adc_lut.iter_mut() {
            *detector = read_array(buf, |b| b.get_u16());
        }
        let coarse_attn_cal = read_array(buf, |b| {
            let dbm = b.get_f32();
            if dbm < UNPOPULATED_DBM {
                Some(dbm)
            } else {
                None
            }
        });
        let fwd_power_temp_slope = buf.get_f32();
        let cal_temp_adc = buf.get_u16();
        let lo_pdet_temp_slope = read_array(buf, |b| b.get_f32());
        let mut lo_pdet_freq_adc_shifts = [[0i16; NUM_FREQUENCY_POINTS]; NUM_POWER_DETECTORS];
        for shifts in lo_pdet_freq_adc_shifts.iter_mut() {
            *shifts = read_array(buf, |b| b.get_i16());
        }
        let lo_pdet_freqs = read_array(buf, |b| b.get_f32());
        // 16 unused bytes
        buf.advance(16);
        let fwd_pwr_shifts = read_array(buf, |b| b.get_f32());
        Self {
            pdet_adc_lut,
            coarse_attn_cal,
            fwd_power_temp_slope,
            cal_temp_adc,
            lo_pdet_temp_slope,
            lo_pdet_freq_adc_shifts,
            lo_pdet_freqs,
            fwd_pwr_shifts,
            rssi_freq_shift: 0,
        }
    }
}

/// Receive signal strength calibration.
#[derive(Clone, Debug, PartialEq)]
pub struct RssiCalibration {
    /// The RF modes RSSI was measured with. Entries may use pre-2.0 firmware mode IDs.
    pub rf_modes: [u16; NUM_RSSI_RF_MODES],

    /// The measured offset for each of `rf_modes`.
    pub rf_mode_lut: [i16; NUM_RSSI_RF_MODES],

    pub pga1_lut: [i16; NUM_GAIN_SETTINGS],
    pub pga2_lut: [i16; NUM_GAIN_SETTINGS],
    pub pga3_lut: [i16; NUM_GAIN_SETTINGS],
    pub mixer_gain_lut: [i16; NUM_GAIN_SETTINGS],
    pub rx_att_gain_lut: [i16; NUM_GAIN_SETTINGS],

    /// Maps an antenna port to an index into `antenna_lut`.
    pub antennas: [u8; NUM_RSSI_ANTENNAS],

    pub antenna_lut: [i16; NUM_RSSI_ANTENNAS],

    /// The input power (dBm) of the reference point.
    pub input_powers: i16,

    /// The RSSI log2 reading at the reference point.
    pub power_shifts: i16,

    /// Parsed but not used; RSSI temperature compensation uses a fixed slope.
    pub temp_slope: f32,

    /// Temperature ADC reading the RSSI tables were measured at.
    pub temp_intercept: u16,
}

impl RssiCalibration {
    pub const DEFAULT: Self = Self {
        rf_modes: [0; NUM_RSSI_RF_MODES],
        rf_mode_lut: [0; NUM_RSSI_RF_MODES],
        pga1_lut: [0; NUM_GAIN_SETTINGS],
        pga2_lut: [0; NUM_GAIN_SETTINGS],
        pga3_lut: [0; NUM_GAIN_SETTINGS],
        mixer_gain_lut: [0; NUM_GAIN_SETTINGS],
        rx_att_gain_lut: [0; NUM_GAIN_SETTINGS],
        antennas: [0; NUM_RSSI_ANTENNAS],
        antenna_lut: [0; NUM_RSSI_ANTENNAS],
        input_powers: 0,
        power_shifts: 0,
        temp_slope: 0.0,
        temp_intercept: 0,
    };
}

/// The parsed contents of a version 5 calibration image.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationParamsV5 {
    pub calibration_version: u8,
    pub customer_calibration_version: u8,
    pub version_strings: VersionStrings,
    pub user_board_id: u16,

    /// The fine gain that produces the calibrated power curves.
    pub tx_scalar_cal: i16,

    pub rf_filter_upper_band: RfFilterLimits,
    pub rf_filter_lower_band: RfFilterLimits,

    /// Power detector readings outside this range are not trusted.
    pub valid_min_adc: u16,
    pub valid_max_adc: u16,

    pub loop_gain_divisor: u16,
    pub error_threshold: u8,
    pub max_iterations: u8,

    pub upper_band: BandCalibration,
    pub lower_band: BandCalibration,

    /// DC offset for each coarse attenuation setting.
    pub dc_offset: [i32; NUM_ATTENUATIONS],

    pub rssi: RssiCalibration,
}

impl CalibrationParamsV5 {
    /// The values used when the device has no usable calibration.
    pub const DEFAULT: Self = Self {
        calibration_version: 0xFF,
        customer_calibration_version: 0,
        version_strings: VersionStrings {
            power_detect_cal_type: 5,
            forward_power_cal_type: 1,
            power_detector_temp_comp_type: 2,
            forward_power_temp_comp_type: 1,
            power_detector_freq_comp_type: 2,
            forward_power_freq_comp_type: 1,
        },
        user_board_id: 0,
        tx_scalar_cal: 1152,
        rf_filter_upper_band: RfFilterLimits {
            low_freq_limit: 0.0,
            high_freq_limit: 0.0,
        },
        rf_filter_lower_band: RfFilterLimits {
            low_freq_limit: 0.0,
            high_freq_limit: 0.0,
        },
        valid_min_adc: 0,
        valid_max_adc: 0,
        loop_gain_divisor: 0,
        error_threshold: 0,
        max_iterations: 0,
        upper_band: BandCalibration::DEFAULT,
        lower_band: BandCalibration::DEFAULT,
        dc_offset: [0; NUM_ATTENUATIONS],
        rssi: RssiCalibration::DEFAULT,
    };

    /// Parse a version 5 image.
    ///
    /// `data` starts at the beginning of the calibration region and must hold at least
    /// [`V5_IMAGE_LENGTH`] bytes. The version byte is not checked.
    pub fn from_data(data: &[u8]) -> Result<Self, LibraryError> {
        if data.len() < V5_IMAGE_LENGTH {
            return Err(LibraryError::InvalidData(
                "Not enough data for a version 5 calibration image",
            ));
        }
        let mut buf = data;
        let calibration_version = buf.get_u8();
        let customer_calibration_version = buf.get_u8();
        buf.advance(2);
        let version_strings = VersionStrings {
            power_detect_cal_type: buf.get_u8(),
            forward_power_cal_type: buf.get_u8(),
            power_detector_temp_comp_type: buf.get_u8(),
            forward_power_temp_comp_type: buf.get_u8(),
            power_detector_freq_comp_type: buf.get_u8(),
            forward_power_freq_comp_type: buf.get_u8(),
        };
        let user_board_id = buf.get_u16();
        let tx_scalar_cal = buf.get_i16();
        let rf_filter_upper_band = RfFilterLimits {
            low_freq_limit: buf.get_f32(),
            high_freq_limit: buf.get_f32(),
        };
        let rf_filter_lower_band = RfFilterLimits {
            low_freq_limit: buf.get_f32(),
            high_freq_limit: buf.get_f32(),
        };
        let valid_min_adc = buf.get_u16();
        let valid_max_adc = buf.get_u16();
        let loop_gain_divisor = buf.get_u16();
        let error_threshold = buf.get_u8();
        let max_iterations = buf.get_u8();

        let mut upper_band = BandCalibration::from_buffer(&mut &data[UPPER_BAND_OFFSET..]);
        let mut lower_band = BandCalibration::from_buffer(&mut &data[LOWER_BAND_OFFSET..]);

        let mut buf = &data[DC_OFFSET_OFFSET..];
        let dc_offset = read_array(&mut buf, |b| b.get_i32());

        let mut buf = &data[RSSI_OFFSET..];
        let rf_modes = read_array(&mut buf, |b| b.get_u16());
        let rf_mode_lut = read_array(&mut buf, |b| b.get_i16());
        let pga1_lut = read_array(&mut buf, |b| b.get_i16());
        let pga2_lut = read_array(&mut buf, |b| b.get_i16());
        let pga3_lut = read_array(&mut buf, |b| b.get_i16());
        let mixer_gain_lut = read_array(&mut buf, |b| b.get_i16());
        let rx_att_gain_lut = read_array(&mut buf, |b| b.get_i16());
        let antennas = read_array(&mut buf, |b| b.get_u8());
        let antenna_lut = read_array(&mut buf, |b| b.get_i16());
        debug_assert_eq!(data.len() - buf.len(), RSSI_FREQ_SHIFT_OFFSET);
        upper_band.rssi_freq_shift = buf.get_i16();
        lower_band.rssi_freq_shift = buf.get_i16();
        let input_powers = buf.get_i16();
        let power_shifts = buf.get_i16();
        let temp_slope = buf.get_f32();
        let temp_intercept = buf.get_u16();

        Ok(Self {
            calibration_version,
            customer_calibration_version,
            version_strings,
            user_board_id,
            tx_scalar_cal,
            rf_filter_upper_band,
            rf_filter_lower_band,
            valid_min_adc,
            valid_max_adc,
            loop_gain_divisor,
            error_threshold,
            max_iterations,
            upper_band,
            lower_band,
            dc_offset,
            rssi: RssiCalibration {
                rf_modes,
                rf_mode_lut,
                pga1_lut,
                pga2_lut,
                pga3_lut,
                mixer_gain_lut,
                rx_att_gain_lut,
                antennas,
                antenna_lut,
                input_powers,
                power_shifts,
                temp_slope,
                temp_intercept,
            },
        })
    }

    /// The tables for a band. Anything other than the lower band uses the upper band tables.
    pub fn band(&self, rf_band: RfFilter) -> &BandCalibration {
        match rf_band {
            RfFilter::LowerBand => &self.lower_band,
            _ => &self.upper_band,
        }
    }
}

impl Default for CalibrationParamsV5 {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn read_array<T, F, const N: usize>(buf: &mut &[u8], mut read: F) -> [T; N]
where
    T: Copy + Default,
    F: FnMut(&mut &[u8]) -> T,
{
    let mut values = [T::default(); N];
    for value in values.iter_mut() {
        *value = read(buf);
    }
    values
}
