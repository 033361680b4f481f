// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Board specific values and GPIO wiring.
use crate::error::LibraryError;
use crate::region::RfFilter;
use crate::register::{GpioPinsSetClear, RxGainControl};
use crate::rf_mode::BasebandFilterType;

/// The parts of the board design the RF power code needs to know about.
pub trait BoardSpec {
    /// The frequency of the reference oscillator in kHz.
    fn tcxo_frequency_khz(&self) -> u32;

    /// The most power the board can transmit, in cdBm.
    fn max_tx_power_cdbm(&self) -> i16;

    /// The number of antenna ports. Ports are numbered starting at 1.
    fn antenna_count(&self) -> u8;

    /// Loss between the antenna port and the receiver, in cdB.
    fn insertion_loss_rx_cdb(&self) -> i16;

    /// Loss between the transmitter and the antenna port, in cdB.
    fn insertion_loss_lo_cdb(&self) -> i16;

    /// Whether a temperature reading is trustworthy enough to compensate with.
    fn temperature_compensation_enabled(&self, temperature_adc: u16) -> bool;

    /// The GPIO changes needed to transmit at `tx_power_cdbm` on `antenna`.
    fn gpio_output_pins_set_clear(
        &self,
        antenna: u8,
        tx_power_cdbm: i16,
        baseband_filter: BasebandFilterType,
        rf_filter: RfFilter,
    ) -> Result<GpioPinsSetClear, LibraryError>;

    /// The GPIO changes needed to select only a receive baseband filter.
    fn baseband_filter_set_clear(&self, baseband_filter: BasebandFilterType) -> GpioPinsSetClear;

    /// The receiver gains applied when the chip is first powered up.
    fn default_rx_analog_config(&self) -> RxGainControl;
}

/// GPIO pin numbers on the reference design.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct BoardGpioPins {
    /// High selects antenna 1, low antenna 2.
    antenna: u8,

    /// High selects the bandpass (DRM) filter.
    baseband_filter: u8,

    pa_bias_enable: u8,

    /// High selects the high power range of the PA.
    power_range: u8,

    rf_enable: u8,

    /// High selects the lower band SAW filter.
    saw_filter: u8,
}

const REFERENCE_PINS: BoardGpioPins = BoardGpioPins {
    antenna: 19,
    baseband_filter: 7,
    pa_bias_enable: 16,
    power_range: 15,
    rf_enable: 17,
    saw_filter: 18,
};

/// Above this power the PA is switched to its high power range.
const LOW_BIAS_TX_POWER_MAX_CDBM: i16 = 2700;

/// Temperature ADC readings above this are treated as bogus.
const TEMPERATURE_ADC_THRESHOLD: u16 = 500;

/// The Impinj reference reader design (R807).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReferenceBoard;

impl ReferenceBoard {
    /// The pins that are always driven on the reference board, with the PA and RF supply enabled.
    pub fn default_gpio_setup(&self) -> GpioPinsSetClear {
        let mut pins = GpioPinsSetClear::default();
        Self::set_pin(&mut pins, REFERENCE_PINS.pa_bias_enable, true);
        Self::set_pin(&mut pins, REFERENCE_PINS.rf_enable, true);
        pins
    }

    fn set_pin(pins: &mut GpioPinsSetClear, pin: u8, level: bool) {
        pins.set_clear((level as u32) << pin, 1 << pin);
    }
}

impl BoardSpec for ReferenceBoard {
    fn tcxo_frequency_khz(&self) -> u32 {
        24_000
    }

    fn max_tx_power_cdbm(&self) -> i16 {
        3000
    }

    fn antenna_count(&self) -> u8 {
        2
    }

    fn insertion_loss_rx_cdb(&self) -> i16 {
        1100
    }

    fn insertion_loss_lo_cdb(&self) -> i16 {
        1440
    }

    fn temperature_compensation_enabled(&self, temperature_adc: u16) -> bool {
        temperature_adc <= TEMPERATURE_ADC_THRESHOLD
    }

    fn gpio_output_pins_set_clear(
        &self,
        antenna: u8,
        tx_power_cdbm: i16,
        baseband_filter: BasebandFilterType,
        rf_filter: RfFilter,
    ) -> Result<GpioPinsSetClear, LibraryError> {
        if antenna == 0 || antenna > self.antenna_count() {
            return Err(LibraryError::BadParamValue("antenna port does not exist"));
        }
        let lower_band = match rf_filter {
            RfFilter::LowerBand => true,
            RfFilter::UpperBand => false,
            RfFilter::Undefined => {
                return Err(LibraryError::BadParamValue("RF filter is undefined"))
            }
        };
        let mut pins = GpioPinsSetClear::default();
        Self::set_pin(&mut pins, REFERENCE_PINS.antenna, antenna == 1);
        Self::set_pin(
            &mut pins,
            REFERENCE_PINS.power_range,
            tx_power_cdbm > LOW_BIAS_TX_POWER_MAX_CDBM,
        );
        Self::set_pin(
            &mut pins,
            REFERENCE_PINS.baseband_filter,
            baseband_filter == BasebandFilterType::Bandpass,
        );
        Self::set_pin(&mut pins, REFERENCE_PINS.saw_filter, lower_band);
        Ok(pins)
    }

    fn baseband_filter_set_clear(&self, baseband_filter: BasebandFilterType) -> GpioPinsSetClear {
        let mut pins = GpioPinsSetClear::default();
        Self::set_pin(
            &mut pins,
            REFERENCE_PINS.baseband_filter,
            baseband_filter == BasebandFilterType::Bandpass,
        );
        pins
    }

    fn default_rx_analog_config(&self) -> RxGainControl {
        // 0 dB attenuation, PGA1 12 dB, PGA2 0 dB, PGA3 18 dB, mixer 11.2 dB
        RxGainControl {
            mixer_bandwidth: true,
            ..RxGainControl::new(0, 3, 0, 3, 1)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::error::LibraryError;
    use crate::region::RfFilter;
    use crate::register::Register;
    use crate::rf_mode::BasebandFilterType;

    use super::{BoardSpec, ReferenceBoard};

    #[test]
    fn antenna_one_high_power() {
        let pins = ReferenceBoard
            .gpio_output_pins_set_clear(1, 3000, BasebandFilterType::Bandpass, RfFilter::UpperBand)
            .unwrap();
        assert_eq!(pins.output_level_set, (1 << 19) | (1 << 15) | (1 << 7));
        assert_eq!(pins.output_level_clear, 1 << 18);
        assert_eq!(
            pins.output_enable_set,
            (1 << 19) | (1 << 15) | (1 << 7) | (1 << 18)
        );
        assert_eq!(pins.output_enable_clear, 0);
    }

    #[test]
    fn antenna_two_low_power() {
        let pins = ReferenceBoard
            .gpio_output_pins_set_clear(2, 2700, BasebandFilterType::Highpass, RfFilter::LowerBand)
            .unwrap();
        assert_eq!(pins.output_level_set, 1 << 18);
        assert_eq!(pins.output_level_clear, (1 << 19) | (1 << 15) | (1 << 7));
    }

    #[test]
    fn bad_gpio_parameters() {
        let board = ReferenceBoard;
        for antenna in [0, 3] {
            assert!(matches!(
                board.gpio_output_pins_set_clear(
                    antenna,
                    3000,
                    BasebandFilterType::Bandpass,
                    RfFilter::UpperBand
                ),
                Err(LibraryError::BadParamValue(_))
            ));
        }
        assert!(board
            .gpio_output_pins_set_clear(1, 3000, BasebandFilterType::Bandpass, RfFilter::Undefined)
            .is_err());
    }

    #[test]
    fn baseband_filter_only() {
        let pins = ReferenceBoard.baseband_filter_set_clear(BasebandFilterType::Highpass);
        assert_eq!(pins.output_level_set, 0);
        assert_eq!(pins.output_level_clear, 1 << 7);
        assert_eq!(pins.output_enable_set, 1 << 7);
    }

    #[test]
    fn temperature_threshold() {
        assert!(ReferenceBoard.temperature_compensation_enabled(500));
        assert!(!ReferenceBoard.temperature_compensation_enabled(501));
    }

    #[test]
    fn default_setup_enables_rf() {
        let pins = ReferenceBoard.default_gpio_setup();
        assert_eq!(pins.output_level_set, (1 << 16) | (1 << 17));
    }

    #[test]
    fn default_rx_gains() {
        let gains = ReferenceBoard.default_rx_analog_config();
        assert_eq!(gains.rx_atten(), 0);
        assert_eq!(gains.pga1_gain(), 3);
        assert_eq!(gains.pga3_gain(), 3);
        assert_eq!(gains.mixer_gain(), 1);
        assert!(!gains.pga1_rin_select());
        assert!(gains.mixer_bandwidth());
        assert_eq!(gains.to_bytes(), [0xcc, 0x44]);
    }
}
