// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Detecting a disconnected antenna from reflected power after a ramp up.
//!
//! With nothing on the antenna port most of the transmitted power comes back into the reverse
//! power detectors. After each ramp the expected reflected power is converted to an ADC reading
//! on one of the `Rx` detectors; a measurement at or above that means the antenna is missing and
//! the transmitter is shut down.
use embedded_hal::blocking::delay::DelayUs;
use log::{error, warn};

use crate::board::BoardSpec;
use crate::error::{Error, LibraryError};
use crate::protocol::{Device, RegisterBus};
use crate::ramp::{RampCallbacks, RampContext};
use crate::rf_power::stop_op_and_ramp_down;

/// The default return loss of a connected antenna, in cdB.
pub const DEFAULT_RETURN_LOSS_CDB: u16 = 1000;

/// The default allowance above the expected reflected power, in cdB.
pub const DEFAULT_MAX_MARGIN_CDB: i16 = -400;

/// A post-ramp check for excessive reflected power.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AntennaDisconnect {
    return_loss_cdb: u16,
    max_margin_cdb: i16,

    /// Board losses between the antenna port and the receiver and LO pins.
    insertion_loss_rx_cdb: i16,
    insertion_loss_lo_cdb: i16,

    last_threshold: u16,
    last_measurement: u16,
}

impl AntennaDisconnect {
    pub fn new<S: BoardSpec>(board: &S) -> Self {
        Self {
            return_loss_cdb: DEFAULT_RETURN_LOSS_CDB,
            max_margin_cdb: DEFAULT_MAX_MARGIN_CDB,
            insertion_loss_rx_cdb: board.insertion_loss_rx_cdb(),
            insertion_loss_lo_cdb: board.insertion_loss_lo_cdb(),
            last_threshold: 0,
            last_measurement: 0,
        }
    }

    pub fn set_return_loss_cdb(&mut self, return_loss_cdb: u16) {
        self.return_loss_cdb = return_loss_cdb;
    }

    pub fn set_max_margin_cdb(&mut self, max_margin_cdb: i16) {
        self.max_margin_cdb = max_margin_cdb;
    }

    /// The ADC threshold used by the most recent check.
    pub fn last_reverse_power_adc_threshold(&self) -> u16 {
        self.last_threshold
    }

    /// The reflected power measured by the most recent check.
    pub fn last_reverse_power_adc(&self) -> u16 {
        self.last_measurement
    }

    /// The reflected power, in cdBm, that counts as a disconnect when transmitting at
    /// `tx_power_cdbm`.
    ///
    /// The detectors are calibrated against the LO pin, so the difference between the receive and
    /// LO insertion losses is taken out as well.
    pub fn threshold_cdbm(&self, tx_power_cdbm: i16) -> i16 {
        let return_loss = self.return_loss_cdb.min(i16::MAX as u16) as i16;
        tx_power_cdbm
            .saturating_sub(return_loss)
            .saturating_sub(self.insertion_loss_rx_cdb - self.insertion_loss_lo_cdb)
            .saturating_sub(self.max_margin_cdb)
    }

    /// Measure the reflected power and compare it to the threshold for the ramp in `context`.
    ///
    /// A calibration without reverse power data can't detect anything, so it never reports a
    /// disconnect.
    pub fn threshold_exceeded<B, D>(
        &mut self,
        device: &mut Device<B, D>,
        context: &RampContext,
    ) -> Result<bool, Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let threshold_cdbm = self.threshold_cdbm(context.config.tx_power_cdbm);
        let conditions = context.config.tx_conditions();
        let target = match context
            .calibration
            .reverse_power_to_adc(threshold_cdbm, &conditions)
        {
            Some(target) => target,
            None => {
                warn!("Reverse power detection isn't supported by this calibration");
                return Ok(false);
            }
        };
        let measurement = device
            .measure_aux_adc(target.detector.result(), 1)?
            .first()
            .copied()
            .ok_or(LibraryError::InvalidData("No reverse power measurement"))?;
        self.last_threshold = target.adc;
        self.last_measurement = measurement;
        Ok(measurement >= target.adc)
    }
}

impl<B, D> RampCallbacks<B, D> for AntennaDisconnect
where
    B: RegisterBus,
    D: DelayUs<u32>,
{
    fn post_ramp(
        &mut self,
        device: &mut Device<B, D>,
        context: &RampContext,
    ) -> Result<(), Error<B>> {
        match self.threshold_exceeded(device, context) {
            Ok(false) => Ok(()),
            Ok(true) => {
                error!(
                    "Antenna {} looks disconnected: reverse power ADC {} >= {}",
                    context.config.antenna, self.last_measurement, self.last_threshold
                );
                stop_op_and_ramp_down(device)?;
                Err(LibraryError::AboveThreshold.into())
            }
            Err(err) => {
                error!("Reverse power check failed, ramping down");
                // Report the measurement failure, not a ramp down failure.
                let _ = stop_op_and_ramp_down(device);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use ex10_rf_test_data::{erased_calibration_image, v5_calibration_image};

    use crate::active_region::SynthesizerParams;
    use crate::board::ReferenceBoard;
    use crate::calibration::{Calibration, PowerConfigs};
    use crate::error::{Error, LibraryError};
    use crate::protocol::Device;
    use crate::ramp::{ChannelSnapshot, RampCallbacks, RampContext};
    use crate::region::{RegulatoryTimers, RfFilter};
    use crate::register::*;
    use crate::rf_power::CwConfig;
    use crate::test::{MockDelay, MockDevice};

    use super::AntennaDisconnect;

    fn config(tx_power_cdbm: i16) -> CwConfig {
        CwConfig {
            antenna: 1,
            rf_mode: 103,
            tx_power_cdbm,
            temperature_adc: None,
            rf_filter: RfFilter::UpperBand,
            frequency_khz: 915_250,
            synthesizer: SynthesizerParams {
                frequency_khz: 915_250,
                r_divider_index: 1,
                n_divider: 7322,
            },
            gpio: GpioPinsSetClear::default(),
            power: PowerConfigs::open_loop(tx_power_cdbm),
            timers: RegulatoryTimers::DISABLED,
        }
    }

    fn context<'a>(config: &'a CwConfig, calibration: &'a Calibration) -> RampContext<'a> {
        RampContext {
            config,
            calibration,
            channel: ChannelSnapshot {
                index: 0,
                frequency_khz: config.frequency_khz,
            },
        }
    }

    fn ramped_up_device() -> (MockDevice, Device<MockDevice, MockDelay>) {
        let mock = MockDevice::new();
        mock.set_register(&CwIsOn::new(true));
        let device = Device::new(mock.clone(), MockDelay);
        (mock, device)
    }

    #[test]
    fn threshold_from_board_losses() {
        let check = AntennaDisconnect::new(&ReferenceBoard);
        // 3000 - 1000 - (1100 - 1440) + 400
        assert_eq!(check.threshold_cdbm(3000), 2740);
        let mut check = check;
        check.set_return_loss_cdb(1500);
        check.set_max_margin_cdb(0);
        assert_eq!(check.threshold_cdbm(3000), 1840);
    }

    #[test]
    fn disconnected_antenna_ramps_down() {
        let calibration = Calibration::init(&mut &v5_calibration_image()[..]).unwrap();
        let config = config(3000);
        let context = context(&config, &calibration);
        let mut check = AntennaDisconnect::new(&ReferenceBoard);
        let target = calibration
            .reverse_power_to_adc(check.threshold_cdbm(3000), &config.tx_conditions())
            .unwrap();
        let (mock, mut device) = ramped_up_device();
        mock.set_aux_adc_result(target.detector.result(), target.adc);

        let result = RampCallbacks::post_ramp(&mut check, &mut device, &context);
        assert!(matches!(
            result,
            Err(Error::LibraryError(LibraryError::AboveThreshold))
        ));
        assert_eq!(
            mock.ops_started(),
            [OpId::MeasureAdc, OpId::Idle, OpId::TxRampDown]
        );
        assert!(!mock.register::<CwIsOn>().is_on());
        assert_eq!(check.last_reverse_power_adc_threshold(), target.adc);
        assert_eq!(check.last_reverse_power_adc(), target.adc);
        let control: AuxAdcControl = mock.register();
        assert_eq!(
            control.channel_enable_bits(),
            target.detector.result().enable_bits(1)
        );
    }

    #[test]
    fn connected_antenna_keeps_transmitting() {
        let calibration = Calibration::init(&mut &v5_calibration_image()[..]).unwrap();
        let config = config(3000);
        let context = context(&config, &calibration);
        let mut check = AntennaDisconnect::new(&ReferenceBoard);
        let target = calibration
            .reverse_power_to_adc(check.threshold_cdbm(3000), &config.tx_conditions())
            .unwrap();
        assert!(target.adc > 0);
        let (mock, mut device) = ramped_up_device();
        mock.set_aux_adc_result(target.detector.result(), target.adc - 1);

        assert!(RampCallbacks::post_ramp(&mut check, &mut device, &context).is_ok());
        assert_eq!(mock.ops_started(), [OpId::MeasureAdc]);
        assert!(mock.register::<CwIsOn>().is_on());
    }

    #[test]
    fn uncalibrated_is_never_disconnected() {
        let calibration = Calibration::init(&mut &erased_calibration_image()[..]).unwrap();
        let config = config(3000);
        let context = context(&config, &calibration);
        let mut check = AntennaDisconnect::new(&ReferenceBoard);
        let (mock, mut device) = ramped_up_device();
        assert!(RampCallbacks::post_ramp(&mut check, &mut device, &context).is_ok());
        assert!(mock.ops_started().is_empty());
    }

    #[test]
    fn measurement_failure_ramps_down() {
        let calibration = Calibration::init(&mut &v5_calibration_image()[..]).unwrap();
        let config = config(3000);
        let context = context(&config, &calibration);
        let mut check = AntennaDisconnect::new(&ReferenceBoard);
        let (mock, mut device) = ramped_up_device();
        mock.fail_op(OpId::MeasureAdc, OpsErrorCode::UnknownError);
        let result = RampCallbacks::post_ramp(&mut check, &mut device, &context);
        assert!(result.unwrap_err().is_device_error());
        assert_eq!(
            mock.ops_started(),
            [OpId::MeasureAdc, OpId::Idle, OpId::TxRampDown]
        );
    }
}
