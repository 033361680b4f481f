// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Turning the carrier wave on and off at a calibrated power.
//!
//! [`RfPower`] holds everything a ramp up needs to know that doesn't change from one ramp to the
//! next (calibration, region, board) and turns a request for a power on an antenna into a
//! [`CwConfig`], then into an Aggregate op that the device runs in one go.
use embedded_hal::blocking::delay::DelayUs;
use log::{debug, error};

use crate::active_region::{ActiveRegion, SynthesizerParams};
use crate::aggregate::{power_control_writes, AggregateOpBuilder, TX_MUTEX_TIME_US};
use crate::board::BoardSpec;
use crate::calibration::{Calibration, PowerConfigs, TxConditions};
use crate::error::{Error, LibraryError};
use crate::protocol::{Device, RegisterBus};
use crate::ramp::{ChannelSnapshot, RampCallbackSlot, RampContext};
use crate::region::{RegulatoryTimers, RfFilter};
use crate::register::{
    self, AnalogEnable, CwIsOn, DcOffset, EtsiBurstOffTime, ExtendedStopTime, GpioPinsSetClear,
    NominalStopTime, OpId, OpsControl, PowerDroopCompensation, Register, RegulatoryStopTime,
    RfModeRegister, RxGainControl, TxCoarseGain, TxFineGain, TxMutexTime,
};
use crate::rf_mode::RfMode;

/// Allowed droop compensation intervals, in milliseconds.
const DROOP_INTERVAL_RANGE_MS: core::ops::RangeInclusive<u8> = 10..=40;

/// Allowed droop compensation fine gain steps, in cdB.
const DROOP_STEP_RANGE_CDB: core::ops::RangeInclusive<u8> = 5..=15;

/// Abort the running op and ramp down, waiting for both.
///
/// Callbacks use this to make the transmitter safe without a handle to [`RfPower`].
pub fn stop_op_and_ramp_down<B, D>(device: &mut Device<B, D>) -> Result<(), Error<B>>
where
    B: RegisterBus,
    D: DelayUs<u32>,
{
    device.stop_op()?;
    device.wait_op_completion()?;
    device.start_op(OpId::TxRampDown)?;
    device.wait_op_completion()?;
    Ok(())
}

/// Everything needed for one ramp up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CwConfig {
    /// Antenna port, starting at 1.
    pub antenna: u8,
    pub rf_mode: RfMode,
    pub tx_power_cdbm: i16,

    /// The temperature the power was compensated for, if any.
    pub temperature_adc: Option<u16>,
    pub rf_filter: RfFilter,
    pub frequency_khz: u32,
    pub synthesizer: SynthesizerParams,
    pub gpio: GpioPinsSetClear,
    pub power: PowerConfigs,
    pub timers: RegulatoryTimers,
}

impl CwConfig {
    /// The conditions the power settings were calculated for.
    pub fn tx_conditions(&self) -> TxConditions {
        TxConditions {
            frequency_khz: self.frequency_khz,
            temperature_adc: self.temperature_adc,
            rf_band: self.rf_filter,
        }
    }
}

/// RF power control for one reader chip.
#[derive(Clone, Debug)]
pub struct RfPower<S> {
    calibration: Calibration,

    region: ActiveRegion,

    board: S,

    /// Whether ramps start above the requested power (Gen2v3 power boost).
    power_boost: bool,

    droop_compensation: PowerDroopCompensation,

    /// The last temperature measured with
    /// [`measure_and_read_adc_temperature`][RfPower::measure_and_read_adc_temperature].
    temperature_adc: Option<u16>,
}

impl<S> RfPower<S>
where
    S: BoardSpec,
{
    /// Power boost and droop compensation start out enabled.
    pub fn new(calibration: Calibration, region: ActiveRegion, board: S) -> Self {
        Self {
            calibration,
            region,
            board,
            power_boost: true,
            droop_compensation: PowerDroopCompensation::default(),
            temperature_adc: None,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut Calibration {
        &mut self.calibration
    }

    pub fn region(&self) -> &ActiveRegion {
        &self.region
    }

    pub fn region_mut(&mut self) -> &mut ActiveRegion {
        &mut self.region
    }

    pub fn board(&self) -> &S {
        &self.board
    }

    pub fn power_boost(&self) -> bool {
        self.power_boost
    }

    pub fn set_power_boost(&mut self, enable: bool) {
        self.power_boost = enable;
    }

    /// The droop compensation settings used by the next ramp up.
    pub fn droop_compensation(&self) -> &PowerDroopCompensation {
        &self.droop_compensation
    }

    /// The most recently measured temperature, if any.
    pub fn temperature_adc(&self) -> Option<u16> {
        self.temperature_adc
    }

    /// Work out the settings for ramping up on the next channel.
    ///
    /// When `temperature_adc` is `None` the last measured temperature is used instead. The power
    /// is only compensated for temperature if `temp_comp_enabled` is set. Boosted ramps are
    /// capped at the lower of the board's and the region's maximum power.
    pub fn build_cw_configs<B, D>(
        &self,
        device: &mut Device<B, D>,
        antenna: u8,
        rf_mode: RfMode,
        tx_power_cdbm: i16,
        temperature_adc: Option<u16>,
        temp_comp_enabled: bool,
    ) -> Result<CwConfig, Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let frequency_khz = self.region.next_channel_khz();
        let synthesizer = self.region.synthesizer_params(frequency_khz)?;
        let timers = self.region.next_channel_regulatory_timers(device)?;
        let rf_filter = self.region.rf_filter();
        let baseband_filter = self.calibration.baseband_filter().choose(rf_mode);
        let gpio =
            self.board
                .gpio_output_pins_set_clear(antenna, tx_power_cdbm, baseband_filter, rf_filter)?;

        let temperature_adc = temperature_adc.or(self.temperature_adc);
        let conditions = TxConditions {
            frequency_khz,
            temperature_adc: temperature_adc.filter(|_| temp_comp_enabled),
            rf_band: rf_filter,
        };
        let max_power_cdbm = self
            .board
            .max_tx_power_cdbm()
            .min(self.region.max_regulatory_tx_power());
        let power = self.calibration.power_control_params(
            tx_power_cdbm,
            self.power_boost,
            max_power_cdbm,
            &conditions,
        );
        Ok(CwConfig {
            antenna,
            rf_mode,
            tx_power_cdbm,
            temperature_adc: conditions.temperature_adc,
            rf_filter,
            frequency_khz,
            synthesizer,
            gpio,
            power,
            timers,
        })
    }

    /// The Aggregate op instructions that ramp up with `config`.
    pub fn ramp_up_sequence(&self, config: &CwConfig) -> Result<AggregateOpBuilder, LibraryError> {
        let power = &config.power;
        let mut builder = AggregateOpBuilder::new();
        builder.append_host_mutex(true)?;
        builder.append_set_clear_gpio_pins(&config.gpio)?;
        builder.append_lock_synthesizer(
            config.synthesizer.r_divider_index,
            config.synthesizer.n_divider,
        )?;
        builder.append_set_tx_fine_gain(power.tx_scalar)?;
        builder.append_set_regulatory_timers(&config.timers)?;
        builder.append_droop_compensation(&self.droop_compensation)?;
        builder.append_set_tx_coarse_gain(power.tx_atten)?;
        let boosted = matches!(power.boost_adc_target, Some(target) if target.adc != 0);
        if self.power_boost && boosted {
            builder.append_boost_tx_ramp_up(power)?;
        } else {
            builder.append_tx_ramp_up_and_power_control(power)?;
        }
        builder.append_run_sjc()?;
        builder.append_exit()?;
        Ok(builder)
    }

    /// Ramp the transmitter up with `config`.
    ///
    /// Nothing happens if the carrier is already on. Otherwise the ramp sequence is assembled,
    /// any off time still owed to the channel is waited out, and the registered pre-ramp callback
    /// gets a chance to cancel the ramp before anything is written to the aggregate buffer. Once
    /// the Aggregate op completes the region moves on to the next channel and the post-ramp
    /// callback runs.
    pub fn cw_on<B, D>(
        &mut self,
        device: &mut Device<B, D>,
        config: &CwConfig,
        callbacks: &mut RampCallbackSlot<'_, B, D>,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        if self.is_cw_on(device)? {
            debug!("CW is already on");
            return Ok(());
        }
        let builder = self.ramp_up_sequence(config)?;

        let off_time_ms = config.timers.off_same_channel_ms;
        if off_time_ms > 0 {
            debug!("Waiting {} ms before reusing the channel", off_time_ms);
            device.write_register(&register::DelayUs::new(u32::from(off_time_ms) * 1000))?;
            device.run_op(OpId::UsTimerStart)?;
            device.run_op(OpId::UsTimerWait)?;
        }

        let context = RampContext {
            config,
            calibration: &self.calibration,
            channel: ChannelSnapshot {
                index: self.region.next_channel_index(),
                frequency_khz: config.frequency_khz,
            },
        };
        callbacks.call_pre_ramp(device, &context)?;
        debug!(
            "Ramping up at {} kHz, {} cdBm",
            config.frequency_khz, config.tx_power_cdbm
        );
        if let Err(err) = builder.execute(device) {
            error!(
                "CW on aggregate op failed with status {:?}",
                err.ops_status()
            );
            return Err(err);
        }
        self.region.update_active_channel();
        callbacks.call_post_ramp(device, &context)
    }

    /// Start ramping the transmitter down. This does not wait for the ramp to finish.
    pub fn cw_off<B, D>(&self, device: &mut Device<B, D>) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        device.start_op(OpId::TxRampDown)
    }

    pub fn is_cw_on<B, D>(&self, device: &mut Device<B, D>) -> Result<bool, Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let cw: CwIsOn = device.read_register()?;
        Ok(cw.is_on())
    }

    /// Abort the running op and ramp down, waiting for both.
    pub fn stop_op_and_ramp_down<B, D>(&self, device: &mut Device<B, D>) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        stop_op_and_ramp_down(device)
    }

    /// Write the dwell timers in one transaction.
    pub fn set_regulatory_timers<B, D>(
        &self,
        device: &mut Device<B, D>,
        timers: &RegulatoryTimers,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let nominal = NominalStopTime::new(timers.nominal_ms).to_bytes();
        let extended = ExtendedStopTime::new(timers.extended_ms).to_bytes();
        let regulatory = RegulatoryStopTime::new(timers.regulatory_ms).to_bytes();
        let mutex = TxMutexTime::new(TX_MUTEX_TIME_US).to_bytes();
        let off = EtsiBurstOffTime::new(timers.off_same_channel_ms).to_bytes();
        device.write_multiple(&[
            (NominalStopTime::address(), &nominal[..]),
            (ExtendedStopTime::address(), &extended[..]),
            (RegulatoryStopTime::address(), &regulatory[..]),
            (TxMutexTime::address(), &mutex[..]),
            (EtsiBurstOffTime::address(), &off[..]),
        ])
    }

    /// Ramp up one op at a time instead of through an Aggregate op.
    ///
    /// Meant for test setups. The power control loop only runs when `configs` has a target.
    pub fn ramp_transmit_power<B, D>(
        &self,
        device: &mut Device<B, D>,
        configs: &PowerConfigs,
        timers: &RegulatoryTimers,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        device.write_register(&TxCoarseGain::new(configs.tx_atten))?;
        device.run_op(OpId::SetTxCoarseGain)?;
        device.write_register(&TxFineGain::new(configs.tx_scalar))?;
        device.run_op(OpId::SetTxFineGain)?;
        self.set_regulatory_timers(device, timers)?;
        device.write_register(&DcOffset::new(configs.dc_offset))?;
        device.run_op(OpId::TxRampUp)?;
        if configs.is_closed_loop() {
            self.run_power_control_loop(device, configs)?;
        }
        Ok(())
    }

    /// Configure and run the power control loop, waiting for it to finish.
    ///
    /// The loop settings and the op start go out as one transaction. Fails without touching the
    /// device if there is no target (or a zero target).
    pub fn run_power_control_loop<B, D>(
        &self,
        device: &mut Device<B, D>,
        configs: &PowerConfigs,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let target = match configs.adc_target {
            Some(target) if target.adc != 0 => target,
            _ => {
                return Err(LibraryError::BadParamValue(
                    "No ADC target for the power control loop",
                )
                .into())
            }
        };
        let [detector, divisor, iterations, adc_target, thresholds] =
            power_control_writes(configs, target);
        let start = OpsControl::new(OpId::PowerControlLoop.into()).to_bytes();
        device.write_multiple(&[
            (detector.0, &detector.1[..]),
            (divisor.0, &divisor.1[..]),
            (iterations.0, &iterations.1[..]),
            (adc_target.0, &adc_target.1[..]),
            (thresholds.0, &thresholds.1[..]),
            (OpsControl::address(), &start[..]),
        ])?;
        device.wait_op_completion()?;
        Ok(())
    }

    /// Power up the analog supplies, then apply the board's default receiver gains.
    ///
    /// This has to run once after the chip boots, before anything is transmitted.
    pub fn init_ex10<B, D>(&self, device: &mut Device<B, D>) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        device.write_register(&AnalogEnable::new(true))?;
        device.run_op(OpId::RadioPowerControl)?;
        let gains = self.board.default_rx_analog_config();
        self.set_analog_rx_config(device, &gains)
    }

    /// Apply new receiver gains and wait for the SetRxGain op to finish.
    pub fn set_analog_rx_config<B, D>(
        &self,
        device: &mut Device<B, D>,
        gains: &RxGainControl,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        debug!("Setting receiver gains {:?}", gains);
        device.write_register(gains)?;
        device.run_op(OpId::SetRxGain)?;
        Ok(())
    }

    /// Switch the modem to `rf_mode` and select the matching receive baseband filter.
    pub fn set_rf_mode<B, D>(&self, device: &mut Device<B, D>, rf_mode: RfMode) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        device.write_register(&RfModeRegister::new(rf_mode))?;
        device.run_op(OpId::SetRfMode)?;
        let filter = self.calibration.baseband_filter().choose(rf_mode);
        let pins = self.board.baseband_filter_set_clear(filter);
        device.write_register(&pins)?;
        device.run_op(OpId::SetClearGpioPins)?;
        Ok(())
    }

    /// Turn on droop compensation.
    ///
    /// `interval_ms` must be 10 through 40, `fine_gain_step_cdb` 5 through 15.
    pub fn enable_droop_compensation<B, D>(
        &mut self,
        device: &mut Device<B, D>,
        interval_ms: u8,
        fine_gain_step_cdb: u8,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        if !DROOP_INTERVAL_RANGE_MS.contains(&interval_ms) {
            return Err(
                LibraryError::BadParamValue("Droop compensation interval out of range").into(),
            );
        }
        if !DROOP_STEP_RANGE_CDB.contains(&fine_gain_step_cdb) {
            return Err(
                LibraryError::BadParamValue("Droop compensation step out of range").into(),
            );
        }
        let compensation = PowerDroopCompensation::new(true, interval_ms, fine_gain_step_cdb);
        device.write_register(&compensation)?;
        self.droop_compensation = compensation;
        Ok(())
    }

    /// Turn off droop compensation, keeping the device's interval and step.
    pub fn disable_droop_compensation<B, D>(
        &mut self,
        device: &mut Device<B, D>,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let current: PowerDroopCompensation = device.read_register()?;
        let compensation = PowerDroopCompensation::new(
            false,
            current.compensation_interval_ms(),
            current.fine_gain_step_cd_b(),
        );
        device.write_register(&compensation)?;
        self.droop_compensation = compensation;
        Ok(())
    }

    /// Measure the temperature sensor and remember the reading for later ramps.
    pub fn measure_and_read_adc_temperature<B, D>(
        &mut self,
        device: &mut Device<B, D>,
    ) -> Result<u16, Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let temperature = device.measure_adc_temperature()?;
        self.temperature_adc = Some(temperature);
        Ok(temperature)
    }
}
