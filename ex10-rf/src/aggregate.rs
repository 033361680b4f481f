// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Instruction buffers for the Aggregate op.
//!
//! The Aggregate op runs a list of instructions (register writes, op runs, jumps) stored in the
//! device's aggregate buffer without any host round trips between them. [`AggregateOpBuilder`]
//! assembles that list on the host. Every append either adds all of its instructions or, if the
//! buffer would fill up, none of them.
use arrayvec::ArrayVec;
use embedded_hal::blocking::delay;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use paste::paste;

use crate::calibration::{AdcTarget, PowerConfigs};
use crate::error::{Error, LibraryError};
use crate::protocol::{Device, RegisterBus};
use crate::region::RegulatoryTimers;
use crate::register::*;
use crate::rf_mode::RfMode;

/// The size of the device's aggregate op buffer.
pub const AGGREGATE_OP_BUFFER_LENGTH: usize = 512;

/// How long the boost power is held before the second power control loop.
///
/// The boost lasts 900µs, but waiting on the timer op costs about 60µs.
pub const BOOST_HOLD_TIME_US: u32 = 840;

/// The TX mutex time used in every region.
pub const TX_MUTEX_TIME_US: u16 = 1500;

/// The largest event FIFO packet that can be inserted by an aggregate op.
pub const MAX_FIFO_EVENT_LENGTH: usize = 64;

/// The smallest event FIFO packet, just a header.
const MIN_FIFO_EVENT_LENGTH: usize = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum InstructionType {
    Reserved = 0x00,
    Write = 0x02,
    Reset = 0x08,
    InsertFifoEvent = 0x0E,
    RunOp = 0x30,
    GoToIndex = 0x31,
    ExitInstruction = 0x32,
    Identifier = 0x33,
    HostMutexOn = 0x34,
    HostMutexOff = 0x35,
}

/// A single aggregate op instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction<'a> {
    /// Write `data` to device memory starting at `address`.
    Write { address: u16, data: &'a [u8] },

    Reset { destination: u8 },

    /// Push a complete event FIFO packet, optionally raising the FIFO interrupt.
    InsertFifoEvent { trigger_irq: bool, packet: &'a [u8] },

    /// Run an op and wait for it to finish.
    RunOp(OpId),

    /// Jump to the instruction at byte offset `index`, `repeat` times.
    GoToIndex { index: u16, repeat: u8 },

    Exit,

    /// Tag the following instructions in the aggregate op summary.
    Identifier(u16),

    HostMutex(bool),
}

impl<'a> Instruction<'a> {
    pub fn instruction_type(&self) -> InstructionType {
        match self {
            Self::Write { .. } => InstructionType::Write,
            Self::Reset { .. } => InstructionType::Reset,
            Self::InsertFifoEvent { .. } => InstructionType::InsertFifoEvent,
            Self::RunOp(_) => InstructionType::RunOp,
            Self::GoToIndex { .. } => InstructionType::GoToIndex,
            Self::Exit => InstructionType::ExitInstruction,
            Self::Identifier(_) => InstructionType::Identifier,
            Self::HostMutex(true) => InstructionType::HostMutexOn,
            Self::HostMutex(false) => InstructionType::HostMutexOff,
        }
    }

    /// The number of bytes this instruction takes up in the buffer, including its type byte.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Self::Write { data, .. } => 4 + data.len(),
            Self::Reset { .. } => 1,
            Self::InsertFifoEvent { packet, .. } => 1 + packet.len(),
            Self::RunOp(_) => 1,
            Self::GoToIndex { .. } => 3,
            Self::Exit | Self::HostMutex(_) => 0,
            Self::Identifier(_) => 2,
        }
    }

    /// Decode the instruction at the start of `bytes`.
    ///
    /// Returns `None` for truncated or unrecognized instructions, and for the zeroed space after
    /// the last instruction.
    fn decode(bytes: &'a [u8]) -> Option<Self> {
        let (&code, rest) = bytes.split_first()?;
        let instruction = match InstructionType::try_from_primitive(code).ok()? {
            InstructionType::Reserved => return None,
            InstructionType::Write => {
                let length = u16_at(rest, 2)? as usize;
                Self::Write {
                    address: u16_at(rest, 0)?,
                    data: rest.get(4..(4 + length))?,
                }
            }
            InstructionType::Reset => Self::Reset {
                destination: *rest.first()?,
            },
            InstructionType::InsertFifoEvent => {
                let words = *rest.get(1)? as usize;
                Self::InsertFifoEvent {
                    trigger_irq: *rest.first()? != 0,
                    packet: rest.get(1..(1 + words * 4))?,
                }
            }
            InstructionType::RunOp => Self::RunOp(OpId::try_from_primitive(*rest.first()?).ok()?),
            InstructionType::GoToIndex => Self::GoToIndex {
                index: u16_at(rest, 0)?,
                repeat: *rest.get(2)?,
            },
            InstructionType::ExitInstruction => Self::Exit,
            InstructionType::Identifier => Self::Identifier(u16_at(rest, 0)?),
            InstructionType::HostMutexOn => Self::HostMutex(true),
            InstructionType::HostMutexOff => Self::HostMutex(false),
        };
        Some(instruction)
    }
}

fn u16_at(bytes: &[u8], offset: usize) -> Option<u16> {
    let word = bytes.get(offset..(offset + 2))?;
    Some(u16::from_le_bytes([word[0], word[1]]))
}

/// Iterator over the instructions in an aggregate buffer.
///
/// Iteration stops at the first byte that doesn't start a valid instruction.
#[derive(Clone, Debug)]
pub struct Instructions<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Instructions<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// The byte offset of the next instruction.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Instruction<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let instruction = Instruction::decode(self.bytes.get(self.offset..)?)?;
        self.offset += instruction.encoded_len();
        Some(instruction)
    }
}

/// The five power control loop registers for `target`, serialized.
///
/// Every one of them is a 4 byte register.
pub(crate) fn power_control_writes(
    configs: &PowerConfigs,
    target: AdcTarget,
) -> [(u16, [u8; 4]); 5] {
    [
        (
            PowerControlLoopAuxAdcControl::address(),
            PowerControlLoopAuxAdcControl::new(target.detector.enable_bits()).to_bytes(),
        ),
        (
            PowerControlLoopGainDivisor::address(),
            PowerControlLoopGainDivisor::new(configs.loop_gain_divisor).to_bytes(),
        ),
        (
            PowerControlLoopMaxIterations::address(),
            PowerControlLoopMaxIterations::new(configs.max_iterations).to_bytes(),
        ),
        (
            PowerControlLoopAdcTarget::address(),
            PowerControlLoopAdcTarget::new(target.adc).to_bytes(),
        ),
        (
            PowerControlLoopAdcThresholds::address(),
            PowerControlLoopAdcThresholds::new(
                configs.loop_stop_threshold,
                configs.op_error_threshold,
            )
            .to_bytes(),
        ),
    ]
}

/// Generate appends that write a single-field register and then run the op that consumes it.
macro_rules! register_op_appends {
    { $( $(#[$meta:meta])* $name:ident($arg:ident: $typ:ty) => $register:ident, $op:ident; )* } => {
        paste! {
            $(
                $(#[$meta])*
                pub fn [< append_ $name >](&mut self, $arg: $typ) -> Result<(), LibraryError> {
                    self.atomic(|builder| {
                        builder.append_register(&$register::new($arg))?;
                        builder.append_op_run(OpId::$op)
                    })
                }
            )*
        }
    };
}

/// Builds the instruction list for an Aggregate op.
#[derive(Clone, Debug, Default)]
pub struct AggregateOpBuilder {
    buffer: ArrayVec<u8, AGGREGATE_OP_BUFFER_LENGTH>,
}

impl AggregateOpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.buffer)
    }

    /// Run `append`, rolling the buffer back if it fails.
    fn atomic<F>(&mut self, append: F) -> Result<(), LibraryError>
    where
        F: FnOnce(&mut Self) -> Result<(), LibraryError>,
    {
        let mark = self.buffer.len();
        let result = append(self);
        if result.is_err() {
            self.buffer.truncate(mark);
        }
        result
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), LibraryError> {
        self.buffer
            .try_extend_from_slice(bytes)
            .map_err(|_| LibraryError::AggregateBufferOverflow)
    }

    /// Whether `index` is the offset of an instruction already in the buffer.
    fn is_instruction_boundary(&self, index: usize) -> bool {
        let mut instructions = self.instructions();
        loop {
            match instructions.offset() {
                offset if offset == index => return true,
                offset if offset > index => return false,
                _ => (),
            }
            if instructions.next().is_none() {
                return false;
            }
        }
    }

    /// Append a single instruction.
    ///
    /// The buffer always keeps at least one zeroed byte free, so an instruction that would fill it
    /// completely is rejected with [`LibraryError::AggregateBufferOverflow`].
    pub fn append(&mut self, instruction: &Instruction) -> Result<(), LibraryError> {
        if self.buffer.len() + instruction.encoded_len() >= AGGREGATE_OP_BUFFER_LENGTH {
            return Err(LibraryError::AggregateBufferOverflow);
        }
        match instruction {
            Instruction::InsertFifoEvent { packet, .. } => {
                if packet.len() < MIN_FIFO_EVENT_LENGTH
                    || packet.len() > MAX_FIFO_EVENT_LENGTH
                    || packet.len() % 4 != 0
                    || packet[0] as usize * 4 != packet.len()
                {
                    return Err(LibraryError::BadParamValue(
                        "FIFO event packet length must match its header",
                    ));
                }
            }
            Instruction::GoToIndex { index, .. } => {
                let index = *index as usize;
                if index < self.buffer.len() && !self.is_instruction_boundary(index) {
                    return Err(LibraryError::BadParamValue(
                        "jump target is not the start of an instruction",
                    ));
                }
            }
            _ => (),
        }
        self.atomic(|builder| {
            builder.extend(&[instruction.instruction_type().into()])?;
            match instruction {
                Instruction::Write { address, data } => {
                    builder.extend(&address.to_le_bytes())?;
                    builder.extend(&(data.len() as u16).to_le_bytes())?;
                    builder.extend(data)
                }
                Instruction::Reset { destination } => builder.extend(&[*destination]),
                Instruction::InsertFifoEvent {
                    trigger_irq,
                    packet,
                } => {
                    builder.extend(&[*trigger_irq as u8])?;
                    builder.extend(packet)
                }
                Instruction::RunOp(op) => builder.extend(&[u8::from(*op)]),
                Instruction::GoToIndex { index, repeat } => {
                    builder.extend(&index.to_le_bytes())?;
                    builder.extend(&[*repeat])
                }
                Instruction::Identifier(id) => builder.extend(&id.to_le_bytes()),
                Instruction::Exit | Instruction::HostMutex(_) => Ok(()),
            }
        })
    }

    pub fn append_write(&mut self, address: u16, data: &[u8]) -> Result<(), LibraryError> {
        self.append(&Instruction::Write { address, data })
    }

    /// Append a write of a whole register.
    pub fn append_register<R: Register>(&mut self, register: &R) -> Result<(), LibraryError> {
        let bytes = register.to_bytes();
        self.append_write(R::address(), bytes.as_ref())
    }

    pub fn append_reset(&mut self, destination: u8) -> Result<(), LibraryError> {
        self.append(&Instruction::Reset { destination })
    }

    pub fn append_op_run(&mut self, op: OpId) -> Result<(), LibraryError> {
        self.append(&Instruction::RunOp(op))
    }

    pub fn append_go_to(&mut self, index: u16, repeat: u8) -> Result<(), LibraryError> {
        self.append(&Instruction::GoToIndex { index, repeat })
    }

    pub fn append_identifier(&mut self, id: u16) -> Result<(), LibraryError> {
        self.append(&Instruction::Identifier(id))
    }

    pub fn append_exit(&mut self) -> Result<(), LibraryError> {
        self.append(&Instruction::Exit)
    }

    pub fn append_host_mutex(&mut self, enable: bool) -> Result<(), LibraryError> {
        self.append(&Instruction::HostMutex(enable))
    }

    /// Append an event FIFO packet.
    ///
    /// `packet` is the complete packet including its header, and the first header byte must be
    /// the packet length in 32-bit words.
    pub fn append_insert_fifo_event(
        &mut self,
        trigger_irq: bool,
        packet: &[u8],
    ) -> Result<(), LibraryError> {
        self.append(&Instruction::InsertFifoEvent {
            trigger_irq,
            packet,
        })
    }

    register_op_appends! {
        /// Set the coarse transmit attenuation.
        set_tx_coarse_gain(tx_atten: u8) => TxCoarseGain, SetTxCoarseGain;
        /// Set the transmit fine gain.
        set_tx_fine_gain(tx_scalar: i16) => TxFineGain, SetTxFineGain;
        set_rf_mode(id: RfMode) => RfModeRegister, SetRfMode;
        /// Set the transmit DC offset and ramp the transmitter up.
        tx_ramp_up(offset: i32) => DcOffset, TxRampUp;
        /// Start the microsecond timer used by [`append_wait_timer_op`][Self::append_wait_timer_op].
        start_timer_op(delay_us: u32) => DelayUs, UsTimerStart;
    }

    pub fn append_wait_timer_op(&mut self) -> Result<(), LibraryError> {
        self.append_op_run(OpId::UsTimerWait)
    }

    pub fn append_run_sjc(&mut self) -> Result<(), LibraryError> {
        self.append_op_run(OpId::RxRunSjc)
    }

    pub fn append_tx_ramp_down(&mut self) -> Result<(), LibraryError> {
        self.append_op_run(OpId::TxRampDown)
    }

    /// Convert `count` aux ADC channels starting at `start`.
    pub fn append_measure_aux_adc(
        &mut self,
        start: AuxAdcResult,
        count: u8,
    ) -> Result<(), LibraryError> {
        self.atomic(|builder| {
            builder.append_register(&AuxAdcControl::new(start.enable_bits(count)))?;
            builder.append_op_run(OpId::MeasureAdc)
        })
    }

    pub fn append_set_clear_gpio_pins(
        &mut self,
        pins: &GpioPinsSetClear,
    ) -> Result<(), LibraryError> {
        self.atomic(|builder| {
            builder.append_register(pins)?;
            builder.append_op_run(OpId::SetClearGpioPins)
        })
    }

    /// Lock the synthesizer to the given R divider index and N divider.
    pub fn append_lock_synthesizer(
        &mut self,
        r_divider_index: u8,
        n_divider: u16,
    ) -> Result<(), LibraryError> {
        self.atomic(|builder| {
            builder.append_register(&RfSynthesizerControl::new(n_divider, r_divider_index, true))?;
            builder.append_op_run(OpId::LockSynthesizer)
        })
    }

    pub fn append_set_regulatory_timers(
        &mut self,
        timers: &RegulatoryTimers,
    ) -> Result<(), LibraryError> {
        self.atomic(|builder| {
            builder.append_register(&NominalStopTime::new(timers.nominal_ms))?;
            builder.append_register(&ExtendedStopTime::new(timers.extended_ms))?;
            builder.append_register(&RegulatoryStopTime::new(timers.regulatory_ms))?;
            builder.append_register(&TxMutexTime::new(TX_MUTEX_TIME_US))?;
            builder.append_register(&EtsiBurstOffTime::new(timers.off_same_channel_ms))
        })
    }

    pub fn append_droop_compensation(
        &mut self,
        compensation: &PowerDroopCompensation,
    ) -> Result<(), LibraryError> {
        self.append_register(compensation)
    }

    /// Write the power control loop settings, using the boost target if `boost` is set.
    ///
    /// Nothing is appended when there is no target to regulate against.
    pub fn append_power_control_settings(
        &mut self,
        configs: &PowerConfigs,
        boost: bool,
    ) -> Result<(), LibraryError> {
        let target = if boost {
            configs.boost_adc_target
        } else {
            configs.adc_target
        };
        let target = match target {
            Some(target) if target.adc != 0 => target,
            _ => return Ok(()),
        };
        self.atomic(|builder| {
            for (address, data) in power_control_writes(configs, target).iter() {
                builder.append_write(*address, data)?;
            }
            Ok(())
        })
    }

    /// Configure and run the power control loop, if there is a target.
    pub fn append_power_control(&mut self, configs: &PowerConfigs) -> Result<(), LibraryError> {
        if !configs.is_closed_loop() {
            return Ok(());
        }
        self.atomic(|builder| {
            builder.append_power_control_settings(configs, false)?;
            builder.append_op_run(OpId::PowerControlLoop)
        })
    }

    /// Ramp up and, if there is a target, run the power control loop right after.
    pub fn append_tx_ramp_up_and_power_control(
        &mut self,
        configs: &PowerConfigs,
    ) -> Result<(), LibraryError> {
        self.atomic(|builder| {
            builder.append_register(&DcOffset::new(configs.dc_offset))?;
            builder.append_power_control_settings(configs, false)?;
            builder.append_op_run(OpId::TxRampUp)?;
            if configs.is_closed_loop() {
                builder.append_op_run(OpId::PowerControlLoop)?;
            }
            Ok(())
        })
    }

    /// Ramp up to the boosted power, hold it, then settle at the requested power.
    ///
    /// Without a boost target this is the same as
    /// [`append_tx_ramp_up_and_power_control`][Self::append_tx_ramp_up_and_power_control].
    pub fn append_boost_tx_ramp_up(&mut self, configs: &PowerConfigs) -> Result<(), LibraryError> {
        if configs.boost_adc_target.is_none() {
            return self.append_tx_ramp_up_and_power_control(configs);
        }
        self.atomic(|builder| {
            builder.append_register(&DcOffset::new(configs.dc_offset))?;
            builder.append_power_control_settings(configs, true)?;
            builder.append_register(&DelayUs::new(BOOST_HOLD_TIME_US))?;
            builder.append_op_run(OpId::TxRampUp)?;
            builder.append_op_run(OpId::UsTimerStart)?;
            builder.append_op_run(OpId::PowerControlLoop)?;
            builder.append_power_control_settings(configs, false)?;
            builder.append_op_run(OpId::UsTimerWait)?;
            builder.append_op_run(OpId::PowerControlLoop)
        })
    }

    /// Set the gains and timers, ramp up, and run power control.
    pub fn append_ramp_transmit_power(
        &mut self,
        configs: &PowerConfigs,
        timers: &RegulatoryTimers,
    ) -> Result<(), LibraryError> {
        self.atomic(|builder| {
            builder.append_set_tx_coarse_gain(configs.tx_atten)?;
            builder.append_set_tx_fine_gain(configs.tx_scalar)?;
            builder.append_set_regulatory_timers(timers)?;
            builder.append_tx_ramp_up(configs.dc_offset)?;
            builder.append_power_control(configs)
        })
    }

    /// Copy the instructions into the device's aggregate buffer.
    pub fn write_to<B, D>(&self, device: &mut Device<B, D>) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: delay::DelayUs<u32>,
    {
        device.write_partial(AGGREGATE_OP_BUFFER_ADDRESS, &self.buffer)
    }

    /// Copy the instructions to the device, run the Aggregate op, and wait for it to finish.
    pub fn execute<B, D>(&self, device: &mut Device<B, D>) -> Result<OpsStatus, Error<B>>
    where
        B: RegisterBus,
        D: delay::DelayUs<u32>,
    {
        self.write_to(device)?;
        device.run_op(OpId::Aggregate)
    }
}
