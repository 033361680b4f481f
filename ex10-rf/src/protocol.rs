// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Register access and op sequencing on top of a host transport.
use arrayvec::ArrayVec;
use embedded_hal::blocking::delay::DelayUs;
use log::{debug, error};

use crate::error::{Error, LibraryError};
use crate::register::*;

/// How often the op status is polled while waiting for an op to finish.
const OP_POLL_INTERVAL_US: u32 = 100;

/// The default amount of time to wait for an op to finish.
pub const DEFAULT_OP_TIMEOUT_MS: u32 = 10_000;

/// The transport used to reach the reader chip's registers.
///
/// Implementations wrap whatever physical link the host uses (SPI on the reference design). Reads
/// and writes are blocking.
pub trait RegisterBus {
    type Error;

    /// Fill `buffer` with the bytes starting at `address`.
    fn read(&mut self, address: u16, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `data` starting at `address`.
    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), Self::Error>;

    /// Write several registers as one transaction.
    ///
    /// Transports that can batch writes should override this; the default issues the writes in
    /// order.
    fn write_multiple(&mut self, writes: &[(u16, &[u8])]) -> Result<(), Self::Error> {
        for (address, data) in writes {
            self.write(*address, data)?;
        }
        Ok(())
    }
}

/// A byte-addressed source for the calibration region.
pub trait CalibrationSource {
    type Error: From<LibraryError>;

    /// Read `buffer.len()` bytes starting `offset` bytes into the calibration region.
    fn read_calibration(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

impl CalibrationSource for &[u8] {
    type Error = LibraryError;

    fn read_calibration(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let end = offset + buffer.len();
        let source = self
            .get(offset..end)
            .ok_or(LibraryError::InvalidData("Calibration data is too short"))?;
        buffer.copy_from_slice(source);
        Ok(())
    }
}

/// A reader chip reachable over a [`RegisterBus`].
#[derive(Clone, Debug)]
pub struct Device<B, D> {
    bus: B,

    delay: D,

    /// How long [`wait_op_completion`][Device::wait_op_completion] waits, in milliseconds.
    op_timeout_ms: u32,
}

impl<B, D> Device<B, D>
where
    B: RegisterBus,
    D: DelayUs<u32>,
{
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
        }
    }

    /// The op completion timeout in milliseconds.
    pub fn op_timeout_ms(&self) -> u32 {
        self.op_timeout_ms
    }

    pub fn set_op_timeout_ms(&mut self, timeout_ms: u32) {
        self.op_timeout_ms = timeout_ms;
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn read_register<R: Register>(&mut self) -> Result<R, Error<B>> {
        read_register(&mut self.bus)
    }

    pub fn write_register<R: Register>(&mut self, register: &R) -> Result<(), Error<B>> {
        write_register(&mut self.bus, register)
    }

    /// Write several already serialized registers as one transaction.
    pub fn write_multiple(&mut self, writes: &[(u16, &[u8])]) -> Result<(), Error<B>> {
        self.bus.write_multiple(writes).map_err(Error::BusError)
    }

    /// Read an arbitrary span of device memory.
    pub fn read_partial(&mut self, address: u16, buffer: &mut [u8]) -> Result<(), Error<B>> {
        self.bus.read(address, buffer).map_err(Error::BusError)
    }

    /// Write an arbitrary span of device memory.
    pub fn write_partial(&mut self, address: u16, data: &[u8]) -> Result<(), Error<B>> {
        self.bus.write(address, data).map_err(Error::BusError)
    }

    /// Start `op`. This does not wait for it to finish.
    pub fn start_op(&mut self, op: OpId) -> Result<(), Error<B>> {
        debug!("Starting op {:?}", op);
        self.write_register(&OpsControl::new(op.into()))
    }

    /// Abort whatever op is running by switching to the idle op.
    pub fn stop_op(&mut self) -> Result<(), Error<B>> {
        self.start_op(OpId::Idle)
    }

    /// Block until the current op finishes.
    ///
    /// A non-zero op error code is reported as [`Error::OpError`]. If the op is still busy once
    /// the timeout has elapsed, [`Error::OpTimeout`] is returned instead.
    pub fn wait_op_completion(&mut self) -> Result<OpsStatus, Error<B>> {
        let timeout_us = self.op_timeout_ms.saturating_mul(1000);
        let mut elapsed_us = 0u32;
        loop {
            let status: OpsStatus = self.read_register()?;
            if status.has_error() {
                error!(
                    "Op {:#04x} ended with error code {:#04x}",
                    status.op_id, status.error
                );
                return Err(Error::OpError(status));
            }
            if !status.busy() {
                return Ok(status);
            }
            if elapsed_us >= timeout_us {
                return Err(Error::OpTimeout(status));
            }
            self.delay.delay_us(OP_POLL_INTERVAL_US);
            elapsed_us = elapsed_us.saturating_add(OP_POLL_INTERVAL_US);
        }
    }

    /// Start `op` and wait for it to finish.
    pub fn run_op(&mut self, op: OpId) -> Result<OpsStatus, Error<B>> {
        self.start_op(op)?;
        self.wait_op_completion()
    }

    /// Convert `count` aux ADC channels beginning at `start` and read back the results.
    ///
    /// The channel count is clipped to the channels remaining after `start`.
    pub fn measure_aux_adc(
        &mut self,
        start: AuxAdcResult,
        count: u8,
    ) -> Result<ArrayVec<u16, { AuxAdcResult::COUNT as usize }>, Error<B>> {
        self.write_register(&AuxAdcControl::new(start.enable_bits(count)))?;
        self.run_op(OpId::MeasureAdc)?;

        let start: u8 = start.into();
        let count = count.min(AuxAdcResult::COUNT - start);
        let mut raw = [0u8; AuxAdcResult::COUNT as usize * 2];
        let raw = &mut raw[..count as usize * 2];
        self.read_partial(AUX_ADC_RESULTS_ADDRESS + u16::from(start) * 2, raw)?;
        Ok(raw
            .chunks_exact(2)
            .map(|word| u16::from_le_bytes([word[0], word[1]]))
            .collect())
    }

    /// Measure the on-chip temperature sensor, returning the raw ADC code.
    pub fn measure_adc_temperature(&mut self) -> Result<u16, Error<B>> {
        let results = self.measure_aux_adc(AuxAdcResult::Temperature, 1)?;
        results
            .first()
            .copied()
            .ok_or_else(|| LibraryError::InvalidData("No temperature measurement").into())
    }

    /// Microseconds since the device booted.
    pub fn timestamp_us(&mut self) -> Result<u32, Error<B>> {
        let timestamp: Timestamp = self.read_register()?;
        Ok(timestamp.time_us())
    }
}

impl<B, D> CalibrationSource for Device<B, D>
where
    B: RegisterBus,
    D: DelayUs<u32>,
{
    type Error = Error<B>;

    fn read_calibration(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), Self::Error> {
        if offset + buffer.len() > CALIBRATION_INFO_LENGTH {
            return Err(LibraryError::BadParamValue("read past the calibration region").into());
        }
        self.read_partial(CALIBRATION_INFO_ADDRESS + offset as u16, buffer)
    }
}

/// Read a register.
///
/// Split out of `Device` to limit how much code is generated per delay type.
fn read_register<R, B>(bus: &mut B) -> Result<R, Error<B>>
where
    R: Register,
    B: RegisterBus,
{
    let mut bytes = R::Bytes::default();
    bus.read(R::address(), bytes.as_mut())
        .map_err(Error::BusError)?;
    Ok(R::from(bytes.as_ref()))
}

fn write_register<R, B>(bus: &mut B, register: &R) -> Result<(), Error<B>>
where
    R: Register,
    B: RegisterBus,
{
    let bytes = register.to_bytes();
    bus.write(R::address(), bytes.as_ref())
        .map_err(Error::BusError)
}
