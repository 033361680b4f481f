// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
extern crate alloc;

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Ref, RefCell};

use embedded_hal::blocking::delay::DelayUs;
use num_enum::TryFromPrimitive;

use crate::aggregate::{Instruction, Instructions, AGGREGATE_OP_BUFFER_LENGTH};
use crate::protocol::RegisterBus;
use crate::register::*;

const RECENT_OPERATIONS_QUEUE_LENGTH: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MockError {
    /// A write to an address that was set up to fail.
    WriteFailed(u16),

    /// Zero length transfers aren't allowed.
    IllegalOperation,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum BusOperation {
    Write { address: u16, length: usize },
    Read { address: u16, length: usize },
}

#[derive(Clone, Debug, Default)]
struct MockState {
    /// Sparse device memory, anything never written reads as zero.
    memory: BTreeMap<u16, u8>,

    /// Ops started by the host writing the ops control register.
    ops_started: Vec<OpId>,

    /// Every op run, including the ones run by an aggregate op.
    ops_run: Vec<OpId>,

    /// How many status reads report busy after an op is started.
    busy_polls: usize,

    remaining_busy_polls: usize,

    /// The status reported once the current op is done.
    final_status: OpsStatus,

    failures: Vec<(OpId, OpsErrorCode)>,

    aux_adc_results: [u16; AuxAdcResult::COUNT as usize],

    failing_write_address: Option<u16>,
}

impl MockState {
    fn read(&self, address: u16, buffer: &mut [u8]) {
        for (offset, byte) in buffer.iter_mut().enumerate() {
            let address = address.wrapping_add(offset as u16);
            *byte = self.memory.get(&address).copied().unwrap_or(0);
        }
    }

    fn write(&mut self, address: u16, data: &[u8]) {
        for (offset, byte) in data.iter().enumerate() {
            self.memory.insert(address.wrapping_add(offset as u16), *byte);
        }
    }

    fn write_register<R: Register>(&mut self, register: &R) {
        self.write(R::address(), register.to_bytes().as_ref());
    }

    fn read_register<R: Register>(&self) -> R {
        let mut bytes = R::Bytes::default();
        self.read(R::address(), bytes.as_mut());
        R::from(bytes.as_ref())
    }

    fn failure_for(&self, op: OpId) -> Option<OpsErrorCode> {
        self.failures
            .iter()
            .find(|(failing_op, _)| *failing_op == op)
            .map(|(_, code)| *code)
    }

    /// Apply the effects of `op`, returning the error code it finishes with.
    fn execute(&mut self, op: OpId) -> OpsErrorCode {
        self.ops_run.push(op);
        if let Some(code) = self.failure_for(op) {
            return code;
        }
        match op {
            OpId::TxRampUp => self.write_register(&CwIsOn::new(true)),
            OpId::TxRampDown => self.write_register(&CwIsOn::new(false)),
            OpId::MeasureAdc => {
                let control: AuxAdcControl = self.read_register();
                let results = self.aux_adc_results;
                for (index, result) in results.iter().enumerate() {
                    if control.channel_enable_bits() & (1 << index) != 0 {
                        let address = AUX_ADC_RESULTS_ADDRESS + index as u16 * 2;
                        self.write(address, &result.to_le_bytes());
                    }
                }
            }
            OpId::Aggregate => return self.execute_aggregate(),
            _ => (),
        }
        OpsErrorCode::None
    }

    fn execute_aggregate(&mut self) -> OpsErrorCode {
        let mut buffer = [0u8; AGGREGATE_OP_BUFFER_LENGTH];
        self.read(AGGREGATE_OP_BUFFER_ADDRESS, &mut buffer);
        for instruction in Instructions::new(&buffer) {
            match instruction {
                Instruction::Write { address, data } => self.write(address, data),
                Instruction::RunOp(op) => {
                    let code = self.execute(op);
                    if code != OpsErrorCode::None {
                        return code;
                    }
                }
                Instruction::Exit => break,
                // Jumps aren't followed.
                _ => (),
            }
        }
        OpsErrorCode::None
    }

    fn start_op(&mut self, raw_op: u8) {
        let (op_id, error) = match OpId::try_from_primitive(raw_op) {
            Ok(op) => {
                self.ops_started.push(op);
                (raw_op, self.execute(op))
            }
            Err(_) => (raw_op, OpsErrorCode::UnknownOp),
        };
        self.final_status = OpsStatus {
            op_id,
            busy: false,
            error: error.into(),
        };
        self.remaining_busy_polls = self.busy_polls;
        self.update_status();
    }

    /// Refresh the status register for the next read.
    fn update_status(&mut self) {
        if self.remaining_busy_polls > 0 {
            self.remaining_busy_polls -= 1;
            let busy = OpsStatus {
                busy: true,
                error: 0,
                ..self.final_status
            };
            self.write_register(&busy);
        } else {
            let status = self.final_status;
            self.write_register(&status);
        }
    }
}

/// A register-level stand-in for the reader chip.
///
/// Clones share the same device state, so a test can keep a handle after giving one to a
/// [`Device`][crate::protocol::Device].
#[derive(Clone, Debug, Default)]
pub(crate) struct MockDevice {
    state: Rc<RefCell<MockState>>,
    recent_operations: Rc<RefCell<VecDeque<BusOperation>>>,
}

impl MockDevice {
    pub(crate) fn new() -> Self {
        let device = Self::default();
        device.state.borrow_mut().final_status = OpsStatus {
            op_id: OpId::Idle.into(),
            busy: false,
            error: 0,
        };
        device
    }

    /// Make every op report busy for `polls` status reads before finishing.
    pub(crate) fn set_busy_polls(&self, polls: usize) {
        self.state.borrow_mut().busy_polls = polls;
    }

    /// Make `op` finish with `code` every time it is run.
    pub(crate) fn fail_op(&self, op: OpId, code: OpsErrorCode) {
        self.state.borrow_mut().failures.push((op, code));
    }

    pub(crate) fn clear_failures(&self) {
        self.state.borrow_mut().failures.clear();
    }

    /// Make bus writes starting at `address` fail.
    pub(crate) fn fail_writes_to(&self, address: u16) {
        self.state.borrow_mut().failing_write_address = Some(address);
    }

    /// The result the MeasureAdc op will report for `channel`.
    pub(crate) fn set_aux_adc_result(&self, channel: AuxAdcResult, value: u16) {
        let index: u8 = channel.into();
        self.state.borrow_mut().aux_adc_results[index as usize] = value;
    }

    /// Put a register value directly into device memory.
    pub(crate) fn set_register<R: Register>(&self, register: &R) {
        self.state.borrow_mut().write_register(register);
    }

    /// Read a register directly out of device memory.
    pub(crate) fn register<R: Register>(&self) -> R {
        self.state.borrow().read_register()
    }

    pub(crate) fn ops_started(&self) -> Vec<OpId> {
        self.state.borrow().ops_started.clone()
    }

    pub(crate) fn ops_run(&self) -> Vec<OpId> {
        self.state.borrow().ops_run.clone()
    }

    pub(crate) fn clear_ops(&self) {
        let mut state = self.state.borrow_mut();
        state.ops_started.clear();
        state.ops_run.clear();
    }

    fn add_operation(&self, operation: BusOperation) {
        let mut recent_ops = self.recent_operations.borrow_mut();
        recent_ops.push_front(operation);
        recent_ops.truncate(RECENT_OPERATIONS_QUEUE_LENGTH);
    }

    /// The most recent bus operations, newest first.
    pub(crate) fn recent_operations(&self) -> Ref<VecDeque<BusOperation>> {
        self.recent_operations.borrow()
    }

    pub(crate) fn clear_recent_operations(&self) {
        self.recent_operations.borrow_mut().clear()
    }

    /// Whether any write has been recorded since the recent operations were last cleared.
    pub(crate) fn has_writes(&self) -> bool {
        self.recent_operations()
            .iter()
            .any(|operation| matches!(operation, BusOperation::Write { .. }))
    }
}

impl RegisterBus for MockDevice {
    type Error = MockError;

    fn read(&mut self, address: u16, buffer: &mut [u8]) -> Result<(), Self::Error> {
        if buffer.is_empty() {
            return Err(MockError::IllegalOperation);
        }
        self.add_operation(BusOperation::Read {
            address,
            length: buffer.len(),
        });
        let mut state = self.state.borrow_mut();
        state.read(address, buffer);
        if address == OpsStatus::address() {
            state.update_status();
        }
        Ok(())
    }

    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), Self::Error> {
        if data.is_empty() {
            return Err(MockError::IllegalOperation);
        }
        let mut state = self.state.borrow_mut();
        if state.failing_write_address == Some(address) {
            return Err(MockError::WriteFailed(address));
        }
        self.add_operation(BusOperation::Write {
            address,
            length: data.len(),
        });
        state.write(address, data);
        if address == OpsControl::address() {
            state.start_op(data[0]);
        }
        Ok(())
    }
}

/// A delay that returns immediately.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MockDelay;

impl DelayUs<u32> for MockDelay {
    fn delay_us(&mut self, _us: u32) {}
}

#[cfg(test)]
mod test {
    use crate::protocol::RegisterBus;
    use crate::register::*;

    use super::{BusOperation, MockDevice};

    #[test]
    fn sparse_memory() {
        let mut device = MockDevice::new();
        device.write(0x1234, &[1, 2, 3]).unwrap();
        let mut buf = [0xffu8; 5];
        device.read(0x1233, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 0]);
        assert_eq!(
            device.recent_operations().front(),
            Some(&BusOperation::Read {
                address: 0x1233,
                length: 5
            })
        );
    }

    #[test]
    fn busy_then_done() {
        let mut device = MockDevice::new();
        device.set_busy_polls(1);
        device
            .write(OpsControl::address(), &[u8::from(OpId::TxRampUp)])
            .unwrap();
        let mut raw = [0u8; 4];
        device.read(OpsStatus::address(), &mut raw).unwrap();
        assert!(OpsStatus::from(&raw[..]).busy());
        device.read(OpsStatus::address(), &mut raw).unwrap();
        let status = OpsStatus::from(&raw[..]);
        assert!(!status.busy());
        assert_eq!(status.op(), Some(OpId::TxRampUp));
        assert!(device.register::<CwIsOn>().is_on());
    }
}
