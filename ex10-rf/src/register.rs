// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Application registers of the reader chip used for RF power control.
//!
//! Every register implements [`Register`], which knows its address, how to parse itself from the
//! little-endian bytes read from the device, and how to serialize itself back. Bit-packed
//! registers are handled with `bitvec` so the field layout reads the same as the datasheet tables.
use bitvec::prelude::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::expose_member;
use crate::util::{array_from_slice, i32_from_bits, is_bit_set};

/// Trait for common register functionality.
pub trait Register: Sized + for<'a> From<&'a [u8]> {
    /// The raw byte representation of this register.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    /// The address of this register in the device's memory map.
    fn address() -> u16;

    /// Serialize this register into the bytes written to the device.
    fn to_bytes(&self) -> Self::Bytes;
}

type RegisterBits<const N: usize> = BitArray<[u8; N], Lsb0>;

/// Define a register that holds a single little-endian integer in its lowest bytes.
macro_rules! simple_register {
    {
        $(#[$meta:meta])*
        $name:ident { $field:ident: $typ:ty }, address: $address:literal, length: $len:literal
    } => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
        pub struct $name {
            pub(crate) $field: $typ,
        }

        impl $name {
            pub fn new($field: $typ) -> Self {
                Self { $field }
            }

            expose_member!($field, $typ);
        }

        impl<'a> From<&'a [u8]> for $name {
            fn from(buf: &'a [u8]) -> Self {
                Self {
                    $field: <$typ>::from_le_bytes(array_from_slice(buf)),
                }
            }
        }

        impl Register for $name {
            type Bytes = [u8; $len];

            fn address() -> u16 {
                $address
            }

            fn to_bytes(&self) -> Self::Bytes {
                let mut bytes = [0u8; $len];
                let value = self.$field.to_le_bytes();
                bytes[..value.len()].copy_from_slice(&value);
                bytes
            }
        }
    };
}

/// Identifiers for the operations the reader chip can run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpId {
    Idle = 0xa0,
    LogTest = 0xa1,
    MeasureAdc = 0xa2,
    TxRampUp = 0xa3,
    TxRampDown = 0xa4,
    SetTxCoarseGain = 0xa5,
    SetTxFineGain = 0xa6,
    RadioPowerControl = 0xa7,
    SetRfMode = 0xa8,
    SetRxGain = 0xa9,
    LockSynthesizer = 0xaa,
    EventFifoTest = 0xab,
    RxRunSjc = 0xac,
    SetGpio = 0xad,
    SetClearGpioPins = 0xae,
    StartInventoryRound = 0xb0,
    RunPrbsData = 0xb1,
    SendSelect = 0xb2,
    SetDac = 0xb3,
    SetATestMux = 0xb4,
    PowerControlLoop = 0xb5,
    MeasureRssi = 0xb6,
    UsTimerStart = 0xb7,
    UsTimerWait = 0xb8,
    Aggregate = 0xb9,
    ListenBeforeTalk = 0xba,
    BerTest = 0xc0,
    EtsiBurst = 0xc1,
    HpfOverrideTest = 0xc2,
    SetDcOffset = 0xc4,
}

/// Error codes an operation can finish with.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpsErrorCode {
    None = 0x00,
    UnknownOp = 0x01,
    UnknownError = 0x02,
    InvalidParameter = 0x03,
    PllNotLocked = 0x04,
    PowerControlTargetFailed = 0x05,
    InvalidTxState = 0x06,
    RadioPowerNotEnabled = 0x07,
    AggregateBufferOverflow = 0x08,
    AggregateInnerOpError = 0x09,
    SjcCdacRangeError = 0x0b,
    SjcResidueThresholdExceeded = 0x0c,
    DroopCompensationTooManyAdcChannels = 0x0d,
    EventFailedToSend = 0x0e,
    AggregateEx10CommandError = 0x0f,
    UnsupportedCommand = 0x10,
    BerRxHung = 0x11,
    Timeout = 0x12,
}

/// Power detector channels the power control loop can regulate against.
///
/// The `Lo*` detectors measure forward power, the `Rx*` detectors measure reflected power. The
/// primitive value is the channel's bit in the aux ADC channel enable mask.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum PowerDetector {
    Lo0 = 0x01,
    Lo1 = 0x02,
    Lo2 = 0x04,
    Rx0 = 0x10,
    Rx1 = 0x20,
    Rx2 = 0x40,
}

impl PowerDetector {
    /// The detector for calibration block `index`, either forward (`Lo*`) or reverse (`Rx*`).
    ///
    /// Only blocks 0 through 2 exist, larger indices are clamped to block 2.
    pub fn from_block(index: usize, forward: bool) -> Self {
        match (index, forward) {
            (0, true) => Self::Lo0,
            (1, true) => Self::Lo1,
            (_, true) => Self::Lo2,
            (0, false) => Self::Rx0,
            (1, false) => Self::Rx1,
            (_, false) => Self::Rx2,
        }
    }

    /// The channel enable bit for this detector.
    pub fn enable_bits(self) -> u16 {
        self.into()
    }

    /// Where this detector's measurement lands in the aux ADC results.
    pub fn result(self) -> AuxAdcResult {
        match self {
            Self::Lo0 => AuxAdcResult::PowerLo0,
            Self::Lo1 => AuxAdcResult::PowerLo1,
            Self::Lo2 => AuxAdcResult::PowerLo2,
            Self::Rx0 => AuxAdcResult::PowerRx0,
            Self::Rx1 => AuxAdcResult::PowerRx1,
            Self::Rx2 => AuxAdcResult::PowerRx2,
        }
    }
}

/// The aux ADC result slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AuxAdcResult {
    PowerLo0 = 0x00,
    PowerLo1 = 0x01,
    PowerLo2 = 0x02,
    PowerLo3 = 0x03,
    PowerRx0 = 0x04,
    PowerRx1 = 0x05,
    PowerRx2 = 0x06,
    PowerRx3 = 0x07,
    TestMux0 = 0x08,
    TestMux1 = 0x09,
    TestMux2 = 0x0a,
    TestMux3 = 0x0b,
    Temperature = 0x0c,
    PowerLoSum = 0x0d,
    PowerRxSum = 0x0e,
}

impl AuxAdcResult {
    /// The number of aux ADC result slots.
    pub const COUNT: u8 = 15;

    /// The channel enable mask for `count` channels starting at this one.
    ///
    /// The count is clipped to the channels remaining after this one.
    pub fn enable_bits(self, count: u8) -> u16 {
        let start: u8 = self.into();
        let count = count.min(Self::COUNT - start);
        ((1u16 << count) - 1) << start
    }
}

/// The address of the first aux ADC result. Each result is 16 bits wide.
pub const AUX_ADC_RESULTS_ADDRESS: u16 = 0x0404;

/// The address of the aggregate op instruction buffer.
pub const AGGREGATE_OP_BUFFER_ADDRESS: u16 = 0x0704;

/// The address of the 2048-byte calibration region.
pub const CALIBRATION_INFO_ADDRESS: u16 = 0xE800;

/// The size of the calibration region.
pub const CALIBRATION_INFO_LENGTH: usize = 0x0800;

simple_register! {
    /// Writing an op ID here starts the op.
    OpsControl { op_id: u8 }, address: 0x0300, length: 1
}

simple_register! {
    /// Microseconds since the device booted.
    Timestamp { time_us: u32 }, address: 0x0030, length: 4
}

simple_register! {
    /// The aux ADC channels to convert when the MeasureAdc op runs.
    AuxAdcControl { channel_enable_bits: u16 }, address: 0x0400, length: 2
}

simple_register! {
    /// The fine gain (transmit scalar) used by the TX ramp.
    TxFineGain { tx_scalar: i16 }, address: 0x0504, length: 4
}

simple_register! {
    RfModeRegister { id: u16 }, address: 0x0514, length: 4
}

simple_register! {
    /// How long the transmitter must stay off before ramping up on the same channel.
    EtsiBurstOffTime { off_time_ms: u16 }, address: 0x051C, length: 4
}

simple_register! {
    LastTxRampUpTimeMs { time_ms: u32 }, address: 0x0908, length: 4
}

simple_register! {
    LastTxRampUpLoFreqKhz { frequency_khz: u32 }, address: 0x090C, length: 4
}

simple_register! {
    LastTxRampDownTimeMs { time_ms: u32 }, address: 0x0910, length: 4
}

simple_register! {
    LastTxRampDownLoFreqKhz { frequency_khz: u32 }, address: 0x0914, length: 4
}

simple_register! {
    NominalStopTime { dwell_time_ms: u16 }, address: 0x1008, length: 2
}

simple_register! {
    ExtendedStopTime { dwell_time_ms: u16 }, address: 0x100C, length: 2
}

simple_register! {
    RegulatoryStopTime { dwell_time_ms: u16 }, address: 0x1010, length: 2
}

simple_register! {
    TxMutexTime { mutex_time_us: u16 }, address: 0x1012, length: 2
}

simple_register! {
    /// The detector channels the power control loop measures.
    PowerControlLoopAuxAdcControl { channel_enable_bits: u16 }, address: 0x00BC, length: 4
}

simple_register! {
    PowerControlLoopGainDivisor { gain_divisor: u16 }, address: 0x00C0, length: 4
}

simple_register! {
    PowerControlLoopMaxIterations { max_iterations: u32 }, address: 0x00C4, length: 4
}

simple_register! {
    PowerControlLoopAdcTarget { adc_target: u16 }, address: 0x00CC, length: 4
}

simple_register! {
    /// The delay used by the UsTimerStart op.
    DelayUs { delay_us: u32 }, address: 0x00D4, length: 4
}

/// The status of the most recently started op.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OpsStatus {
    pub(crate) op_id: u8,
    pub(crate) busy: bool,
    pub(crate) error: u8,
}

impl OpsStatus {
    expose_member!(busy, bool);

    /// The op this status is for, if it is a known op.
    pub fn op(&self) -> Option<OpId> {
        OpId::try_from_primitive(self.op_id).ok()
    }

    /// The raw op error code.
    pub fn raw_error(&self) -> u8 {
        self.error
    }

    /// The decoded op error code, if it is a known code.
    pub fn error(&self) -> Option<OpsErrorCode> {
        OpsErrorCode::try_from_primitive(self.error).ok()
    }

    /// Whether the op finished with an error.
    pub fn has_error(&self) -> bool {
        self.error != u8::from(OpsErrorCode::None)
    }
}

impl<'a> From<&'a [u8]> for OpsStatus {
    fn from(buf: &'a [u8]) -> Self {
        let bits = RegisterBits::<4>::new(array_from_slice(buf));
        Self {
            op_id: bits[0..8].load_le(),
            busy: bits[8],
            error: bits[16..24].load_le(),
        }
    }
}

impl Register for OpsStatus {
    type Bytes = [u8; 4];

    fn address() -> u16 {
        0x0304
    }

    fn to_bytes(&self) -> Self::Bytes {
        let mut bits = RegisterBits::<4>::new([0u8; 4]);
        bits[0..8].store_le(self.op_id);
        bits.set(8, self.busy);
        bits[16..24].store_le(self.error);
        bits.into_inner()
    }
}

/// The coarse transmit attenuation, 0 (no attenuation) through 30.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TxCoarseGain {
    pub(crate) tx_atten: u8,
}

impl TxCoarseGain {
    pub fn new(tx_atten: u8) -> Self {
        Self {
            tx_atten: tx_atten & 0x1F,
        }
    }

    expose_member!(tx_atten, u8);
}

impl<'a> From<&'a [u8]> for TxCoarseGain {
    fn from(buf: &'a [u8]) -> Self {
        Self {
            tx_atten: buf[0] & 0x1F,
        }
    }
}

impl Register for TxCoarseGain {
    type Bytes = [u8; 4];

    fn address() -> u16 {
        0x050C
    }

    fn to_bytes(&self) -> Self::Bytes {
        let mut bits = RegisterBits::<4>::new([0u8; 4]);
        bits[0..5].store_le(self.tx_atten);
        bits.into_inner()
    }
}

/// The DC offset applied during the TX ramp, a 20-bit signed value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DcOffset {
    pub(crate) offset: i32,
}

impl DcOffset {
    pub fn new(offset: i32) -> Self {
        Self { offset }
    }

    expose_member!(offset, i32);
}

impl<'a> From<&'a [u8]> for DcOffset {
    fn from(buf: &'a [u8]) -> Self {
        let bits = RegisterBits::<4>::new(array_from_slice(buf));
        let raw: u32 = bits[0..20].load_le();
        Self {
            offset: i32_from_bits(raw, 20),
        }
    }
}

impl Register for DcOffset {
    type Bytes = [u8; 4];

    fn address() -> u16 {
        0x0518
    }

    fn to_bytes(&self) -> Self::Bytes {
        let mut bits = RegisterBits::<4>::new([0u8; 4]);
        bits[0..20].store_le(self.offset as u32 & 0x000F_FFFF);
        bits.into_inner()
    }
}

/// Whether the carrier wave is currently being transmitted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CwIsOn {
    pub(crate) is_on: bool,
}

impl CwIsOn {
    pub fn new(is_on: bool) -> Self {
        Self { is_on }
    }

    expose_member!(is_on, bool);
}

impl<'a> From<&'a [u8]> for CwIsOn {
    fn from(buf: &'a [u8]) -> Self {
        Self {
            is_on: is_bit_set(buf[0], 0),
        }
    }
}

impl Register for CwIsOn {
    type Bytes = [u8; 4];

    fn address() -> u16 {
        0x0520
    }

    fn to_bytes(&self) -> Self::Bytes {
        [self.is_on as u8, 0, 0, 0]
    }
}

/// Whether the analog supplies are powered. Applied by the RadioPowerControl op.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AnalogEnable {
    pub(crate) all: bool,
}

impl AnalogEnable {
    pub fn new(all: bool) -> Self {
        Self { all }
    }

    expose_member!(all, bool);
}

impl<'a> From<&'a [u8]> for AnalogEnable {
    fn from(buf: &'a [u8]) -> Self {
        Self {
            all: is_bit_set(buf[0], 0),
        }
    }
}

impl Register for AnalogEnable {
    type Bytes = [u8; 4];

    fn address() -> u16 {
        0x0700
    }

    fn to_bytes(&self) -> Self::Bytes {
        [self.all as u8, 0, 0, 0]
    }
}

/// The receiver gain stages.
///
/// Each of the gain fields is a 2-bit index into the matching calibration lookup table.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RxGainControl {
    pub(crate) rx_atten: u8,
    pub(crate) pga1_gain: u8,
    pub(crate) pga2_gain: u8,
    pub(crate) pga3_gain: u8,
    pub(crate) mixer_gain: u8,
    pub(crate) pga1_rin_select: bool,
    pub(crate) mixer_bandwidth: bool,
}

impl RxGainControl {
    /// Create a gain setting. Only the lowest two bits of each index are kept.
    pub fn new(rx_atten: u8, pga1_gain: u8, pga2_gain: u8, pga3_gain: u8, mixer_gain: u8) -> Self {
        Self {
            rx_atten: rx_atten & 0x3,
            pga1_gain: pga1_gain & 0x3,
            pga2_gain: pga2_gain & 0x3,
            pga3_gain: pga3_gain & 0x3,
            mixer_gain: mixer_gain & 0x3,
            pga1_rin_select: false,
            mixer_bandwidth: false,
        }
    }

    expose_member!(rx_atten, u8);
    expose_member!(pga1_gain, u8);
    expose_member!(pga2_gain, u8);
    expose_member!(pga3_gain, u8);
    expose_member!(mixer_gain, u8);
    expose_member!(pga1_rin_select, bool);
    expose_member!(mixer_bandwidth, bool);
}

impl<'a> From<&'a [u8]> for RxGainControl {
    fn from(buf: &'a [u8]) -> Self {
        let bits = RegisterBits::<2>::new(array_from_slice(buf));
        Self {
            rx_atten: bits[0..2].load_le(),
            pga1_gain: bits[2..4].load_le(),
            pga2_gain: bits[4..6].load_le(),
            pga3_gain: bits[6..8].load_le(),
            mixer_gain: bits[10..12].load_le(),
            pga1_rin_select: bits[12],
            mixer_bandwidth: bits[14],
        }
    }
}

impl Register for RxGainControl {
    type Bytes = [u8; 2];

    fn address() -> u16 {
        0x0508
    }

    fn to_bytes(&self) -> Self::Bytes {
        let mut bits = RegisterBits::<2>::new([0u8; 2]);
        bits[0..2].store_le(self.rx_atten);
        bits[2..4].store_le(self.pga1_gain);
        bits[4..6].store_le(self.pga2_gain);
        bits[6..8].store_le(self.pga3_gain);
        bits[10..12].store_le(self.mixer_gain);
        bits.set(12, self.pga1_rin_select);
        bits.set(14, self.mixer_bandwidth);
        bits.into_inner()
    }
}

/// Periodic fine gain adjustment to counter power amplifier droop while transmitting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PowerDroopCompensation {
    pub(crate) enable: bool,
    pub(crate) compensation_interval_ms: u8,
    pub(crate) fine_gain_step_cd_b: u8,
}

impl PowerDroopCompensation {
    pub fn new(enable: bool, compensation_interval_ms: u8, fine_gain_step_cd_b: u8) -> Self {
        Self {
            enable,
            compensation_interval_ms,
            fine_gain_step_cd_b,
        }
    }

    expose_member!(enable, bool);
    expose_member!(compensation_interval_ms, u8);
    expose_member!(fine_gain_step_cd_b, u8);
}

impl Default for PowerDroopCompensation {
    fn default() -> Self {
        Self {
            enable: true,
            compensation_interval_ms: 25,
            fine_gain_step_cd_b: 10,
        }
    }
}

impl<'a> From<&'a [u8]> for PowerDroopCompensation {
    fn from(buf: &'a [u8]) -> Self {
        let bits = RegisterBits::<4>::new(array_from_slice(buf));
        Self {
            enable: bits[0],
            compensation_interval_ms: bits[16..24].load_le(),
            fine_gain_step_cd_b: bits[24..32].load_le(),
        }
    }
}

impl Register for PowerDroopCompensation {
    type Bytes = [u8; 4];

    fn address() -> u16 {
        0x0904
    }

    fn to_bytes(&self) -> Self::Bytes {
        let mut bits = RegisterBits::<4>::new([0u8; 4]);
        bits.set(0, self.enable);
        bits[16..24].store_le(self.compensation_interval_ms);
        bits[24..32].store_le(self.fine_gain_step_cd_b);
        bits.into_inner()
    }
}

/// The thresholds that end the power control loop.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PowerControlLoopAdcThresholds {
    pub(crate) loop_stop_threshold: u16,
    pub(crate) op_error_threshold: u16,
}

impl PowerControlLoopAdcThresholds {
    pub fn new(loop_stop_threshold: u16, op_error_threshold: u16) -> Self {
        Self {
            loop_stop_threshold,
            op_error_threshold,
        }
    }

    expose_member!(loop_stop_threshold, u16);
    expose_member!(op_error_threshold, u16);
}

impl<'a> From<&'a [u8]> for PowerControlLoopAdcThresholds {
    fn from(buf: &'a [u8]) -> Self {
        let bits = RegisterBits::<4>::new(array_from_slice(buf));
        Self {
            loop_stop_threshold: bits[0..16].load_le(),
            op_error_threshold: bits[16..32].load_le(),
        }
    }
}

impl Register for PowerControlLoopAdcThresholds {
    type Bytes = [u8; 4];

    fn address() -> u16 {
        0x00D0
    }

    fn to_bytes(&self) -> Self::Bytes {
        let mut bits = RegisterBits::<4>::new([0u8; 4]);
        bits[0..16].store_le(self.loop_stop_threshold);
        bits[16..32].store_le(self.op_error_threshold);
        bits.into_inner()
    }
}

/// The number of (identical) entries in the synthesizer control register.
pub const RF_SYNTHESIZER_CONTROL_ENTRIES: usize = 5;

/// PLL divider settings used by the LockSynthesizer op.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RfSynthesizerControl {
    pub(crate) n_divider: u16,
    pub(crate) r_divider: u8,
    pub(crate) lf_type: bool,
}

impl RfSynthesizerControl {
    pub fn new(n_divider: u16, r_divider: u8, lf_type: bool) -> Self {
        Self {
            n_divider,
            r_divider: r_divider & 0x7,
            lf_type,
        }
    }

    expose_member!(n_divider, u16);
    expose_member!(r_divider, u8);
    expose_member!(lf_type, bool);

    fn entry_bytes(&self) -> [u8; 4] {
        let mut bits = RegisterBits::<4>::new([0u8; 4]);
        bits[0..16].store_le(self.n_divider);
        bits[16..19].store_le(self.r_divider);
        bits.set(24, self.lf_type);
        bits.into_inner()
    }
}

impl<'a> From<&'a [u8]> for RfSynthesizerControl {
    /// Parse the first entry of the register.
    fn from(buf: &'a [u8]) -> Self {
        let bits = RegisterBits::<4>::new(array_from_slice(buf));
        Self {
            n_divider: bits[0..16].load_le(),
            r_divider: bits[16..19].load_le(),
            lf_type: bits[24],
        }
    }
}

impl Register for RfSynthesizerControl {
    type Bytes = [u8; 4 * RF_SYNTHESIZER_CONTROL_ENTRIES];

    fn address() -> u16 {
        0x0588
    }

    fn to_bytes(&self) -> Self::Bytes {
        let entry = self.entry_bytes();
        let mut bytes = [0u8; 4 * RF_SYNTHESIZER_CONTROL_ENTRIES];
        for chunk in bytes.chunks_exact_mut(4) {
            chunk.copy_from_slice(&entry);
        }
        bytes
    }
}

/// Output level and enable changes for the DIGITAL_IO pins, applied by the SetClearGpioPins op.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GpioPinsSetClear {
    pub output_level_set: u32,
    pub output_level_clear: u32,
    pub output_enable_set: u32,
    pub output_enable_clear: u32,
}

impl GpioPinsSetClear {
    /// Drive the pins in `mask` to the matching bits of `levels`, enabling them as outputs.
    pub fn set_clear(&mut self, levels: u32, mask: u32) {
        self.output_level_set |= levels & mask;
        self.output_level_clear |= !levels & mask;
        self.output_enable_set |= mask;
    }
}

impl<'a> From<&'a [u8]> for GpioPinsSetClear {
    fn from(buf: &'a [u8]) -> Self {
        let word = |index: usize| u32::from_le_bytes(array_from_slice(&buf[index * 4..]));
        Self {
            output_level_set: word(0),
            output_level_clear: word(1),
            output_enable_set: word(2),
            output_enable_clear: word(3),
        }
    }
}

impl Register for GpioPinsSetClear {
    type Bytes = [u8; 16];

    fn address() -> u16 {
        0x00E0
    }

    fn to_bytes(&self) -> Self::Bytes {
        let mut bytes = [0u8; 16];
        let words = [
            self.output_level_set,
            self.output_level_clear,
            self.output_enable_set,
            self.output_enable_clear,
        ];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ops_status() {
        let status = OpsStatus::from(&b"\xb5\x01\x05\x00"[..]);
        assert_eq!(status.op(), Some(OpId::PowerControlLoop));
        assert!(status.busy());
        assert!(status.has_error());
        assert_eq!(
            status.error(),
            Some(OpsErrorCode::PowerControlTargetFailed)
        );
        assert_eq!(status.to_bytes(), [0xb5, 0x01, 0x05, 0x00]);
        let idle = OpsStatus::from(&b"\xa0\x00\x00\x00"[..]);
        assert!(!idle.busy());
        assert!(!idle.has_error());
    }

    #[test]
    fn dc_offset_sign() {
        let negative = DcOffset::new(-3);
        let bytes = negative.to_bytes();
        assert_eq!(bytes, [0xfd, 0xff, 0x0f, 0x00]);
        assert_eq!(DcOffset::from(&bytes[..]), negative);
        assert_eq!(DcOffset::from(&b"\x10\x27\x00\x00"[..]).offset(), 10000);
    }

    #[test]
    fn coarse_gain_masks() {
        assert_eq!(TxCoarseGain::new(0xFF).tx_atten(), 31);
        assert_eq!(TxCoarseGain::new(12).to_bytes(), [12, 0, 0, 0]);
    }

    #[test]
    fn rx_gain_control_fields() {
        let gains = RxGainControl::new(1, 2, 3, 0, 2);
        // rx_atten 0b01, pga1 0b10, pga2 0b11, pga3 0b00, mixer 0b10 at bits 10-11
        assert_eq!(gains.to_bytes(), [0b0011_1001, 0b0000_1000]);
        assert_eq!(RxGainControl::from(&gains.to_bytes()[..]), gains);
    }

    #[test]
    fn droop_compensation_layout() {
        let droop = PowerDroopCompensation::default();
        assert_eq!(droop.to_bytes(), [0x01, 0x00, 25, 10]);
        assert_eq!(PowerDroopCompensation::from(&droop.to_bytes()[..]), droop);
    }

    #[test]
    fn synthesizer_entries_repeat() {
        let synth = RfSynthesizerControl::new(0x1234, 2, true);
        let bytes = synth.to_bytes();
        for entry in bytes.chunks_exact(4) {
            assert_eq!(entry, [0x34, 0x12, 0x02, 0x01]);
        }
        assert_eq!(RfSynthesizerControl::from(&bytes[..]), synth);
    }

    #[test]
    fn gpio_set_clear() {
        let mut gpio = GpioPinsSetClear::default();
        gpio.set_clear(1 << 19, 1 << 19);
        gpio.set_clear(0, 1 << 7);
        assert_eq!(gpio.output_level_set, 1 << 19);
        assert_eq!(gpio.output_level_clear, 1 << 7);
        assert_eq!(gpio.output_enable_set, (1 << 19) | (1 << 7));
        assert_eq!(gpio.output_enable_clear, 0);
        assert_eq!(GpioPinsSetClear::from(&gpio.to_bytes()[..]), gpio);
    }

    #[test]
    fn simple_register_padding() {
        assert_eq!(
            PowerControlLoopAdcTarget::new(0x0abc).to_bytes(),
            [0xbc, 0x0a, 0x00, 0x00]
        );
        assert_eq!(NominalStopTime::new(3800).to_bytes(), 3800u16.to_le_bytes());
        assert_eq!(
            PowerControlLoopAdcThresholds::new(4, 24).to_bytes(),
            [4, 0, 24, 0]
        );
    }

    #[test]
    fn detector_bits() {
        assert_eq!(PowerDetector::from_block(2, true), PowerDetector::Lo2);
        assert_eq!(PowerDetector::from_block(0, false).enable_bits(), 0x10);
        assert_eq!(PowerDetector::Rx1.result(), AuxAdcResult::PowerRx1);
    }

    #[test]
    fn aux_adc_enable_bits() {
        assert_eq!(AuxAdcResult::PowerLo0.enable_bits(3), 0x0007);
        assert_eq!(AuxAdcResult::PowerRx1.enable_bits(1), 0x0020);
        assert_eq!(AuxAdcResult::PowerLoSum.enable_bits(5), 0x6000);
        assert_eq!(AuxAdcResult::Temperature.enable_bits(0), 0);
    }
}
