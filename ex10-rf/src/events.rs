// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Event FIFO packets.
//!
//! The reader chip reports what its ops did by pushing packets into the event FIFO. Each packet
//! starts with an 8 byte [`PacketHeader`], followed by a fixed size payload that depends on the
//! packet type and then (for some types) variable length data. Packet lengths are always a whole
//! number of 32-bit words.
use arrayvec::ArrayVec;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::aggregate::MAX_FIFO_EVENT_LENGTH;
use crate::error::LibraryError;
use crate::expose_member;
use crate::util::Buffer;

/// The packet format revision the firmware and this crate agree on.
pub const EVENT_FIFO_SHA: u16 = 0xbf4b;

pub const PACKET_HEADER_LENGTH: usize = 8;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PacketType {
    TxRampUp = 0x01,
    TxRampDown = 0x02,
    InventoryRoundSummary = 0x03,
    QChanged = 0x04,
    TagRead = 0x05,
    TagReadExtended = 0x06,
    Gen2Transaction = 0x07,
    ContinuousInventorySummary = 0x08,
    HelloWorld = 0x09,
    Custom = 0x0a,
    PowerControlLoopSummary = 0x0b,
    AggregateOpSummary = 0x0d,
    Halted = 0x0e,
    InvalidPacket = 0xf0,
    FifoOverflow = 0xf1,
    Ex10Result = 0xf2,
    SjcMeasurement = 0xfe,
    Debug = 0xff,
}

impl PacketType {
    /// The length of the fixed part of the payload.
    pub fn static_payload_length(self) -> usize {
        match self {
            Self::InventoryRoundSummary | Self::TagReadExtended => 20,
            Self::QChanged | Self::TagRead | Self::Gen2Transaction | Self::SjcMeasurement => 12,
            Self::ContinuousInventorySummary | Self::AggregateOpSummary => 16,
            Self::PowerControlLoopSummary | Self::Ex10Result => 8,
            _ => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PacketHeader {
    /// Length of the whole packet in 32-bit words, header included.
    packet_length: u8,
    packet_type: u8,
    sha: u16,
    time_us: u32,
}

impl PacketHeader {
    pub fn new(packet_type: PacketType, packet_length_bytes: usize, time_us: u32) -> Self {
        Self {
            packet_length: (packet_length_bytes / 4) as u8,
            packet_type: packet_type.into(),
            sha: EVENT_FIFO_SHA,
            time_us,
        }
    }

    /// Parse a header, checking the format revision.
    pub fn parse(mut bytes: &[u8]) -> Result<Self, LibraryError> {
        if bytes.len() < PACKET_HEADER_LENGTH {
            return Err(LibraryError::InvalidData("Event packet header is truncated"));
        }
        let header = Self {
            packet_length: bytes.get_u8(),
            packet_type: bytes.get_u8(),
            sha: bytes.get_u16(),
            time_us: bytes.get_u32(),
        };
        if header.sha != EVENT_FIFO_SHA {
            return Err(LibraryError::InvalidData(
                "Event packet format doesn't match, the firmware version is probably different",
            ));
        }
        Ok(header)
    }

    expose_member!(packet_length, u8);
    expose_member!(sha, u16);
    expose_member!(time_us, u32);

    /// The packet type, if it's one this crate knows about.
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::try_from_primitive(self.packet_type).ok()
    }

    pub fn raw_packet_type(&self) -> u8 {
        self.packet_type
    }

    pub fn length_bytes(&self) -> usize {
        usize::from(self.packet_length) * 4
    }

    pub fn to_bytes(&self) -> [u8; PACKET_HEADER_LENGTH] {
        let mut bytes = [0u8; PACKET_HEADER_LENGTH];
        bytes[0] = self.packet_length;
        bytes[1] = self.packet_type;
        bytes[2..4].copy_from_slice(&self.sha.to_le_bytes());
        bytes[4..].copy_from_slice(&self.time_us.to_le_bytes());
        bytes
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RampDownReason {
    /// The host asked for it.
    Host = 1,

    /// A regulatory timer ran out.
    Regulatory = 2,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PowerControlLoopSummary {
    pub iterations_taken: u32,

    /// The last difference between the measured and target ADC values.
    pub final_error: i16,
    pub final_tx_fine_gain: i16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AggregateOpSummary {
    pub op_run_count: u16,
    pub write_count: u16,
    pub insert_fifo_count: u16,
    pub final_buffer_byte_index: u16,
    pub total_jump_count: u16,
    pub last_inner_op_run: u8,
    pub last_inner_op_error: u8,
    pub identifier: u16,
    pub last_inner_command_run: u8,
    pub last_inner_command_error: u8,
}

/// The result of a self-jammer cancellation measurement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SjcMeasurement {
    pub cdac_i: i8,
    pub cdac_q: i8,
    pub rx_atten: u8,
    pub flags: u8,
    pub residue_i: i32,
    pub residue_q: i32,
}

/// An error reported through the event FIFO.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ex10Result {
    pub error: bool,
    pub customer: bool,
    pub module: u8,
    pub result_code: u8,
    pub device_status: u32,
}

/// The decoded payload of an event packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventData<'a> {
    TxRampUp {
        frequency_khz: u32,
    },
    TxRampDown {
        /// The raw reason code, see [`EventData::ramp_down_reason`].
        reason: u8,
    },
    PowerControlLoopSummary(PowerControlLoopSummary),
    AggregateOpSummary(AggregateOpSummary),
    SjcMeasurement(SjcMeasurement),
    Ex10Result(Ex10Result),
    Custom(&'a [u8]),

    /// Any other packet, as the payload bytes after the header.
    Raw(&'a [u8]),
}

impl<'a> EventData<'a> {
    pub fn ramp_down_reason(&self) -> Option<RampDownReason> {
        match self {
            Self::TxRampDown { reason } => RampDownReason::try_from_primitive(*reason).ok(),
            _ => None,
        }
    }

    fn parse(packet_type: Option<PacketType>, payload: &'a [u8]) -> Result<Self, LibraryError> {
        let packet_type = match packet_type {
            Some(packet_type) => packet_type,
            None => return Ok(Self::Raw(payload)),
        };
        if payload.len() < packet_type.static_payload_length() {
            return Err(LibraryError::InvalidData(
                "Event packet is shorter than its type requires",
            ));
        }
        let mut buf = payload;
        let data = match packet_type {
            PacketType::TxRampUp => Self::TxRampUp {
                frequency_khz: buf.get_u32(),
            },
            PacketType::TxRampDown => Self::TxRampDown {
                reason: buf.get_u8(),
            },
            PacketType::PowerControlLoopSummary => {
                Self::PowerControlLoopSummary(PowerControlLoopSummary {
                    iterations_taken: buf.get_u32(),
                    final_error: buf.get_i16(),
                    final_tx_fine_gain: buf.get_i16(),
                })
            }
            PacketType::AggregateOpSummary => Self::AggregateOpSummary(AggregateOpSummary {
                op_run_count: buf.get_u16(),
                write_count: buf.get_u16(),
                insert_fifo_count: buf.get_u16(),
                final_buffer_byte_index: buf.get_u16(),
                total_jump_count: buf.get_u16(),
                last_inner_op_run: buf.get_u8(),
                last_inner_op_error: buf.get_u8(),
                identifier: buf.get_u16(),
                last_inner_command_run: buf.get_u8(),
                last_inner_command_error: buf.get_u8(),
            }),
            PacketType::SjcMeasurement => Self::SjcMeasurement(SjcMeasurement {
                cdac_i: buf.get_i8(),
                cdac_q: buf.get_i8(),
                rx_atten: buf.get_u8(),
                flags: buf.get_u8(),
                residue_i: buf.get_i32(),
                residue_q: buf.get_i32(),
            }),
            PacketType::Ex10Result => {
                let flags = buf.get_u16();
                Self::Ex10Result(Ex10Result {
                    error: flags & 0x01 != 0,
                    customer: flags & 0x02 != 0,
                    module: buf.get_u8(),
                    result_code: buf.get_u8(),
                    device_status: buf.get_u32(),
                })
            }
            PacketType::Custom => {
                let length = buf.get_u32() as usize;
                // Padding to a whole word follows the data.
                let data = buf
                    .get(..length)
                    .ok_or(LibraryError::InvalidData("Custom event data is truncated"))?;
                Self::Custom(data)
            }
            _ => Self::Raw(payload),
        };
        Ok(data)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EventPacket<'a> {
    pub header: PacketHeader,
    pub data: EventData<'a>,
}

impl<'a> EventPacket<'a> {
    /// Parse one packet from the start of `bytes`, returning it and whatever follows it.
    pub fn parse(bytes: &'a [u8]) -> Result<(Self, &'a [u8]), LibraryError> {
        let header = PacketHeader::parse(bytes)?;
        let length = header.length_bytes();
        if length < PACKET_HEADER_LENGTH {
            return Err(LibraryError::InvalidData(
                "Event packet length is shorter than its header",
            ));
        }
        if length > bytes.len() {
            return Err(LibraryError::InvalidData("Event packet is truncated"));
        }
        let (packet, rest) = bytes.split_at(length);
        let data = EventData::parse(header.packet_type(), &packet[PACKET_HEADER_LENGTH..])?;
        Ok((Self { header, data }, rest))
    }
}

/// Iterate over the packets in a block of event FIFO data.
///
/// Parsing stops after the first malformed packet, as there's no way to find where the next one
/// starts.
#[derive(Clone, Debug)]
pub struct EventPackets<'a> {
    remaining: &'a [u8],
}

impl<'a> EventPackets<'a> {
    pub fn new(fifo_data: &'a [u8]) -> Self {
        Self {
            remaining: fifo_data,
        }
    }
}

impl<'a> Iterator for EventPackets<'a> {
    type Item = Result<EventPacket<'a>, LibraryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        match EventPacket::parse(self.remaining) {
            Ok((packet, rest)) => {
                self.remaining = rest;
                Some(Ok(packet))
            }
            Err(err) => {
                self.remaining = &[];
                Some(Err(err))
            }
        }
    }
}

/// Build a [`PacketType::Custom`] packet, ready for
/// [`AggregateOpBuilder::append_insert_fifo_event`][crate::aggregate::AggregateOpBuilder::append_insert_fifo_event].
pub fn custom_event_packet(
    time_us: u32,
    data: &[u8],
) -> Result<ArrayVec<u8, MAX_FIFO_EVENT_LENGTH>, LibraryError> {
    let padded_length = (data.len() + 3) & !3;
    let length = PACKET_HEADER_LENGTH + 4 + padded_length;
    if length > MAX_FIFO_EVENT_LENGTH {
        return Err(LibraryError::BadParamValue(
            "Custom event data doesn't fit in a FIFO packet",
        ));
    }
    let header = PacketHeader::new(PacketType::Custom, length, time_us);
    let mut packet = ArrayVec::new();
    packet
        .try_extend_from_slice(&header.to_bytes())
        .and_then(|_| packet.try_extend_from_slice(&(data.len() as u32).to_le_bytes()))
        .and_then(|_| packet.try_extend_from_slice(data))
        .map_err(|_| LibraryError::BadParamValue("Custom event data doesn't fit in a FIFO packet"))?;
    while packet.len() < length {
        packet.push(0);
    }
    Ok(packet)
}
