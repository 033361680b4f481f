// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

use crate::protocol::RegisterBus;
use crate::register::OpsStatus;

/// Errors that don't involve the register bus or the device.
#[derive(Clone, Debug, PartialEq)]
pub enum LibraryError {
    /// A parameter was outside of its allowed range.
    BadParamValue(&'static str),

    /// The aggregate op instruction buffer is full.
    AggregateBufferOverflow,

    /// The request doesn't make sense in the current state.
    InvalidState(&'static str),

    /// A measured value crossed a safety threshold (for example reflected power when an antenna
    /// is disconnected).
    AboveThreshold,

    /// When a value from the device is malformed in some way.
    InvalidData(&'static str),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::BadParamValue(msg) => write!(f, "bad parameter value: {}", msg),
            LibraryError::AggregateBufferOverflow => {
                write!(f, "aggregate op buffer overflow")
            }
            LibraryError::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            LibraryError::AboveThreshold => write!(f, "measurement above threshold"),
            LibraryError::InvalidData(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LibraryError {}

#[derive(Clone, PartialEq)]
pub enum Error<B>
where
    B: RegisterBus,
{
    /// Errors originating from the register bus implementation.
    BusError(B::Error),

    /// The device finished an op with an error code.
    OpError(OpsStatus),

    /// An op was still running when the completion timeout elapsed.
    OpTimeout(OpsStatus),

    /// Errors originating from within this library.
    LibraryError(LibraryError),
}

impl<B> Error<B>
where
    B: RegisterBus,
{
    /// Whether this error is a completion timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::OpTimeout(_))
    }

    /// Whether the device itself reported this error.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::OpError(_))
    }

    /// The op status attached to device errors and timeouts.
    pub fn ops_status(&self) -> Option<OpsStatus> {
        match self {
            Error::OpError(status) | Error::OpTimeout(status) => Some(*status),
            _ => None,
        }
    }
}

// Custom Debug implementation so that the bus itself doesn't need to implement Debug.
impl<B> fmt::Debug for Error<B>
where
    B: RegisterBus,
    B::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BusError(bus_error) => f.debug_tuple("Error::BusError").field(bus_error).finish(),
            Error::OpError(status) => f.debug_tuple("Error::OpError").field(status).finish(),
            Error::OpTimeout(status) => f.debug_tuple("Error::OpTimeout").field(status).finish(),
            Error::LibraryError(err) => f.debug_tuple("Error::LibraryError").field(err).finish(),
        }
    }
}

impl<B> fmt::Display for Error<B>
where
    B: RegisterBus,
    B::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BusError(bus_error) => write!(f, "Bus Error: {:?}", bus_error),
            Error::OpError(status) => write!(
                f,
                "Op {:#04x} failed with error code {:#04x}",
                status.op_id, status.error
            ),
            Error::OpTimeout(status) => {
                write!(f, "Timed out waiting for op {:#04x}", status.op_id)
            }
            Error::LibraryError(err) => write!(f, "Library Error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<B> std::error::Error for Error<B>
where
    B: RegisterBus,
    B::Error: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BusError(bus_error) => Some(bus_error),
            Error::LibraryError(lib_err) => Some(lib_err),
            _ => None,
        }
    }
}

impl<B> From<LibraryError> for Error<B>
where
    B: RegisterBus,
{
    fn from(lib_err: LibraryError) -> Self {
        Self::LibraryError(lib_err)
    }
}
