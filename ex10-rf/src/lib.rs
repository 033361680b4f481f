// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! RF power ramping and calibration compensation for the Impinj Ex10 family of RAIN RFID reader
//! chips.
//!
//! The reader chip does the actual transmitting, but the host is responsible for working out how
//! to get there: which channel to hop to, how long it may stay there, what gains and ADC targets
//! produce the requested output power at the current temperature and frequency, and how to turn
//! the raw RSSI the chip reports into something calibrated. All of that depends on the per-device
//! calibration image stored in the chip's flash.
//!
//! This library uses the [`embedded-hal`][embedded-hal] delay traits and a small
//! [`RegisterBus`] trait for the host interface, so it should work anywhere a register level
//! transport to the chip can be implemented. It is `no_std` compatible; either the `std` (default)
//! or `libm` feature must be enabled for the floating point math.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/0.2/embedded_hal/
//!
//! # Overview
//! [`Calibration`] parses the calibration image (read through [`CalibrationSource`]) and does
//! the compensation math: transmit power to gain and ADC targets, reverse power to ADC targets,
//! and RSSI compensation through the [`rssi_lut`] tables.
//!
//! [`ActiveRegion`] keeps the hop table and regulatory dwell timers for a [`Region`], including
//! the off time tracking some regions require.
//!
//! [`RfPower`] ties those together with a [`BoardSpec`] to build a [`CwConfig`] for the next
//! channel, then ramps up through a single aggregate op ([`AggregateOpBuilder`]). Code that has to
//! run around a ramp (like [`AntennaDisconnect`]) implements [`RampCallbacks`] and is registered
//! in a [`RampCallbackSlot`].
//!
//! What the chip did is reported back through the event FIFO, which [`events`] decodes.
//!
//! [`Region`]: region::Region
//! [`AggregateOpBuilder`]: aggregate::AggregateOpBuilder
//! [`RampCallbacks`]: ramp::RampCallbacks
//! [`RampCallbackSlot`]: ramp::RampCallbackSlot

#![no_std]
#![allow(clippy::float_cmp)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("Either the 'std' or 'libm' feature must be enabled.");

pub mod active_region;
pub mod aggregate;
pub mod antenna_disconnect;
pub mod board;
pub mod calibration;
#[doc(hidden)]
pub mod error;
pub mod events;
mod interpolate;
pub mod protocol;
pub mod ramp;
pub mod region;
pub mod register;
pub mod rf_mode;
pub mod rf_power;
pub mod rssi_lut;
mod util;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use active_region::ActiveRegion;
#[doc(inline)]
pub use antenna_disconnect::AntennaDisconnect;
pub use board::{BoardSpec, ReferenceBoard};
#[doc(inline)]
pub use calibration::Calibration;
#[doc(inline)]
pub use error::{Error, LibraryError};
pub use protocol::{CalibrationSource, Device, RegisterBus};
pub use region::RegionId;
#[doc(inline)]
pub use rf_power::{CwConfig, RfPower};
