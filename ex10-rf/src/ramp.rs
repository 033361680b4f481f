// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Hooks that run around a carrier wave ramp up.
//!
//! Only one set of callbacks can be active at a time. Registering returns a [`CallbackGuard`]
//! that unregisters the callbacks when it is dropped, so an early return can't leave a stale
//! handler behind.
use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::calibration::Calibration;
use crate::error::{Error, LibraryError};
use crate::protocol::{Device, RegisterBus};
use crate::rf_power::CwConfig;

/// The hop table entry a ramp used, captured just before the active channel moves on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChannelSnapshot {
    pub index: usize,
    pub frequency_khz: u32,
}

/// What the callbacks get to look at.
#[derive(Clone, Copy, Debug)]
pub struct RampContext<'a> {
    pub config: &'a CwConfig,
    pub calibration: &'a Calibration,
    pub channel: ChannelSnapshot,
}

/// Work to do right before and right after ramping up.
///
/// An error from [`pre_ramp`][RampCallbacks::pre_ramp] cancels the ramp before the aggregate op
/// is written to the device. An error from [`post_ramp`][RampCallbacks::post_ramp] is returned
/// from the ramp up; the callback is expected to have made the transmitter safe already.
pub trait RampCallbacks<B: RegisterBus, D> {
    fn pre_ramp(
        &mut self,
        _device: &mut Device<B, D>,
        _context: &RampContext,
    ) -> Result<(), Error<B>> {
        Ok(())
    }

    fn post_ramp(
        &mut self,
        _device: &mut Device<B, D>,
        _context: &RampContext,
    ) -> Result<(), Error<B>> {
        Ok(())
    }
}

/// Holds at most one registered set of [`RampCallbacks`].
pub struct RampCallbackSlot<'a, B, D> {
    handler: Option<&'a mut dyn RampCallbacks<B, D>>,
}

impl<'a, B, D> RampCallbackSlot<'a, B, D>
where
    B: RegisterBus,
{
    pub fn new() -> Self {
        Self { handler: None }
    }

    pub fn is_registered(&self) -> bool {
        self.handler.is_some()
    }

    /// Register `handler`, failing if something is already registered.
    pub fn register<'s>(
        &'s mut self,
        handler: &'a mut dyn RampCallbacks<B, D>,
    ) -> Result<CallbackGuard<'s, 'a, B, D>, LibraryError> {
        if self.handler.is_some() {
            return Err(LibraryError::InvalidState(
                "Ramp callbacks are already registered",
            ));
        }
        self.handler = Some(handler);
        Ok(CallbackGuard { slot: self })
    }

    pub(crate) fn call_pre_ramp(
        &mut self,
        device: &mut Device<B, D>,
        context: &RampContext,
    ) -> Result<(), Error<B>> {
        match self.handler.as_mut() {
            Some(handler) => handler.pre_ramp(device, context),
            None => Ok(()),
        }
    }

    pub(crate) fn call_post_ramp(
        &mut self,
        device: &mut Device<B, D>,
        context: &RampContext,
    ) -> Result<(), Error<B>> {
        match self.handler.as_mut() {
            Some(handler) => handler.post_ramp(device, context),
            None => Ok(()),
        }
    }
}

impl<'a, B, D> Default for RampCallbackSlot<'a, B, D>
where
    B: RegisterBus,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, B, D> fmt::Debug for RampCallbackSlot<'a, B, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RampCallbackSlot")
            .field("registered", &self.handler.is_some())
            .finish()
    }
}

/// Keeps callbacks registered in a [`RampCallbackSlot`] until dropped.
///
/// The guard dereferences to the slot, so it can be handed straight to
/// [`RfPower::cw_on`][crate::rf_power::RfPower::cw_on].
pub struct CallbackGuard<'s, 'a, B, D> {
    slot: &'s mut RampCallbackSlot<'a, B, D>,
}

impl<'s, 'a, B, D> Deref for CallbackGuard<'s, 'a, B, D> {
    type Target = RampCallbackSlot<'a, B, D>;

    fn deref(&self) -> &Self::Target {
        self.slot
    }
}

impl<'s, 'a, B, D> DerefMut for CallbackGuard<'s, 'a, B, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.slot
    }
}

impl<'s, 'a, B, D> Drop for CallbackGuard<'s, 'a, B, D> {
    fn drop(&mut self) {
        self.slot.handler = None;
    }
}
