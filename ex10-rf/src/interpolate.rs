// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Piecewise-linear lookups over small calibration tables.
//!
//! Both flavors share the same rules: inputs below the first sample return the first `y`, inputs
//! above the last sample return the last `y`, an input equal to a sample's `x` returns that
//! sample's `y` exactly, and anything else is interpolated between the two bracketing samples. The
//! `x` values must be sorted ascending.

/// Integer interpolation, truncating each partial product towards zero.
///
/// Returns 0 for an empty table.
pub(crate) fn interpolate_i16(x: &[u16], y: &[i16], x_new: i16) -> i16 {
    let len = x.len().min(y.len());
    if len == 0 {
        return 0;
    }
    let x_new = i32::from(x_new);
    if x_new < i32::from(x[0]) {
        return y[0];
    }
    if x_new > i32::from(x[len - 1]) {
        return y[len - 1];
    }
    if x_new == i32::from(x[0]) {
        return y[0];
    }
    for i in 1..len {
        let x_hi = i32::from(x[i]);
        if x_hi == x_new {
            return y[i];
        }
        if x_hi > x_new {
            let x_lo = i32::from(x[i - 1]);
            let span = x_hi - x_lo;
            let y_new = ((x_hi - x_new) * i32::from(y[i - 1])) / span
                + ((x_new - x_lo) * i32::from(y[i])) / span;
            return y_new as i16;
        }
    }
    y[len - 1]
}

/// Floating point interpolation.
///
/// Returns 0.0 for an empty table.
pub(crate) fn interpolate_f32(x: &[f32], y: &[f32], x_new: f32) -> f32 {
    let len = x.len().min(y.len());
    if len == 0 {
        return 0.0;
    }
    if x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[len - 1] {
        return y[len - 1];
    }
    for i in 1..len {
        if x_new == x[i] {
            return y[i];
        }
        if x_new < x[i] {
            let fraction = (x_new - x[i - 1]) / (x[i] - x[i - 1]);
            return y[i - 1] + fraction * (y[i] - y[i - 1]);
        }
    }
    y[len - 1]
}
