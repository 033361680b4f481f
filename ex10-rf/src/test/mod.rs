// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
mod counting_rng;
mod mock_device;

pub(crate) use counting_rng::CountingRng;
pub(crate) use mock_device::{BusOperation, MockDelay, MockDevice, MockError};
