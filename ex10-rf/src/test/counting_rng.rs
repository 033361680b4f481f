// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use rand_core::{impls, Error as RandError, RngCore};

/// Counts up from a seed, so shuffles are predictable.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CountingRng(pub(crate) u32);

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        self.fill_bytes(dest);
        Ok(())
    }
}
