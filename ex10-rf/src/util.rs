// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

#[doc(hidden)]
#[macro_export]
macro_rules! expose_member {
    ($name:ident, $typ:ty) => {
        pub fn $name(&self) -> $typ {
            self.$name
        }
    };
    (&$name:ident, $typ:ty) => {
        pub fn $name(&self) -> &$typ {
            &self.$name
        }
    };
}

/// This is a very small reimplementation of [bytes::Buf] with just the parts needed for this
/// crate.
///
/// Everything the reader chip stores is little-endian, so unlike `bytes` there are no `_le`
/// suffixes. Every getter panics if there aren't enough bytes left, so callers must check the
/// length up front.
///
/// [bytes::Buf]: https://docs.rs/bytes/*/bytes/trait.Buf.html
pub(crate) trait Buffer {
    fn advance(&mut self, cnt: usize);
    fn get_u8(&mut self) -> u8;
    fn get_i8(&mut self) -> i8;
    fn get_u16(&mut self) -> u16;
    fn get_i16(&mut self) -> i16;
    fn get_u32(&mut self) -> u32;
    fn get_i32(&mut self) -> i32;
    fn get_f32(&mut self) -> f32;
}

impl Buffer for &[u8] {
    fn advance(&mut self, cnt: usize) {
        *self = &self[cnt..];
    }

    fn get_u8(&mut self) -> u8 {
        let (byte, rest) = self.split_at(1);
        *self = rest;
        byte[0]
    }

    fn get_i8(&mut self) -> i8 {
        let (byte, rest) = self.split_at(1);
        *self = rest;
        i8::from_le_bytes([byte[0]])
    }

    fn get_u16(&mut self) -> u16 {
        let (bytes, rest) = self.split_at(2);
        *self = rest;
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn get_i16(&mut self) -> i16 {
        let (bytes, rest) = self.split_at(2);
        *self = rest;
        i16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn get_u32(&mut self) -> u32 {
        let (bytes, rest) = self.split_at(4);
        *self = rest;
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn get_i32(&mut self) -> i32 {
        let (bytes, rest) = self.split_at(4);
        *self = rest;
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn get_f32(&mut self) -> f32 {
        f32::from_bits(self.get_u32())
    }
}

/// Check if the n-th bit is set.
///
/// Bits are 0-indexed, from the LSB.
pub(crate) fn is_bit_set<B>(value: B, index: usize) -> bool
where
    B: num_traits::PrimInt + num_traits::Unsigned,
{
    (value & (B::one() << index)) > B::zero()
}

/// Sign-extend the lowest `num_bits` bits of `raw`.
pub(crate) fn i32_from_bits(raw: u32, num_bits: u8) -> i32 {
    let shift_amount = 32 - num_bits;
    ((raw << shift_amount) as i32) >> shift_amount
}

/// Copy the first `N` bytes of `buf` into an array.
///
/// Panics if `buf` is too short, the same as the [`Buffer`] getters.
pub(crate) fn array_from_slice<const N: usize>(buf: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&buf[..N]);
    bytes
}
