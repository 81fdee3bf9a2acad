// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-width primitives.
//!
//! Each value is aligned to its own size (capped by the stream's maximum
//! alignment) and stored in the stream's byte order. Slices of primitives are
//! aligned and bounds-checked once for the whole run.

use std::fmt;

use super::CdrValue;
use crate::error::{Fault, Result};
use crate::props::{BitBound, EntityProperties};
use crate::stream::{CdrStream, Endianness};

/// Fixed-width value with a byte-order aware encoding.
pub trait Primitive: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const SIZE: usize;

    /// Store into `dst[..SIZE]`.
    fn encode(self, dst: &mut [u8], endianness: Endianness);

    /// Load from `src[..SIZE]`; `None` when the bytes are not a valid value.
    fn decode(src: &[u8], endianness: Endianness) -> Option<Self>;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(self, dst: &mut [u8], endianness: Endianness) {
                    let bytes = match endianness {
                        Endianness::Little => self.to_le_bytes(),
                        Endianness::Big => self.to_be_bytes(),
                    };
                    if let Some(slot) = dst.get_mut(..Self::SIZE) {
                        slot.copy_from_slice(&bytes);
                    }
                }

                fn decode(src: &[u8], endianness: Endianness) -> Option<Self> {
                    let bytes: [u8; std::mem::size_of::<$ty>()] =
                        src.get(..Self::SIZE)?.try_into().ok()?;
                    Some(match endianness {
                        Endianness::Little => <$ty>::from_le_bytes(bytes),
                        Endianness::Big => <$ty>::from_be_bytes(bytes),
                    })
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

macro_rules! impl_cdr_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CdrValue for $ty {
                const IS_PRIMITIVE: bool = true;

                fn type_props() -> EntityProperties {
                    EntityProperties::primitive(BitBound::from_size(<$ty as Primitive>::SIZE))
                }

                fn read_cdr<'b, S: CdrStream<'b>>(
                    &mut self,
                    stream: &mut S,
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    *self = read_primitive(stream)?;
                    Ok(())
                }

                fn write_cdr<'b, S: CdrStream<'b>>(
                    &self,
                    stream: &mut S,
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    write_primitive(stream, *self)
                }

                fn move_cdr<'b, S: CdrStream<'b>>(
                    &self,
                    stream: &mut S,
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    move_primitive::<$ty, S>(stream, 1)
                }

                fn max_cdr<'b, S: CdrStream<'b>>(
                    stream: &mut S,
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    move_primitive::<$ty, S>(stream, 1)
                }

                fn read_slice<'b, S: CdrStream<'b>>(
                    stream: &mut S,
                    items: &mut [Self],
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    read_primitive_slice(stream, items)
                }

                fn write_slice<'b, S: CdrStream<'b>>(
                    stream: &mut S,
                    items: &[Self],
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    write_primitive_slice(stream, items)
                }

                fn move_slice<'b, S: CdrStream<'b>>(
                    stream: &mut S,
                    items: &[Self],
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    move_primitive::<$ty, S>(stream, items.len())
                }

                fn max_slice<'b, S: CdrStream<'b>>(
                    stream: &mut S,
                    count: usize,
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    move_primitive::<$ty, S>(stream, count)
                }

                fn skip_slice<'b, S: CdrStream<'b>>(
                    stream: &mut S,
                    count: usize,
                    _props: &EntityProperties,
                    _bounds: &[u32],
                ) -> Result<()> {
                    skip_primitives::<$ty, S>(stream, count)
                }
            }
        )*
    };
}

impl_cdr_value!(bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Primitive for bool {
    const SIZE: usize = 1;

    fn encode(self, dst: &mut [u8], _endianness: Endianness) {
        if let Some(byte) = dst.first_mut() {
            *byte = u8::from(self);
        }
    }

    fn decode(src: &[u8], _endianness: Endianness) -> Option<Self> {
        match src.first()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
}

pub fn read_primitive<'b, T: Primitive, S: CdrStream<'b>>(stream: &mut S) -> Result<T> {
    stream.align(T::SIZE, false)?;
    stream.get::<T>()
}

pub fn write_primitive<'b, T: Primitive, S: CdrStream<'b>>(stream: &mut S, value: T) -> Result<()> {
    stream.align(T::SIZE, true)?;
    stream.put(value)
}

/// Advance over `count` values of `T` (move and max passes).
pub fn move_primitive<'b, T: Primitive, S: CdrStream<'b>>(stream: &mut S, count: usize) -> Result<()> {
    stream.ensure_usable()?;
    if count == 0 {
        return Ok(());
    }
    stream.align(T::SIZE, false)?;
    stream.incr_position(T::SIZE.saturating_mul(count));
    Ok(())
}

fn skip_primitives<'b, T: Primitive, S: CdrStream<'b>>(stream: &mut S, count: usize) -> Result<()> {
    if count == 0 {
        return stream.ensure_usable();
    }
    stream.align(T::SIZE, false)?;
    stream.skip(T::SIZE.saturating_mul(count))
}

pub fn read_primitive_slice<'b, T: Primitive, S: CdrStream<'b>>(
    stream: &mut S,
    items: &mut [T],
) -> Result<()> {
    if items.is_empty() {
        return stream.ensure_usable();
    }
    stream.align(T::SIZE, false)?;
    let endianness = stream.endianness();
    let bytes = stream.take(T::SIZE.saturating_mul(items.len()))?;
    let mut invalid = false;
    for (item, chunk) in items.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
        match T::decode(chunk, endianness) {
            Some(value) => *item = value,
            None => {
                *item = T::default();
                invalid = true;
            }
        }
    }
    if invalid {
        stream.raise(Fault::ILLEGAL_FIELD_VALUE)?;
    }
    Ok(())
}

pub fn write_primitive_slice<'b, T: Primitive, S: CdrStream<'b>>(
    stream: &mut S,
    items: &[T],
) -> Result<()> {
    if items.is_empty() {
        return stream.ensure_usable();
    }
    stream.align(T::SIZE, true)?;
    stream.put_with(T::SIZE.saturating_mul(items.len()), |slot, endianness| {
        for (item, chunk) in items.iter().zip(slot.chunks_exact_mut(T::SIZE)) {
            item.encode(chunk, endianness);
        }
    })
}
