// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic read / write / move / max functions.
//!
//! Every serializable type implements [`CdrValue`]: four passes over one
//! value, generic over the stream format. The same function body drives
//! Basic CDR, XCDR1 and XCDR2; the stream hooks supply the framing.
//!
//! Bounds of strings and sequences are passed alongside as `&[u32]`, outer
//! dimension first. A bound of 0 means unbounded.
//!
//! # Example
//!
//! ```
//! use hdds_cdr::{codec, CdrStream, StreamConfig, Xcdr2Stream};
//!
//! let value: Vec<u16> = vec![1, 2, 3];
//! let mut sizer = Xcdr2Stream::new(StreamConfig::default());
//! codec::move_(&mut sizer, &value, false).unwrap();
//! let mut buf = vec![0u8; sizer.position()];
//!
//! let mut writer = Xcdr2Stream::new(StreamConfig::default());
//! writer.set_write_buffer(&mut buf);
//! codec::write(&mut writer, &value, false).unwrap();
//! drop(writer);
//!
//! let mut reader = Xcdr2Stream::new(StreamConfig::default());
//! reader.set_read_buffer(&buf);
//! let mut decoded: Vec<u16> = Vec::new();
//! codec::read(&mut reader, &mut decoded, false).unwrap();
//! assert_eq!(decoded, value);
//! ```

pub mod aggregate;
pub mod collection;
pub mod enums;
pub mod optional;
pub mod primitive;
pub mod string;

use crate::error::Result;
use crate::props::{get_type_props, EntityProperties};
use crate::stream::{CdrStream, StreamMode};

/// A type with CDR streaming glue.
///
/// `props` is the node describing the value at its position in the tree
/// (its own type props, plus member identity when it is a member).
pub trait CdrValue: Sized {
    /// Fixed-width primitive or enum (no DHEADER around sequences of it).
    const IS_PRIMITIVE: bool = false;

    /// Unfinished property tree of this type.
    fn type_props() -> EntityProperties;

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()>;

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()>;

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()>;

    /// Worst-case size contribution of any value of this type.
    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()>;

    fn read_slice<'b, S: CdrStream<'b>>(
        stream: &mut S,
        items: &mut [Self],
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        for item in items {
            item.read_cdr(stream, props, bounds)?;
        }
        Ok(())
    }

    fn write_slice<'b, S: CdrStream<'b>>(
        stream: &mut S,
        items: &[Self],
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        for item in items {
            item.write_cdr(stream, props, bounds)?;
        }
        Ok(())
    }

    fn move_slice<'b, S: CdrStream<'b>>(
        stream: &mut S,
        items: &[Self],
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        for item in items {
            item.move_cdr(stream, props, bounds)?;
        }
        Ok(())
    }

    fn max_slice<'b, S: CdrStream<'b>>(
        stream: &mut S,
        count: usize,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        for _ in 0..count {
            Self::max_cdr(stream, props, bounds)?;
            if stream.position() == usize::MAX {
                break;
            }
        }
        Ok(())
    }

    /// Consume `count` elements whose values are dropped.
    fn skip_slice<'b, S: CdrStream<'b>>(
        stream: &mut S,
        count: usize,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()>
    where
        Self: Default,
    {
        let mut scratch = Self::default();
        for _ in 0..count {
            scratch.read_cdr(stream, props, bounds)?;
        }
        Ok(())
    }
}

/// Deserialize `value` (or only its key members) from the stream's buffer.
pub fn read<'b, T, S>(stream: &mut S, value: &mut T, as_key: bool) -> Result<()>
where
    T: CdrValue + 'static,
    S: CdrStream<'b>,
{
    let props = get_type_props::<T>();
    stream.set_mode(StreamMode::Read, as_key);
    value.read_cdr(stream, &props, &[])
}

/// Serialize `value` into the stream's buffer.
pub fn write<'b, T, S>(stream: &mut S, value: &T, as_key: bool) -> Result<()>
where
    T: CdrValue + 'static,
    S: CdrStream<'b>,
{
    let props = get_type_props::<T>();
    stream.set_mode(StreamMode::Write, as_key);
    value.write_cdr(stream, &props, &[])
}

/// Compute the serialized size of `value`; read it from `stream.position()`.
pub fn move_<'b, T, S>(stream: &mut S, value: &T, as_key: bool) -> Result<()>
where
    T: CdrValue + 'static,
    S: CdrStream<'b>,
{
    let props = get_type_props::<T>();
    stream.set_mode(StreamMode::Move, as_key);
    value.move_cdr(stream, &props, &[])
}

/// Compute the worst-case serialized size of any `T`.
///
/// `stream.position()` is `usize::MAX` afterwards when `T` is unbounded.
pub fn max<'b, T, S>(stream: &mut S, as_key: bool) -> Result<()>
where
    T: CdrValue + 'static,
    S: CdrStream<'b>,
{
    let props = get_type_props::<T>();
    stream.set_mode(StreamMode::Max, as_key);
    T::max_cdr(stream, &props, &[])
}

/// Serialized size of `value` in the format of `S`.
pub fn serialized_size<'b, T, S>(value: &T, as_key: bool, stream: &mut S) -> Result<usize>
where
    T: CdrValue + 'static,
    S: CdrStream<'b>,
{
    move_(stream, value, as_key)?;
    Ok(stream.position())
}

/// Split `bounds` into the bound of this level and the remainder.
pub(crate) fn split_bound(bounds: &[u32]) -> (u32, &[u32]) {
    match bounds.split_first() {
        Some((first, rest)) => (*first, rest),
        None => (0, &[]),
    }
}
