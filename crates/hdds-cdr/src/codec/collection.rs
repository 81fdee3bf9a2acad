// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sequences (`Vec<T>`) and arrays (`[T; N]`).
//!
//! A sequence is a `u32` element count followed by the elements; an array has
//! no count. Both are framed by `start_consecutive`/`finish_consecutive`, so
//! XCDR2 puts a DHEADER in front of collections of non-primitive elements.
//!
//! The first entry of `bounds` bounds the sequence itself; the rest is
//! handed down to the elements. Arrays pass `bounds` through unchanged.

use super::primitive::{move_primitive, read_primitive, write_primitive};
use super::{split_bound, CdrValue};
use crate::error::{Fault, Result};
use crate::props::EntityProperties;
use crate::stream::CdrStream;

fn collection_props<T: CdrValue>() -> EntityProperties {
    let mut props = T::type_props();
    props.is_primitive = false;
    props
}

fn check_write_bound<'b, S: CdrStream<'b>>(
    stream: &mut S,
    len: usize,
    bound: u32,
    fault: Fault,
) -> Result<u32> {
    if bound != 0 && len > bound as usize {
        log::debug!("[cdr] sequence of {} elements exceeds bound {}", len, bound);
        stream.raise(fault)?;
    }
    match u32::try_from(len) {
        Ok(count) => Ok(count),
        Err(_) => {
            stream.raise(Fault::ILLEGAL_FIELD_VALUE)?;
            Ok(u32::MAX)
        }
    }
}

/// Read a sequence into `items`, keeping at most `bound` elements.
pub fn read_sequence<'b, T, S>(
    stream: &mut S,
    items: &mut Vec<T>,
    props: &EntityProperties,
    bounds: &[u32],
) -> Result<()>
where
    T: CdrValue + Default,
    S: CdrStream<'b>,
{
    let (bound, inner) = split_bound(bounds);
    stream.start_consecutive(T::IS_PRIMITIVE)?;
    let count = read_primitive::<u32, S>(stream)? as usize;

    // Every element occupies at least one byte.
    let remaining = stream.buffer_size().saturating_sub(stream.position());
    if count > remaining {
        log::debug!(
            "[cdr] sequence length {} exceeds {} remaining bytes",
            count,
            remaining
        );
        stream.raise(Fault::BUFFER_SIZE_EXCEEDED)?;
    }

    let keep = if bound != 0 {
        count.min(bound as usize)
    } else {
        count
    };
    if keep < count {
        stream.raise(Fault::READ_BOUND_EXCEEDED)?;
    }

    items.clear();
    items.resize_with(keep, T::default);
    T::read_slice(stream, items, props, inner)?;
    T::skip_slice(stream, count - keep, props, inner)?;
    stream.finish_consecutive()
}

pub fn write_sequence<'b, T, S>(
    stream: &mut S,
    items: &[T],
    props: &EntityProperties,
    bounds: &[u32],
) -> Result<()>
where
    T: CdrValue,
    S: CdrStream<'b>,
{
    let (bound, inner) = split_bound(bounds);
    let count = check_write_bound(stream, items.len(), bound, Fault::WRITE_BOUND_EXCEEDED)?;
    stream.start_consecutive(T::IS_PRIMITIVE)?;
    write_primitive(stream, count)?;
    T::write_slice(stream, items, props, inner)?;
    stream.finish_consecutive()
}

pub fn move_sequence<'b, T, S>(
    stream: &mut S,
    items: &[T],
    props: &EntityProperties,
    bounds: &[u32],
) -> Result<()>
where
    T: CdrValue,
    S: CdrStream<'b>,
{
    let (bound, inner) = split_bound(bounds);
    check_write_bound(stream, items.len(), bound, Fault::MOVE_BOUND_EXCEEDED)?;
    stream.start_consecutive(T::IS_PRIMITIVE)?;
    move_primitive::<u32, S>(stream, 1)?;
    T::move_slice(stream, items, props, inner)?;
    stream.finish_consecutive()
}

/// An unbounded sequence has no maximum size.
pub fn max_sequence<'b, T, S>(stream: &mut S, props: &EntityProperties, bounds: &[u32]) -> Result<()>
where
    T: CdrValue,
    S: CdrStream<'b>,
{
    let (bound, inner) = split_bound(bounds);
    stream.start_consecutive(T::IS_PRIMITIVE)?;
    move_primitive::<u32, S>(stream, 1)?;
    if bound == 0 {
        stream.set_position(usize::MAX);
    } else {
        T::max_slice(stream, bound as usize, props, inner)?;
    }
    stream.finish_consecutive()
}

impl<T: CdrValue + Default> CdrValue for Vec<T> {
    fn type_props() -> EntityProperties {
        collection_props::<T>()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        read_sequence(stream, self, props, bounds)
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        write_sequence(stream, self, props, bounds)
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        move_sequence(stream, self, props, bounds)
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        max_sequence::<T, S>(stream, props, bounds)
    }
}

impl<T: CdrValue, const N: usize> CdrValue for [T; N] {
    fn type_props() -> EntityProperties {
        collection_props::<T>()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        stream.start_consecutive(T::IS_PRIMITIVE)?;
        T::read_slice(stream, self, props, bounds)?;
        stream.finish_consecutive()
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        stream.start_consecutive(T::IS_PRIMITIVE)?;
        T::write_slice(stream, self, props, bounds)?;
        stream.finish_consecutive()
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        stream.start_consecutive(T::IS_PRIMITIVE)?;
        T::move_slice(stream, self, props, bounds)?;
        stream.finish_consecutive()
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        stream.start_consecutive(T::IS_PRIMITIVE)?;
        T::max_slice(stream, N, props, bounds)?;
        stream.finish_consecutive()
    }
}
