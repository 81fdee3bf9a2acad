// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Strings: `u32` length including the trailing NUL, then the bytes.
//!
//! A bound of 0 means unbounded. Writing or sizing a string longer than its
//! bound is a fault. Reading one truncates it to the bound (on a character
//! boundary) while still consuming the full incoming length.

use super::{split_bound, CdrValue};
use crate::error::{Fault, Result};
use crate::props::EntityProperties;
use crate::stream::CdrStream;

fn check_write_bound<'b, S: CdrStream<'b>>(
    stream: &mut S,
    value: &str,
    bound: u32,
    fault: Fault,
) -> Result<()> {
    if bound != 0 && value.len() > bound as usize {
        log::debug!(
            "[cdr] string of {} bytes exceeds bound {}",
            value.len(),
            bound
        );
        stream.raise(fault)?;
    }
    Ok(())
}

fn wire_length<'b, S: CdrStream<'b>>(stream: &mut S, value: &str) -> Result<u32> {
    match u32::try_from(value.len() + 1) {
        Ok(len) => Ok(len),
        Err(_) => {
            stream.raise(Fault::ILLEGAL_FIELD_VALUE)?;
            Ok(u32::MAX)
        }
    }
}

pub fn write_string<'b, S: CdrStream<'b>>(stream: &mut S, value: &str, bound: u32) -> Result<()> {
    check_write_bound(stream, value, bound, Fault::WRITE_BOUND_EXCEEDED)?;
    let len = wire_length(stream, value)?;
    stream.align(4, true)?;
    stream.put(len)?;
    stream.write_bytes(value.as_bytes())?;
    stream.put(0u8)?;
    stream.set_alignment(1);
    Ok(())
}

pub fn move_string<'b, S: CdrStream<'b>>(stream: &mut S, value: &str, bound: u32) -> Result<()> {
    check_write_bound(stream, value, bound, Fault::MOVE_BOUND_EXCEEDED)?;
    stream.ensure_usable()?;
    stream.align(4, false)?;
    stream.incr_position(4 + value.len() + 1);
    stream.set_alignment(1);
    Ok(())
}

pub fn max_string<'b, S: CdrStream<'b>>(stream: &mut S, bound: u32) -> Result<()> {
    stream.ensure_usable()?;
    if bound == 0 {
        stream.set_position(usize::MAX);
        return Ok(());
    }
    stream.align(4, false)?;
    stream.incr_position(4 + bound as usize + 1);
    stream.set_alignment(1);
    Ok(())
}

pub fn read_string<'b, S: CdrStream<'b>>(
    stream: &mut S,
    value: &mut String,
    bound: u32,
) -> Result<()> {
    stream.align(4, false)?;
    let len = stream.get::<u32>()? as usize;
    value.clear();
    if len == 0 {
        log::debug!("[cdr] zero string length at offset {}", stream.position());
        stream.raise(Fault::ILLEGAL_FIELD_VALUE)?;
        stream.set_alignment(1);
        return Ok(());
    }
    let bytes = stream.take(len)?;
    stream.set_alignment(1);

    // Trailing NUL is not part of the value.
    let mut content = &bytes[..len - 1];
    if let Some(nul) = content.iter().position(|&b| b == 0) {
        content = &content[..nul];
    }
    let text = match std::str::from_utf8(content) {
        Ok(text) => std::borrow::Cow::Borrowed(text),
        Err(_) => {
            stream.raise(Fault::ILLEGAL_FIELD_VALUE)?;
            String::from_utf8_lossy(content)
        }
    };

    if bound != 0 && text.len() > bound as usize {
        stream.raise(Fault::READ_BOUND_EXCEEDED)?;
        let mut cut = bound as usize;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        value.push_str(&text[..cut]);
    } else {
        value.push_str(&text);
    }
    Ok(())
}

impl CdrValue for String {
    fn type_props() -> EntityProperties {
        EntityProperties::leaf()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        _props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        read_string(stream, self, split_bound(bounds).0)
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        _props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        write_string(stream, self, split_bound(bounds).0)
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        _props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        move_string(stream, self, split_bound(bounds).0)
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        _props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        max_string(stream, split_bound(bounds).0)
    }
}
