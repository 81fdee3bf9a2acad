// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enumerations.
//!
//! Enums travel as their integer value. Basic CDR and XCDR1 always use 4
//! bytes; XCDR2 uses the width of the declared bit bound. Received values that
//! name no enumerator decode to the enum's default.

use super::primitive::{move_primitive, read_primitive, write_primitive};
use crate::error::Result;
use crate::props::{BitBound, EntityProperties};
use crate::stream::CdrStream;

/// An enumeration with a wire representation.
///
/// Usually derived with `#[derive(CdrEnum)]`.
pub trait CdrEnum: Copy + Default + 'static {
    const BIT_BOUND: BitBound;

    /// Integer value of the enumerator.
    fn to_raw(self) -> u32;

    /// Enumerator with the given value, or `Self::default()` if none matches.
    fn from_raw(raw: u32) -> Self;
}

/// Checked conversion of a received integer to an enumerator.
pub fn enum_conversion<E: CdrEnum>(raw: u32) -> E {
    E::from_raw(raw)
}

pub fn enum_props<E: CdrEnum>() -> EntityProperties {
    EntityProperties::primitive(E::BIT_BOUND)
}

pub fn read_enum<'b, E: CdrEnum, S: CdrStream<'b>>(stream: &mut S) -> Result<E> {
    let raw = match stream.enum_width(E::BIT_BOUND) {
        1 => u32::from(read_primitive::<u8, S>(stream)?),
        2 => u32::from(read_primitive::<u16, S>(stream)?),
        _ => read_primitive::<u32, S>(stream)?,
    };
    let value = enum_conversion::<E>(raw);
    if value.to_raw() != raw {
        log::trace!("[cdr] enum value {} out of range, using default", raw);
    }
    Ok(value)
}

pub fn write_enum<'b, E: CdrEnum, S: CdrStream<'b>>(stream: &mut S, value: E) -> Result<()> {
    let raw = value.to_raw();
    match stream.enum_width(E::BIT_BOUND) {
        1 => write_primitive(stream, raw as u8),
        2 => write_primitive(stream, raw as u16),
        _ => write_primitive(stream, raw),
    }
}

/// Move and max passes.
pub fn move_enum<'b, E: CdrEnum, S: CdrStream<'b>>(stream: &mut S) -> Result<()> {
    match stream.enum_width(E::BIT_BOUND) {
        1 => move_primitive::<u8, S>(stream, 1),
        2 => move_primitive::<u16, S>(stream, 1),
        _ => move_primitive::<u32, S>(stream, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{BasicCdrStream, StreamMode, Xcdr2Stream};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum Level {
        #[default]
        Low,
        High,
    }

    impl CdrEnum for Level {
        const BIT_BOUND: BitBound = BitBound::Bits8;

        fn to_raw(self) -> u32 {
            self as u32
        }

        fn from_raw(raw: u32) -> Self {
            match raw {
                1 => Level::High,
                _ => Level::Low,
            }
        }
    }

    #[test]
    fn test_width_per_format() {
        let mut basic = BasicCdrStream::default();
        basic.set_mode(StreamMode::Move, false);
        move_enum::<Level, _>(&mut basic).expect("move");
        assert_eq!(basic.position(), 4);

        let mut xcdr2 = Xcdr2Stream::default();
        xcdr2.set_mode(StreamMode::Move, false);
        move_enum::<Level, _>(&mut xcdr2).expect("move");
        assert_eq!(xcdr2.position(), 1);
    }

    #[test]
    fn test_unknown_value_reads_default() {
        let data = 9u32.to_ne_bytes();
        let mut s = BasicCdrStream::default();
        s.set_mode(StreamMode::Read, false);
        s.set_read_buffer(&data);
        assert_eq!(read_enum::<Level, _>(&mut s).expect("read"), Level::Low);
        assert_eq!(enum_conversion::<Level>(1), Level::High);
    }
}
