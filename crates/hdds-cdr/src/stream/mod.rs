// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR stream state machines.
//!
//! A stream is a cursor over a caller-owned byte view plus the traversal
//! hooks of one encoding format. The same codec functions drive all three
//! formats; each format decides what framing (DHEADER, parameter headers,
//! EMHEADER, presence flags) surrounds structs and members.
//!
//! | Format            | Max alignment | Appendable   | Mutable            |
//! |-------------------|---------------|--------------|--------------------|
//! | [`BasicCdrStream`] | 8            | positional   | unsupported        |
//! | [`Xcdr1Stream`]   | 8             | positional   | parameter list     |
//! | [`Xcdr2Stream`]   | 4             | DHEADER      | DHEADER + EMHEADER |

mod basic;
mod cursor;
pub(crate) mod stack;
mod xcdr1;
mod xcdr2;

pub use self::basic::BasicCdrStream;
pub use self::cursor::StreamCore;
pub use self::stack::MAX_DEPTH;
pub use self::xcdr1::Xcdr1Stream;
pub use self::xcdr2::Xcdr2Stream;

use std::ops::DerefMut;

use crate::error::{Fault, Result};
use crate::props::{BitBound, EntityProperties};

/// Byte order of multi-byte values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Self::native()
    }
}

/// Pass a traversal performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamMode {
    Read,
    #[default]
    Write,
    /// Size computation without a buffer.
    Move,
    /// Worst-case size computation without a buffer.
    Max,
}

/// Encoding format implemented by a stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Basic,
    Xcdr1,
    Xcdr2,
}

/// Stream construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub endianness: Endianness,
    /// Faults that are recorded but do not stop a pass.
    pub ignore_faults: Fault,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endianness: Endianness::native(),
            ignore_faults: Fault::READ_BOUND_EXCEEDED,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config that stops on every fault.
    pub fn strict() -> Self {
        Self {
            ignore_faults: Fault::empty(),
            ..Self::default()
        }
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn ignore_faults(mut self, ignore_faults: Fault) -> Self {
        self.ignore_faults = ignore_faults;
        self
    }
}

/// Traversal hooks of one encoding format.
///
/// The shared cursor state is reached through `Deref<Target = StreamCore>`.
/// Hook calls must nest: every `start_struct` is matched by a `finish_struct`,
/// every `start_member` by a `finish_member` and every `start_consecutive` by
/// a `finish_consecutive`, whatever the outcome of the nested codec calls.
pub trait CdrStream<'b>: DerefMut<Target = StreamCore<'b>> {
    const ENCODING: Encoding;

    fn with_config(config: StreamConfig) -> Self
    where
        Self: Sized;

    /// Wire width of an enum with the given bit bound.
    fn enum_width(&self, bit_bound: BitBound) -> usize {
        let _ = bit_bound;
        4
    }

    /// Open an aggregate: emits/consumes its DHEADER where the format has one.
    fn start_struct(&mut self, props: &EntityProperties) -> Result<()>;

    /// Close an aggregate: patches lengths, writes list terminators, checks
    /// must-understand members when reading.
    fn finish_struct(&mut self, props: &EntityProperties) -> Result<()>;

    /// Open a member. `present` tells a writer whether an optional member
    /// holds a value. Returns whether the payload follows: for readers, whether
    /// the member is present on the wire.
    fn start_member(&mut self, prop: &EntityProperties, present: bool) -> Result<bool>;

    fn finish_member(&mut self, prop: &EntityProperties, present: bool) -> Result<()>;

    /// Open a run of collection elements. `primitive` is true for elements of
    /// fixed-width primitive type.
    fn start_consecutive(&mut self, primitive: bool) -> Result<()> {
        let _ = primitive;
        self.ensure_usable()
    }

    fn finish_consecutive(&mut self) -> Result<()> {
        self.ensure_usable()
    }

    /// First member to process, or the terminator.
    fn first_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        Ok(self.positional_first(props))
    }

    fn next_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        Ok(self.positional_next(props))
    }

    fn previous_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        Ok(self.positional_previous(props))
    }
}

/// Implements `Deref`/`DerefMut` to the embedded `StreamCore`.
macro_rules! impl_core_deref {
    ($stream:ident) => {
        impl<'b> std::ops::Deref for $stream<'b> {
            type Target = $crate::stream::StreamCore<'b>;

            fn deref(&self) -> &Self::Target {
                &self.core
            }
        }

        impl<'b> std::ops::DerefMut for $stream<'b> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.core
            }
        }
    };
}
pub(crate) use impl_core_deref;
