// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS CDR - streaming serialization core
//!
//! Streaming encoder/decoder for the OMG Common Data Representation in its
//! three flavours: classic CDR, XCDR version 1 and XCDR version 2 (DDS-XTypes
//! v1.3 Sec.7.4). One generic code path per type drives all formats; the
//! stream supplies the framing.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_cdr::{codec, CdrStream, CdrType, StreamConfig, Xcdr2Stream};
//!
//! #[derive(CdrType, Debug, Default, PartialEq)]
//! #[cdr(extensibility = "appendable")]
//! struct Reading {
//!     #[cdr(key)]
//!     sensor: u32,
//!     value: f64,
//!     #[cdr(bound = 16)]
//!     unit: String,
//! }
//!
//! let sample = Reading { sensor: 7, value: 21.5, unit: "C".into() };
//!
//! // Pass 1: size. Pass 2: write.
//! let mut stream = Xcdr2Stream::new(StreamConfig::default());
//! codec::move_(&mut stream, &sample, false).unwrap();
//! let mut buf = vec![0u8; stream.position()];
//! let mut stream = Xcdr2Stream::new(StreamConfig::default());
//! stream.set_write_buffer(&mut buf);
//! codec::write(&mut stream, &sample, false).unwrap();
//! drop(stream);
//!
//! let mut stream = Xcdr2Stream::new(StreamConfig::default());
//! stream.set_read_buffer(&buf);
//! let mut decoded = Reading::default();
//! codec::read(&mut stream, &mut decoded, false).unwrap();
//! assert_eq!(decoded, sample);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |  #[derive(CdrType)] / #[derive(CdrEnum)]   (per-type glue)   |
//! +--------------------------------------------------------------+
//! |  codec: read / write / move / max per value shape            |
//! +--------------------------------------------------------------+
//! |  stream: BasicCdrStream | Xcdr1Stream | Xcdr2Stream          |
//! |          cursor, alignment, faults, frames, member framing   |
//! +--------------------------------------------------------------+
//! |  props: EntityProperties tree, cached per type               |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`stream`] - stream state machines and format framing
//! - [`props`] - per-type wire layout metadata
//! - [`codec`] - generic per-shape codec functions
//! - [`encapsulation`] - encapsulated payloads and key hashes
//! - [`error`] - fault mask and error type

// Allow the derive macros to refer to `::hdds_cdr` inside this crate.
extern crate self as hdds_cdr;

/// Generic read/write/move/max codec functions.
pub mod codec;
/// Encapsulation header, owned-buffer serialization and key hashes.
pub mod encapsulation;
/// Fault mask and error types.
pub mod error;
/// Entity properties tree and per-type cache.
pub mod props;
/// Stream state machines (basic CDR, XCDR1, XCDR2).
pub mod stream;

pub use codec::aggregate::{
    max_aggregate, move_aggregate, read_aggregate, write_aggregate, CdrAggregate,
};
pub use codec::enums::{enum_conversion, read_enum, write_enum, move_enum, CdrEnum};
pub use codec::optional::External;
pub use codec::CdrValue;
pub use encapsulation::{deserialize, key_hash, serialize};
pub use error::{CdrError, Fault, Result};
pub use props::{
    get_type_props, member_props, AggregateKind, BitBound, EntityProperties, Extensibility,
};
pub use stream::{
    BasicCdrStream, CdrStream, Encoding, Endianness, StreamConfig, StreamCore, StreamMode,
    Xcdr1Stream, Xcdr2Stream,
};

/// Derive CDR streaming glue for a struct (`CdrAggregate` + `CdrValue`).
pub use hdds_cdr_codegen::CdrType;
/// Derive `CdrEnum` + `CdrValue` for a fieldless enum.
pub use hdds_cdr_codegen::CdrEnum;
