// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared helpers for the integration tests: two-pass encode, decode, and
//! the reference types used across files.

#![allow(dead_code)]

use hdds_cdr::{
    codec, BasicCdrStream, CdrStream, CdrType, CdrValue, Encoding, Endianness, Result,
    StreamConfig, Xcdr1Stream, Xcdr2Stream,
};

pub const ENCODINGS: [Encoding; 3] = [Encoding::Basic, Encoding::Xcdr1, Encoding::Xcdr2];
pub const XTYPES_ENCODINGS: [Encoding; 2] = [Encoding::Xcdr1, Encoding::Xcdr2];
pub const ENDIANNESSES: [Endianness; 2] = [Endianness::Big, Endianness::Little];

fn encode_in<'b, T, S>(
    value: &T,
    config: StreamConfig,
    key: bool,
    out: &'b mut Vec<u8>,
) -> Result<()>
where
    T: CdrValue + 'static,
    S: CdrStream<'b>,
{
    let mut sizer = S::with_config(config);
    let size = codec::serialized_size(value, key, &mut sizer)?;
    out.clear();
    out.resize(size, 0);

    let mut writer = S::with_config(config);
    writer.set_write_buffer(&mut out[..]);
    codec::write(&mut writer, value, key)?;
    assert_eq!(writer.position(), size, "move and write disagree on the size");
    Ok(())
}

fn decode_in<'b, T, S>(data: &'b [u8], config: StreamConfig, key: bool) -> Result<(T, usize)>
where
    T: CdrValue + Default + 'static,
    S: CdrStream<'b>,
{
    let mut reader = S::with_config(config);
    reader.set_read_buffer(data);
    let mut value = T::default();
    codec::read(&mut reader, &mut value, key)?;
    Ok((value, reader.position()))
}

/// Move pass then write pass; asserts both agree on the size.
pub fn try_encode<T: CdrValue + 'static>(
    value: &T,
    encoding: Encoding,
    config: StreamConfig,
    key: bool,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match encoding {
        Encoding::Basic => encode_in::<T, BasicCdrStream<'_>>(value, config, key, &mut out)?,
        Encoding::Xcdr1 => encode_in::<T, Xcdr1Stream<'_>>(value, config, key, &mut out)?,
        Encoding::Xcdr2 => encode_in::<T, Xcdr2Stream<'_>>(value, config, key, &mut out)?,
    }
    Ok(out)
}

/// Decoded value and the number of bytes consumed.
pub fn try_decode<T: CdrValue + Default + 'static>(
    data: &[u8],
    encoding: Encoding,
    config: StreamConfig,
    key: bool,
) -> Result<(T, usize)> {
    match encoding {
        Encoding::Basic => decode_in::<T, BasicCdrStream<'_>>(data, config, key),
        Encoding::Xcdr1 => decode_in::<T, Xcdr1Stream<'_>>(data, config, key),
        Encoding::Xcdr2 => decode_in::<T, Xcdr2Stream<'_>>(data, config, key),
    }
}

pub fn config(endianness: Endianness) -> StreamConfig {
    StreamConfig::new().endianness(endianness)
}

pub fn encode<T: CdrValue + 'static>(
    value: &T,
    encoding: Encoding,
    endianness: Endianness,
) -> Vec<u8> {
    try_encode(value, encoding, config(endianness), false).expect("encode")
}

pub fn encode_key<T: CdrValue + 'static>(
    value: &T,
    encoding: Encoding,
    endianness: Endianness,
) -> Vec<u8> {
    try_encode(value, encoding, config(endianness), true).expect("encode key")
}

pub fn decode<T: CdrValue + Default + 'static>(
    data: &[u8],
    encoding: Encoding,
    endianness: Endianness,
) -> T {
    let (value, consumed) = try_decode(data, encoding, config(endianness), false).expect("decode");
    assert_eq!(consumed, data.len(), "decoder left bytes behind");
    value
}

/// Final struct of the reference fixtures: `{ long l; @key char c; string str; double d; }`.
#[derive(CdrType, Debug, Default, Clone, PartialEq)]
pub struct Sample {
    pub l: i32,
    #[cdr(key)]
    pub c: u8,
    pub text: String,
    pub d: f64,
}

/// Same members, appendable.
#[derive(CdrType, Debug, Default, Clone, PartialEq)]
#[cdr(extensibility = "appendable")]
pub struct AppendableSample {
    pub l: i32,
    #[cdr(key)]
    pub c: u8,
    pub text: String,
    pub d: f64,
}

pub fn sample() -> Sample {
    Sample {
        l: 123_456,
        c: b'g',
        text: "abcdef".to_string(),
        d: 654.321,
    }
}

pub fn appendable_sample() -> AppendableSample {
    AppendableSample {
        l: 123_456,
        c: b'g',
        text: "abcdef".to_string(),
        d: 654.321,
    }
}
