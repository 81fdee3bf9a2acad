// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for the CDR readers
//!
//! Feeds arbitrary bytes to the Basic CDR, XCDR1 and XCDR2 readers in both
//! byte orders, full and key-only, and to the encapsulated decoder. None of
//! these operations should panic on any input.

#![no_main]

use hdds_cdr::{
    codec, BasicCdrStream, CdrStream, CdrType, CdrValue, Endianness, External, StreamConfig,
    Xcdr1Stream, Xcdr2Stream,
};
use libfuzzer_sys::fuzz_target;

#[derive(CdrType, Debug, Default)]
struct Leaf {
    #[cdr(key)]
    id: u16,
    flag: bool,
    wide: i64,
}

#[derive(CdrType, Debug, Default)]
#[cdr(extensibility = "appendable")]
struct Segment {
    #[cdr(bounds = [16])]
    name: String,
    points: Vec<f32>,
}

#[derive(CdrType, Debug, Default)]
struct Plain {
    #[cdr(key)]
    leaf: Leaf,
    text: String,
    values: Vec<u32>,
    fixed: [u8; 3],
}

#[derive(CdrType, Debug, Default)]
#[cdr(extensibility = "mutable")]
struct Evolving {
    #[cdr(key)]
    id: u32,
    leaf: Leaf,
    segments: Vec<Segment>,
    label: Option<String>,
    #[cdr(must_understand)]
    count: u8,
    blob: External<Vec<u8>>,
}

fn read_all<'b, T, S>(data: &'b [u8])
where
    T: CdrValue + Default + 'static,
    S: CdrStream<'b>,
{
    for endianness in [Endianness::Big, Endianness::Little] {
        for as_key in [false, true] {
            let mut stream = S::with_config(StreamConfig::strict().endianness(endianness));
            stream.set_read_buffer(data);
            let mut value = T::default();
            let _ = codec::read(&mut stream, &mut value, as_key);
        }
    }
}

fuzz_target!(|data: &[u8]| {
    // ----------------------------------------------------------------
    // 1. Basic CDR: final types only
    // ----------------------------------------------------------------
    read_all::<Plain, BasicCdrStream<'_>>(data);
    read_all::<Vec<String>, BasicCdrStream<'_>>(data);

    // ----------------------------------------------------------------
    // 2. XCDR1: parameter lists, extended headers, optional headers
    // ----------------------------------------------------------------
    read_all::<Plain, Xcdr1Stream<'_>>(data);
    read_all::<Evolving, Xcdr1Stream<'_>>(data);

    // ----------------------------------------------------------------
    // 3. XCDR2: DHEADERs, EMHEADERs, presence flags
    // ----------------------------------------------------------------
    read_all::<Plain, Xcdr2Stream<'_>>(data);
    read_all::<Evolving, Xcdr2Stream<'_>>(data);
    read_all::<Vec<Segment>, Xcdr2Stream<'_>>(data);

    // ----------------------------------------------------------------
    // 4. Encapsulated payloads: header parsing and format dispatch
    // ----------------------------------------------------------------
    let _ = hdds_cdr::deserialize::<Evolving>(data);
    let _ = hdds_cdr::deserialize::<Plain>(data);
});
