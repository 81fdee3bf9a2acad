// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unreadable_literal)] // Wire fixtures
#![allow(clippy::float_cmp)] // Exact round-trips

//! Byte-exact reference encodings.
//!
//! The sample struct `{ long l; @key char c; string str; double d; }` with
//! `l = 123456`, `c = 'g'`, `str = "abcdef"`, `d = 654.321` in every format.

mod common;

use common::{appendable_sample, decode, encode, encode_key, sample, AppendableSample, Sample};
use hdds_cdr::{Encoding, Endianness};

const SAMPLE_BASIC_BE: [u8; 32] = [
    0x00, 0x01, 0xE2, 0x40, // l
    0x67, 0x00, 0x00, 0x00, // c + padding
    0x00, 0x00, 0x00, 0x07, // string length
    0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x00, // "abcdef\0"
    0x00, 0x00, 0x00, 0x00, 0x00, // padding to 8
    0x40, 0x84, 0x72, 0x91, 0x68, 0x72, 0xB0, 0x21, // d
];

const SAMPLE_BASIC_LE: [u8; 32] = [
    0x40, 0xE2, 0x01, 0x00, //
    0x67, 0x00, 0x00, 0x00, //
    0x07, 0x00, 0x00, 0x00, //
    0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, //
    0x21, 0xB0, 0x72, 0x68, 0x91, 0x72, 0x84, 0x40,
];

/// XCDR2 caps alignment at 4: the double lands at offset 20.
const SAMPLE_XCDR2_BE: [u8; 28] = [
    0x00, 0x01, 0xE2, 0x40, //
    0x67, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x07, //
    0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x00, //
    0x00, // padding to 4
    0x40, 0x84, 0x72, 0x91, 0x68, 0x72, 0xB0, 0x21,
];

#[test]
fn test_basic_big_endian_fixture() {
    let bytes = encode(&sample(), Encoding::Basic, Endianness::Big);
    assert_eq!(bytes, SAMPLE_BASIC_BE);
    assert_eq!(
        decode::<Sample>(&SAMPLE_BASIC_BE, Encoding::Basic, Endianness::Big),
        sample()
    );
}

#[test]
fn test_basic_little_endian_fixture() {
    let bytes = encode(&sample(), Encoding::Basic, Endianness::Little);
    assert_eq!(bytes, SAMPLE_BASIC_LE);
    assert_eq!(
        decode::<Sample>(&SAMPLE_BASIC_LE, Encoding::Basic, Endianness::Little),
        sample()
    );
}

#[test]
fn test_xcdr1_final_matches_basic() {
    let bytes = encode(&sample(), Encoding::Xcdr1, Endianness::Big);
    assert_eq!(bytes, SAMPLE_BASIC_BE);
    assert_eq!(
        decode::<Sample>(&bytes, Encoding::Xcdr1, Endianness::Big),
        sample()
    );
}

#[test]
fn test_xcdr2_final_fixture() {
    let bytes = encode(&sample(), Encoding::Xcdr2, Endianness::Big);
    assert_eq!(bytes, SAMPLE_XCDR2_BE);
    assert_eq!(
        decode::<Sample>(&bytes, Encoding::Xcdr2, Endianness::Big),
        sample()
    );
}

#[test]
fn test_xcdr2_appendable_has_dheader() {
    let bytes = encode(&appendable_sample(), Encoding::Xcdr2, Endianness::Big);
    assert_eq!(&bytes[..4], &[0x00, 0x00, 0x00, 0x1C]);
    assert_eq!(&bytes[4..], &SAMPLE_XCDR2_BE);
    assert_eq!(
        decode::<AppendableSample>(&bytes, Encoding::Xcdr2, Endianness::Big),
        appendable_sample()
    );
}

#[test]
fn test_xcdr1_appendable_is_positional() {
    let bytes = encode(&appendable_sample(), Encoding::Xcdr1, Endianness::Big);
    assert_eq!(bytes, SAMPLE_BASIC_BE);
}

#[test]
fn test_key_projection_is_the_key_member_only() {
    for encoding in common::ENCODINGS {
        for endianness in common::ENDIANNESSES {
            assert_eq!(encode_key(&sample(), encoding, endianness), vec![0x67]);
        }
    }
    // No DHEADER in key mode.
    assert_eq!(
        encode_key(&appendable_sample(), Encoding::Xcdr2, Endianness::Big),
        vec![0x67]
    );
}

#[test]
fn test_key_read_fills_only_keys() {
    let (value, consumed) = common::try_decode::<Sample>(
        &[0x67],
        Encoding::Xcdr2,
        common::config(Endianness::Big),
        true,
    )
    .expect("key read");
    assert_eq!(consumed, 1);
    assert_eq!(
        value,
        Sample {
            c: b'g',
            ..Sample::default()
        }
    );
}

#[test]
fn test_encapsulated_payload() {
    let payload =
        hdds_cdr::serialize(&appendable_sample(), Encoding::Xcdr2, Endianness::Little)
            .expect("serialize");
    // D_CDR2_LE, 32 byte body needs no padding.
    assert_eq!(&payload[..4], &[0x00, 0x09, 0x00, 0x00]);
    assert_eq!(payload.len(), 4 + 32);
    assert_eq!(
        hdds_cdr::deserialize::<AppendableSample>(&payload).expect("deserialize"),
        appendable_sample()
    );

    let payload = hdds_cdr::serialize(&sample(), Encoding::Basic, Endianness::Big)
        .expect("serialize");
    assert_eq!(&payload[..4], &[0x00, 0x00, 0x00, 0x00]);
    assert_eq!(&payload[4..], &SAMPLE_BASIC_BE);
    assert_eq!(
        hdds_cdr::deserialize::<Sample>(&payload).expect("deserialize"),
        sample()
    );
}

#[test]
fn test_key_hash_of_short_key_is_zero_padded() {
    let hash = hdds_cdr::key_hash(&sample()).expect("key hash");
    let mut expected = [0u8; 16];
    expected[0] = 0x67;
    assert_eq!(hash, expected);
}
