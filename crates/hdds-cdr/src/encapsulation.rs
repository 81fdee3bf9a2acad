// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serialized payload helpers: RTPS encapsulation header, two-pass
//! serialization into an owned buffer, and XTypes key hashes.
//!
//! Payload layout (DDS-RTPS v2.5 Sec.10.2, XTypes v1.3 Sec.7.6.3.1.2):
//!
//! ```text
//! u16 representation id (big-endian) | u16 options | serialized data
//! ```
//!
//! Alignment of the serialized data is relative to its first byte, not to
//! the header. For XCDR2 the data is padded to a multiple of 4 bytes and the
//! two low bits of the options carry the padding length.

use md5::{Digest, Md5};

use crate::codec::{self, CdrValue};
use crate::error::{CdrError, Result};
use crate::props::{get_type_props, Extensibility};
use crate::stream::{
    BasicCdrStream, CdrStream, Encoding, Endianness, StreamConfig, Xcdr1Stream, Xcdr2Stream,
};

/// Encapsulation header length.
pub const HEADER_SIZE: usize = 4;

/// Representation identifier of a serialized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepresentationId(pub u16);

impl RepresentationId {
    /// CDR_BE (0x0000): classic CDR / XCDR1 final+appendable, big-endian
    pub const CDR_BE: Self = Self(0x0000);
    /// CDR_LE (0x0001)
    pub const CDR_LE: Self = Self(0x0001);
    /// PL_CDR_BE (0x0002): XCDR1 parameter list (mutable), big-endian
    pub const PL_CDR_BE: Self = Self(0x0002);
    /// PL_CDR_LE (0x0003)
    pub const PL_CDR_LE: Self = Self(0x0003);
    /// CDR2_BE (0x0006): XCDR2 final
    pub const CDR2_BE: Self = Self(0x0006);
    /// CDR2_LE (0x0007)
    pub const CDR2_LE: Self = Self(0x0007);
    /// D_CDR2_BE (0x0008): XCDR2 appendable (delimited)
    pub const D_CDR2_BE: Self = Self(0x0008);
    /// D_CDR2_LE (0x0009)
    pub const D_CDR2_LE: Self = Self(0x0009);
    /// PL_CDR2_BE (0x000a): XCDR2 mutable
    pub const PL_CDR2_BE: Self = Self(0x000a);
    /// PL_CDR2_LE (0x000b)
    pub const PL_CDR2_LE: Self = Self(0x000b);

    /// Identifier for data of a type with extensibility `ext`.
    pub fn select(encoding: Encoding, endianness: Endianness, ext: Extensibility) -> Self {
        let big = match (encoding, ext) {
            (Encoding::Basic, _) => Self::CDR_BE,
            (Encoding::Xcdr1, Extensibility::Mutable) => Self::PL_CDR_BE,
            (Encoding::Xcdr1, _) => Self::CDR_BE,
            (Encoding::Xcdr2, Extensibility::Final) => Self::CDR2_BE,
            (Encoding::Xcdr2, Extensibility::Appendable) => Self::D_CDR2_BE,
            (Encoding::Xcdr2, Extensibility::Mutable) => Self::PL_CDR2_BE,
        };
        match endianness {
            Endianness::Big => big,
            Endianness::Little => Self(big.0 | 1),
        }
    }

    /// Stream format and byte order of the data. Plain CDR payloads are read
    /// with the XCDR1 stream, which accepts every final/appendable layout.
    pub fn decode(self) -> Result<(Encoding, Endianness)> {
        let encoding = match self.0 & !1 {
            0x0000 | 0x0002 => Encoding::Xcdr1,
            0x0006 | 0x0008 | 0x000a => Encoding::Xcdr2,
            _ => return Err(CdrError::InvalidEncapsulation(self.0)),
        };
        let endianness = if self.0 & 1 == 1 {
            Endianness::Little
        } else {
            Endianness::Big
        };
        Ok((encoding, endianness))
    }
}

/// Parsed 4-byte encapsulation header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncapsulationHeader {
    pub id: RepresentationId,
    pub options: u16,
}

impl EncapsulationHeader {
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let id = self.id.0.to_be_bytes();
        let options = self.options.to_be_bytes();
        [id[0], id[1], options[0], options[1]]
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        match data {
            [a, b, c, d, ..] => Ok(Self {
                id: RepresentationId(u16::from_be_bytes([*a, *b])),
                options: u16::from_be_bytes([*c, *d]),
            }),
            _ => Err(CdrError::Truncated),
        }
    }

    /// Padding bytes appended after the data.
    pub fn padding(self) -> usize {
        usize::from(self.options & 0x3)
    }
}

fn serialize_into<'b, T, S>(value: &T, config: StreamConfig, out: &'b mut Vec<u8>) -> Result<()>
where
    T: CdrValue + 'static,
    S: CdrStream<'b>,
{
    let mut sizer = S::with_config(config);
    let size = codec::serialized_size(value, false, &mut sizer)?;
    let padding = if S::ENCODING == Encoding::Xcdr2 {
        (4 - size % 4) % 4
    } else {
        0
    };
    let header = EncapsulationHeader {
        id: RepresentationId::select(
            S::ENCODING,
            config.endianness,
            get_type_props::<T>().e_ext,
        ),
        options: padding as u16,
    };

    out.clear();
    out.resize(HEADER_SIZE + size + padding, 0);
    out[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    let mut writer = S::with_config(config);
    writer.set_write_buffer(&mut out[HEADER_SIZE..HEADER_SIZE + size]);
    codec::write(&mut writer, value, false)
}

/// Serialize `value` with an encapsulation header.
pub fn serialize<T: CdrValue + 'static>(
    value: &T,
    encoding: Encoding,
    endianness: Endianness,
) -> Result<Vec<u8>> {
    let config = StreamConfig::new().endianness(endianness);
    let mut out = Vec::new();
    match encoding {
        Encoding::Basic => serialize_into::<T, BasicCdrStream>(value, config, &mut out)?,
        Encoding::Xcdr1 => serialize_into::<T, Xcdr1Stream>(value, config, &mut out)?,
        Encoding::Xcdr2 => serialize_into::<T, Xcdr2Stream>(value, config, &mut out)?,
    }
    log::trace!(
        "[cdr] serialized {} ({} bytes, {:?})",
        std::any::type_name::<T>(),
        out.len(),
        encoding
    );
    Ok(out)
}

/// Deserialize an encapsulated payload.
pub fn deserialize<T: CdrValue + Default + 'static>(data: &[u8]) -> Result<T> {
    deserialize_with(data, StreamConfig::default())
}

/// Deserialize with a custom ignore mask (the byte order comes from the header).
pub fn deserialize_with<T: CdrValue + Default + 'static>(
    data: &[u8],
    config: StreamConfig,
) -> Result<T> {
    let header = EncapsulationHeader::parse(data)?;
    let (encoding, endianness) = header.id.decode()?;
    let body = &data[HEADER_SIZE..];
    let body = &body[..body.len().saturating_sub(header.padding())];
    let config = config.endianness(endianness);

    let mut value = T::default();
    match encoding {
        Encoding::Basic | Encoding::Xcdr1 => {
            let mut reader = Xcdr1Stream::new(config);
            reader.set_read_buffer(body);
            codec::read(&mut reader, &mut value, false)?;
        }
        Encoding::Xcdr2 => {
            let mut reader = Xcdr2Stream::new(config);
            reader.set_read_buffer(body);
            codec::read(&mut reader, &mut value, false)?;
        }
    }
    Ok(value)
}

/// XTypes key hash: the key members serialized as big-endian XCDR2, zero
/// padded to 16 bytes when the key can never exceed 16 bytes, MD5 digest
/// otherwise.
pub fn key_hash<T: CdrValue + 'static>(value: &T) -> Result<[u8; 16]> {
    let config = StreamConfig::new().endianness(Endianness::Big);

    let mut sizer = Xcdr2Stream::new(config);
    codec::max::<T, _>(&mut sizer, true)?;
    let max_size = sizer.position();

    codec::move_(&mut sizer, value, true)?;
    let size = sizer.position();

    let mut key = vec![0u8; size.max(16)];
    {
        let mut writer = Xcdr2Stream::new(config);
        writer.set_write_buffer(&mut key[..size]);
        codec::write(&mut writer, value, true)?;
    }

    let mut hash = [0u8; 16];
    if max_size <= 16 {
        hash.copy_from_slice(&key[..16]);
    } else {
        hash.copy_from_slice(&Md5::digest(&key[..size]));
    }
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_ids() {
        assert_eq!(
            RepresentationId::select(Encoding::Xcdr1, Endianness::Little, Extensibility::Mutable),
            RepresentationId::PL_CDR_LE
        );
        assert_eq!(
            RepresentationId::select(Encoding::Xcdr2, Endianness::Big, Extensibility::Appendable),
            RepresentationId::D_CDR2_BE
        );
        assert_eq!(
            RepresentationId::select(Encoding::Basic, Endianness::Little, Extensibility::Final),
            RepresentationId::CDR_LE
        );
    }

    #[test]
    fn test_decode_rejects_unknown_ids() {
        assert_eq!(
            RepresentationId::PL_CDR2_LE.decode().expect("known"),
            (Encoding::Xcdr2, Endianness::Little)
        );
        assert_eq!(
            RepresentationId(0x0102).decode(),
            Err(CdrError::InvalidEncapsulation(0x0102))
        );
    }

    #[test]
    fn test_header_bytes() {
        let header = EncapsulationHeader {
            id: RepresentationId::CDR2_LE,
            options: 3,
        };
        assert_eq!(header.to_bytes(), [0x00, 0x07, 0x00, 0x03]);
        assert_eq!(EncapsulationHeader::parse(&header.to_bytes()), Ok(header));
        assert_eq!(header.padding(), 3);
        assert_eq!(EncapsulationHeader::parse(&[0, 1]), Err(CdrError::Truncated));
    }

    #[test]
    fn test_serialize_pads_xcdr2() {
        let out = serialize(&7u8, Encoding::Xcdr2, Endianness::Little).expect("serialize");
        assert_eq!(out, vec![0x00, 0x07, 0x00, 0x03, 7, 0, 0, 0]);
        assert_eq!(deserialize::<u8>(&out), Ok(7));
    }

    #[test]
    fn test_key_hash_of_small_key_is_padded() {
        let hash = key_hash(&0x0102_0304u32).expect("hash");
        // A bare u32 has no key members, so nothing is hashed.
        assert_eq!(hash, [0u8; 16]);
    }
}
