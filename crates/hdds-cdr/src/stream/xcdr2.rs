// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XCDR version 2 (XTypes v1.3 Sec.7.4.3).
//!
//! - Alignment is capped at 4 bytes.
//! - Appendable and mutable structs start with a DHEADER (u32 byte length of
//!   the body). Collections of non-primitive elements do as well.
//! - Members of mutable structs are preceded by an EMHEADER:
//!
//! ```text
//! bit 31      : must-understand
//! bits 30..28 : length code (LC)
//! bits 27..0  : member id
//! ```
//!
//! LC 0..3 imply a payload of 1/2/4/8 bytes, LC 4 is followed by a NEXTINT
//! length, LC 5..7 reuse the first u32 of the payload as a count scaled by
//! 1/4/8 (plus the u32 itself).
//! - Optional members of non-mutable structs carry a one-byte presence flag.

use super::stack::{Frame, MemberHeader};
use super::{impl_core_deref, CdrStream, Encoding, StreamConfig, StreamCore, StreamMode};
use crate::error::{Fault, Result};
use crate::props::{BitBound, EntityProperties, Extensibility};

pub(crate) const EMHEADER_FLAG_MU: u32 = 0x8000_0000;
pub(crate) const EMHEADER_LC_SHIFT: u32 = 28;
pub(crate) const EMHEADER_LC_MASK: u32 = 0x7;
pub(crate) const EMHEADER_ID_MASK: u32 = 0x0FFF_FFFF;

/// EMHEADER length code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum LengthCode {
    Lc1Byte = 0,
    Lc2Bytes = 1,
    Lc4Bytes = 2,
    Lc8Bytes = 3,
    LcNextInt = 4,
    LcNextIntTimes1 = 5,
    LcNextIntTimes4 = 6,
    LcNextIntTimes8 = 7,
}

impl LengthCode {
    fn from_u32(value: u32) -> Self {
        match value & EMHEADER_LC_MASK {
            0 => LengthCode::Lc1Byte,
            1 => LengthCode::Lc2Bytes,
            2 => LengthCode::Lc4Bytes,
            3 => LengthCode::Lc8Bytes,
            4 => LengthCode::LcNextInt,
            5 => LengthCode::LcNextIntTimes1,
            6 => LengthCode::LcNextIntTimes4,
            _ => LengthCode::LcNextIntTimes8,
        }
    }

    /// Implied-length code for a fixed-size primitive payload.
    fn for_primitive(bit_bound: BitBound) -> Option<Self> {
        match bit_bound {
            BitBound::Bits8 => Some(LengthCode::Lc1Byte),
            BitBound::Bits16 => Some(LengthCode::Lc2Bytes),
            BitBound::Bits32 => Some(LengthCode::Lc4Bytes),
            BitBound::Bits64 => Some(LengthCode::Lc8Bytes),
            BitBound::Unset => None,
        }
    }
}

/// XCDR2 stream.
#[derive(Debug)]
pub struct Xcdr2Stream<'b> {
    core: StreamCore<'b>,
}

impl_core_deref!(Xcdr2Stream);

impl Xcdr2Stream<'_> {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            core: StreamCore::new(4, config),
        }
    }

    /// Emit a DHEADER placeholder, or consume one and bound the frame.
    fn open_delimited(&mut self, frame: &mut Frame) -> Result<()> {
        self.align(4, true)?;
        if self.mode() == StreamMode::Read {
            let len = self.get::<u32>()? as usize;
            let body = self.position();
            self.require(len)?;
            frame.body_start = body;
            frame.end = body + len;
        } else {
            frame.dheader_at = Some(self.position());
            self.put(0u32)?;
            frame.body_start = self.position();
        }
        Ok(())
    }

    /// Jump to the end of a delimited body, or patch its DHEADER.
    fn close_delimited(&mut self, frame: &Frame) -> Result<()> {
        if self.mode() == StreamMode::Read {
            if frame.is_delimited() {
                if self.position() > frame.end {
                    log::debug!(
                        "[xcdr2] read past delimited body ({} > {})",
                        self.position(),
                        frame.end
                    );
                    self.raise(Fault::ILLEGAL_FIELD_VALUE)?;
                }
                self.set_position(frame.end);
                self.set_alignment(1);
            }
            return Ok(());
        }
        if let Some(at) = frame.dheader_at {
            let end = self.position();
            if end != usize::MAX {
                let len = end.saturating_sub(frame.body_start);
                self.patch(at, len as u32)?;
            }
        }
        Ok(())
    }

    fn write_emheader(&mut self, prop: &EntityProperties) -> Result<()> {
        self.align(4, true)?;
        let header_at = self.position();
        let mu = if prop.must_understand { EMHEADER_FLAG_MU } else { 0 };
        let id = prop.member_id & EMHEADER_ID_MASK;
        let implied = if prop.is_primitive {
            LengthCode::for_primitive(prop.bit_bound)
        } else {
            None
        };
        let header = match implied {
            Some(lc) => {
                self.put(mu | ((lc as u32) << EMHEADER_LC_SHIFT) | id)?;
                MemberHeader::Implied
            }
            None => {
                let lc = LengthCode::LcNextInt as u32;
                self.put(mu | (lc << EMHEADER_LC_SHIFT) | id)?;
                self.put(0u32)?;
                MemberHeader::NextInt
            }
        };
        let member_start = self.position();
        if let Some(frame) = self.frame_mut() {
            frame.header = header;
            frame.header_at = header_at;
            frame.member_start = member_start;
        }
        Ok(())
    }

    /// Consume one EMHEADER. Returns `(member_id, payload_len, must_understand)`.
    fn read_emheader(&mut self) -> Result<(u32, usize, bool)> {
        self.align(4, false)?;
        let header: u32 = self.get()?;
        let mu = header & EMHEADER_FLAG_MU != 0;
        let id = header & EMHEADER_ID_MASK;
        let len = match LengthCode::from_u32(header >> EMHEADER_LC_SHIFT) {
            LengthCode::Lc1Byte => 1,
            LengthCode::Lc2Bytes => 2,
            LengthCode::Lc4Bytes => 4,
            LengthCode::Lc8Bytes => 8,
            LengthCode::LcNextInt => self.get::<u32>()? as usize,
            // NEXTINT belongs to the payload: peek, do not consume.
            lc => {
                let count = self.peek::<u32>()? as usize;
                let scale = match lc {
                    LengthCode::LcNextIntTimes1 => 1,
                    LengthCode::LcNextIntTimes4 => 4,
                    _ => 8,
                };
                match count.checked_mul(scale).and_then(|n| n.checked_add(4)) {
                    Some(len) => len,
                    None => {
                        self.raise(Fault::ILLEGAL_FIELD_VALUE)?;
                        0
                    }
                }
            }
        };
        Ok((id, len, mu))
    }

    /// Next member of a mutable body that the local type knows, skipping
    /// unknown ones. Returns the terminator at the end of the body.
    fn next_emheader<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        loop {
            let end = self.frame().end;
            if self.position() >= end {
                return Ok(props.terminator(false));
            }
            let (id, len, mu) = self.read_emheader()?;
            let start = self.position();
            let member_end = match start.checked_add(len) {
                Some(member_end) if member_end <= end => member_end,
                _ => {
                    log::debug!("[xcdr2] member {} overruns enclosing body", id);
                    self.raise(Fault::ILLEGAL_FIELD_VALUE)?;
                    return Ok(props.terminator(false));
                }
            };
            if let Some(frame) = self.frame_mut() {
                frame.member_start = start;
                frame.member_end = member_end;
            }
            if let Some(member) = props.find_member(id) {
                self.visit(member.member_id);
                return Ok(member);
            }
            if mu {
                log::debug!("[xcdr2] unknown must-understand member {}", id);
                self.raise(Fault::MUST_UNDERSTAND_FAIL)?;
            }
            log::trace!("[xcdr2] skipping unknown member {} ({} bytes)", id, len);
            self.set_position(member_end);
        }
    }

    fn reading_mutable(&self, props: &EntityProperties) -> bool {
        self.mode() == StreamMode::Read
            && !self.is_key()
            && props.e_ext == Extensibility::Mutable
    }
}

impl Default for Xcdr2Stream<'_> {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl<'b> CdrStream<'b> for Xcdr2Stream<'b> {
    const ENCODING: Encoding = Encoding::Xcdr2;

    fn with_config(config: StreamConfig) -> Self {
        Self::new(config)
    }

    fn enum_width(&self, bit_bound: BitBound) -> usize {
        match bit_bound.bytes() {
            0 => 4,
            n => n,
        }
    }

    fn start_struct(&mut self, props: &EntityProperties) -> Result<()> {
        self.ensure_usable()?;
        let mut frame = Frame::at(self.position());
        let delimited = !self.is_key() && props.e_ext != Extensibility::Final;
        if delimited {
            self.open_delimited(&mut frame)?;
        }
        self.push_frame(frame, delimited)
    }

    fn finish_struct(&mut self, props: &EntityProperties) -> Result<()> {
        self.ensure_usable()?;
        if self.mode() == StreamMode::Read {
            self.check_must_understand(props)?;
        }
        let frame = self.pop_frame();
        self.close_delimited(&frame)
    }

    fn start_member(&mut self, prop: &EntityProperties, present: bool) -> Result<bool> {
        self.ensure_usable()?;
        if let Some(frame) = self.frame_mut() {
            frame.header = MemberHeader::None;
        }
        if self.is_key() {
            return Ok(self.mode() == StreamMode::Read || present);
        }
        let framed = prop.p_ext == Extensibility::Mutable;
        match self.mode() {
            // EMHEADER was consumed while locating the member.
            StreamMode::Read if framed => Ok(true),
            StreamMode::Read if prop.is_optional => {
                let flag: u8 = self.get()?;
                if flag > 1 {
                    self.raise(Fault::ILLEGAL_FIELD_VALUE)?;
                }
                Ok(flag != 0)
            }
            StreamMode::Read => Ok(true),
            _ if framed && !present => Ok(false),
            _ if framed => {
                self.write_emheader(prop)?;
                Ok(true)
            }
            _ if prop.is_optional => {
                self.put(u8::from(present))?;
                Ok(present)
            }
            _ => Ok(present),
        }
    }

    fn finish_member(&mut self, prop: &EntityProperties, _present: bool) -> Result<()> {
        self.ensure_usable()?;
        if self.is_key() {
            return Ok(());
        }
        let frame = self.frame();
        if self.mode() == StreamMode::Read {
            if prop.p_ext == Extensibility::Mutable {
                if self.position() > frame.member_end {
                    log::debug!(
                        "[xcdr2] member {} read past its length ({} > {})",
                        prop.member_id,
                        self.position(),
                        frame.member_end
                    );
                    self.raise(Fault::ILLEGAL_FIELD_VALUE)?;
                }
                self.set_position(frame.member_end);
                self.set_alignment(1);
            }
            return Ok(());
        }
        if frame.header == MemberHeader::NextInt {
            let end = self.position();
            if end != usize::MAX {
                let len = end.saturating_sub(frame.member_start);
                self.patch(frame.header_at + 4, len as u32)?;
            }
        }
        if let Some(frame) = self.frame_mut() {
            frame.header = MemberHeader::None;
        }
        Ok(())
    }

    fn start_consecutive(&mut self, primitive: bool) -> Result<()> {
        self.ensure_usable()?;
        let mut frame = Frame::at(self.position());
        if !primitive && !self.is_key() {
            self.open_delimited(&mut frame)?;
        }
        self.push_frame(frame, false)
    }

    fn finish_consecutive(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let frame = self.pop_frame();
        self.close_delimited(&frame)
    }

    fn first_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        if self.reading_mutable(props) {
            return self.next_emheader(props);
        }
        Ok(self.positional_first(props))
    }

    fn next_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        if self.reading_mutable(props) {
            return self.next_emheader(props);
        }
        Ok(self.positional_next(props))
    }

    fn previous_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        if self.reading_mutable(props) {
            return Ok(props.terminator(false));
        }
        Ok(self.positional_previous(props))
    }
}
