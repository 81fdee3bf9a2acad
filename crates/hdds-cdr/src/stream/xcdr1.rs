// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XCDR version 1 (PLAIN_CDR / PL_CDR).
//!
//! Final and appendable structs are positional. Mutable structs are a
//! parameter list: every member is preceded by a 4-byte header
//! `u16 pid | u16 length`, and the list ends with `PID_LIST_END`. Members with
//! an id that does not fit the short form, or a payload above 65535 bytes,
//! use the `PID_EXTENDED` header carrying a 32-bit id and length.
//!
//! Optional members of non-mutable structs also carry a header; length 0
//! marks an absent value.

use super::stack::{Frame, MemberHeader};
use super::{impl_core_deref, CdrStream, Encoding, StreamConfig, StreamCore, StreamMode};
use crate::error::{Fault, Result};
use crate::props::{EntityProperties, Extensibility};

/// Must-understand flag of a parameter id.
pub(crate) const PID_FLAG_MU: u16 = 0x4000;
pub(crate) const PID_MASK: u16 = 0x3FFF;
pub(crate) const PID_EXTENDED: u16 = 0x3F01;
pub(crate) const PID_LIST_END: u16 = 0x3F02;
pub(crate) const PID_IGNORE: u16 = 0x3F03;
/// First id reserved for the protocol; short-form member ids stay below.
pub(crate) const PID_RESERVED: u16 = 0x3F00;

/// Must-understand flag inside the extended 32-bit member id.
const EXT_FLAG_MU: u32 = 0x4000_0000;
const EXT_ID_MASK: u32 = 0x0FFF_FFFF;
const EXTENDED_PAYLOAD: u16 = 8;
const SHORT_LEN_MAX: usize = u16::MAX as usize;

/// XCDR1 stream.
#[derive(Debug)]
pub struct Xcdr1Stream<'b> {
    core: StreamCore<'b>,
}

impl_core_deref!(Xcdr1Stream);

impl Xcdr1Stream<'_> {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            core: StreamCore::new(8, config),
        }
    }

    fn parameter_list(&self, ext: Extensibility) -> bool {
        !self.is_key() && ext == Extensibility::Mutable
    }

    fn write_header(&mut self, prop: &EntityProperties) -> Result<()> {
        self.align(4, true)?;
        let header_at = self.position();
        let header = if prop.member_id >= u32::from(PID_RESERVED) {
            let mu = if prop.must_understand { EXT_FLAG_MU } else { 0 };
            self.put(PID_EXTENDED | PID_FLAG_MU)?;
            self.put(EXTENDED_PAYLOAD)?;
            self.put((prop.member_id & EXT_ID_MASK) | mu)?;
            self.put(0u32)?;
            MemberHeader::Extended
        } else {
            let mu = if prop.must_understand { PID_FLAG_MU } else { 0 };
            self.put(prop.member_id as u16 | mu)?;
            self.put(0u16)?;
            MemberHeader::Short
        };
        let member_start = self.position();
        if let Some(frame) = self.frame_mut() {
            frame.header = header;
            frame.header_at = header_at;
            frame.member_start = member_start;
        }
        Ok(())
    }

    /// Patch the length of the member opened by `write_header`, promoting a
    /// short header to the extended form when the payload outgrew it.
    fn close_header(&mut self, prop: &EntityProperties) -> Result<()> {
        let frame = self.frame();
        let end = self.position();
        if end == usize::MAX {
            return Ok(());
        }
        let len = end.saturating_sub(frame.member_start);
        match frame.header {
            MemberHeader::Short if len > SHORT_LEN_MAX => {
                log::debug!(
                    "[xcdr1] member {} payload {} bytes, promoting to extended header",
                    prop.member_id,
                    len
                );
                let grow = usize::from(EXTENDED_PAYLOAD);
                self.shift_tail(frame.member_start, end, grow)?;
                let mu = if prop.must_understand { EXT_FLAG_MU } else { 0 };
                let at = frame.header_at;
                self.patch(at, PID_EXTENDED | PID_FLAG_MU)?;
                self.patch(at + 2, EXTENDED_PAYLOAD)?;
                self.patch(at + 4, (prop.member_id & EXT_ID_MASK) | mu)?;
                self.patch(at + 8, len as u32)?;
            }
            MemberHeader::Short => self.patch(frame.header_at + 2, len as u16)?,
            MemberHeader::Extended => self.patch(frame.header_at + 8, len as u32)?,
            _ => {}
        }
        if let Some(frame) = self.frame_mut() {
            frame.header = MemberHeader::None;
        }
        Ok(())
    }

    /// Consume one parameter header. Returns `(member_id, length, must_understand)`,
    /// or `None` on `PID_LIST_END`. `PID_IGNORE` entries are skipped.
    fn read_header(&mut self) -> Result<Option<(u32, usize, bool)>> {
        loop {
            self.align(4, false)?;
            let raw: u16 = self.get()?;
            let slen = usize::from(self.get::<u16>()?);
            let mu = raw & PID_FLAG_MU != 0;
            match raw & PID_MASK {
                PID_LIST_END => return Ok(None),
                PID_IGNORE => self.skip(slen)?,
                PID_EXTENDED => {
                    if slen < usize::from(EXTENDED_PAYLOAD) {
                        self.raise(Fault::INVALID_PL_ENTRY)?;
                        self.skip(slen)?;
                        continue;
                    }
                    let id: u32 = self.get()?;
                    let len: u32 = self.get()?;
                    self.skip(slen - usize::from(EXTENDED_PAYLOAD))?;
                    return Ok(Some((
                        id & EXT_ID_MASK,
                        len as usize,
                        mu || id & EXT_FLAG_MU != 0,
                    )));
                }
                pid if pid >= PID_RESERVED => {
                    log::debug!("[xcdr1] reserved parameter id {:#06x}", pid);
                    self.raise(Fault::INVALID_PL_ENTRY)?;
                    self.skip(slen)?;
                }
                pid => return Ok(Some((u32::from(pid), slen, mu))),
            }
        }
    }

    fn open_payload(&mut self, len: usize) -> Result<()> {
        self.require(len)?;
        let start = self.position();
        if let Some(frame) = self.frame_mut() {
            frame.member_start = start;
            frame.member_end = start + len;
        }
        Ok(())
    }

    /// Next member of a parameter list that the local type knows, skipping
    /// unknown ones. Returns the terminator on `PID_LIST_END`.
    fn next_parameter<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        while let Some((id, len, mu)) = self.read_header()? {
            self.open_payload(len)?;
            if let Some(member) = props.find_member(id) {
                self.visit(member.member_id);
                return Ok(member);
            }
            if mu {
                log::debug!("[xcdr1] unknown must-understand member {}", id);
                self.raise(Fault::MUST_UNDERSTAND_FAIL)?;
            }
            log::trace!("[xcdr1] skipping unknown member {} ({} bytes)", id, len);
            self.skip(len)?;
        }
        Ok(props.terminator(false))
    }

    fn reading_parameters(&self, props: &EntityProperties) -> bool {
        self.mode() == StreamMode::Read && self.parameter_list(props.e_ext)
    }
}

impl Default for Xcdr1Stream<'_> {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl<'b> CdrStream<'b> for Xcdr1Stream<'b> {
    const ENCODING: Encoding = Encoding::Xcdr1;

    fn with_config(config: StreamConfig) -> Self {
        Self::new(config)
    }

    fn start_struct(&mut self, props: &EntityProperties) -> Result<()> {
        self.ensure_usable()?;
        let position = self.position();
        let track = self.parameter_list(props.e_ext);
        self.push_frame(Frame::at(position), track)
    }

    fn finish_struct(&mut self, props: &EntityProperties) -> Result<()> {
        self.ensure_usable()?;
        if self.parameter_list(props.e_ext) && self.mode() != StreamMode::Read {
            self.align(4, true)?;
            self.put(PID_LIST_END | PID_FLAG_MU)?;
            self.put(0u16)?;
        }
        if self.mode() == StreamMode::Read {
            self.check_must_understand(props)?;
        }
        self.pop_frame();
        Ok(())
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
            // Parameter headers were consumed while locating the member.
            StreamMode::Read if framed => Ok(true),
            StreamMode::Read if prop.is_optional => {
                let (id, len, _) = match self.read_header()? {
                    Some(header) => header,
                    None => {
                        self.raise(Fault::INVALID_PL_ENTRY)?;
                        return Ok(false);
                    }
                };
                if id != prop.member_id {
                    self.raise(Fault::INVALID_PL_ENTRY)?;
                }
                self.open_payload(len)?;
                if let Some(frame) = self.frame_mut() {
                    frame.header = MemberHeader::Short;
                }
                Ok(len != 0)
            }
            StreamMode::Read => Ok(true),
            _ if framed && !present => Ok(false),
            _ if framed || prop.is_optional => {
                self.write_header(prop)?;
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
        if self.mode() == StreamMode::Read {
            let frame = self.frame();
            if prop.p_ext == Extensibility::Mutable || frame.header != MemberHeader::None {
                if self.position() > frame.member_end {
                    log::debug!(
                        "[xcdr1] member {} read past its length ({} > {})",
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
        self.close_header(prop)
    }

    fn first_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        if self.reading_parameters(props) {
            return self.next_parameter(props);
        }
        Ok(self.positional_first(props))
    }

    fn next_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        if self.reading_parameters(props) {
            return self.next_parameter(props);
        }
        Ok(self.positional_next(props))
    }

    fn previous_entity<'p>(&mut self, props: &'p EntityProperties) -> Result<&'p EntityProperties> {
        // A parameter list cannot be walked backwards.
        if self.reading_parameters(props) {
            return Ok(props.terminator(false));
        }
        Ok(self.positional_previous(props))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::BitBound;
    use crate::stream::Endianness;

    fn mutable_props() -> EntityProperties {
        let mut props = EntityProperties::aggregate(
            crate::props::AggregateKind::Struct,
            Extensibility::Mutable,
        );
        props.push_member(EntityProperties::primitive(BitBound::Bits16).with_member_props(1, false));
        props.push_member(
            EntityProperties::primitive(BitBound::Bits32)
                .with_member_props(0x4000, false)
                .must_understand(true),
        );
        props.finish(true);
        props
    }

    #[test]
    fn test_short_and_extended_headers() {
        let props = mutable_props();
        let mut buf = [0u8; 40];
        let mut s = Xcdr1Stream::new(StreamConfig::new().endianness(Endianness::Big));
        s.set_write_buffer(&mut buf);
        s.start_struct(&props).expect("struct");
        for member in props.members_by_seq().iter().filter(|m| m.is_valid()) {
            assert!(s.start_member(member, true).expect("member"));
            if member.member_id == 1 {
                s.put(0xBEEFu16).expect("payload");
            } else {
                s.align(4, true).expect("align");
                s.put(7u32).expect("payload");
            }
            s.finish_member(member, true).expect("finish");
        }
        s.finish_struct(&props).expect("finish struct");
        let len = s.position();
        drop(s);
        assert_eq!(
            &buf[..len],
            &[
                0x00, 0x01, 0x00, 0x02, 0xBE, 0xEF, 0x00, 0x00, // short header + u16
                0x7F, 0x01, 0x00, 0x08, 0x40, 0x00, 0x40, 0x00, // extended header
                0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x07, // length + u32
                0x7F, 0x02, 0x00, 0x00, // list end
            ]
        );
    }

    #[test]
    fn test_reserved_pid_is_invalid_entry() {
        let props = mutable_props();
        let data = [0x3F, 0x05, 0x00, 0x00, 0x7F, 0x02, 0x00, 0x00];
        let mut s = Xcdr1Stream::new(StreamConfig::new().endianness(Endianness::Big));
        s.set_mode(StreamMode::Read, false);
        s.set_read_buffer(&data);
        s.start_struct(&props).expect("struct");
        let err = s.first_entity(&props).expect_err("reserved id");
        assert_eq!(err.fault(), Some(Fault::INVALID_PL_ENTRY));
    }

    #[test]
    fn test_pid_ignore_is_skipped() {
        let props = mutable_props();
        let data = [
            0x3F, 0x03, 0x00, 0x04, 0xDE, 0xAD, 0xBE, 0xEF, // PID_IGNORE
            0x00, 0x01, 0x00, 0x02, 0x12, 0x34, 0x00, 0x00, // member 1
            0x7F, 0x02, 0x00, 0x00,
        ];
        let mut s = Xcdr1Stream::new(StreamConfig::new().endianness(Endianness::Big));
        s.set_mode(StreamMode::Read, false);
        s.set_read_buffer(&data);
        s.start_struct(&props).expect("struct");
        let member = s.first_entity(&props).expect("entity");
        assert_eq!(member.member_id, 1);
        assert_eq!(s.get::<u16>().expect("payload"), 0x1234);
        s.finish_member(member, true).expect("finish");
        assert!(s.next_entity(&props).expect("entity").is_last);
        assert_eq!(s.position(), data.len());
        // Member 0x4000 is must-understand and was never seen.
        let err = s.finish_struct(&props).expect_err("missing member");
        assert_eq!(err.fault(), Some(Fault::MUST_UNDERSTAND_FAIL));
    }
}
