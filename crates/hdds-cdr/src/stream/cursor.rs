// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cursor, buffer view, fault bookkeeping and traversal frames shared by all
//! stream formats.

use super::stack::{Frame, FrameStack};
use super::{Endianness, StreamConfig, StreamMode};
use crate::codec::primitive::Primitive;
use crate::error::{CdrError, Fault, Result};
use crate::props::{AggregateKind, EntityProperties};

/// Buffer view attached to a stream.
#[derive(Debug, Default)]
pub(crate) enum Buffer<'b> {
    #[default]
    Empty,
    Read(&'b [u8]),
    Write(&'b mut [u8]),
}

impl Buffer<'_> {
    fn len(&self) -> usize {
        match self {
            Buffer::Empty => 0,
            Buffer::Read(buf) => buf.len(),
            Buffer::Write(buf) => buf.len(),
        }
    }
}

/// State common to every stream: cursor, alignment, byte order, fault masks,
/// mode flags and the frame stack.
///
/// `position == usize::MAX` is the "unbounded" marker produced by max passes
/// over unbounded types; every further advance is a no-op.
#[derive(Debug)]
pub struct StreamCore<'b> {
    buffer: Buffer<'b>,
    position: usize,
    alignment: usize,
    max_alignment: usize,
    endianness: Endianness,
    ignore: Fault,
    status: Fault,
    mode: StreamMode,
    key: bool,
    pub(crate) stack: FrameStack,
    seen: Vec<u32>,
}

impl<'b> StreamCore<'b> {
    pub(crate) fn new(max_alignment: usize, config: StreamConfig) -> Self {
        Self {
            buffer: Buffer::Empty,
            position: 0,
            alignment: 1,
            max_alignment,
            endianness: config.endianness,
            ignore: config.ignore_faults,
            status: Fault::empty(),
            mode: StreamMode::Write,
            key: false,
            stack: FrameStack::default(),
            seen: Vec::new(),
        }
    }

    // ---- cursor ----

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance the cursor by `n`, saturating at the unbounded marker.
    pub fn incr_position(&mut self, n: usize) -> usize {
        if self.position != usize::MAX {
            self.position = self.position.saturating_add(n);
        }
        self.position
    }

    /// Alignment in effect after the last primitive/header.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn set_alignment(&mut self, alignment: usize) {
        self.alignment = alignment.clamp(1, self.max_alignment);
    }

    pub fn max_alignment(&self) -> usize {
        self.max_alignment
    }

    /// Pad the cursor to a multiple of `min(new_alignment, max_alignment)`.
    ///
    /// Returns the number of padding bytes. Idempotent when already aligned.
    pub fn align(&mut self, new_alignment: usize, add_zeroes: bool) -> Result<usize> {
        let target = new_alignment.clamp(1, self.max_alignment);
        self.alignment = target;
        if self.position == usize::MAX {
            return Ok(0);
        }
        let pad = (target - self.position % target) % target;
        if pad == 0 {
            return Ok(0);
        }
        match self.mode {
            StreamMode::Write if add_zeroes => self.put_with(pad, |slot, _| slot.fill(0))?,
            StreamMode::Read | StreamMode::Write => {
                self.require(pad)?;
                self.incr_position(pad);
            }
            StreamMode::Move | StreamMode::Max => {
                self.incr_position(pad);
            }
        }
        Ok(pad)
    }

    // ---- configuration ----

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// Whether multi-byte values are stored in the non-native byte order.
    pub fn swap_bytes(&self) -> bool {
        self.endianness != Endianness::native()
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Key-only projection active.
    pub fn is_key(&self) -> bool {
        self.key
    }

    /// Select the pass and projection for the next traversal and rewind.
    pub fn set_mode(&mut self, mode: StreamMode, key: bool) {
        self.mode = mode;
        self.key = key;
        self.reset();
    }

    pub fn ignore_faults(&self) -> Fault {
        self.ignore
    }

    pub fn set_ignore_faults(&mut self, ignore: Fault) {
        self.ignore = ignore;
    }

    // ---- buffers ----

    pub fn set_read_buffer(&mut self, data: &'b [u8]) {
        self.buffer = Buffer::Read(data);
        self.reset();
    }

    pub fn set_write_buffer(&mut self, data: &'b mut [u8]) {
        self.buffer = Buffer::Write(data);
        self.reset();
    }

    /// Detach the buffer (move/max passes need none).
    pub fn clear_buffer(&mut self) {
        self.buffer = Buffer::Empty;
        self.reset();
    }

    /// Size of the attached view.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Rewind cursor, alignment, fault status and frames. Byte order and
    /// configuration are kept.
    pub fn reset(&mut self) {
        self.position = 0;
        self.alignment = 1;
        self.status = Fault::empty();
        self.stack.clear();
        self.seen.clear();
    }

    /// Whether `n` more bytes fit in the view from the cursor.
    ///
    /// Move and max passes always succeed. A failing non-peek check records
    /// `BUFFER_SIZE_EXCEEDED`.
    pub fn bytes_available(&mut self, n: usize, peek: bool) -> bool {
        if matches!(self.mode, StreamMode::Move | StreamMode::Max) {
            return true;
        }
        let fits = self.position != usize::MAX
            && self
                .position
                .checked_add(n)
                .is_some_and(|end| end <= self.buffer.len());
        if !fits && !peek {
            self.status(Fault::BUFFER_SIZE_EXCEEDED);
        }
        fits
    }

    // ---- faults ----

    /// Faults recorded since the last reset.
    pub fn faults(&self) -> Fault {
        self.status
    }

    /// Record `fault`; returns `true` when the stream is now in abort state.
    pub fn status(&mut self, fault: Fault) -> bool {
        self.status |= fault;
        self.abort_status()
    }

    /// Whether a recorded fault is neither ignored nor suppressible.
    pub fn abort_status(&self) -> bool {
        let blocking = Fault(!self.ignore.0) | Fault::FATAL;
        self.status.intersects(blocking)
    }

    /// Record `fault` and turn it into an error unless it is ignored.
    pub fn raise(&mut self, fault: Fault) -> Result<()> {
        let offset = self.position;
        if self.status(fault) {
            log::debug!("[cdr] fault {} at offset {}", fault, offset);
            return Err(CdrError::Fault { fault, offset });
        }
        log::trace!("[cdr] ignored fault {} at offset {}", fault, offset);
        Ok(())
    }

    /// Refuse further work once a pass has aborted.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.abort_status() {
            return Err(CdrError::Aborted(self.status));
        }
        Ok(())
    }

    fn overflow<T>(&mut self) -> Result<T> {
        let offset = self.position;
        self.status(Fault::BUFFER_SIZE_EXCEEDED);
        log::debug!("[cdr] buffer exhausted at offset {}", offset);
        Err(CdrError::Fault {
            fault: Fault::BUFFER_SIZE_EXCEEDED,
            offset,
        })
    }

    /// Fail unless `n` bytes are available.
    pub(crate) fn require(&mut self, n: usize) -> Result<()> {
        if self.bytes_available(n, true) {
            Ok(())
        } else {
            self.overflow()
        }
    }

    // ---- raw access ----

    /// Run `fill` over the next `len` bytes of a write buffer and advance.
    /// Move and max passes only advance.
    pub(crate) fn put_with<F>(&mut self, len: usize, fill: F) -> Result<()>
    where
        F: FnOnce(&mut [u8], Endianness),
    {
        self.ensure_usable()?;
        if self.mode == StreamMode::Write {
            let at = self.position;
            let endianness = self.endianness;
            let slot = self.slot_mut(at, len)?;
            fill(slot, endianness);
        }
        self.incr_position(len);
        Ok(())
    }

    pub(crate) fn put<T: Primitive>(&mut self, value: T) -> Result<()> {
        self.put_with(T::SIZE, |slot, endianness| value.encode(slot, endianness))
    }

    pub(crate) fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.put_with(data.len(), |slot, _| slot.copy_from_slice(data))
    }

    /// Overwrite an already emitted value (length/DHEADER patch-up).
    pub(crate) fn patch<T: Primitive>(&mut self, at: usize, value: T) -> Result<()> {
        if self.mode != StreamMode::Write {
            return Ok(());
        }
        let endianness = self.endianness;
        let slot = self.slot_mut(at, T::SIZE)?;
        value.encode(slot, endianness);
        Ok(())
    }

    /// Move `start..end` forward by `by` bytes and advance the cursor by `by`.
    pub(crate) fn shift_tail(&mut self, start: usize, end: usize, by: usize) -> Result<()> {
        if self.mode == StreamMode::Write {
            self.require(by)?;
            if let Buffer::Write(buf) = &mut self.buffer {
                buf.copy_within(start..end, start + by);
            }
        }
        self.incr_position(by);
        Ok(())
    }

    fn slot_mut(&mut self, at: usize, len: usize) -> Result<&mut [u8]> {
        let end = match at.checked_add(len) {
            Some(end) if end <= self.buffer.len() => end,
            _ => return self.overflow(),
        };
        match &mut self.buffer {
            Buffer::Write(buf) => Ok(&mut buf[at..end]),
            _ => Err(CdrError::Fault {
                fault: Fault::BUFFER_SIZE_EXCEEDED,
                offset: at,
            }),
        }
    }

    fn read_view(&mut self) -> Result<&'b [u8]> {
        match &self.buffer {
            Buffer::Read(buf) => Ok(*buf),
            _ => self.overflow(),
        }
    }

    /// Borrow the next `len` bytes of the read buffer and advance.
    pub(crate) fn take(&mut self, len: usize) -> Result<&'b [u8]> {
        self.ensure_usable()?;
        let bytes = self.peek_bytes(len)?;
        self.incr_position(len);
        Ok(bytes)
    }

    pub(crate) fn peek_bytes(&mut self, len: usize) -> Result<&'b [u8]> {
        let view = self.read_view()?;
        let at = self.position;
        match at.checked_add(len).and_then(|end| view.get(at..end)) {
            Some(bytes) => Ok(bytes),
            None => self.overflow(),
        }
    }

    /// Decode the next value without alignment.
    pub(crate) fn get<T: Primitive>(&mut self) -> Result<T> {
        let endianness = self.endianness;
        let bytes = self.take(T::SIZE)?;
        match T::decode(bytes, endianness) {
            Some(value) => Ok(value),
            None => {
                self.raise(Fault::ILLEGAL_FIELD_VALUE)?;
                Ok(T::default())
            }
        }
    }

    pub(crate) fn peek<T: Primitive>(&mut self) -> Result<T> {
        let endianness = self.endianness;
        let bytes = self.peek_bytes(T::SIZE)?;
        Ok(T::decode(bytes, endianness).unwrap_or_default())
    }

    /// Skip `n` bytes: bounds-checked when reading, plain advance otherwise.
    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure_usable()?;
        if self.mode == StreamMode::Read {
            self.require(n)?;
        }
        self.incr_position(n);
        Ok(())
    }

    // ---- frames ----

    pub(crate) fn push_frame(&mut self, mut frame: Frame, track_seen: bool) -> Result<()> {
        if track_seen && self.mode == StreamMode::Read {
            frame.seen_base = Some(self.seen.len());
        }
        if self.stack.push(frame) {
            Ok(())
        } else {
            self.raise(Fault::MAX_DEPTH_EXCEEDED)
        }
    }

    pub(crate) fn pop_frame(&mut self) -> Frame {
        self.stack.pop().unwrap_or_default()
    }

    pub(crate) fn frame(&self) -> Frame {
        self.stack.top().copied().unwrap_or_default()
    }

    pub(crate) fn frame_mut(&mut self) -> Option<&mut Frame> {
        self.stack.top_mut()
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Remember a member id seen on the wire in the current frame.
    pub(crate) fn visit(&mut self, member_id: u32) {
        if self.frame().seen_base.is_some() {
            self.seen.push(member_id);
        }
    }

    /// Fail when a must-understand member of `props` was never visited in the
    /// current frame. Optional members are exempt; unions are not checked.
    pub(crate) fn check_must_understand(&mut self, props: &EntityProperties) -> Result<()> {
        let Some(base) = self.frame().seen_base else {
            return Ok(());
        };
        let seen = self.seen.split_off(base.min(self.seen.len()));
        if props.kind == AggregateKind::Union {
            return Ok(());
        }
        let missing = props
            .entities(self.key)
            .iter()
            .filter(|m| m.is_valid() && m.must_understand && !m.is_optional)
            .find(|m| !seen.contains(&m.member_id));
        if let Some(member) = missing {
            log::debug!(
                "[cdr] must-understand member {} missing from input",
                member.member_id
            );
            return self.raise(Fault::MUST_UNDERSTAND_FAIL);
        }
        Ok(())
    }

    // ---- positional traversal ----

    fn delimited_end_reached(&self) -> bool {
        let frame = self.frame();
        self.mode == StreamMode::Read && frame.is_delimited() && self.position >= frame.end
    }

    fn entity_at<'p>(&mut self, props: &'p EntityProperties, index: usize) -> &'p EntityProperties {
        if let Some(frame) = self.frame_mut() {
            frame.index = index;
        }
        if self.delimited_end_reached() {
            return props.terminator(self.key);
        }
        match props.entities(self.key).get(index) {
            Some(entity) => {
                if entity.is_valid() {
                    self.visit(entity.member_id);
                }
                entity
            }
            None => props.terminator(self.key),
        }
    }

    /// First entity in declaration (or key-id) order.
    pub fn positional_first<'p>(&mut self, props: &'p EntityProperties) -> &'p EntityProperties {
        self.entity_at(props, 0)
    }

    pub fn positional_next<'p>(&mut self, props: &'p EntityProperties) -> &'p EntityProperties {
        let index = self.frame().index.saturating_add(1);
        self.entity_at(props, index)
    }

    pub fn positional_previous<'p>(
        &mut self,
        props: &'p EntityProperties,
    ) -> &'p EntityProperties {
        match self.frame().index.checked_sub(1) {
            Some(index) => self.entity_at(props, index),
            None => props.terminator(self.key),
        }
    }
}
