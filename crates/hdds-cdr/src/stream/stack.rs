// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-depth stack of traversal frames.

/// Maximum nesting of structs and delimited collections per stream.
pub const MAX_DEPTH: usize = 32;

/// Header shape written for the member currently open in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum MemberHeader {
    #[default]
    None,
    /// XCDR1 2+2 byte parameter header.
    Short,
    /// XCDR1 PID_EXTENDED header (12 bytes).
    Extended,
    /// XCDR2 EMHEADER followed by a NEXTINT length.
    NextInt,
    /// XCDR2 EMHEADER with the length implied by LC 0..3.
    Implied,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    /// Index of the current entity in the traversed list.
    pub index: usize,
    /// Offset of a pending DHEADER slot (write/move).
    pub dheader_at: Option<usize>,
    pub body_start: usize,
    /// End of a delimited body when reading, `usize::MAX` otherwise.
    pub end: usize,
    pub header: MemberHeader,
    pub header_at: usize,
    pub member_start: usize,
    /// End of the current member payload when reading header-framed data.
    pub member_end: usize,
    /// Start of this frame's slice of the seen-id list, if tracked.
    pub seen_base: Option<usize>,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            index: 0,
            dheader_at: None,
            body_start: 0,
            end: usize::MAX,
            header: MemberHeader::None,
            header_at: 0,
            member_start: 0,
            member_end: usize::MAX,
            seen_base: None,
        }
    }
}

impl Frame {
    /// Frame for a struct or collection body starting at `position`.
    pub fn at(position: usize) -> Self {
        Self {
            body_start: position,
            ..Self::default()
        }
    }

    pub fn is_delimited(&self) -> bool {
        self.end != usize::MAX
    }
}

#[derive(Debug)]
pub(crate) struct FrameStack {
    frames: [Frame; MAX_DEPTH],
    depth: usize,
}

impl Default for FrameStack {
    fn default() -> Self {
        Self {
            frames: [Frame::default(); MAX_DEPTH],
            depth: 0,
        }
    }
}

impl FrameStack {
    /// Returns `false` when the stack is full.
    pub fn push(&mut self, frame: Frame) -> bool {
        match self.frames.get_mut(self.depth) {
            Some(slot) => {
                *slot = frame;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    pub fn pop(&mut self) -> Option<Frame> {
        if self.depth == 0 {
            return None;
        }
        self.depth -= 1;
        Some(self.frames[self.depth])
    }

    pub fn top(&self) -> Option<&Frame> {
        self.depth.checked_sub(1).and_then(|i| self.frames.get(i))
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.depth.checked_sub(1).and_then(|i| self.frames.get_mut(i))
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn clear(&mut self) {
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_and_overflow() {
        let mut stack = FrameStack::default();
        assert!(stack.top().is_none());
        for i in 0..MAX_DEPTH {
            assert!(stack.push(Frame::at(i)));
        }
        assert!(!stack.push(Frame::at(99)));
        assert_eq!(stack.depth(), MAX_DEPTH);
        assert_eq!(stack.top().map(|f| f.body_start), Some(MAX_DEPTH - 1));

        let popped = stack.pop().expect("frame");
        assert_eq!(popped.body_start, MAX_DEPTH - 1);
        stack.clear();
        assert!(stack.pop().is_none());
    }
}
