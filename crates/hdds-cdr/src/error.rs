// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fault bitmask and error types for the CDR streaming core.
//!
//! Every stream keeps a [`Fault`] status mask. A codec function that detects a
//! problem ORs the matching bit into the mask; the stream then decides from its
//! ignore mask whether the pass has to stop. Only faults that stop the pass
//! surface as [`CdrError`].

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Serialization fault classes (independently maskable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Fault(pub u32);

impl Fault {
    /// A bounded string/sequence exceeded its bound during a move pass.
    pub const MOVE_BOUND_EXCEEDED: Self = Self(0x0001);

    /// A bounded string/sequence exceeded its bound during a write pass.
    pub const WRITE_BOUND_EXCEEDED: Self = Self(0x0002);

    /// Incoming string/sequence is longer than the local bound (value truncated).
    pub const READ_BOUND_EXCEEDED: Self = Self(0x0004);

    /// Illegal parameter-list id in an XCDR1 mutable struct.
    pub const INVALID_PL_ENTRY: Self = Self(0x0008);

    /// Wire-invalid field content (zero string length, bad boolean, ...).
    pub const ILLEGAL_FIELD_VALUE: Self = Self(0x0010);

    /// Type feature the selected encoding cannot represent.
    pub const UNSUPPORTED_XTYPES: Self = Self(0x0020);

    /// A must-understand member could not be matched.
    pub const MUST_UNDERSTAND_FAIL: Self = Self(0x0040);

    /// Cursor would cross the end of the buffer view. Never ignorable.
    pub const BUFFER_SIZE_EXCEEDED: Self = Self(0x0080);

    /// More nested frames than the stream stack holds. Never ignorable.
    pub const MAX_DEPTH_EXCEEDED: Self = Self(0x0100);

    const NAMES: [(Self, &'static str); 9] = [
        (Self::MOVE_BOUND_EXCEEDED, "move_bound_exceeded"),
        (Self::WRITE_BOUND_EXCEEDED, "write_bound_exceeded"),
        (Self::READ_BOUND_EXCEEDED, "read_bound_exceeded"),
        (Self::INVALID_PL_ENTRY, "invalid_pl_entry"),
        (Self::ILLEGAL_FIELD_VALUE, "illegal_field_value"),
        (Self::UNSUPPORTED_XTYPES, "unsupported_xtypes"),
        (Self::MUST_UNDERSTAND_FAIL, "must_understand_fail"),
        (Self::BUFFER_SIZE_EXCEEDED, "buffer_size_exceeded"),
        (Self::MAX_DEPTH_EXCEEDED, "max_depth_exceeded"),
    ];

    /// Faults that no ignore mask can suppress.
    pub const FATAL: Self = Self(Self::BUFFER_SIZE_EXCEEDED.0 | Self::MAX_DEPTH_EXCEEDED.0);

    /// Empty mask
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if any bit of `flag` is set
    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl BitOr for Fault {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Fault {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Fault {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        let unknown = self.0 & !Self::NAMES.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        if unknown != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{:#x}", unknown)?;
        }
        Ok(())
    }
}

/// Errors surfaced by the streaming core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CdrError {
    /// A fault outside the ignore mask stopped the pass.
    #[error("CDR stream fault {fault} at offset {offset}")]
    Fault { fault: Fault, offset: usize },

    /// The stream is in abort state and needs `reset`/`set_buffer` first.
    #[error("CDR stream already aborted ({0})")]
    Aborted(Fault),

    /// Unknown RTPS encapsulation identifier.
    #[error("invalid encapsulation identifier {0:#06x}")]
    InvalidEncapsulation(u16),

    /// Serialized payload shorter than its encapsulation header.
    #[error("serialized payload truncated")]
    Truncated,
}

impl CdrError {
    /// Fault bits carried by this error, if any.
    pub fn fault(&self) -> Option<Fault> {
        match self {
            CdrError::Fault { fault, .. } | CdrError::Aborted(fault) => Some(*fault),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CdrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display_lists_names() {
        let fault = Fault::WRITE_BOUND_EXCEEDED | Fault::MUST_UNDERSTAND_FAIL;
        assert_eq!(fault.to_string(), "write_bound_exceeded|must_understand_fail");
        assert_eq!(Fault::empty().to_string(), "none");
        assert_eq!(Fault(0x8000_0000).to_string(), "0x80000000");
    }

    #[test]
    fn test_fault_mask_ops() {
        let mut mask = Fault::empty();
        assert!(mask.is_empty());
        mask |= Fault::READ_BOUND_EXCEEDED;
        assert!(mask.contains(Fault::READ_BOUND_EXCEEDED));
        assert!(!mask.contains(Fault::INVALID_PL_ENTRY));
        assert_eq!(
            (mask | Fault::INVALID_PL_ENTRY) & Fault::INVALID_PL_ENTRY,
            Fault::INVALID_PL_ENTRY
        );
        assert!(Fault::FATAL.contains(Fault::BUFFER_SIZE_EXCEEDED));
    }

    #[test]
    fn test_error_display() {
        let err = CdrError::Fault {
            fault: Fault::ILLEGAL_FIELD_VALUE,
            offset: 12,
        };
        assert_eq!(
            err.to_string(),
            "CDR stream fault illegal_field_value at offset 12"
        );
        assert_eq!(err.fault(), Some(Fault::ILLEGAL_FIELD_VALUE));
        assert_eq!(CdrError::Truncated.fault(), None);
        assert_eq!(
            CdrError::InvalidEncapsulation(0x42).to_string(),
            "invalid encapsulation identifier 0x0042"
        );
    }
}
