//! # Shared Contract (Resolver ↔ Sampler)
//!
//! Defines the values exchanged between the location resolver and the
//! sampler that consumes it. The sampler only ever needs this crate: it
//! receives a [`ResolvedLocation`] per sample and checks [`ResolvedLocation::found`]
//! (or compares against the sentinel) to decide where to attribute the sample.
//!
//! ## Key Types
//!
//! - [`ResolvedLocation`] - Result of one location query
//! - [`ThreadId`] - Runtime-assigned thread identifier
//!
//! ## The Sentinel
//!
//! A query that finds no traceable frame yields `("<BOGUS>", 1, 0, false)`.
//! The sampler attributes such samples to interpreter/native overhead rather
//! than user code, so the four values always travel together.

#![no_std]

extern crate alloc;

use alloc::string::String;
use core::fmt;

// ============================================================================
// Sentinel Constants
// ============================================================================

/// **Sentinel**: pseudo-filename reported when no traceable frame exists
///
/// Starts with `<` and contains no path separator, so it can never collide
/// with a real file path handed out by the runtime.
pub const SENTINEL_FILENAME: &str = "<BOGUS>";

/// **Sentinel**: line number paired with [`SENTINEL_FILENAME`]
pub const SENTINEL_LINE: u32 = 1;

/// **Sentinel**: instruction offset paired with [`SENTINEL_FILENAME`]
pub const SENTINEL_OFFSET: u32 = 0;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Runtime thread identifier
///
/// Assigned by the host runtime when it starts tracking a thread. Used to
/// pick the fallback thread when the sampling thread has no frame of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

/// Outcome of one location query
///
/// **Invariants**:
/// - `found == true`: `filename` is the code path of a traceable frame and
///   `line >= 1`
/// - `found == false`: the value equals [`ResolvedLocation::not_found`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// File path as reported by the runtime's code metadata
    pub filename: String,

    /// Current line number within `filename`
    pub line: u32,

    /// Instruction offset within the executing code unit
    ///
    /// `0` when the runtime cannot report one.
    pub instruction_offset: u32,

    /// Whether a traceable frame was found
    pub found: bool,
}

impl ResolvedLocation {
    /// A location for a traceable frame.
    ///
    /// Line numbers below 1 are clamped to 1; runtimes report 0 or negative
    /// lines for synthetic code.
    #[must_use]
    pub fn found(filename: impl Into<String>, line: u32, instruction_offset: u32) -> Self {
        Self { filename: filename.into(), line: line.max(1), instruction_offset, found: true }
    }

    /// The sentinel location: `("<BOGUS>", 1, 0, false)`.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            filename: String::from(SENTINEL_FILENAME),
            line: SENTINEL_LINE,
            instruction_offset: SENTINEL_OFFSET,
            found: false,
        }
    }

    /// Returns true if this is the sentinel location.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        !self.found
            && self.filename == SENTINEL_FILENAME
            && self.line == SENTINEL_LINE
            && self.instruction_offset == SENTINEL_OFFSET
    }
}

impl Default for ResolvedLocation {
    fn default() -> Self {
        Self::not_found()
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (offset {})", self.filename, self.line, self.instruction_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_sentinel() {
        let loc = ResolvedLocation::not_found();
        assert_eq!(loc.filename, "<BOGUS>");
        assert_eq!(loc.line, 1);
        assert_eq!(loc.instruction_offset, 0);
        assert!(!loc.found);
        assert!(loc.is_sentinel());
        assert_eq!(loc, ResolvedLocation::default());
    }

    #[test]
    fn test_found_clamps_line() {
        let loc = ResolvedLocation::found("/proj/app.py", 0, 14);
        assert_eq!(loc.line, 1);
        assert_eq!(loc.instruction_offset, 14);
        assert!(loc.found);
        assert!(!loc.is_sentinel());
    }

    #[test]
    fn test_found_bogus_name_is_not_sentinel() {
        // A traced frame is never the sentinel, whatever its name
        let loc = ResolvedLocation::found(SENTINEL_FILENAME, 1, 0);
        assert!(!loc.is_sentinel());
    }

    #[test]
    fn test_thread_id_ordering() {
        assert!(ThreadId(1) < ThreadId(7));
    }
}
