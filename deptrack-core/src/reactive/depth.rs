//! Recursion depth of effect execution.
//!
//! Every dependency carries two `u32` marker fields. Bit `d - 1` of each field
//! belongs to the effect currently executing at recursion depth `d`, so an
//! outer pass at depth `d` and a nested pass at depth `d + 1` can mark the
//! same dependency without seeing each other's state.
//!
//! Depths start at 1 (the outermost running effect). A depth is only valid
//! while the pass that owns it is open; the runner reuses it for the next pass
//! at the same level once the previous occupant has finalized.

use std::fmt;

use crate::error::{Result, TrackError};

/// Deepest nesting level that still owns a marker bit.
pub const MAX_TRACK_DEPTH: u32 = u32::BITS;

/// A validated recursion depth, `1..=MAX_TRACK_DEPTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackDepth(u32);

impl TrackDepth {
    /// The outermost depth.
    pub const ROOT: TrackDepth = TrackDepth(1);

    /// Validate a depth level.
    ///
    /// Returns [`TrackError::DepthOverflow`] for level 0 or anything past
    /// [`MAX_TRACK_DEPTH`].
    pub fn new(level: u32) -> Result<Self> {
        if level == 0 || level > MAX_TRACK_DEPTH {
            return Err(TrackError::DepthOverflow {
                depth: level,
                max: MAX_TRACK_DEPTH,
            });
        }
        Ok(Self(level))
    }

    /// The depth as a number.
    pub fn level(self) -> u32 {
        self.0
    }

    /// The single bit this depth owns in a marker field.
    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self.0 - 1)
    }

    /// The depth one level further in, if it still has a bit.
    pub fn deeper(self) -> Result<Self> {
        Self::new(self.0 + 1)
    }
}

impl fmt::Display for TrackDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth {}", self.0)
    }
}
