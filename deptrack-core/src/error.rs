//! Error types.
//!
//! The tracking protocol itself is total over well-formed input. The only
//! recoverable failure is asking for a recursion depth that the marker
//! bitfields cannot represent.

use thiserror::Error;

/// Errors produced by the dependency-tracking core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The requested recursion depth has no bit in the marker fields.
    #[error("tracking depth {depth} is outside the supported range 1..={max}")]
    DepthOverflow {
        /// The depth that was requested.
        depth: u32,
        /// The deepest level a marker bitfield can represent.
        max: u32,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackError>;
