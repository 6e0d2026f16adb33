//! Operation labels for read and write events.
//!
//! These tags ride along with every tracked read and every trigger so that
//! debugging tools can tell a plain property read from a `has` check or an
//! iteration. Nothing in the tracking algorithm branches on them.
//!
//! The serialized form is a lowercase string, which keeps events readable
//! when they are inspected outside the process.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{DepId, EffectId};

/// Kinds of reactive reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackOpType {
    /// `target.key`
    Get,
    /// `key in target`
    Has,
    /// Iterating over the keys of a target.
    Iterate,
}

impl TrackOpType {
    /// Stable string label.
    pub fn as_str(self) -> &'static str {
        match self {
            TrackOpType::Get => "get",
            TrackOpType::Has => "has",
            TrackOpType::Iterate => "iterate",
        }
    }
}

impl fmt::Display for TrackOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of reactive writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOpType {
    Set,
    Add,
    Delete,
    Clear,
}

impl TriggerOpType {
    /// Stable string label.
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerOpType::Set => "set",
            TriggerOpType::Add => "add",
            TriggerOpType::Delete => "delete",
            TriggerOpType::Clear => "clear",
        }
    }
}

impl fmt::Display for TriggerOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passed to an effect's `on_track` hook when it subscribes to a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackEvent {
    pub effect: EffectId,
    pub dep: DepId,
    pub op: TrackOpType,
}

/// Passed to an effect's `on_trigger` hook when a write schedules it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerEvent {
    pub effect: EffectId,
    pub dep: DepId,
    pub op: TriggerOpType,
}
