//! Identity types for the reactive system.
//!
//! Effects and dependencies are compared by identity, never by value. Each
//! one gets a process-unique ID from an atomic counter when created, and the
//! subscriber set of a [`Dep`](super::Dep) is keyed by [`EffectId`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Unique identifier for a reactive effect.
///
/// Used as the key of every dependency's subscriber set, so that adding the
/// same effect twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a dependency.
///
/// Only used for labelling debugger events and log output; dependencies are
/// otherwise compared by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DepId(u64);

impl DepId {
    /// Generate a new unique dependency ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DepId {
    fn default() -> Self {
        Self::new()
    }
}
