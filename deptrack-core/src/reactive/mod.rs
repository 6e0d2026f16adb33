//! Reactive Dependency Tracking
//!
//! This module implements the subscription bookkeeping behind fine-grained
//! reactivity: which effects observe which dependencies, and how that
//! relation is kept exact as effects re-run with different read patterns.
//!
//! # Concepts
//!
//! ## Dependencies
//!
//! A [`Dep`] is the subscription point for one reactive slot. It holds the set
//! of effects that read the slot and two marker bitfields with one bit per
//! recursion depth.
//!
//! ## Effects
//!
//! A [`ReactiveEffect`] is a computation that re-runs when something it read
//! changes. It owns the ordered list of deps it subscribes to; the subscriber
//! sets of those deps mirror the list.
//!
//! ## Tracking passes
//!
//! Every run of an effect is one pass: mark the old deps, record reads,
//! prune the deps that were not read again. The [`tracking`] functions do
//! the work and [`TrackContext`] drives them around each run.
//!
//! # Implementation Notes
//!
//! Passes can nest: an effect run may trigger another effect, which runs to
//! completion one level deeper before the outer run continues. Each level
//! marks its own bit, so the outer pass is never disturbed by the inner one,
//! and pruning is decided locally per dep without diffing whole sets.

mod context;
mod dep;
mod depth;
mod effect;
mod id;
mod ops;
mod signal;
pub mod tracking;

pub use context::TrackContext;
pub use dep::Dep;
pub use depth::{TrackDepth, MAX_TRACK_DEPTH};
pub use effect::{EffectOptions, ReactiveEffect, Scheduler, WeakEffect};
pub use id::{DepId, EffectId};
pub use ops::{TrackEvent, TrackOpType, TriggerEvent, TriggerOpType};
pub use signal::Signal;
pub use tracking::{finalize_dep_markers, init_dep_markers};
