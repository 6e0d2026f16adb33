//! Deptrack Core
//!
//! This crate provides the dependency-tracking core of a fine-grained
//! reactive engine. It implements:
//!
//! - Dependencies with per-depth tracking markers
//! - The begin / record / finalize pass run around every effect execution
//! - An explicit tracking context that nests effect runs safely
//! - Operation labels and debugger events for inspection tooling
//!
//! Deciding *when* effects run and intercepting reads on arbitrary objects
//! are left to the layers built on top; they talk to this crate through
//! [`TrackContext::track`](reactive::TrackContext::track),
//! [`TrackContext::trigger`](reactive::TrackContext::trigger) and the
//! scheduler hook on [`EffectOptions`](reactive::EffectOptions).
//!
//! # Example
//!
//! ```rust
//! use deptrack_core::reactive::{Signal, TrackContext};
//!
//! let ctx = TrackContext::new();
//! let show_detail = Signal::new(true);
//! let detail = Signal::new("a");
//!
//! let (s, d) = (show_detail.clone(), detail.clone());
//! let effect = ctx.effect(move |ctx| {
//!     if s.get(ctx) {
//!         let _ = d.get(ctx);
//!     }
//! });
//! assert_eq!(effect.dep_count(), 2);
//!
//! // The branch is no longer taken, so `detail` is pruned.
//! show_detail.set(&ctx, false);
//! assert_eq!(effect.dep_count(), 1);
//! assert_eq!(detail.subscriber_count(), 0);
//! ```

pub mod error;
pub mod reactive;

pub use error::{Result, TrackError};
