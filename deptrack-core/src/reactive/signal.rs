//! Signal Implementation
//!
//! A Signal is the simplest reactive slot: one value guarded by a lock, and
//! one [`Dep`] recording which effects read it.
//!
//! # How Signals Work
//!
//! 1. Reading a signal inside an effect run registers the running effect with
//!    the signal's dep.
//!
//! 2. Writing a signal triggers every subscriber of the dep.
//!
//! Reads and writes take the [`TrackContext`] they happen in, so the signal
//! never has to look up ambient state.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::TrackContext;
use super::dep::Dep;
use super::ops::{TrackOpType, TriggerOpType};

/// A reactive value of type `T`.
///
/// # Example
///
/// ```rust
/// use deptrack_core::reactive::{Signal, TrackContext};
///
/// let ctx = TrackContext::new();
/// let count = Signal::new(0);
///
/// let c = count.clone();
/// let effect = ctx.effect(move |ctx| {
///     let _ = c.get(ctx);
/// });
///
/// count.set(&ctx, 5);
/// assert_eq!(effect.run_count(), 2);
/// ```
pub struct Signal<T> {
    /// The current value.
    value: Arc<RwLock<T>>,

    /// Effects that read this signal.
    dep: Dep,
}

impl<T> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            dep: Dep::new(),
        }
    }

    /// The dependency backing this signal.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    /// Borrow the value, registering the read with the running effect.
    pub fn with<R>(&self, ctx: &TrackContext, f: impl FnOnce(&T) -> R) -> R {
        ctx.track(&self.dep, TrackOpType::Get);
        f(&self.value.read())
    }

    /// Set a new value and trigger subscribers.
    pub fn set(&self, ctx: &TrackContext, value: T) {
        *self.value.write() = value;
        ctx.trigger(&self.dep, TriggerOpType::Set);
    }

    /// Update the value in place and trigger subscribers.
    pub fn update(&self, ctx: &TrackContext, f: impl FnOnce(&mut T)) {
        f(&mut self.value.write());
        ctx.trigger(&self.dep, TriggerOpType::Set);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.dep.len()
    }
}

impl<T: Clone> Signal<T> {
    /// Get the current value, registering the read with the running effect.
    pub fn get(&self, ctx: &TrackContext) -> T {
        self.with(ctx, T::clone)
    }

    /// Get the current value without tracking.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            dep: self.dep.clone(),
        }
    }
}

impl<T: Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("dep", &self.dep.id())
            .field("value", &*self.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_set() {
        let ctx = TrackContext::new();
        let signal = Signal::new(42);
        assert_eq!(signal.get(&ctx), 42);

        signal.set(&ctx, 100);
        assert_eq!(signal.get(&ctx), 100);
    }

    #[test]
    fn signal_update() {
        let ctx = TrackContext::new();
        let signal = Signal::new(10);
        signal.update(&ctx, |v| *v *= 2);
        assert_eq!(signal.get_untracked(), 20);
    }

    #[test]
    fn signal_clone_shares_value() {
        let ctx = TrackContext::new();
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(&ctx, 42);
        assert_eq!(signal2.get_untracked(), 42);
        assert_eq!(signal1.dep(), signal2.dep());
    }

    #[test]
    fn effect_reruns_on_write() {
        let ctx = TrackContext::new();
        let signal = Signal::new(1);
        let observed = Arc::new(AtomicI32::new(0));

        let (s, o) = (signal.clone(), observed.clone());
        let effect = ctx.effect(move |ctx| {
            o.store(s.get(ctx), Ordering::SeqCst);
        });
        assert_eq!(observed.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 1);

        signal.set(&ctx, 7);
        assert_eq!(observed.load(Ordering::SeqCst), 7);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn reads_outside_effects_do_not_subscribe() {
        let ctx = TrackContext::new();
        let signal = Signal::new(String::from("hello"));
        assert_eq!(signal.with(&ctx, |s| s.len()), 5);
        assert_eq!(signal.subscriber_count(), 0);
    }
}
