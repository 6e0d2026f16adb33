//! Tracking Context
//!
//! A [`TrackContext`] is the execution context effects run in. It holds the
//! stack of effects whose runs it has opened, and it is handed to every
//! effect body so reads and writes always say which context they belong to.
//! It is not `Sync`: one context drives one logical thread of effect
//! execution.
//!
//! The recursion depth, which selects the marker bit a pass uses, is counted
//! per thread rather than per context. A context created inside a running
//! effect therefore opens its passes below the ones already open on the
//! thread, instead of reusing their bits.
//!
//! # Nesting
//!
//! An effect body may trigger other effects, which run nested one level
//! deeper before control returns. Each level owns its own marker bit, so the
//! outer pass is unaffected by anything the inner one marks or clears. An
//! effect that is already running is never entered a second time.
//!
//! Once more than [`MAX_TRACK_DEPTH`](super::MAX_TRACK_DEPTH) passes are open
//! on the thread the run falls back to a full cleanup before the body and plain membership
//! checks during it.

use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::debug;

use super::dep::Dep;
use super::depth::TrackDepth;
use super::effect::{EffectOptions, ReactiveEffect};
use super::ops::{TrackOpType, TriggerOpType};
use super::tracking::{
    cleanup_effect, finalize_dep_markers, init_dep_markers, track_effects, trigger_effects,
};

thread_local! {
    /// Passes open on this thread, across every context.
    static OPEN_PASSES: Cell<u32> = const { Cell::new(0) };
}

/// An entry in the active effect stack.
#[derive(Debug, Clone)]
struct Frame {
    effect: ReactiveEffect,
    /// `None` past the marker cap.
    depth: Option<TrackDepth>,
}

/// Explicit execution context for running effects under tracking.
#[derive(Default)]
pub struct TrackContext {
    stack: RefCell<Vec<Frame>>,
    paused: Cell<bool>,
}

impl TrackContext {
    /// Create a context with no open runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an effect and run it once, unless the options say it is lazy.
    pub fn effect<F>(&self, body: F) -> ReactiveEffect
    where
        F: Fn(&TrackContext) + Send + Sync + 'static,
    {
        self.effect_with_options(body, EffectOptions::default())
    }

    /// Create an effect with options and run it once unless it is lazy.
    pub fn effect_with_options<F>(&self, body: F, options: EffectOptions) -> ReactiveEffect
    where
        F: Fn(&TrackContext) + Send + Sync + 'static,
    {
        let lazy = options.is_lazy();
        let effect = ReactiveEffect::with_options(body, options);
        if !lazy {
            self.run(&effect);
        }
        effect
    }

    /// Run `effect` inside a tracking pass.
    ///
    /// Returns `false` without running if the effect is already running.
    /// Stopped effects run their body with tracking paused; those runs still
    /// count towards [`ReactiveEffect::run_count`].
    pub fn run(&self, effect: &ReactiveEffect) -> bool {
        if !effect.is_active() {
            self.untracked(|| effect.invoke(self));
            effect.record_run();
            return true;
        }
        if effect.is_running() {
            debug!(effect = effect.id().raw(), "skipping re-entrant run");
            return false;
        }

        let level = Self::thread_depth() + 1;
        let depth = TrackDepth::new(level).ok();
        match depth {
            Some(depth) => init_dep_markers(effect, depth),
            None => {
                debug!(effect = effect.id().raw(), level, "marker bits exhausted, cleaning up");
                cleanup_effect(effect);
            }
        }

        self.stack.borrow_mut().push(Frame {
            effect: effect.clone(),
            depth,
        });
        OPEN_PASSES.with(|open| open.set(level));
        effect.set_running(true);

        let _pass = PassGuard {
            ctx: self,
            effect,
            depth,
            was_paused: self.paused.replace(false),
        };
        effect.invoke(self);
        effect.record_run();
        true
    }

    /// Record a read of `dep` by the effect currently running, if any.
    ///
    /// Returns `true` if the dep was appended to the effect's deps.
    pub fn track(&self, dep: &Dep, op: TrackOpType) -> bool {
        if self.paused.get() {
            return false;
        }
        let Some(frame) = self.stack.borrow().last().cloned() else {
            return false;
        };
        track_effects(dep, &frame.effect, frame.depth, op)
    }

    /// Notify the subscribers of `dep` of a write.
    ///
    /// Returns the number of effects run or handed to a scheduler.
    pub fn trigger(&self, dep: &Dep, op: TriggerOpType) -> usize {
        trigger_effects(self, dep, op)
    }

    /// Run `f` with read tracking paused.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _resume = ResumeGuard {
            ctx: self,
            was_paused: self.paused.replace(true),
        };
        f()
    }

    /// The effect whose run is innermost, if any.
    pub fn active_effect(&self) -> Option<ReactiveEffect> {
        self.stack.borrow().last().map(|frame| frame.effect.clone())
    }

    /// Whether `effect` is the innermost running effect.
    pub fn is_current(&self, effect: &ReactiveEffect) -> bool {
        self.stack
            .borrow()
            .last()
            .is_some_and(|frame| frame.effect == *effect)
    }

    /// Number of passes open on the current thread, across all contexts.
    pub fn thread_depth() -> u32 {
        OPEN_PASSES.with(Cell::get)
    }

    /// Number of effect runs this context currently has open.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Whether reads are being recorded right now.
    pub fn is_tracking(&self) -> bool {
        !self.paused.get() && !self.stack.borrow().is_empty()
    }
}

impl fmt::Debug for TrackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackContext")
            .field("depth", &self.depth())
            .field("paused", &self.paused.get())
            .finish()
    }
}

/// Closes a pass when the effect body returns or unwinds.
struct PassGuard<'a> {
    ctx: &'a TrackContext,
    effect: &'a ReactiveEffect,
    depth: Option<TrackDepth>,
    was_paused: bool,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if let Some(depth) = self.depth {
            finalize_dep_markers(self.effect, depth);
        }

        OPEN_PASSES.with(|open| open.set(open.get().saturating_sub(1)));

        let popped = self.ctx.stack.borrow_mut().pop();
        if let Some(frame) = popped {
            debug_assert_eq!(
                frame.effect.id(),
                self.effect.id(),
                "TrackContext mismatch: expected {:?}, got {:?}",
                self.effect.id(),
                frame.effect.id()
            );
        }

        self.ctx.paused.set(self.was_paused);
        self.effect.set_running(false);

        if self.effect.take_defer_stop() {
            self.effect.stop();
        }
    }
}

struct ResumeGuard<'a> {
    ctx: &'a TrackContext,
    was_paused: bool,
}

impl Drop for ResumeGuard<'_> {
    fn drop(&mut self) {
        self.ctx.paused.set(self.was_paused);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn context_tracks_active_effect() {
        let ctx = TrackContext::new();
        assert!(ctx.active_effect().is_none());
        assert!(!ctx.is_tracking());

        let seen = Arc::new(parking_lot::Mutex::new(None));
        let seen_clone = seen.clone();
        let effect = ctx.effect(move |ctx| {
            *seen_clone.lock() = Some((ctx.active_effect().map(|e| e.id()), ctx.depth()));
        });

        assert_eq!(*seen.lock(), Some((Some(effect.id()), 1)));
        assert!(ctx.active_effect().is_none());
        assert_eq!(ctx.depth(), 0);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn lazy_effect_waits_for_run() {
        let ctx = TrackContext::new();
        let effect = ctx.effect_with_options(|_| {}, EffectOptions::new().lazy(true));
        assert_eq!(effect.run_count(), 0);

        assert!(ctx.run(&effect));
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn reads_outside_effects_are_ignored() {
        let ctx = TrackContext::new();
        let dep = Dep::new();
        assert!(!ctx.track(&dep, TrackOpType::Get));
        assert!(dep.is_empty());
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let ctx = TrackContext::new();
        let tracked = Dep::new();
        let ignored = Dep::new();

        let (t, i) = (tracked.clone(), ignored.clone());
        let effect = ctx.effect(move |ctx| {
            ctx.track(&t, TrackOpType::Get);
            ctx.untracked(|| {
                assert!(!ctx.is_tracking());
                ctx.track(&i, TrackOpType::Get);
            });
            assert!(ctx.is_tracking());
        });

        assert_eq!(effect.deps(), vec![tracked.clone()]);
        assert!(ignored.is_empty());
    }

    #[test]
    fn running_effect_is_not_reentered() {
        let ctx = TrackContext::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(parking_lot::Mutex::new(None::<ReactiveEffect>));

        let (r, s) = (runs.clone(), slot.clone());
        let effect = ctx.effect_with_options(
            move |ctx| {
                r.fetch_add(1, Ordering::SeqCst);
                let me = s.lock().clone();
                if let Some(me) = me {
                    assert!(!ctx.run(&me));
                }
            },
            EffectOptions::new().lazy(true),
        );
        *slot.lock() = Some(effect.clone());

        ctx.run(&effect);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn panicking_body_still_closes_the_pass() {
        let ctx = TrackContext::new();
        let dep = Dep::new();
        let d = dep.clone();

        let effect = ctx.effect_with_options(
            move |ctx| {
                ctx.track(&d, TrackOpType::Get);
                panic!("body failed");
            },
            EffectOptions::new().lazy(true),
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ctx.run(&effect)));
        assert!(result.is_err());
        assert_eq!(ctx.depth(), 0);
        assert!(!effect.is_running());
        assert_eq!(dep.markers(), (0, 0));
        assert_eq!(effect.deps(), vec![dep.clone()]);
    }

    #[test]
    fn stopped_effect_runs_untracked() {
        let ctx = TrackContext::new();
        let dep = Dep::new();
        let d = dep.clone();
        let effect = ctx.effect(move |ctx| {
            ctx.track(&d, TrackOpType::Get);
        });
        assert!(dep.contains(effect.id()));

        effect.stop();
        assert!(dep.is_empty());

        assert!(ctx.run(&effect));
        assert!(dep.is_empty());
        assert!(effect.deps().is_empty());
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn second_context_nests_below_open_passes() {
        let outer_ctx = TrackContext::new();
        let shared = Dep::new();
        let levels = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let (s, l) = (shared.clone(), levels.clone());
        let inner = ReactiveEffect::new(move |ctx| {
            l.lock().push(TrackContext::thread_depth());
            ctx.track(&s, TrackOpType::Get);
        });

        let (s, i, l) = (shared.clone(), inner.clone(), levels.clone());
        let outer = outer_ctx.effect(move |ctx| {
            l.lock().push(TrackContext::thread_depth());
            ctx.track(&s, TrackOpType::Get);
            assert!(TrackContext::new().run(&i));
        });

        assert_eq!(*levels.lock(), vec![1, 2]);
        assert_eq!(inner.deps(), vec![shared.clone()]);
        assert_eq!(outer.deps(), vec![shared.clone()]);
        assert_eq!(shared.subscriber_ids(), vec![outer.id(), inner.id()]);
        assert_eq!(shared.markers(), (0, 0));
        assert_eq!(TrackContext::thread_depth(), 0);

        // Re-run through the second context again; both subscriptions hold.
        outer_ctx.run(&outer);
        assert_eq!(inner.deps(), vec![shared.clone()]);
        assert_eq!(outer.deps(), vec![shared.clone()]);
        assert_eq!(shared.markers(), (0, 0));
    }

    #[test]
    fn refused_reentrant_run_is_not_counted() {
        let ctx = TrackContext::new();
        let dep = Dep::new();
        let counts = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let (d, c) = (dep.clone(), counts.clone());
        let effect = ctx.effect_with_options(
            move |ctx| {
                ctx.track(&d, TrackOpType::Get);
                let triggered = ctx.trigger(&d, TriggerOpType::Set);
                c.lock().push(triggered);
            },
            EffectOptions::new().allow_recurse(true),
        );

        assert_eq!(*counts.lock(), vec![0]);
        assert_eq!(effect.run_count(), 1);
        assert_eq!(ctx.trigger(&dep, TriggerOpType::Set), 1);
    }
}
