//! Effect Implementation
//!
//! A [`ReactiveEffect`] is a computation that re-runs when reactive data it
//! previously read changes. This module only defines the effect handle and
//! its options; running it under tracking is the job of
//! [`TrackContext`](super::TrackContext).
//!
//! # Deps sequence
//!
//! Each effect owns an ordered sequence of the [`Dep`]s it currently
//! subscribes to. The order is the order of first read on the last completed
//! run. The sequence is mirrored by the subscriber sets of those deps, and
//! the two views are only ever changed together by the functions in
//! [`tracking`](super::tracking).
//!
//! # Stopping
//!
//! [`ReactiveEffect::stop`] unsubscribes the effect from everything and
//! deactivates it. Stopping an effect from inside its own run is deferred
//! until that run's pass has been finalized.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::debug;

use super::context::TrackContext;
use super::dep::Dep;
use super::id::EffectId;
use super::ops::{TrackEvent, TriggerEvent};
use super::tracking::cleanup_effect;

/// Inline capacity of an effect's deps sequence.
const INLINE_DEPS: usize = 4;

pub(crate) type DepList = SmallVec<[Dep; INLINE_DEPS]>;

/// Decides when a triggered effect runs instead of running it right away.
pub type Scheduler = Arc<dyn Fn(&ReactiveEffect) + Send + Sync>;

type TrackHook = Arc<dyn Fn(&TrackEvent) + Send + Sync>;
type TriggerHook = Arc<dyn Fn(&TriggerEvent) + Send + Sync>;
type StopHook = Arc<dyn Fn() + Send + Sync>;

/// Options for creating an effect.
#[derive(Clone, Default)]
pub struct EffectOptions {
    lazy: bool,
    allow_recurse: bool,
    scheduler: Option<Scheduler>,
    on_track: Option<TrackHook>,
    on_trigger: Option<TriggerHook>,
    on_stop: Option<StopHook>,
}

impl EffectOptions {
    /// Options for an eager, non-recursive effect with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run the effect when it is created through
    /// [`TrackContext::effect_with_options`].
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Let the effect be triggered by writes made during its own run.
    pub fn allow_recurse(mut self, allow: bool) -> Self {
        self.allow_recurse = allow;
        self
    }

    /// Hand triggered runs to `scheduler` instead of running them inline.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&ReactiveEffect) + Send + Sync + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Called whenever the effect subscribes to a new dependency.
    pub fn on_track<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TrackEvent) + Send + Sync + 'static,
    {
        self.on_track = Some(Arc::new(hook));
        self
    }

    /// Called whenever a write triggers the effect.
    pub fn on_trigger<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TriggerEvent) + Send + Sync + 'static,
    {
        self.on_trigger = Some(Arc::new(hook));
        self
    }

    /// Called once when the effect is stopped.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }

    /// Whether the effect skips its initial run.
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("allow_recurse", &self.allow_recurse)
            .field("scheduler", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) struct EffectInner {
    id: EffectId,
    body: Box<dyn Fn(&TrackContext) + Send + Sync>,
    deps: Mutex<DepList>,
    active: AtomicBool,
    running: AtomicBool,
    defer_stop: AtomicBool,
    run_count: AtomicUsize,
    options: EffectOptions,
}

/// A reactive computation.
///
/// Cloning produces another handle to the same effect; equality is identity.
#[derive(Clone)]
pub struct ReactiveEffect {
    inner: Arc<EffectInner>,
}

/// A non-owning handle to an effect, held by the deps it subscribes to.
#[derive(Clone)]
pub struct WeakEffect {
    inner: Weak<EffectInner>,
}

impl WeakEffect {
    /// Get the effect back, if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<ReactiveEffect> {
        self.inner.upgrade().map(|inner| ReactiveEffect { inner })
    }
}

impl ReactiveEffect {
    /// Create an effect without running it.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&TrackContext) + Send + Sync + 'static,
    {
        Self::with_options(body, EffectOptions::default())
    }

    /// Create an effect with options, without running it.
    pub fn with_options<F>(body: F, options: EffectOptions) -> Self
    where
        F: Fn(&TrackContext) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(EffectInner {
                id: EffectId::new(),
                body: Box::new(body),
                deps: Mutex::new(SmallVec::new()),
                active: AtomicBool::new(true),
                running: AtomicBool::new(false),
                defer_stop: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
                options,
            }),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Snapshot of the deps sequence.
    pub fn deps(&self) -> Vec<Dep> {
        self.inner.deps.lock().to_vec()
    }

    /// Number of deps the effect currently subscribes to.
    pub fn dep_count(&self) -> usize {
        self.inner.deps.lock().len()
    }

    /// Whether the effect still tracks. Stopped effects do not.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Whether a run of this effect is currently open.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Whether writes made during the effect's own run may trigger it.
    pub fn allows_recurse(&self) -> bool {
        self.inner.options.allow_recurse
    }

    /// The scheduler triggered runs are handed to, if one was configured.
    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.inner.options.scheduler.as_ref()
    }

    /// Unsubscribe from every dependency and stop tracking.
    ///
    /// Inside the effect's own run this only takes effect once the run ends.
    pub fn stop(&self) {
        if self.is_running() {
            self.inner.defer_stop.store(true, Ordering::SeqCst);
            return;
        }

        if self.inner.active.swap(false, Ordering::SeqCst) {
            cleanup_effect(self);
            debug!(effect = self.id().raw(), "effect stopped");
            if let Some(on_stop) = &self.inner.options.on_stop {
                on_stop();
            }
        }
    }

    /// Create a non-owning handle, as stored in subscriber sets.
    pub fn downgrade(&self) -> WeakEffect {
        WeakEffect {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn deps_mut(&self) -> MutexGuard<'_, DepList> {
        self.inner.deps.lock()
    }

    pub(crate) fn invoke(&self, ctx: &TrackContext) {
        (self.inner.body)(ctx);
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn record_run(&self) {
        self.inner.run_count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn take_defer_stop(&self) -> bool {
        self.inner.defer_stop.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn notify_track(&self, event: &TrackEvent) {
        if let Some(hook) = &self.inner.options.on_track {
            hook(event);
        }
    }

    pub(crate) fn notify_trigger(&self, event: &TriggerEvent) {
        if let Some(hook) = &self.inner.options.on_trigger {
            hook(event);
        }
    }
}

impl PartialEq for ReactiveEffect {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ReactiveEffect {}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dep_count", &self.dep_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
