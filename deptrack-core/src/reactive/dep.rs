//! Dependency Container
//!
//! A [`Dep`] is the subscription point for one reactive slot: it holds the
//! set of effects that read the slot, plus the two marker bitfields used while
//! a tracking pass is open.
//!
//! # Markers
//!
//! `was_tracked` and `new_tracked` each hold one bit per recursion depth (see
//! [`TrackDepth`]). For the effect running at depth `d`:
//!
//! - the `was_tracked` bit is set when the effect subscribed to this dep on its
//!   previous run,
//! - the `new_tracked` bit is set once the effect has read this dep during the
//!   current run.
//!
//! Both bits are zero whenever no pass at depth `d` is open.
//!
//! # Ownership
//!
//! Effects own their deps (strong handles in the effect's deps sequence), and
//! deps refer back to their subscribers weakly. Dropping the last handle to an
//! effect therefore never leaks it through the deps it read.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::depth::TrackDepth;
use super::effect::{ReactiveEffect, WeakEffect};
use super::id::{DepId, EffectId};

struct DepInner {
    id: DepId,

    /// Effects observing this slot, keyed by identity, in subscription order.
    subscribers: RwLock<IndexMap<EffectId, WeakEffect>>,

    /// wasTracked
    w: AtomicU32,

    /// newTracked
    n: AtomicU32,
}

/// A reactive dependency.
///
/// Cloning a `Dep` produces another handle to the same dependency.
#[derive(Clone)]
pub struct Dep {
    inner: Arc<DepInner>,
}

impl Dep {
    /// Create a dependency with no subscribers and cleared markers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DepInner {
                id: DepId::new(),
                subscribers: RwLock::new(IndexMap::new()),
                w: AtomicU32::new(0),
                n: AtomicU32::new(0),
            }),
        }
    }

    /// Create a dependency whose subscriber set is seeded from `effects`.
    ///
    /// Only the subscriber set is filled; the effects' own deps sequences are
    /// left alone. Useful for grouping effects that should be triggered
    /// together.
    pub fn with_effects<'a, I>(effects: I) -> Self
    where
        I: IntoIterator<Item = &'a ReactiveEffect>,
    {
        let dep = Self::new();
        {
            let mut subscribers = dep.inner.subscribers.write();
            for effect in effects {
                subscribers
                    .entry(effect.id())
                    .or_insert_with(|| effect.downgrade());
            }
        }
        dep
    }

    /// Get the dependency's unique ID.
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Whether the effect at `depth` subscribed to this dep before its
    /// current run began.
    #[inline]
    pub fn was_tracked(&self, depth: TrackDepth) -> bool {
        self.inner.w.load(Ordering::Relaxed) & depth.bit() != 0
    }

    /// Whether the effect at `depth` has read this dep during its current run.
    #[inline]
    pub fn new_tracked(&self, depth: TrackDepth) -> bool {
        self.inner.n.load(Ordering::Relaxed) & depth.bit() != 0
    }

    /// Raw `(was_tracked, new_tracked)` bitfields.
    pub fn markers(&self) -> (u32, u32) {
        (
            self.inner.w.load(Ordering::Relaxed),
            self.inner.n.load(Ordering::Relaxed),
        )
    }

    pub(crate) fn mark_was_tracked(&self, depth: TrackDepth) {
        self.inner.w.fetch_or(depth.bit(), Ordering::Relaxed);
    }

    pub(crate) fn mark_new_tracked(&self, depth: TrackDepth) {
        self.inner.n.fetch_or(depth.bit(), Ordering::Relaxed);
    }

    /// Clear both bits at `depth`, leaving every other depth untouched.
    pub(crate) fn clear_markers(&self, depth: TrackDepth) {
        let mask = !depth.bit();
        self.inner.w.fetch_and(mask, Ordering::Relaxed);
        self.inner.n.fetch_and(mask, Ordering::Relaxed);
    }

    /// Add an effect to the subscriber set.
    ///
    /// Returns `false` if it was already a member.
    pub(crate) fn add_subscriber(&self, effect: &ReactiveEffect) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        if subscribers.contains_key(&effect.id()) {
            return false;
        }
        subscribers.insert(effect.id(), effect.downgrade());
        true
    }

    /// Remove an effect from the subscriber set.
    ///
    /// Returns `false` if it was not a member.
    pub(crate) fn remove_subscriber(&self, effect: EffectId) -> bool {
        self.inner.subscribers.write().shift_remove(&effect).is_some()
    }

    /// Check whether an effect is subscribed.
    pub fn contains(&self, effect: EffectId) -> bool {
        self.inner.subscribers.read().contains_key(&effect)
    }

    /// Number of subscribed effects, including ones that have been dropped
    /// but not yet pruned.
    pub fn len(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Check whether nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.inner.subscribers.read().is_empty()
    }

    /// IDs of all subscribed effects, in subscription order.
    pub fn subscriber_ids(&self) -> Vec<EffectId> {
        self.inner.subscribers.read().keys().copied().collect()
    }

    /// Snapshot of the live subscribers, in subscription order.
    ///
    /// Entries whose effect has been dropped are removed along the way.
    pub fn subscribers(&self) -> Vec<ReactiveEffect> {
        let mut live = Vec::new();
        let mut dead = Vec::new();
        {
            let subscribers = self.inner.subscribers.read();
            for (id, weak) in subscribers.iter() {
                match weak.upgrade() {
                    Some(effect) => live.push(effect),
                    None => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.inner.subscribers.write();
            for id in dead {
                subscribers.shift_remove(&id);
            }
        }

        live
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Dep {}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, n) = self.markers();
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscribers", &self.subscriber_ids())
            .field("was_tracked", &format_args!("{w:#b}"))
            .field("new_tracked", &format_args!("{n:#b}"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(level: u32) -> TrackDepth {
        TrackDepth::new(level).unwrap()
    }

    #[test]
    fn new_dep_is_empty_and_clear() {
        let dep = Dep::new();
        assert!(dep.is_empty());
        assert_eq!(dep.markers(), (0, 0));
        assert!(!dep.was_tracked(TrackDepth::ROOT));
        assert!(!dep.new_tracked(TrackDepth::ROOT));
    }

    #[test]
    fn with_effects_seeds_subscribers() {
        let a = ReactiveEffect::new(|_| {});
        let b = ReactiveEffect::new(|_| {});

        let dep = Dep::with_effects([&a, &b, &a]);
        assert_eq!(dep.subscriber_ids(), vec![a.id(), b.id()]);
        assert_eq!(dep.markers(), (0, 0));

        // Seeding does not touch the effects' own deps.
        assert!(a.deps().is_empty());
    }

    #[test]
    fn membership_is_idempotent() {
        let effect = ReactiveEffect::new(|_| {});
        let dep = Dep::new();

        assert!(dep.add_subscriber(&effect));
        assert!(!dep.add_subscriber(&effect));
        assert_eq!(dep.len(), 1);

        assert!(dep.remove_subscriber(effect.id()));
        assert!(!dep.remove_subscriber(effect.id()));
        assert!(!dep.contains(effect.id()));
    }

    #[test]
    fn markers_are_per_depth() {
        let dep = Dep::new();

        dep.mark_was_tracked(depth(1));
        dep.mark_new_tracked(depth(2));

        assert!(dep.was_tracked(depth(1)));
        assert!(!dep.was_tracked(depth(2)));
        assert!(dep.new_tracked(depth(2)));
        assert!(!dep.new_tracked(depth(1)));

        dep.clear_markers(depth(1));
        assert!(!dep.was_tracked(depth(1)));
        assert!(dep.new_tracked(depth(2)));

        dep.clear_markers(depth(2));
        assert_eq!(dep.markers(), (0, 0));
    }

    #[test]
    fn dropped_subscribers_are_pruned_from_snapshots() {
        let kept = ReactiveEffect::new(|_| {});
        let dropped = ReactiveEffect::new(|_| {});
        let dep = Dep::with_effects([&kept, &dropped]);

        drop(dropped);
        assert_eq!(dep.len(), 2);

        let live = dep.subscribers();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id(), kept.id());
        assert_eq!(dep.len(), 1);
    }

    #[test]
    fn equality_is_identity() {
        let a = Dep::new();
        let b = Dep::new();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
