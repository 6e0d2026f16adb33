//! Tracking Passes
//!
//! One execution of an effect is bracketed by a tracking pass:
//!
//! 1. [`init_dep_markers`] stamps `was_tracked` at the pass depth on every dep
//!    the effect subscribed to on its previous run.
//! 2. While the body runs, every reactive read goes through
//!    [`track_effects`], which stamps `new_tracked` and subscribes the effect
//!    to deps it did not have before.
//! 3. [`finalize_dep_markers`] walks the deps sequence once. Deps with
//!    `was_tracked` set and `new_tracked` clear were dropped by this run and
//!    get unsubscribed; everything else is compacted to the front. Both bits
//!    are cleared on every dep visited.
//!
//! The cost of a pass is proportional to the effect's own deps. Nothing
//! outside them is scanned, and a nested pass at another depth works on a
//! different bit of the same markers.
//!
//! Past [`MAX_TRACK_DEPTH`](super::MAX_TRACK_DEPTH) there is no bit left, so
//! the runner falls back to [`cleanup_effect`] before the run and tracks with
//! a plain membership check (`depth == None` in [`track_effects`]).

use tracing::trace;

use super::context::TrackContext;
use super::dep::Dep;
use super::depth::TrackDepth;
use super::effect::ReactiveEffect;
use super::ops::{TrackEvent, TrackOpType, TriggerEvent, TriggerOpType};

/// Begin a pass: mark every currently subscribed dep as previously tracked.
pub fn init_dep_markers(effect: &ReactiveEffect, depth: TrackDepth) {
    let deps = effect.deps_mut();
    for dep in deps.iter() {
        dep.mark_was_tracked(depth);
    }
}

/// End a pass: unsubscribe from deps this run did not read, compact the deps
/// sequence in place and clear the markers at `depth`.
pub fn finalize_dep_markers(effect: &ReactiveEffect, depth: TrackDepth) {
    let mut deps = effect.deps_mut();
    if deps.is_empty() {
        return;
    }

    let mut ptr = 0;
    for i in 0..deps.len() {
        let dep = &deps[i];
        let was = dep.was_tracked(depth);
        let now = dep.new_tracked(depth);
        debug_assert!(
            was || now,
            "{:?} finalized at {} without a matching init",
            dep,
            depth
        );

        dep.clear_markers(depth);

        if was && !now {
            dep.remove_subscriber(effect.id());
            trace!(effect = effect.id().raw(), dep = dep.id().raw(), "pruned stale dependency");
        } else {
            // ptr <= i, so whatever sits at ptr is already visited.
            deps.swap(ptr, i);
            ptr += 1;
        }
    }
    deps.truncate(ptr);
}

/// Register a read of `dep` by `effect`.
///
/// `depth` is the depth of `effect`'s open pass, or `None` when the pass runs
/// past the marker cap. Repeated reads of the same dep during one run are
/// no-ops. Returns `true` if the dep was appended to the effect's deps.
pub fn track_effects(
    dep: &Dep,
    effect: &ReactiveEffect,
    depth: Option<TrackDepth>,
    op: TrackOpType,
) -> bool {
    let should_track = match depth {
        Some(depth) => {
            if dep.new_tracked(depth) {
                return false;
            }
            dep.mark_new_tracked(depth);
            !dep.was_tracked(depth)
        }
        None => !dep.contains(effect.id()),
    };

    if !should_track {
        return false;
    }
    // Deps already in the sequence are was- or new-tracked, so this dep is
    // absent from it even when the effect is already a subscriber.
    dep.add_subscriber(effect);
    effect.deps_mut().push(dep.clone());

    trace!(effect = effect.id().raw(), dep = dep.id().raw(), %op, "tracked");
    effect.notify_track(&TrackEvent {
        effect: effect.id(),
        dep: dep.id(),
        op,
    });
    true
}

/// Notify every live subscriber of `dep` that it changed.
///
/// The effect currently running in `ctx` is skipped unless it allows
/// recursion. Effects with a scheduler are handed to it; the rest run
/// immediately. Returns the number of effects that were run or handed to a
/// scheduler; a refused re-entrant run is not counted.
pub fn trigger_effects(ctx: &TrackContext, dep: &Dep, op: TriggerOpType) -> usize {
    let effects = dep.subscribers();
    let mut triggered = 0;

    for effect in effects {
        if ctx.is_current(&effect) && !effect.allows_recurse() {
            continue;
        }

        trace!(effect = effect.id().raw(), dep = dep.id().raw(), %op, "triggered");
        effect.notify_trigger(&TriggerEvent {
            effect: effect.id(),
            dep: dep.id(),
            op,
        });

        let handled = match effect.scheduler() {
            Some(scheduler) => {
                scheduler(&effect);
                true
            }
            None => ctx.run(&effect),
        };
        if handled {
            triggered += 1;
        }
    }

    triggered
}

/// Remove `effect` from every dep it subscribes to and empty its deps.
pub fn cleanup_effect(effect: &ReactiveEffect) {
    let mut deps = effect.deps_mut();
    for dep in deps.drain(..) {
        dep.remove_subscriber(effect.id());
    }
}
