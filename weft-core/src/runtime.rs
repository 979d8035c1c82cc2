//! Dependency registry and the track/trigger hooks.
//!
//! This is the process-wide bookkeeping that connects tracked state to the
//! effects reading it.
//!
//! # Structure
//!
//! Two maps:
//!
//! - The dependency map, `target → key → set of effect ids`. Entries appear
//!   lazily on the first tracked read and are pruned when re-runs or
//!   disposal release the edges pointing at them, so the map only describes
//!   live dependencies.
//!
//! - The effect registry, `id → effect`. It holds the strong reference that
//!   keeps an undisposed effect alive and resolves ids during fan-out.
//!
//! # Notification protocol
//!
//! [`trigger`] snapshots the dependent set before running anything: re-runs
//! re-register themselves (and may register brand-new effects) against the
//! very set being iterated, and a snapshot makes that mutation harmless.
//! All locks are released before any computation executes.
//!
//! # Known hazard
//!
//! A computation that writes a key it also reads re-enters [`trigger`] on
//! itself and recurses without bound. This layer does not detect or break
//! such cycles; avoiding them is the caller's responsibility.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::batch;
use crate::context;
use crate::effect::{EffectId, EffectInner};
use crate::target::{Key, TargetId};

/// Forward dependency map: target → key → effects that read that key.
type DepMap = HashMap<TargetId, HashMap<Key, IndexSet<EffectId>>>;

/// Effect ids resolved per trigger before any effect runs.
type FanOut = SmallVec<[EffectId; 8]>;

static DEP_MAP: OnceLock<RwLock<DepMap>> = OnceLock::new();
static EFFECTS: OnceLock<DashMap<EffectId, Arc<EffectInner>>> = OnceLock::new();

fn dep_map() -> &'static RwLock<DepMap> {
    DEP_MAP.get_or_init(|| RwLock::new(HashMap::new()))
}

fn effects() -> &'static DashMap<EffectId, Arc<EffectInner>> {
    EFFECTS.get_or_init(DashMap::new)
}

/// Keep `inner` resolvable (and alive) for trigger fan-out.
pub(crate) fn register(inner: Arc<EffectInner>) {
    effects().insert(inner.id(), inner);
}

/// Forget a disposed effect.
pub(crate) fn unregister(id: EffectId) {
    effects().remove(&id);
}

/// Record a read of `key` on `target`, attributing it to the active effect.
///
/// Called by the interception layer immediately after a successful read. A
/// no-op when no effect is running: there is nothing to attribute the read
/// to. Also a no-op when the active effect was disposed earlier in its own
/// run. Reading the same key twice in one run records one edge (set
/// semantics). Never fails.
pub fn track(target: TargetId, key: impl Into<Key>) {
    let Some(effect_id) = context::current_effect() else {
        return;
    };

    // Resolve the effect before touching the dependency map: a computation
    // may dispose its own effect partway through a run, and reads after
    // that point must register nothing. Inserting the forward edge first
    // would leave an entry no reverse edge can ever prune.
    let Some(inner) = effects().get(&effect_id).map(|e| Arc::clone(e.value())) else {
        return;
    };
    if !inner.is_active() {
        return;
    }
    let key = key.into();

    let inserted = dep_map()
        .write()
        .entry(target)
        .or_default()
        .entry(key)
        .or_default()
        .insert(effect_id);

    if inserted {
        // Reverse edge, so re-run pruning and dispose can find this set.
        // The dep map lock is already released here; a dispose racing past
        // this point leaves at most one stale id, which fan-out skips.
        inner.remember_edge(target, key);
        tracing::trace!(%target, %key, effect = %effect_id, "dependency recorded");
    }
}

/// Re-run every effect that read `key` on `target`.
///
/// Called by the interception layer immediately after a successful write. A
/// no-op when nothing ever read the key. Inside a [`batch`](crate::batch)
/// the dependents are queued instead of run.
///
/// This layer never sees the written value, so every call notifies,
/// including writes that left the value unchanged; equality
/// short-circuiting is the interception layer's choice to make. Fan-out
/// order across effects is currently first-registration order and is not a
/// contract.
pub fn trigger(target: TargetId, key: impl Into<Key>) {
    let key = key.into();

    let ids: FanOut = {
        let deps = dep_map().read();
        match deps.get(&target).and_then(|keys| keys.get(&key)) {
            Some(dependents) => dependents.iter().copied().collect(),
            None => return,
        }
    };
    if ids.is_empty() {
        return;
    }

    tracing::trace!(%target, %key, dependents = ids.len(), "trigger");

    if batch::defer(&ids) {
        return;
    }
    run_effects(&ids);
}

/// Resolve ids to live effects and run each one.
///
/// Strong references are collected first: running a computation re-enters
/// the registry through the read hook, so no registry lock may be held
/// while it executes. Ids whose effect was disposed resolve to nothing and
/// are skipped.
pub(crate) fn run_effects(ids: &[EffectId]) {
    let live: SmallVec<[Arc<EffectInner>; 8]> = ids
        .iter()
        .filter_map(|id| effects().get(id).map(|entry| Arc::clone(entry.value())))
        .collect();

    for inner in live {
        inner.run();
    }
}

/// Drop every dependency edge naming `effect`.
///
/// Emptied key sets and emptied target maps are removed as well, so the
/// registry does not accumulate dead structure as dependencies shift
/// between runs.
pub(crate) fn release_edges(effect: &EffectInner) {
    // Drain the reverse-edge list before taking the map lock; the two are
    // never held together.
    let edges = effect.take_edges();
    if edges.is_empty() {
        return;
    }

    let mut deps = dep_map().write();
    for (target, key) in edges {
        let Some(keys) = deps.get_mut(&target) else {
            continue;
        };
        if let Some(dependents) = keys.get_mut(&key) {
            dependents.swap_remove(&effect.id());
            if dependents.is_empty() {
                keys.remove(&key);
            }
        }
        if keys.is_empty() {
            deps.remove(&target);
        }
    }
}

/// Number of effects currently registered against `(target, key)`.
///
/// The count a write to that key would fan out to. Diagnostic helper.
pub fn dependent_count(target: TargetId, key: impl Into<Key>) -> usize {
    let key = key.into();
    dep_map()
        .read()
        .get(&target)
        .and_then(|keys| keys.get(&key))
        .map_or(0, |dependents| dependents.len())
}
