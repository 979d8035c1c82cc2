//! Deferred trigger delivery.
//!
//! By default a write cascades synchronously: N writes to keys sharing a
//! dependent re-run that dependent N times. [`batch`] is the opt-in
//! coalescing policy for callers who want one re-run instead. The trigger
//! hook only consults the batch state; nothing here changes the default
//! synchronous protocol.
//!
//! Batching is per-thread, like the tracking context.

use std::cell::{Cell, RefCell};

use indexmap::IndexSet;

use crate::effect::EffectId;
use crate::runtime;

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
    static PENDING: RefCell<IndexSet<EffectId>> = RefCell::new(IndexSet::new());
}

/// Coalesce every trigger raised inside `f`.
///
/// While `f` runs, dependents of written keys are queued (deduplicated)
/// instead of re-run; when the outermost batch scope exits, each queued
/// effect runs once. Writes performed by those flush runs are past the
/// batch and cascade synchronously again. Batches nest: inner scopes
/// coalesce into the outermost one.
///
/// If `f` panics, the queued re-runs are discarded; effects do not run
/// during unwinding.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::enter();
    f()
}

/// Whether the current thread is inside a [`batch`].
pub fn in_batch() -> bool {
    DEPTH.with(|depth| depth.get() > 0)
}

/// Queue `ids` if a batch is active on this thread.
///
/// Returns false when no batch is active and triggering should proceed
/// synchronously.
pub(crate) fn defer(ids: &[EffectId]) -> bool {
    if !in_batch() {
        return false;
    }
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        for id in ids {
            pending.insert(*id);
        }
    });
    true
}

struct BatchScope;

impl BatchScope {
    fn enter() -> Self {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = DEPTH.with(|depth| {
            let next = depth.get() - 1;
            depth.set(next);
            next == 0
        });
        if !outermost {
            return;
        }

        let pending: Vec<EffectId> =
            PENDING.with(|pending| pending.borrow_mut().drain(..).collect());
        if pending.is_empty() {
            return;
        }

        if std::thread::panicking() {
            tracing::debug!(dropped = pending.len(), "batch unwound, queued re-runs discarded");
            return;
        }

        tracing::trace!(effects = pending.len(), "batch flush");
        runtime::run_effects(&pending);
    }
}
