//! Effect: a computation re-executed when state it read changes.
//!
//! # How effects work
//!
//! 1. Creating an effect runs its computation once, immediately. Every
//!    tracked read performed by that run registers a dependency edge naming
//!    the effect.
//!
//! 2. Writing a tracked key re-runs every effect registered against it.
//!
//! 3. A re-run releases the effect's previous edges first, then records
//!    fresh ones while the computation executes. Dependencies may differ
//!    between runs (a branch changed), and only the latest run's reads
//!    count.
//!
//! # Lifecycle
//!
//! The runtime holds the strong reference to every effect it registers, so
//! an effect keeps responding to writes even after every [`Effect`] handle
//! is dropped. [`Effect::dispose`] is the only way to stop one: it removes
//! the effect from every dependency set it occupies and unregisters it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::context::TrackingScope;
use crate::runtime;
use crate::target::{Key, TargetId};

/// Dependency edges an effect holds inline before spilling to the heap.
/// Most effects read a handful of keys.
const INLINE_EDGES: usize = 8;

/// The `(target, key)` pairs an effect is currently registered against.
pub(crate) type EdgeList = SmallVec<[(TargetId, Key); INLINE_EDGES]>;

/// Unique identifier for an effect.
///
/// Dependency sets store ids rather than effect references; the runtime's
/// registry resolves an id back to the live effect during trigger fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    /// Mint the next effect id. Ids are unique across threads.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// Shared state behind every [`Effect`] handle.
pub(crate) struct EffectInner {
    id: EffectId,

    /// The wrapped computation. Re-run as-is on every trigger.
    computation: Box<dyn Fn() + Send + Sync>,

    /// False once disposed; a disposed effect never runs again.
    active: AtomicBool,

    /// Completed runs, for diagnostics and tests.
    runs: AtomicU64,

    /// Reverse edges: every dependency set this effect currently occupies.
    /// Drained before each run and by dispose, so stale edges from an older
    /// code path never outlive the run that recorded them.
    edges: Mutex<EdgeList>,
}

impl EffectInner {
    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Record that the read hook inserted this effect into the set for
    /// `(target, key)`.
    pub(crate) fn remember_edge(&self, target: TargetId, key: Key) {
        self.edges.lock().push((target, key));
    }

    /// Remove and return every recorded edge.
    pub(crate) fn take_edges(&self) -> EdgeList {
        std::mem::take(&mut *self.edges.lock())
    }

    /// Execute the computation, re-establishing dependencies from scratch.
    ///
    /// No-op once disposed. The tracking scope is restored on the way out
    /// even when the computation panics.
    pub(crate) fn run(&self) {
        if !self.is_active() {
            return;
        }

        runtime::release_edges(self);

        let _scope = TrackingScope::enter(self.id);
        (self.computation)();

        let runs = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(effect = %self.id, runs, "effect ran");
    }
}

/// Handle to a registered effect.
///
/// Returned by [`effect`] and [`Effect::new`]; by the time the handle
/// exists, the computation has already run once and its dependencies are
/// established. Cloning shares the underlying effect.
#[must_use = "dropping the handle does not dispose the effect"]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create an effect and run it once to establish its dependencies.
    pub fn new<F>(computation: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_deferred(computation);
        effect.inner.run();
        effect
    }

    /// Create an effect without running it.
    ///
    /// It has no dependencies until its first [`run`](Self::run), so no
    /// write can reach it before then.
    pub fn new_deferred<F>(computation: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            id: EffectId::next(),
            computation: Box::new(computation),
            active: AtomicBool::new(true),
            runs: AtomicU64::new(0),
            edges: Mutex::new(EdgeList::new()),
        });

        // Register before the first run: the read hook resolves the id
        // through the registry while recording reverse edges.
        runtime::register(Arc::clone(&inner));
        tracing::debug!(effect = %inner.id, "effect created");

        Self { inner }
    }

    /// The effect's unique id.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Re-run the computation now, exactly as a trigger would.
    pub fn run(&self) {
        self.inner.run();
    }

    /// Stop the effect.
    ///
    /// Removes it from every dependency set it occupies and unregisters it,
    /// so future triggers skip it. Idempotent.
    pub fn dispose(&self) {
        if self.inner.active.swap(false, Ordering::AcqRel) {
            runtime::release_edges(&self.inner);
            runtime::unregister(self.inner.id);
            tracing::debug!(effect = %self.inner.id, "effect disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        !self.inner.is_active()
    }

    /// Completed runs since creation. The initial run counts.
    pub fn run_count(&self) -> u64 {
        self.inner.runs.load(Ordering::Relaxed)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("runs", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create an effect: run `computation` once now, and again whenever tracked
/// state it read is written.
///
/// The returned handle is the disposer; see [`Effect::dispose`].
pub fn effect<F>(computation: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(computation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let _effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_effect_waits_for_first_run() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new_deferred(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 0);

        effect.run();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn disposed_effect_does_not_run() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        effect.dispose();
        assert!(effect.is_disposed());

        effect.run();
        effect.run();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let effect = Effect::new(|| {});

        effect.dispose();
        effect.dispose();

        assert!(effect.is_disposed());
    }

    #[test]
    fn clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        assert_eq!(effect2.run_count(), 1);

        effect1.run();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }

    #[test]
    fn run_counts_completed_runs() {
        let effect = Effect::new(|| {});
        assert_eq!(effect.run_count(), 1);

        effect.run();
        effect.run();
        assert_eq!(effect.run_count(), 3);
    }
}
