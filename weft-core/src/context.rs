//! Read-tracking context.
//!
//! The context answers one question for the read hook: which effect, if any,
//! should a read be attributed to right now?
//!
//! # Implementation
//!
//! Each thread keeps a stack of tracking frames. Running an effect pushes a
//! frame carrying its id; the frame is popped by an RAII guard when the run
//! finishes, so the outer effect's frame is restored after a nested effect
//! completes and after a panicking computation unwinds. A flat "current
//! effect" slot would lose the outer effect in both of those cases.
//!
//! [`untracked`] pushes a shielding frame instead: while it is on top,
//! reads are attributed to nobody.
//!
//! The stack is thread-local. Attribution is meaningless across concurrently
//! running computations, so each thread gets its own current effect.

use std::cell::RefCell;

use crate::effect::EffectId;

thread_local! {
    static TRACKING_STACK: RefCell<Vec<Option<EffectId>>> = RefCell::new(Vec::new());
}

/// Guard that pops its tracking frame when dropped.
///
/// Dropping on unwind is what keeps a panic inside one effect's computation
/// from corrupting attribution for unrelated future effects.
pub(crate) struct TrackingScope {
    frame: Option<EffectId>,
}

impl TrackingScope {
    /// Attribute reads on this thread to `id` until the scope drops.
    pub(crate) fn enter(id: EffectId) -> Self {
        TRACKING_STACK.with(|stack| stack.borrow_mut().push(Some(id)));
        Self { frame: Some(id) }
    }

    /// Suppress attribution until the scope drops.
    pub(crate) fn shield() -> Self {
        TRACKING_STACK.with(|stack| stack.borrow_mut().push(None));
        Self { frame: None }
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        TRACKING_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Scopes are strictly nested; popping someone else's frame means
            // a guard escaped its run.
            debug_assert_eq!(
                popped,
                Some(self.frame),
                "tracking scope popped out of order"
            );
        });
    }
}

/// The effect reads on this thread are currently attributed to, if any.
pub fn current_effect() -> Option<EffectId> {
    TRACKING_STACK.with(|stack| stack.borrow().last().copied().flatten())
}

/// Whether an effect is currently recording its reads on this thread.
pub fn is_tracking() -> bool {
    current_effect().is_some()
}

/// Run `f` without attributing its reads to any effect.
///
/// Reads inside `f` establish no dependency edges, even when called from
/// within a running effect's computation. Writes inside `f` still trigger
/// normally.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _shield = TrackingScope::shield();
    f()
}
