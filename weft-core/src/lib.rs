//! Weft Core
//!
//! This crate is the dependency-tracking runtime underneath the Weft
//! reactive framework: it records which effects read which pieces of state
//! and re-executes exactly those effects when that state is later written.
//!
//! # Concepts
//!
//! ## Targets and keys
//!
//! The engine does not hold state. Whatever layer owns the data (a store, a
//! proxy, a component's fields) identifies it with a [`TargetId`] per
//! container and a [`Key`] per property, and brackets access with the two
//! hooks: [`track`] after every read, [`trigger`] after every write.
//!
//! ## Effects
//!
//! An [`effect`] wraps a computation. It runs once at creation; every
//! tracked read during a run records an edge from that `(target, key)` to
//! the effect. A later write to the key re-runs the effect, which re-records
//! its dependencies from scratch, so an effect whose reads change between
//! runs is only ever reachable through its latest reads.
//!
//! ## Attribution
//!
//! A thread-local stack identifies the effect currently running, so nested
//! effects attribute their reads correctly and a panicking computation
//! cannot leak its attribution to later code. [`untracked`] suppresses
//! attribution for a block; [`batch`] coalesces triggers raised in a block
//! into one re-run per dependent.
//!
//! # Hazards
//!
//! Writes cascade synchronously. A computation that writes a key it also
//! reads re-triggers itself and recurses without bound; this layer does not
//! detect such cycles.
//!
//! # Example
//!
//! The interception layer is not part of this crate; a few lines stand in
//! for it here, bracketing reads and writes of one stored number with the
//! two hooks:
//!
//! ```
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! use weft_core::{effect, track, trigger, TargetId};
//!
//! struct Count {
//!     id: TargetId,
//!     value: AtomicI64,
//! }
//!
//! impl Count {
//!     fn get(&self) -> i64 {
//!         track(self.id, "value");
//!         self.value.load(Ordering::SeqCst)
//!     }
//!
//!     fn set(&self, value: i64) {
//!         self.value.store(value, Ordering::SeqCst);
//!         trigger(self.id, "value");
//!     }
//! }
//!
//! let count = Arc::new(Count { id: TargetId::new(), value: AtomicI64::new(0) });
//! let doubled = Arc::new(AtomicI64::new(-1));
//!
//! let handle = effect({
//!     let count = Arc::clone(&count);
//!     let doubled = Arc::clone(&doubled);
//!     move || doubled.store(count.get() * 2, Ordering::SeqCst)
//! });
//! assert_eq!(doubled.load(Ordering::SeqCst), 0);
//!
//! count.set(5);
//! assert_eq!(doubled.load(Ordering::SeqCst), 10);
//!
//! handle.dispose();
//! count.set(7);
//! assert_eq!(doubled.load(Ordering::SeqCst), 10);
//! ```

mod batch;
mod context;
mod effect;
mod runtime;
mod target;

pub use batch::{batch, in_batch};
pub use context::{current_effect, is_tracking, untracked};
pub use effect::{effect, Effect, EffectId};
pub use runtime::{dependent_count, track, trigger};
pub use target::{Key, TargetId};
