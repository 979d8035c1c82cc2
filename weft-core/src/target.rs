//! Identity types for tracked state.
//!
//! The engine never holds the state it tracks. The interception layer owns
//! the actual data and identifies it to the hooks with a [`TargetId`] per
//! container and a [`Key`] per property, so the registry can key dependency
//! edges by identity rather than by value.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one tracked state container.
///
/// The interception layer allocates a `TargetId` when it instruments an
/// object and passes it to [`track`](crate::track)/[`trigger`](crate::trigger)
/// on every read and write of that object. Two reads belong to the same
/// dependency root exactly when their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a fresh target identity.
    ///
    /// Uses an atomic counter, so ids are unique across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// A property key within a tracked target.
///
/// Named fields use [`Key::Field`], positional slots in indexed collections
/// use [`Key::Index`]. Both [`From`] conversions exist so hook call sites
/// stay terse: `track(id, "count")`, `trigger(id, 3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named field or property.
    Field(&'static str),

    /// A positional slot in an indexed collection.
    Index(usize),
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Self::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_ids_are_unique() {
        let t1 = TargetId::new();
        let t2 = TargetId::new();
        let t3 = TargetId::new();

        assert_ne!(t1, t2);
        assert_ne!(t2, t3);
        assert_ne!(t1, t3);
    }

    #[test]
    fn key_conversions() {
        assert_eq!(Key::from("count"), Key::Field("count"));
        assert_eq!(Key::from(3), Key::Index(3));
        assert_ne!(Key::Field("0"), Key::Index(0));
    }

    #[test]
    fn key_display() {
        assert_eq!(Key::Field("count").to_string(), "count");
        assert_eq!(Key::Index(7).to_string(), "[7]");
        assert!(TargetId::new().to_string().starts_with("target#"));
    }
}
