//! Identity generators
//!
//! Two schemes ship with the engine:
//! - [`SequenceIdentityGenerator`]: numeric keys from two monotonic counters,
//!   one for transient and one for persistent identities. Deterministic, so it
//!   is what tests use.
//! - [`UuidIdentityGenerator`]: uuid v4 string keys.
//!
//! Counters are shared across types. A key is unique within its type either
//! way, which is all identity equality needs.

use causeway_core::{Identity, IdentityGenerator};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Counter-backed identity generator
#[derive(Debug)]
pub struct SequenceIdentityGenerator {
    next_transient: AtomicU64,
    next_persistent: AtomicU64,
}

impl SequenceIdentityGenerator {
    /// Generator whose first keys are `1`
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Generator whose first persistent key is `first_persistent`
    ///
    /// Useful when storage already holds objects keyed below that value.
    pub fn starting_at(first_persistent: u64) -> Self {
        Self {
            next_transient: AtomicU64::new(1),
            next_persistent: AtomicU64::new(first_persistent),
        }
    }
}

impl Default for SequenceIdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityGenerator for SequenceIdentityGenerator {
    fn new_transient_identity(&self, type_name: &str) -> Identity {
        let key = self.next_transient.fetch_add(1, Ordering::Relaxed);
        Identity::transient(type_name, key)
    }

    fn convert_transient_to_persistent(&self, transient: &Identity) -> Identity {
        let key = self.next_persistent.fetch_add(1, Ordering::Relaxed);
        Identity::persistent(transient.type_name(), key)
    }
}

/// Random (uuid v4) identity generator
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdentityGenerator;

impl IdentityGenerator for UuidIdentityGenerator {
    fn new_transient_identity(&self, type_name: &str) -> Identity {
        Identity::transient(type_name, Uuid::new_v4().to_string())
    }

    fn convert_transient_to_persistent(&self, transient: &Identity) -> Identity {
        Identity::persistent(transient.type_name(), Uuid::new_v4().to_string())
    }
}
