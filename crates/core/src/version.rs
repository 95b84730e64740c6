//! Version stamps for optimistic concurrency
//!
//! A [`Version`] records the last known persisted state of one identity.
//! Only the `sequence` takes part in the "different" predicate; the user and
//! timestamp are informational and travel with the stamp for auditing.
//!
//! ## Invariants
//!
//! - Versions held by one identity have strictly increasing sequences
//! - Two versions are different iff their sequences differ

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, comparable stamp of last known persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    sequence: u64,
    user: Option<String>,
    utc_timestamp: Option<DateTime<Utc>>,
}

impl Version {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a bare version with only a sequence
    pub const fn new(sequence: u64) -> Self {
        Self {
            sequence,
            user: None,
            utc_timestamp: None,
        }
    }

    /// Create a version stamped with user and time
    pub fn stamped(sequence: u64, user: Option<String>, utc_timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence,
            user,
            utc_timestamp: Some(utc_timestamp),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Monotonic sequence
    #[inline]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// User that produced this version, if stamped
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Time this version was produced, if stamped
    pub fn utc_timestamp(&self) -> Option<DateTime<Utc>> {
        self.utc_timestamp
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// True if the stamps differ, meaning a write based on `other` is stale
    #[inline]
    pub fn different(&self, other: &Version) -> bool {
        self.sequence != other.sequence
    }

    /// True if this version is strictly newer than `other`
    #[inline]
    pub fn is_newer_than(&self, other: &Version) -> bool {
        self.sequence > other.sequence
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        !self.different(other)
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sequence.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.sequence)
    }
}

impl From<u64> for Version {
    fn from(sequence: u64) -> Self {
        Version::new(sequence)
    }
}

// ============================================================================
// Tests
// ============================================================================
