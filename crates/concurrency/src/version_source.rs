//! Version sources
//!
//! [`SequenceVersionSource`] hands out sequences from one monotonic counter,
//! so a new version is newer than every version the source ever produced,
//! not just the identity's previous one. The clock only decorates the stamp.

use causeway_core::{Identity, Version, VersionSource};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy)]
enum Clock {
    System,
    Fixed(DateTime<Utc>),
}

/// Counter-backed version source
#[derive(Debug)]
pub struct SequenceVersionSource {
    /// Last sequence handed out
    last: AtomicU64,
    clock: Clock,
}

impl SequenceVersionSource {
    /// Source starting after `initial`, stamped with wall-clock time
    pub fn new(initial: u64) -> Self {
        Self {
            last: AtomicU64::new(initial),
            clock: Clock::System,
        }
    }

    /// Deterministic source for tests: every stamp carries `at`
    pub fn fixed(initial: u64, at: DateTime<Utc>) -> Self {
        Self {
            last: AtomicU64::new(initial),
            clock: Clock::Fixed(at),
        }
    }

    /// Last sequence handed out
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }

    fn now(&self) -> DateTime<Utc> {
        match self.clock {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => at,
        }
    }
}

impl Default for SequenceVersionSource {
    fn default() -> Self {
        Self::new(0)
    }
}

impl VersionSource for SequenceVersionSource {
    fn next_version(
        &self,
        _identity: &Identity,
        previous: Option<&Version>,
        user: Option<&str>,
    ) -> Version {
        let floor = previous.map_or(0, Version::sequence);
        // A version loaded from storage may be ahead of this counter
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(last.max(floor) + 1)
            })
            .unwrap_or_else(|last| last);
        let sequence = prev.max(floor) + 1;
        Version::stamped(sequence, user.map(str::to_string), self.now())
    }
}
