//! InMemoryObjectStore: reference storage collaborator
//!
//! This module implements the ObjectStore trait using:
//! - `FxHashMap<Identity, StoredRecord>` for committed state
//! - Per-transaction staging areas that reads never see
//! - `parking_lot` locks for thread-safe access from many sessions
//!
//! # Commit Sequence
//!
//! ```text
//! 1. Take the staged batch for the transaction
//! 2. Lock committed state for writing
//! 3. Validate and apply every notification to a scratch copy, in order
//! 4. IF any check fails: drop the scratch copy, return the error
//! 5. Publish the scratch copy and append the batch to the commit log
//! ```
//!
//! Validation is first-committer-wins: a changed or destroyed notification
//! whose base version differs from the committed version is a conflict. One
//! that carries no base version at all cannot be checked, so it is refused
//! whenever a committed record exists. Notifications for identities the store
//! has never seen are accepted as upserts.

use causeway_core::{
    Error, Identity, Notification, NotificationKind, ObjectStore, Result, StoredRecord,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Faults {
    flush: Option<String>,
    commit: Option<(usize, String)>,
}

/// Thread-safe in-memory storage with staged flushes and atomic commits
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    /// Committed object state
    records: RwLock<FxHashMap<Identity, StoredRecord>>,
    /// Flushed but uncommitted notifications per transaction
    staged: Mutex<FxHashMap<u64, Vec<Notification>>>,
    /// Every committed batch, in commit order
    log: RwLock<Vec<CommittedBatch>>,
    /// Armed failures for tests
    faults: Mutex<Faults>,
    commits: AtomicU64,
    aborts: AtomicU64,
}

/// One committed transaction as observed by storage
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedBatch {
    /// Transaction that produced the batch
    pub txn_id: u64,
    /// Notifications in application order
    pub notifications: Vec<Notification>,
}

impl InMemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed committed state directly, bypassing transactions
    ///
    /// Used to simulate objects that already exist in storage.
    pub fn seed(&self, record: StoredRecord) {
        self.records
            .write()
            .insert(record.identity.clone(), record);
    }

    // === Observation ===

    /// Committed record for `identity`
    pub fn record(&self, identity: &Identity) -> Option<StoredRecord> {
        self.records.read().get(identity).cloned()
    }

    /// Number of committed (including destroyed) records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True if nothing was ever committed or seeded
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// All committed batches in order
    pub fn committed_batches(&self) -> Vec<CommittedBatch> {
        self.log.read().clone()
    }

    /// Committed notifications produced by one transaction
    pub fn committed_for(&self, txn_id: u64) -> Vec<Notification> {
        self.log
            .read()
            .iter()
            .filter(|b| b.txn_id == txn_id)
            .flat_map(|b| b.notifications.iter().cloned())
            .collect()
    }

    /// Total committed notifications
    pub fn committed_notification_count(&self) -> usize {
        self.log.read().iter().map(|b| b.notifications.len()).sum()
    }

    /// Notifications staged (flushed, not committed) for a transaction
    pub fn staged_count(&self, txn_id: u64) -> usize {
        self.staged.lock().get(&txn_id).map_or(0, Vec::len)
    }

    /// Number of successful commits
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Number of aborted staging areas
    pub fn abort_count(&self) -> u64 {
        self.aborts.load(Ordering::Relaxed)
    }

    // === Fault injection ===

    /// Make the next flush fail
    pub fn fail_next_flush(&self, reason: impl Into<String>) {
        self.faults.lock().flush = Some(reason.into());
    }

    /// Make the next commit fail before applying anything
    pub fn fail_next_commit(&self, reason: impl Into<String>) {
        self.fail_next_commit_at(0, reason);
    }

    /// Make the next commit fail when it reaches notification `index`
    ///
    /// Earlier notifications have already been applied to the scratch copy
    /// by then, which exercises the all-or-nothing guarantee.
    pub fn fail_next_commit_at(&self, index: usize, reason: impl Into<String>) {
        self.faults.lock().commit = Some((index, reason.into()));
    }

    // === Commit internals ===

    fn apply_one(
        scratch: &mut FxHashMap<Identity, StoredRecord>,
        n: &Notification,
    ) -> Result<()> {
        let existing = scratch.get(&n.identity);

        match n.kind {
            NotificationKind::Created => {
                if let Some(record) = existing {
                    if !record.destroyed {
                        return Err(Error::storage(format!(
                            "{} already exists in storage",
                            n.identity
                        )));
                    }
                }
            }
            NotificationKind::Changed | NotificationKind::Destroyed => {
                if let Some(record) = existing {
                    if record.destroyed {
                        return Err(Error::storage(format!(
                            "{} was destroyed by another transaction",
                            n.identity
                        )));
                    }
                    let base = n.base_version.as_ref().ok_or_else(|| {
                        Error::storage(format!(
                            "{} has committed version {} but the {} notification has no base version",
                            n.identity, record.version, n.kind
                        ))
                    })?;
                    if record.version.different(base) {
                        return Err(Error::Concurrency {
                            identity: n.identity.clone(),
                            supplied: base.clone(),
                            current: record.version.clone(),
                        });
                    }
                }
            }
        }

        scratch.insert(
            n.identity.clone(),
            StoredRecord {
                identity: n.identity.clone(),
                version: n.version.clone(),
                memento: n.memento.clone(),
                destroyed: n.kind == NotificationKind::Destroyed,
            },
        );
        Ok(())
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn begin(&self, txn_id: u64) -> Result<()> {
        let mut staged = self.staged.lock();
        if staged.contains_key(&txn_id) {
            return Err(Error::storage(format!(
                "transaction {} already has a staging area",
                txn_id
            )));
        }
        staged.insert(txn_id, Vec::new());
        Ok(())
    }

    fn flush(&self, txn_id: u64, batch: &[Notification]) -> Result<()> {
        if let Some(reason) = self.faults.lock().flush.take() {
            warn!(target: "causeway::store", txn_id, %reason, "Injected flush failure");
            return Err(Error::Storage(reason));
        }

        let mut staged = self.staged.lock();
        let area = staged
            .get_mut(&txn_id)
            .ok_or_else(|| Error::storage(format!("unknown transaction {}", txn_id)))?;
        area.extend_from_slice(batch);

        debug!(target: "causeway::store", txn_id, staged = batch.len(), "Batch staged");
        Ok(())
    }

    fn commit(&self, txn_id: u64) -> Result<()> {
        let batch = self
            .staged
            .lock()
            .remove(&txn_id)
            .ok_or_else(|| Error::storage(format!("unknown transaction {}", txn_id)))?;
        let fault = self.faults.lock().commit.take();

        let mut records = self.records.write();
        let mut scratch = records.clone();

        for (index, n) in batch.iter().enumerate() {
            if let Some((at, reason)) = &fault {
                if *at == index {
                    warn!(target: "causeway::store", txn_id, index, %reason, "Injected commit failure");
                    return Err(Error::Storage(reason.clone()));
                }
            }
            if let Err(e) = Self::apply_one(&mut scratch, n) {
                warn!(target: "causeway::store", txn_id, identity = %n.identity, error = %e, "Commit rejected");
                return Err(e);
            }
        }

        *records = scratch;
        drop(records);

        let applied = batch.len();
        self.log.write().push(CommittedBatch {
            txn_id,
            notifications: batch,
        });
        self.commits.fetch_add(1, Ordering::Relaxed);

        info!(target: "causeway::store", txn_id, applied, "Batch committed");
        Ok(())
    }

    fn abort(&self, txn_id: u64) {
        if let Some(batch) = self.staged.lock().remove(&txn_id) {
            self.aborts.fetch_add(1, Ordering::Relaxed);
            debug!(target: "causeway::store", txn_id, discarded = batch.len(), "Staging area dropped");
        }
    }

    fn load(&self, identity: &Identity) -> Result<Option<StoredRecord>> {
        Ok(self.record(identity))
    }
}
