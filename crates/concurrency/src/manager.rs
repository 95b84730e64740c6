//! Transaction manager for one session's units of work
//!
//! Orchestrates start, flush, end and abort against the storage collaborator.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. flush   - stage pending notifications with storage (invisible to reads)
//! 2. commit  - storage validates and applies every staged notification at once
//! 3. IF either step fails: abort() and return the error
//! 4. mark Committed, return the outcome
//! ```
//!
//! There is no partial-commit state. Either every notification recorded in
//! the transaction reaches storage, or none does and the in-memory adapter
//! bookkeeping is rolled back. Adapters whose creation was discarded are
//! left for the owner of the identity map to collect with
//! [`TransactionManager::take_reverted_creations`].
//!
//! Aborting when nothing is active (never started, or already committed or
//! aborted) is a no-op.

use crate::transaction::{RevertedCreation, Transaction, TransactionState};
use causeway_core::{
    AdapterRef, Error, Identity, Notification, ObjectStore, Result, VersionSource,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared allocator of transaction identifiers
///
/// Storage keys its staging areas by transaction id, so every manager that
/// talks to one store must draw ids from the same allocator.
#[derive(Debug, Default)]
pub struct TxnIdAllocator {
    next: AtomicU64,
}

impl TxnIdAllocator {
    /// Allocator whose first id is `max_txn_id + 1`
    pub fn starting_after(max_txn_id: u64) -> Self {
        Self {
            next: AtomicU64::new(max_txn_id + 1),
        }
    }

    /// Allocate the next id
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

/// What a committed transaction produced
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    /// Committed transaction
    pub txn_id: u64,
    /// Notifications applied, in order
    pub notifications: Vec<Notification>,
    /// Informational messages
    pub messages: Vec<String>,
    /// Warnings
    pub warnings: Vec<String>,
    /// Distinct identities created or changed
    pub changed: Vec<Identity>,
    /// Distinct identities destroyed
    pub disposed: Vec<Identity>,
}

/// Transaction metrics
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionMetrics {
    /// Total number of transactions started
    pub total_started: u64,
    /// Total number of transactions committed
    pub total_committed: u64,
    /// Total number of transactions aborted
    pub total_aborted: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Total transactions that completed (committed + aborted)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted
    }

    /// Abort rate (aborted / started)
    pub fn abort_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_aborted as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}

/// Manages transaction lifecycle for one session
pub struct TransactionManager {
    store: Arc<dyn ObjectStore>,
    versions: Arc<dyn VersionSource>,
    ids: Arc<TxnIdAllocator>,
    /// Name stamped on versions produced by this manager
    user: Option<String>,
    /// Active transaction, or the last terminal one
    current: Option<Transaction>,
    total_started: u64,
    total_committed: u64,
    total_aborted: u64,
}

impl TransactionManager {
    /// Create a manager drawing ids from a shared allocator
    pub fn new(
        store: Arc<dyn ObjectStore>,
        versions: Arc<dyn VersionSource>,
        ids: Arc<TxnIdAllocator>,
    ) -> Self {
        Self {
            store,
            versions,
            ids,
            user: None,
            current: None,
            total_started: 0,
            total_committed: 0,
            total_aborted: 0,
        }
    }

    /// Create a manager with a private id allocator
    ///
    /// Only safe when no other manager shares `store`.
    pub fn standalone(store: Arc<dyn ObjectStore>, versions: Arc<dyn VersionSource>) -> Self {
        Self::new(store, versions, Arc::new(TxnIdAllocator::starting_after(0)))
    }

    /// Stamp versions with this user name
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    // === Inspection ===

    /// The active transaction, or the last terminal one
    pub fn transaction(&self) -> Option<&Transaction> {
        self.current.as_ref()
    }

    /// True if a transaction is active
    pub fn is_active(&self) -> bool {
        self.current.as_ref().map_or(false, Transaction::is_active)
    }

    /// Id of the active transaction
    pub fn active_txn_id(&self) -> Option<u64> {
        self.current
            .as_ref()
            .filter(|t| t.is_active())
            .map(Transaction::id)
    }

    /// Storage collaborator
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Version source
    pub fn versions(&self) -> &Arc<dyn VersionSource> {
        &self.versions
    }

    /// Transaction statistics for this manager
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            total_started: self.total_started,
            total_committed: self.total_committed,
            total_aborted: self.total_aborted,
            commit_rate: if self.total_started > 0 {
                self.total_committed as f64 / self.total_started as f64
            } else {
                0.0
            },
        }
    }

    fn active_mut(&mut self) -> Result<&mut Transaction> {
        match self.current.as_mut() {
            Some(txn) if txn.is_active() => Ok(txn),
            _ => Err(Error::NoActiveTransaction),
        }
    }

    // === Lifecycle ===

    /// Start a new transaction
    ///
    /// Fails if one is already active.
    pub fn start_transaction(&mut self) -> Result<u64> {
        if let Some(txn_id) = self.active_txn_id() {
            return Err(Error::TransactionAlreadyActive { txn_id });
        }

        let txn_id = self.ids.next_id();
        self.store.begin(txn_id)?;
        self.current = Some(Transaction::new(txn_id));
        self.total_started += 1;

        debug!(target: "causeway::txn", txn_id, "Transaction started");
        Ok(txn_id)
    }

    /// Stage pending notifications with storage without ending the unit of work
    ///
    /// Returns whether anything was flushed. A storage failure aborts the
    /// whole transaction before the error is returned.
    pub fn flush_transaction(&mut self) -> Result<bool> {
        let txn = self.active_mut()?;
        let txn_id = txn.id();
        let batch = txn.take_pending();
        if batch.is_empty() {
            return Ok(false);
        }

        if let Err(e) = self.store.flush(txn_id, &batch) {
            self.abort_active(format!("flush failed: {}", e));
            return Err(e);
        }

        debug!(target: "causeway::txn", txn_id, notifications = batch.len(), "Transaction flushed");
        Ok(true)
    }

    /// Flush, then commit the active transaction
    pub fn end_transaction(&mut self) -> Result<TransactionOutcome> {
        let txn_id = self.active_mut()?.id();
        self.flush_transaction()?;

        if let Err(e) = self.store.commit(txn_id) {
            self.abort_active(format!("commit failed: {}", e));
            return Err(e);
        }

        let txn = self.active_mut()?;
        let notifications = txn.all_notifications();
        let (messages, warnings) = txn.messages_mut().drain();
        let outcome = TransactionOutcome {
            txn_id,
            notifications,
            messages,
            warnings,
            changed: txn.updates().changed().to_vec(),
            disposed: txn.updates().disposed().to_vec(),
        };
        txn.mark_committed();
        self.total_committed += 1;

        info!(
            target: "causeway::txn",
            txn_id,
            notifications = outcome.notifications.len(),
            "Transaction committed"
        );
        Ok(outcome)
    }

    /// Discard all pending notifications and mark the transaction aborted
    ///
    /// No-op when nothing is active.
    pub fn abort_transaction(&mut self) -> Result<()> {
        if !self.is_active() {
            debug!(target: "causeway::txn", "Abort with no active transaction ignored");
            return Ok(());
        }
        self.abort_active("aborted by caller".to_string());
        Ok(())
    }

    fn abort_active(&mut self, reason: String) {
        if let Some(txn) = self.current.as_mut().filter(|t| t.is_active()) {
            let txn_id = txn.id();
            self.store.abort(txn_id);
            let discarded = txn.abort(reason.clone());
            self.total_aborted += 1;
            warn!(target: "causeway::txn", txn_id, discarded, %reason, "Transaction aborted");
        }
    }

    /// Creations discarded by the last abort, newest first
    ///
    /// Each adapter is still keyed under its persistent identity; the caller
    /// re-keys it. Empties the list.
    pub fn take_reverted_creations(&mut self) -> Vec<RevertedCreation> {
        self.current
            .as_mut()
            .map(Transaction::take_reverted)
            .unwrap_or_default()
    }

    /// Like [`TransactionManager::end_transaction`], but guarantees the
    /// transaction is not left active when the commit fails
    pub fn end_or_abort(&mut self) -> Result<TransactionOutcome> {
        let result = self.end_transaction();
        if result.is_err() && self.is_active() {
            self.abort_active("end failed".to_string());
        }
        result
    }

    // === Notifications ===

    /// Record that a freshly remapped adapter must be created in storage
    ///
    /// `transient` is the identity it held before the remap.
    pub fn object_created(&mut self, adapter: &AdapterRef, transient: Identity) -> Result<()> {
        self.active_mut()?.record_created(adapter, transient)
    }

    /// Record an object-changed notification
    pub fn object_changed(&mut self, adapter: &AdapterRef) -> Result<()> {
        let versions = Arc::clone(&self.versions);
        let user = self.user.clone();
        self.active_mut()?
            .record_changed(adapter, versions.as_ref(), user.as_deref())
    }

    /// Record an object-destroyed notification
    pub fn object_destroyed(&mut self, adapter: &AdapterRef) -> Result<()> {
        let versions = Arc::clone(&self.versions);
        let user = self.user.clone();
        self.active_mut()?
            .record_destroyed(adapter, versions.as_ref(), user.as_deref())
    }

    /// Add an informational message to the active transaction
    pub fn add_message(&mut self, message: impl Into<String>) -> Result<()> {
        self.active_mut()?.messages_mut().add_message(message);
        Ok(())
    }

    /// Add a warning to the active transaction
    pub fn add_warning(&mut self, warning: impl Into<String>) -> Result<()> {
        self.active_mut()?.messages_mut().add_warning(warning);
        Ok(())
    }

    /// State of the current (or last) transaction
    pub fn state(&self) -> Option<&TransactionState> {
        self.current.as_ref().map(Transaction::state)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("user", &self.user)
            .field("current", &self.current.as_ref().map(|t| (t.id(), t.state().clone())))
            .field("metrics", &self.metrics())
            .finish()
    }
}
