//! Transaction: one unit-of-work boundary
//!
//! A Transaction collects the change notifications recorded while it is
//! active, plus the side-channel messages and update records a unit of work
//! produces. Recording a change or destroy bumps the adapter's version at
//! once, so several updates to one object inside one transaction are replayed
//! to storage in order with distinct stamps.
//!
//! ## Lifecycle
//!
//! ```text
//! Active -> Committed
//! Active -> Aborted
//! ```
//!
//! Terminal states accept nothing. Aborting restores every touched adapter's
//! resolve-state and version (newest change first) and hands back the
//! adapters whose creation was discarded, so the identity map can return
//! them to their transient identities. Domain field values mutated through
//! the adapter are not restored. Either way the change lists are released
//! once the transaction is terminal.

use causeway_core::{
    AdapterMark, AdapterRef, Error, Identity, Notification, NotificationKind, ResolveState,
    Result, VersionSource,
};
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};

/// Status of a transaction in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting notifications
    Active,
    /// Committed successfully
    Committed,
    /// Aborted; nothing reached storage
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

impl TransactionState {
    /// True for `Committed` and `Aborted`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionState::Active)
    }
}

/// A recorded change together with what it takes to undo its bookkeeping
#[derive(Debug, Clone)]
pub struct PendingChange {
    adapter: AdapterRef,
    notification: Notification,
    before: AdapterMark,
    /// Identity held before a created notification's remap
    transient: Option<Identity>,
}

impl PendingChange {
    /// Adapter the change applies to
    pub fn adapter(&self) -> &AdapterRef {
        &self.adapter
    }

    /// Notification handed to storage
    pub fn notification(&self) -> &Notification {
        &self.notification
    }
}

/// Informational messages accumulated during a unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBroker {
    messages: Vec<String>,
    warnings: Vec<String>,
}

impl MessageBroker {
    /// Add an informational message
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Messages in the order added
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Warnings in the order added
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Clear both lists, returning their contents
    pub fn drain(&mut self) -> (Vec<String>, Vec<String>) {
        (
            std::mem::take(&mut self.messages),
            std::mem::take(&mut self.warnings),
        )
    }
}

/// A creation discarded by abort: the adapter and the transient identity it
/// held before it was remapped
#[derive(Debug, Clone)]
pub struct RevertedCreation {
    /// Adapter that is persistent in memory only
    pub adapter: AdapterRef,
    /// Identity to re-key it under
    pub transient: Identity,
}

/// Which objects a unit of work touched
#[derive(Debug, Clone, Default)]
pub struct UpdateNotifier {
    changed: Vec<Identity>,
    disposed: Vec<Identity>,
    seen_changed: FxHashSet<Identity>,
    seen_disposed: FxHashSet<Identity>,
}

impl UpdateNotifier {
    fn add_changed(&mut self, identity: &Identity) {
        if self.seen_changed.insert(identity.clone()) {
            self.changed.push(identity.clone());
        }
    }

    fn add_disposed(&mut self, identity: &Identity) {
        if self.seen_disposed.insert(identity.clone()) {
            self.disposed.push(identity.clone());
        }
    }

    /// Distinct identities created or changed, first touch first
    pub fn changed(&self) -> &[Identity] {
        &self.changed
    }

    /// Distinct identities destroyed
    pub fn disposed(&self) -> &[Identity] {
        &self.disposed
    }
}

/// One unit of work
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    state: TransactionState,
    /// Recorded, not yet flushed
    pending: Vec<PendingChange>,
    /// Flushed to storage (staged), not yet committed
    flushed: Vec<PendingChange>,
    messages: MessageBroker,
    updates: UpdateNotifier,
    /// Creations undone by abort, until the session re-keys them
    reverted: Vec<RevertedCreation>,
    started: Instant,
}

impl Transaction {
    /// New active transaction
    pub fn new(id: u64) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            pending: Vec::new(),
            flushed: Vec::new(),
            messages: MessageBroker::default(),
            updates: UpdateNotifier::default(),
            reverted: Vec::new(),
            started: Instant::now(),
        }
    }

    // === Accessors ===

    /// Transaction identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state
    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    /// True while accepting notifications
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Notifications recorded but not yet flushed
    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter().map(|c| &c.notification)
    }

    /// Number of notifications recorded but not yet flushed
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of notifications already flushed
    pub fn flushed_count(&self) -> usize {
        self.flushed.len()
    }

    /// Side-channel messages
    pub fn messages(&self) -> &MessageBroker {
        &self.messages
    }

    /// Mutable access to side-channel messages
    pub fn messages_mut(&mut self) -> &mut MessageBroker {
        &mut self.messages
    }

    /// Touched objects
    pub fn updates(&self) -> &UpdateNotifier {
        &self.updates
    }

    /// Time since the transaction started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::illegal_state(format!(
                "transaction {} is {:?}, cannot record",
                self.id, self.state
            )))
        }
    }

    // === Recording ===

    /// Record that a transient adapter was just made persistent
    ///
    /// `transient` is the identity the adapter held before the remap. Carries
    /// the adapter's initial version; nothing is bumped.
    pub fn record_created(&mut self, adapter: &AdapterRef, transient: Identity) -> Result<()> {
        self.ensure_active()?;
        let identity = adapter.identity();
        let version = adapter.version().ok_or_else(|| {
            Error::illegal_state(format!("{} has no version, is it persistent?", identity))
        })?;
        if identity.is_transient() {
            return Err(Error::illegal_state(format!(
                "{} is still transient",
                identity
            )));
        }
        if !transient.is_transient() {
            return Err(Error::illegal_state(format!(
                "{} was not created from a transient identity",
                identity
            )));
        }

        self.updates.add_changed(&identity);
        self.pending.push(PendingChange {
            adapter: AdapterRef::clone(adapter),
            notification: Notification {
                identity,
                kind: NotificationKind::Created,
                base_version: None,
                version,
                memento: adapter.memento(),
            },
            before: adapter.mark(),
            transient: Some(transient),
        });
        Ok(())
    }

    /// Record an object-changed notification and bump the version
    ///
    /// Only resolved adapters can change. A ghost must be resolved first,
    /// otherwise its unloaded fields would overwrite the stored ones.
    pub fn record_changed(
        &mut self,
        adapter: &AdapterRef,
        versions: &dyn VersionSource,
        user: Option<&str>,
    ) -> Result<()> {
        self.record_transition(adapter, NotificationKind::Changed, versions, user)
    }

    /// Record an object-destroyed notification and bump the version
    pub fn record_destroyed(
        &mut self,
        adapter: &AdapterRef,
        versions: &dyn VersionSource,
        user: Option<&str>,
    ) -> Result<()> {
        self.record_transition(adapter, NotificationKind::Destroyed, versions, user)
    }

    fn record_transition(
        &mut self,
        adapter: &AdapterRef,
        kind: NotificationKind,
        versions: &dyn VersionSource,
        user: Option<&str>,
    ) -> Result<()> {
        self.ensure_active()?;

        let identity = adapter.identity();
        if identity.is_transient() {
            return Err(Error::illegal_state(format!(
                "{} is transient; make it persistent before recording {}",
                identity, kind
            )));
        }

        let target = match kind {
            NotificationKind::Destroyed => ResolveState::Destroyed,
            _ => ResolveState::Resolved,
        };

        let before = adapter.mark();
        if target == ResolveState::Resolved && before.resolve_state == ResolveState::Ghost {
            return Err(Error::IllegalResolveTransition {
                identity,
                from: ResolveState::Ghost,
                to: ResolveState::Resolved,
            });
        }
        if before.version.is_none() {
            return Err(Error::illegal_state(format!(
                "{} has no version; resolve it before recording {}",
                identity, kind
            )));
        }
        adapter.transition_to(target)?;

        let next = versions.next_version(&identity, before.version.as_ref(), user);
        if let Err(e) = adapter.set_version(next.clone()) {
            adapter.rollback_to(before)?;
            return Err(e);
        }

        match kind {
            NotificationKind::Destroyed => self.updates.add_disposed(&identity),
            _ => self.updates.add_changed(&identity),
        }

        let memento = match kind {
            NotificationKind::Destroyed => serde_json::Value::Null,
            _ => adapter.memento(),
        };

        self.pending.push(PendingChange {
            adapter: AdapterRef::clone(adapter),
            notification: Notification {
                identity,
                kind,
                base_version: before.version.clone(),
                version: next,
                memento,
            },
            before,
            transient: None,
        });
        Ok(())
    }

    // === Lifecycle (driven by the manager) ===

    /// Move pending notifications to the flushed list, returning them in order
    pub(crate) fn take_pending(&mut self) -> Vec<Notification> {
        let batch: Vec<Notification> = self
            .pending
            .iter()
            .map(|c| c.notification.clone())
            .collect();
        self.flushed.append(&mut self.pending);
        batch
    }

    /// Every notification recorded, flushed first
    pub(crate) fn all_notifications(&self) -> Vec<Notification> {
        self.flushed
            .iter()
            .chain(self.pending.iter())
            .map(|c| c.notification.clone())
            .collect()
    }

    /// Mark committed and release the change lists
    pub(crate) fn mark_committed(&mut self) {
        self.pending.clear();
        self.flushed.clear();
        self.state = TransactionState::Committed;
    }

    /// Undo adapter bookkeeping (newest first) and mark aborted
    ///
    /// Returns how many notifications were discarded. Discarded creations
    /// are kept for [`Transaction::take_reverted`].
    pub(crate) fn abort(&mut self, reason: impl Into<String>) -> usize {
        let discarded = self.pending.len() + self.flushed.len();
        let changes: Vec<PendingChange> = self
            .pending
            .drain(..)
            .rev()
            .chain(self.flushed.drain(..).rev())
            .collect();
        for change in changes {
            if let Err(e) = change.adapter.rollback_to(change.before) {
                tracing::error!(
                    target: "causeway::txn",
                    txn_id = self.id,
                    identity = %change.notification.identity,
                    error = %e,
                    "Could not restore adapter on abort"
                );
            }
            if let Some(transient) = change.transient {
                self.reverted.push(RevertedCreation {
                    adapter: change.adapter,
                    transient,
                });
            }
        }
        self.state = TransactionState::Aborted {
            reason: reason.into(),
        };
        discarded
    }

    /// Creations discarded by abort, newest first; empties the list
    pub fn take_reverted(&mut self) -> Vec<RevertedCreation> {
        std::mem::take(&mut self.reverted)
    }
}
