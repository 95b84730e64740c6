//! Session: one identity map, one transaction manager and one principal
//!
//! A session is the unit of execution through which every adapter lookup and
//! mutation happens. It is passed explicitly; nothing in the engine reads an
//! ambient "current session" (see [`crate::context::SessionStack`] for the
//! boundary helper that keeps one).
//!
//! ## Closing
//!
//! Closing while a transaction is active fails with
//! [`Error::SessionClosedWithActiveTransaction`] and leaves the session open
//! so the caller can end or abort explicitly. Dropping an open session with
//! an active transaction panics: silently aborting would hide lost writes.

use crate::config::GhostPolicy;
use crate::identity_map::IdentityMap;
use causeway_concurrency::{check_lock_opt, TransactionManager, TransactionOutcome};
use causeway_core::{
    AdapterRef, Consent, DomainObject, Error, Identity, Intent, Pojo, Principal, ResolveState,
    Result, Version,
};
use tracing::{debug, error, info};

/// Per-session behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Whether `lookup` resolves ghosts
    pub ghost_policy: GhostPolicy,
    /// Stamp versions with the principal's name
    pub stamp_versions_with_principal: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ghost_policy: GhostPolicy::default(),
            stamp_versions_with_principal: true,
        }
    }
}

/// One open unit of execution
pub struct Session {
    principal: Principal,
    map: IdentityMap,
    txns: TransactionManager,
    options: SessionOptions,
    open: bool,
}

impl Session {
    /// Open a session over an identity map and transaction manager
    ///
    /// Both are owned by the session; pass fresh ones (a runtime does) or
    /// test doubles wired to deterministic collaborators.
    pub fn open(
        principal: Principal,
        map: IdentityMap,
        txns: TransactionManager,
        options: SessionOptions,
    ) -> Self {
        let txns = if options.stamp_versions_with_principal {
            txns.with_user(principal.name())
        } else {
            txns
        };
        debug!(target: "causeway::session", principal = %principal.name(), "Session opened");
        Self {
            principal,
            map,
            txns,
            options,
            open: true,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Principal the session acts for
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The session's identity map
    pub fn identity_map(&self) -> &IdentityMap {
        &self.map
    }

    /// The session's transaction manager
    pub fn transactions(&self) -> &TransactionManager {
        &self.txns
    }

    /// Behavior switches
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// False once closed
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// True while a transaction is active
    pub fn in_transaction(&self) -> bool {
        self.txns.is_active()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::illegal_state(format!(
                "session for {} is closed",
                self.principal.name()
            )))
        }
    }

    fn ensure_transaction(&self) -> Result<()> {
        self.ensure_open()?;
        if self.txns.is_active() {
            Ok(())
        } else {
            Err(Error::NoActiveTransaction)
        }
    }

    fn stamp_user(&self) -> Option<&str> {
        self.options
            .stamp_versions_with_principal
            .then(|| self.principal.name())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Start a unit of work
    pub fn start_transaction(&mut self) -> Result<u64> {
        self.ensure_open()?;
        self.txns.start_transaction()
    }

    /// Stage pending notifications with storage
    pub fn flush_transaction(&mut self) -> Result<bool> {
        self.ensure_open()?;
        let result = self.txns.flush_transaction();
        self.revert_discarded_creations();
        result
    }

    /// Flush and commit the active transaction
    pub fn end_transaction(&mut self) -> Result<TransactionOutcome> {
        self.ensure_open()?;
        let result = self.txns.end_transaction();
        self.revert_discarded_creations();
        result
    }

    /// Abort the active transaction; no-op when none is active
    ///
    /// Adapters made persistent inside it go back to their transient
    /// identities.
    pub fn abort_transaction(&mut self) -> Result<()> {
        self.ensure_open()?;
        let result = self.txns.abort_transaction();
        self.revert_discarded_creations();
        result
    }

    fn revert_discarded_creations(&mut self) {
        for creation in self.txns.take_reverted_creations() {
            if let Err(e) = self
                .map
                .revert_to_transient(&creation.adapter, creation.transient.clone())
            {
                error!(
                    target: "causeway::session",
                    identity = %creation.adapter.identity(),
                    transient = %creation.transient,
                    error = %e,
                    "Could not revert discarded creation"
                );
            }
        }
    }

    /// Run `f` inside a transaction: commit on `Ok`, abort on `Err`
    pub fn transaction<F, R>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> Result<R>,
    {
        self.transaction_with_outcome(f).map(|(value, _)| value)
    }

    /// Like [`Session::transaction`], also returning what the commit produced
    pub fn transaction_with_outcome<F, R>(&mut self, f: F) -> Result<(R, TransactionOutcome)>
    where
        F: FnOnce(&mut Session) -> Result<R>,
    {
        self.start_transaction()?;
        match f(self) {
            Ok(value) => {
                let result = self.txns.end_or_abort();
                self.revert_discarded_creations();
                Ok((value, result?))
            }
            Err(e) => {
                self.abort_transaction()?;
                Err(e)
            }
        }
    }

    /// Add an informational message to the active transaction
    pub fn add_message(&mut self, message: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.txns.add_message(message)
    }

    /// Add a warning to the active transaction
    pub fn add_warning(&mut self, warning: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.txns.add_warning(warning)
    }

    // =========================================================================
    // Object lifecycle
    // =========================================================================

    /// Wrap a new in-memory instance as a transient adapter
    pub fn create_transient(&self, pojo: Pojo) -> Result<AdapterRef> {
        self.ensure_open()?;
        self.map.create_transient_adapter(pojo)
    }

    /// Make a transient adapter persistent within the active transaction
    ///
    /// The adapter is remapped at once (new identity, `Resolved`, initial
    /// version) and a created notification is recorded for storage. If the
    /// transaction is aborted the remap is undone.
    pub fn make_persistent(&mut self, adapter: &AdapterRef) -> Result<()> {
        self.ensure_transaction()?;
        let user = self.stamp_user().map(str::to_string);
        let transient = adapter.identity();
        self.map
            .remap_as_persistent_with(adapter, ResolveState::Resolved, user.as_deref())?;
        if let Err(e) = self.txns.object_created(adapter, transient.clone()) {
            self.map.revert_to_transient(adapter, transient)?;
            return Err(e);
        }
        Ok(())
    }

    /// Wrap and persist a new instance in one step
    pub fn persist(&mut self, pojo: Pojo) -> Result<AdapterRef> {
        self.ensure_transaction()?;
        let adapter = self.map.create_transient_adapter(pojo)?;
        self.make_persistent(&adapter)?;
        Ok(adapter)
    }

    /// Mutate the wrapped instance and record the change
    ///
    /// `expected` is the version the caller based the change on; a stale one
    /// fails with [`Error::Concurrency`] before anything is touched. A ghost
    /// is resolved first. Transient adapters are rejected; their state reaches
    /// storage with the created notification.
    pub fn update<T, R>(
        &mut self,
        adapter: &AdapterRef,
        expected: Option<&Version>,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R>
    where
        T: DomainObject,
    {
        self.ensure_transaction()?;
        let identity = adapter.identity();
        if identity.is_transient() {
            return Err(Error::illegal_state(format!(
                "{} is transient; make it persistent before updating",
                identity
            )));
        }
        self.resolve(adapter)?;
        check_lock_opt(adapter, expected)?;

        let from = adapter.resolve_state();
        if !from.can_transition_to(ResolveState::Resolved) {
            return Err(Error::IllegalResolveTransition {
                identity: adapter.identity(),
                from,
                to: ResolveState::Resolved,
            });
        }

        let value = adapter.write(f)?;
        self.txns.object_changed(adapter)?;
        Ok(value)
    }

    /// Record that the object was deleted
    ///
    /// A ghost is deleted without loading its fields, unless it does not yet
    /// know its version.
    pub fn destroy(&mut self, adapter: &AdapterRef, expected: Option<&Version>) -> Result<()> {
        self.ensure_transaction()?;
        if adapter.version().is_none() {
            self.resolve(adapter)?;
        }
        check_lock_opt(adapter, expected)?;
        self.txns.object_destroyed(adapter)
    }

    /// Load a ghost's fields from storage and mark it `Resolved`
    ///
    /// No-op for adapters that are not ghosts, except `Destroyed`, which
    /// cannot be resolved.
    pub fn resolve(&self, adapter: &AdapterRef) -> Result<()> {
        self.ensure_open()?;
        match adapter.resolve_state() {
            ResolveState::Ghost => {}
            ResolveState::Destroyed => return adapter.transition_to(ResolveState::Resolved),
            _ => return Ok(()),
        }

        let identity = adapter.identity();
        let record = self
            .txns
            .store()
            .load(&identity)?
            .filter(|r| !r.destroyed)
            .ok_or_else(|| Error::ObjectNotFound(identity.clone()))?;

        adapter.load_memento(&record.memento);
        let newer = adapter
            .version()
            .map_or(true, |current| record.version.is_newer_than(&current));
        if newer {
            adapter.set_version(record.version)?;
        }
        adapter.transition_to(ResolveState::Resolved)?;

        debug!(target: "causeway::session", identity = %identity, "Ghost resolved");
        Ok(())
    }

    /// Adapter for an identity string
    ///
    /// Fails with [`Error::ObjectNotFound`] if this session has no adapter for
    /// it. Ghosts are resolved first unless the ghost policy is `Lazy`.
    pub fn lookup(&self, identity: &str) -> Result<AdapterRef> {
        self.ensure_open()?;
        let identity: Identity = identity.parse()?;
        let adapter = self
            .map
            .adapter_for(&identity)
            .ok_or(Error::ObjectNotFound(identity))?;
        if self.options.ghost_policy == GhostPolicy::ResolveOnLookup {
            self.resolve(&adapter)?;
        }
        Ok(adapter)
    }

    /// Read the wrapped instance, resolving a ghost first
    pub fn read<T, R>(&self, adapter: &AdapterRef, f: impl FnOnce(&T) -> R) -> Result<R>
    where
        T: DomainObject,
    {
        self.resolve(adapter)?;
        adapter.read(f)
    }

    /// Check whether the principal may view or use a member of the adapter
    pub fn check_access(&self, adapter: &AdapterRef, member: &str, intent: Intent) -> Result<Consent> {
        self.ensure_open()?;
        let spec = adapter.specification();
        let found = spec.member(member).ok_or_else(|| {
            Error::illegal_state(format!("{} has no member '{}'", spec.type_name(), member))
        })?;
        Ok(found.check_access(&self.principal, adapter, intent))
    }

    /// Like [`Session::check_access`], turning a veto into [`Error::Vetoed`]
    pub fn ensure_access(&self, adapter: &AdapterRef, member: &str, intent: Intent) -> Result<()> {
        self.check_access(adapter, member, intent)?
            .into_result(member)
    }

    // =========================================================================
    // Close
    // =========================================================================

    /// Close the session and discard its identity map
    ///
    /// Fails, leaving the session open, if a transaction is still active.
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        if let Some(txn_id) = self.txns.active_txn_id() {
            error!(
                target: "causeway::session",
                principal = %self.principal.name(),
                txn_id,
                "Session closed with active transaction"
            );
            return Err(Error::SessionClosedWithActiveTransaction { txn_id });
        }

        self.map.reset();
        self.open = false;
        info!(
            target: "causeway::session",
            principal = %self.principal.name(),
            metrics = ?self.txns.metrics(),
            "Session closed"
        );
        Ok(())
    }

    /// Abort whatever is active, then close
    pub(crate) fn abort_and_close(&mut self) -> Result<()> {
        if self.open {
            self.abort_transaction()?;
        }
        self.close()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Some(txn_id) = self.txns.active_txn_id() {
            error!(
                target: "causeway::session",
                principal = %self.principal.name(),
                txn_id,
                "Session dropped with active transaction"
            );
            if !std::thread::panicking() {
                panic!(
                    "session for {} dropped with transaction {} still active",
                    self.principal.name(),
                    txn_id
                );
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("principal", &self.principal.name())
            .field("open", &self.open)
            .field("map", &self.map)
            .field("txns", &self.txns)
            .finish()
    }
}
