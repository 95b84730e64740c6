//! Runtime: the session factory
//!
//! Holds the collaborators every session shares (storage, version source,
//! identity generator, specification loader, transaction-id allocator) and
//! hands each new session a fresh identity map and transaction manager over
//! them. Sessions never share mutable state beyond what these collaborators
//! synchronize themselves.

use crate::config::{IdentityScheme, RuntimeConfig};
use crate::generators::{SequenceIdentityGenerator, UuidIdentityGenerator};
use crate::identity_map::IdentityMap;
use crate::session::{Session, SessionOptions};
use causeway_concurrency::{SequenceVersionSource, TransactionManager, TxnIdAllocator};
use causeway_core::{
    IdentityGenerator, ObjectStore, Principal, Result, SpecificationLoader, VersionSource,
};
use causeway_storage::InMemoryObjectStore;
use std::sync::Arc;
use tracing::warn;

/// Shared collaborators plus configuration; cheap to clone
#[derive(Clone)]
pub struct Runtime {
    config: RuntimeConfig,
    store: Arc<dyn ObjectStore>,
    versions: Arc<dyn VersionSource>,
    identities: Arc<dyn IdentityGenerator>,
    specifications: Arc<dyn SpecificationLoader>,
    txn_ids: Arc<TxnIdAllocator>,
}

impl Runtime {
    /// Runtime over `store`, with the identity scheme the config names and a
    /// counter-backed version source
    pub fn new(
        config: RuntimeConfig,
        specifications: Arc<dyn SpecificationLoader>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let identities: Arc<dyn IdentityGenerator> = match config.identity_scheme {
            IdentityScheme::Sequence => Arc::new(SequenceIdentityGenerator::new()),
            IdentityScheme::Uuid => Arc::new(UuidIdentityGenerator),
        };
        Self {
            config,
            store,
            versions: Arc::new(SequenceVersionSource::default()),
            identities,
            specifications,
            txn_ids: Arc::new(TxnIdAllocator::starting_after(0)),
        }
    }

    /// Runtime over a fresh [`InMemoryObjectStore`]
    pub fn in_memory(config: RuntimeConfig, specifications: Arc<dyn SpecificationLoader>) -> Self {
        Self::new(config, specifications, Arc::new(InMemoryObjectStore::new()))
    }

    /// Replace the identity generator (e.g. with a deterministic double)
    pub fn with_identity_generator(mut self, identities: Arc<dyn IdentityGenerator>) -> Self {
        self.identities = identities;
        self
    }

    /// Replace the version source
    pub fn with_version_source(mut self, versions: Arc<dyn VersionSource>) -> Self {
        self.versions = versions;
        self
    }

    /// Start transaction ids after `max_txn_id` (e.g. the highest id storage has seen)
    pub fn with_txn_ids_after(mut self, max_txn_id: u64) -> Self {
        self.txn_ids = Arc::new(TxnIdAllocator::starting_after(max_txn_id));
        self
    }

    /// Configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Storage shared by every session
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Specification loader shared by every session
    pub fn specifications(&self) -> &Arc<dyn SpecificationLoader> {
        &self.specifications
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            ghost_policy: self.config.ghost_policy,
            stamp_versions_with_principal: self.config.stamp_versions_with_principal,
        }
    }

    /// Open a session with its own identity map and transaction manager
    pub fn open_session(&self, principal: Principal) -> Session {
        let map = IdentityMap::new(
            Arc::clone(&self.identities),
            Arc::clone(&self.versions),
            Arc::clone(&self.specifications),
        );
        let txns = TransactionManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.versions),
            Arc::clone(&self.txn_ids),
        );
        Session::open(principal, map, txns, self.session_options())
    }

    /// Run `f` in a fresh session and close it afterwards
    ///
    /// If `f` fails, an active transaction is aborted before the session is
    /// closed and `f`'s error is returned. If `f` succeeds but leaves a
    /// transaction active, the transaction is aborted and
    /// [`causeway_core::Error::SessionClosedWithActiveTransaction`] is returned.
    pub fn in_session<F, R>(&self, principal: Principal, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> Result<R>,
    {
        let mut session = self.open_session(principal);
        match f(&mut session) {
            Ok(value) => match session.close() {
                Ok(()) => Ok(value),
                Err(e) => {
                    warn!(target: "causeway::session", error = %e, "Aborting work left open by in_session");
                    session.abort_and_close()?;
                    Err(e)
                }
            },
            Err(e) => {
                session.abort_and_close()?;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .finish()
    }
}
