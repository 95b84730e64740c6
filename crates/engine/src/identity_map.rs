//! Identity map: the per-session adapter registry
//!
//! The single authority for "does an adapter already exist for this raw
//! instance or this identity, and if not, create one".
//!
//! ## Indexes
//!
//! ```text
//! by_identity: Identity -> AdapterRef   (one adapter per identity)
//! by_pojo:     PojoId   -> AdapterRef   (one adapter per raw instance)
//! ```
//!
//! Both indexes live behind one lock, so a remap (remove the transient key,
//! insert the persistent key, same adapter) is never observed half done.
//! Callers holding the adapter see its new identity; a lookup by the old
//! transient identity returns nothing afterwards.

use causeway_core::{
    AdapterRef, Error, Identity, IdentityGenerator, ObjectAdapter, Pojo, PojoId, ResolveState,
    Result, SpecificationLoader, Version, VersionSource,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// How much of a persistent instance has been loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loaded {
    /// Fields are populated
    Resolved,
    /// Reference only, fields not yet loaded
    Ghost,
}

#[derive(Default)]
struct Entries {
    by_identity: FxHashMap<Identity, AdapterRef>,
    by_pojo: FxHashMap<PojoId, AdapterRef>,
}

impl Entries {
    fn insert(&mut self, adapter: &AdapterRef) {
        self.by_identity
            .insert(adapter.identity(), AdapterRef::clone(adapter));
        self.by_pojo
            .insert(adapter.pojo_id(), AdapterRef::clone(adapter));
    }

    fn ensure_unwrapped(&self, pojo: &Pojo) -> Result<()> {
        match self.by_pojo.get(&pojo.instance_id()) {
            Some(existing) => Err(Error::DuplicateAdapter {
                identity: existing.identity(),
            }),
            None => Ok(()),
        }
    }
}

/// Per-session registry of adapters
pub struct IdentityMap {
    identities: Arc<dyn IdentityGenerator>,
    versions: Arc<dyn VersionSource>,
    specifications: Arc<dyn SpecificationLoader>,
    entries: RwLock<Entries>,
}

impl IdentityMap {
    /// Create an empty map over the given collaborators
    pub fn new(
        identities: Arc<dyn IdentityGenerator>,
        versions: Arc<dyn VersionSource>,
        specifications: Arc<dyn SpecificationLoader>,
    ) -> Self {
        Self {
            identities,
            versions,
            specifications,
            entries: RwLock::new(Entries::default()),
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Adapter registered under `identity`; never creates one
    pub fn adapter_for(&self, identity: &Identity) -> Option<AdapterRef> {
        self.entries.read().by_identity.get(identity).cloned()
    }

    /// Lookup by the string form of an identity (`Type:key` or `Type:~key`)
    pub fn adapter_for_str(&self, identity: &str) -> Result<Option<AdapterRef>> {
        let identity: Identity = identity.parse()?;
        Ok(self.adapter_for(&identity))
    }

    /// Adapter wrapping this raw instance, if any
    pub fn adapter_for_pojo(&self, pojo: &Pojo) -> Option<AdapterRef> {
        self.entries.read().by_pojo.get(&pojo.instance_id()).cloned()
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.entries.read().by_identity.len()
    }

    /// True if no adapter is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().by_identity.is_empty()
    }

    /// Snapshot of every registered adapter
    pub fn adapters(&self) -> Vec<AdapterRef> {
        self.entries.read().by_identity.values().cloned().collect()
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Wrap a new in-memory instance with a fresh transient identity
    ///
    /// Fails with [`Error::DuplicateAdapter`] if the instance is already wrapped.
    pub fn create_transient_adapter(&self, pojo: Pojo) -> Result<AdapterRef> {
        self.create_transient(pojo, None)
    }

    /// Like [`IdentityMap::create_transient_adapter`], with a non-owning link
    /// to the aggregate that owns the part
    pub fn create_aggregated_adapter(&self, pojo: Pojo, owner: &AdapterRef) -> Result<AdapterRef> {
        self.create_transient(pojo, Some(owner))
    }

    fn create_transient(&self, pojo: Pojo, owner: Option<&AdapterRef>) -> Result<AdapterRef> {
        let type_name = pojo.type_name();
        let specification = self.specifications.load_specification(&type_name)?;

        let mut entries = self.entries.write();
        entries.ensure_unwrapped(&pojo)?;

        let identity = self.identities.new_transient_identity(&type_name);
        let adapter = ObjectAdapter::new(
            pojo,
            identity,
            specification,
            ResolveState::Transient,
            None,
            owner,
        )?;
        entries.insert(&adapter);

        debug!(target: "causeway::map", identity = %adapter.identity(), "Transient adapter created");
        Ok(adapter)
    }

    /// Wrap an instance loaded from storage under a caller-supplied identity
    ///
    /// Value types get the `Value` state regardless of `loaded`. A resolved
    /// instance must carry the version it was loaded at; a ghost may leave it
    /// to [`crate::Session::resolve`].
    pub fn create_persistent_adapter(
        &self,
        pojo: Pojo,
        identity: Identity,
        version: Option<Version>,
        loaded: Loaded,
    ) -> Result<AdapterRef> {
        if identity.is_transient() {
            return Err(Error::illegal_state(format!(
                "{} is transient; use create_transient_adapter",
                identity
            )));
        }

        let resolve_state = if pojo.is_value() {
            ResolveState::Value
        } else {
            match loaded {
                Loaded::Resolved => ResolveState::Resolved,
                Loaded::Ghost => ResolveState::Ghost,
            }
        };
        if resolve_state == ResolveState::Resolved && version.is_none() {
            return Err(Error::illegal_state(format!(
                "{} is loaded but has no version",
                identity
            )));
        }
        let specification = self.specifications.load_specification(&pojo.type_name())?;

        let mut entries = self.entries.write();
        entries.ensure_unwrapped(&pojo)?;
        if entries.by_identity.contains_key(&identity) {
            return Err(Error::DuplicateAdapter { identity });
        }

        let adapter = ObjectAdapter::new(pojo, identity, specification, resolve_state, version, None)?;
        entries.insert(&adapter);

        debug!(
            target: "causeway::map",
            identity = %adapter.identity(),
            state = %resolve_state,
            "Persistent adapter created"
        );
        Ok(adapter)
    }

    // =========================================================================
    // Remap
    // =========================================================================

    /// Give a transient adapter its persistent identity, `Resolved` state and
    /// initial version
    ///
    /// Fails with [`Error::IllegalState`] if the adapter is already persistent.
    pub fn remap_as_persistent(&self, adapter: &AdapterRef) -> Result<()> {
        self.remap_as_persistent_with(adapter, ResolveState::Resolved, None)
    }

    /// Remap choosing the target state (`Ghost` or `Resolved`) and the user
    /// stamped on the initial version
    pub fn remap_as_persistent_with(
        &self,
        adapter: &AdapterRef,
        to: ResolveState,
        user: Option<&str>,
    ) -> Result<()> {
        let mut entries = self.entries.write();

        let old = adapter.identity();
        if !old.is_transient() {
            return Err(Error::illegal_state(format!("{} is already persistent", old)));
        }
        match entries.by_identity.get(&old) {
            Some(registered) if Arc::ptr_eq(registered, adapter) => {}
            _ => {
                return Err(Error::illegal_state(format!(
                    "{} is not registered in this identity map",
                    old
                )))
            }
        }

        let new = self.identities.convert_transient_to_persistent(&old);
        if entries.by_identity.contains_key(&new) {
            return Err(Error::DuplicateAdapter { identity: new });
        }
        let version = self.versions.next_version(&new, None, user);

        adapter.remap(new.clone(), to, version)?;
        entries.by_identity.remove(&old);
        entries
            .by_identity
            .insert(new.clone(), AdapterRef::clone(adapter));

        debug!(target: "causeway::map", from = %old, to = %new, state = %to, "Adapter remapped");
        Ok(())
    }

    /// Undo a remap whose created notification was discarded
    ///
    /// Re-keys the adapter from its persistent identity back to `transient`
    /// under one write lock, and puts it back in the `Transient` state. An
    /// adapter no longer registered here (the map was reset) is only unmapped.
    pub fn revert_to_transient(&self, adapter: &AdapterRef, transient: Identity) -> Result<()> {
        let mut entries = self.entries.write();

        let current = adapter.identity();
        let registered = matches!(
            entries.by_identity.get(&current),
            Some(found) if Arc::ptr_eq(found, adapter)
        );
        if registered && entries.by_identity.contains_key(&transient) {
            return Err(Error::DuplicateAdapter { identity: transient });
        }

        adapter.unmap(transient.clone())?;
        if registered {
            entries.by_identity.remove(&current);
            entries
                .by_identity
                .insert(transient.clone(), AdapterRef::clone(adapter));
        }

        debug!(target: "causeway::map", from = %current, to = %transient, "Remap reverted");
        Ok(())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Drop every entry
    ///
    /// Test and debugging use only. Adapters already handed out stay valid
    /// but are no longer reachable through this map.
    pub fn reset(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.by_identity.len();
        entries.by_identity.clear();
        entries.by_pojo.clear();
        debug!(target: "causeway::map", dropped, "Identity map reset");
    }
}

impl std::fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMap")
            .field("len", &self.len())
            .finish()
    }
}
