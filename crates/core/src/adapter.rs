//! Object adapters
//!
//! An [`ObjectAdapter`] binds one raw instance to its identity, specification,
//! resolve-state and version. Adapters are shared as [`AdapterRef`] and mutated
//! in place; the identity map guarantees there is only one per identity.
//!
//! ## Invariants
//!
//! - A transient identity carries the `Transient` resolve-state and nothing else
//! - Every resolve-state change goes through [`ObjectAdapter::transition_to`]
//!   (or the remap/rollback paths, which check the same rules)
//! - Versions only move forward

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::object::{DomainObject, Pojo, PojoId};
use crate::resolve::ResolveState;
use crate::specification::Specification;
use crate::version::Version;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared handle to an adapter
pub type AdapterRef = Arc<ObjectAdapter>;

#[derive(Debug, Clone)]
struct AdapterState {
    identity: Identity,
    resolve_state: ResolveState,
    version: Option<Version>,
}

/// Resolve-state and version captured before a change, for rollback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterMark {
    /// Resolve-state at the time of the mark
    pub resolve_state: ResolveState,
    /// Version at the time of the mark
    pub version: Option<Version>,
}

/// Wrapper around one raw domain instance
pub struct ObjectAdapter {
    pojo: Pojo,
    specification: Arc<Specification>,
    owner: Option<Weak<ObjectAdapter>>,
    state: RwLock<AdapterState>,
}

impl ObjectAdapter {
    /// Create an adapter, checking that identity and resolve-state agree
    ///
    /// Only the identity map should call this; it is responsible for the
    /// one-adapter-per-identity guarantee.
    pub fn new(
        pojo: Pojo,
        identity: Identity,
        specification: Arc<Specification>,
        resolve_state: ResolveState,
        version: Option<Version>,
        owner: Option<&AdapterRef>,
    ) -> Result<AdapterRef> {
        check_agreement(&identity, resolve_state)?;
        Ok(Arc::new(Self {
            pojo,
            specification,
            owner: owner.map(Arc::downgrade),
            state: RwLock::new(AdapterState {
                identity,
                resolve_state,
                version,
            }),
        }))
    }

    // === Accessors ===

    /// Current identity
    pub fn identity(&self) -> Identity {
        self.state.read().identity.clone()
    }

    /// Current resolve-state
    pub fn resolve_state(&self) -> ResolveState {
        self.state.read().resolve_state
    }

    /// Current version, `None` while transient
    pub fn version(&self) -> Option<Version> {
        self.state.read().version.clone()
    }

    /// Type descriptor
    pub fn specification(&self) -> &Arc<Specification> {
        &self.specification
    }

    /// Aggregating owner, if any and still alive
    pub fn owner(&self) -> Option<AdapterRef> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Identity of the wrapped raw instance
    pub fn pojo_id(&self) -> PojoId {
        self.pojo.instance_id()
    }

    /// Runtime type name of the wrapped instance
    pub fn type_name(&self) -> String {
        self.pojo.type_name()
    }

    /// True if the adapter wraps this handle's instance
    pub fn wraps(&self, pojo: &Pojo) -> bool {
        self.pojo.ptr_eq(pojo)
    }

    /// Capture resolve-state and version
    pub fn mark(&self) -> AdapterMark {
        let state = self.state.read();
        AdapterMark {
            resolve_state: state.resolve_state,
            version: state.version.clone(),
        }
    }

    // === Domain state ===

    /// Read the wrapped instance as `T`
    pub fn read<T: DomainObject, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.pojo
            .read(f)
            .ok_or_else(|| self.type_mismatch::<T>())
    }

    /// Mutate the wrapped instance as `T`
    ///
    /// This does not record a change. Inside a unit of work go through the
    /// session so the change is notified and the version bumped.
    pub fn write<T: DomainObject, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.pojo
            .write(f)
            .ok_or_else(|| self.type_mismatch::<T>())
    }

    /// Persisted-state snapshot of the wrapped instance
    pub fn memento(&self) -> JsonValue {
        self.pojo.memento()
    }

    /// Load persisted state into the wrapped instance
    pub fn load_memento(&self, memento: &JsonValue) {
        self.pojo.restore(memento)
    }

    fn type_mismatch<T>(&self) -> Error {
        Error::TypeMismatch {
            identity: self.identity(),
            expected: std::any::type_name::<T>(),
        }
    }

    // === Lifecycle ===

    /// Move to `to`, or fail leaving the state unchanged
    pub fn transition_to(&self, to: ResolveState) -> Result<()> {
        let mut state = self.state.write();
        if !state.resolve_state.can_transition_to(to) {
            return Err(Error::IllegalResolveTransition {
                identity: state.identity.clone(),
                from: state.resolve_state,
                to,
            });
        }
        check_agreement(&state.identity, to)?;
        state.resolve_state = to;
        Ok(())
    }

    /// Advance the version stamp
    ///
    /// The new version must be newer than the current one, so every version
    /// an identity ever held stays distinguishable.
    pub fn set_version(&self, version: Version) -> Result<()> {
        let mut state = self.state.write();
        if let Some(current) = &state.version {
            if !version.is_newer_than(current) {
                return Err(Error::NonMonotonicVersion {
                    identity: state.identity.clone(),
                    current: current.clone(),
                    proposed: version,
                });
            }
        }
        state.version = Some(version);
        Ok(())
    }

    /// Swap a transient identity for a persistent one in a single step
    ///
    /// Used by the identity map while it re-keys its entry.
    pub fn remap(&self, identity: Identity, to: ResolveState, version: Version) -> Result<()> {
        let mut state = self.state.write();
        if !state.identity.is_transient() || !state.resolve_state.is_transient() {
            return Err(Error::illegal_state(format!(
                "{} is not transient",
                state.identity
            )));
        }
        if !identity.is_persistent() {
            return Err(Error::illegal_state(format!(
                "remap target {} is not persistent",
                identity
            )));
        }
        if !state.resolve_state.can_transition_to(to) {
            return Err(Error::IllegalResolveTransition {
                identity: state.identity.clone(),
                from: state.resolve_state,
                to,
            });
        }
        state.identity = identity;
        state.resolve_state = to;
        state.version = Some(version);
        Ok(())
    }

    /// Reverse a [`ObjectAdapter::remap`] whose created notification was
    /// discarded: back to `transient`, `Transient` state, no version
    ///
    /// Used by the identity map while it re-keys its entry.
    pub fn unmap(&self, transient: Identity) -> Result<()> {
        let mut state = self.state.write();
        if !transient.is_transient() {
            return Err(Error::illegal_state(format!(
                "unmap target {} is not transient",
                transient
            )));
        }
        if !state.identity.is_persistent() {
            return Err(Error::illegal_state(format!(
                "{} is not persistent",
                state.identity
            )));
        }
        state.identity = transient;
        state.resolve_state = ResolveState::Transient;
        state.version = None;
        Ok(())
    }

    /// Put back resolve-state and version captured by [`ObjectAdapter::mark`]
    ///
    /// Transaction abort uses this to undo the bookkeeping of discarded
    /// notifications. Rolling back is not a forward transition, so the
    /// machine is not consulted; identity agreement still is.
    pub fn rollback_to(&self, mark: AdapterMark) -> Result<()> {
        let mut state = self.state.write();
        check_agreement(&state.identity, mark.resolve_state)?;
        state.resolve_state = mark.resolve_state;
        state.version = mark.version;
        Ok(())
    }
}

fn check_agreement(identity: &Identity, resolve_state: ResolveState) -> Result<()> {
    if identity.is_transient() != resolve_state.allows_transient_identity() {
        return Err(Error::illegal_state(format!(
            "{} cannot be in state {}",
            identity, resolve_state
        )));
    }
    Ok(())
}

impl fmt::Debug for ObjectAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ObjectAdapter")
            .field("identity", &state.identity)
            .field("resolve_state", &state.resolve_state)
            .field("version", &state.version)
            .field("type_name", &self.specification.type_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account {
        balance: i64,
    }

    impl DomainObject for Account {
        fn type_name(&self) -> &str {
            "Account"
        }
    }

    fn spec() -> Arc<Specification> {
        Arc::new(Specification::new("Account"))
    }

    fn transient() -> AdapterRef {
        ObjectAdapter::new(
            Pojo::new(Account { balance: 10 }),
            Identity::transient("Account", 1u64),
            spec(),
            ResolveState::Transient,
            None,
            None,
        )
        .unwrap()
    }

    fn resolved(version: u64) -> AdapterRef {
        ObjectAdapter::new(
            Pojo::new(Account { balance: 10 }),
            Identity::persistent("Account", 1u64),
            spec(),
            ResolveState::Resolved,
            Some(Version::new(version)),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_disagreeing_identity() {
        let err = ObjectAdapter::new(
            Pojo::new(Account { balance: 0 }),
            Identity::transient("Account", 1u64),
            spec(),
            ResolveState::Destroyed,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));

        let err = ObjectAdapter::new(
            Pojo::new(Account { balance: 0 }),
            Identity::persistent("Account", 1u64),
            spec(),
            ResolveState::Transient,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn test_illegal_transition_leaves_state() {
        let a = resolved(1);
        a.transition_to(ResolveState::Destroyed).unwrap();
        let err = a.transition_to(ResolveState::Resolved).unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalResolveTransition {
                from: ResolveState::Destroyed,
                to: ResolveState::Resolved,
                ..
            }
        ));
        assert_eq!(a.resolve_state(), ResolveState::Destroyed);
    }

    #[test]
    fn test_transient_cannot_transition_without_remap() {
        // Transient -> Resolved is a legal edge, but only via remap
        let a = transient();
        assert!(matches!(
            a.transition_to(ResolveState::Resolved),
            Err(Error::IllegalState(_))
        ));
        assert_eq!(a.resolve_state(), ResolveState::Transient);
    }

    #[test]
    fn test_set_version_must_advance() {
        let a = resolved(5);
        a.set_version(Version::new(6)).unwrap();
        let err = a.set_version(Version::new(6)).unwrap_err();
        assert!(matches!(err, Error::NonMonotonicVersion { .. }));
        assert!(a.set_version(Version::new(2)).is_err());
        assert_eq!(a.version(), Some(Version::new(6)));
    }

    #[test]
    fn test_remap() {
        let a = transient();
        a.remap(
            Identity::persistent("Account", 100u64),
            ResolveState::Resolved,
            Version::new(1),
        )
        .unwrap();
        assert_eq!(a.identity(), Identity::persistent("Account", 100u64));
        assert_eq!(a.resolve_state(), ResolveState::Resolved);
        assert_eq!(a.version(), Some(Version::new(1)));

        let again = a.remap(
            Identity::persistent("Account", 101u64),
            ResolveState::Resolved,
            Version::new(2),
        );
        assert!(matches!(again, Err(Error::IllegalState(_))));
        assert_eq!(a.identity(), Identity::persistent("Account", 100u64));
    }

    #[test]
    fn test_unmap_reverses_remap() {
        let a = transient();
        let before = a.identity();
        a.remap(
            Identity::persistent("Account", 100u64),
            ResolveState::Resolved,
            Version::new(1),
        )
        .unwrap();

        a.unmap(before.clone()).unwrap();
        assert_eq!(a.identity(), before);
        assert_eq!(a.resolve_state(), ResolveState::Transient);
        assert!(a.version().is_none());

        assert!(matches!(a.unmap(before), Err(Error::IllegalState(_))));
        assert!(matches!(
            resolved(1).unmap(Identity::persistent("Account", 2u64)),
            Err(Error::IllegalState(_))
        ));
    }

    #[test]
    fn test_rollback_to_mark() {
        let a = resolved(1);
        let mark = a.mark();
        a.set_version(Version::new(2)).unwrap();
        a.transition_to(ResolveState::Destroyed).unwrap();
        a.rollback_to(mark).unwrap();
        assert_eq!(a.resolve_state(), ResolveState::Resolved);
        assert_eq!(a.version(), Some(Version::new(1)));
    }

    #[test]
    fn test_read_write_downcast() {
        let a = resolved(1);
        a.write(|acc: &mut Account| acc.balance += 5).unwrap();
        assert_eq!(a.read(|acc: &Account| acc.balance).unwrap(), 15);

        struct Other;
        impl DomainObject for Other {
            fn type_name(&self) -> &str {
                "Other"
            }
        }
        assert!(matches!(
            a.read(|_: &Other| ()),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_owner_is_weak() {
        let owner = resolved(1);
        let part = ObjectAdapter::new(
            Pojo::new(Account { balance: 0 }),
            Identity::transient("Account", 2u64),
            spec(),
            ResolveState::Transient,
            None,
            Some(&owner),
        )
        .unwrap();
        assert!(Arc::ptr_eq(&part.owner().unwrap(), &owner));
        drop(owner);
        assert!(part.owner().is_none());
    }
}
