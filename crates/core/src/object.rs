//! Raw domain instances
//!
//! A domain type implements [`DomainObject`] and is registered through a
//! [`Pojo`] handle. The handle's pointer identity is what "the same raw
//! instance" means to the identity map: wrapping one handle twice is rejected
//! no matter how many clones of it exist.
//!
//! Once wrapped, state is reached through the adapter. The handle's accessors
//! are crate-private so callers cannot bypass resolve-state and version
//! tracking.

use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Upcast helper so trait objects can be downcast to their concrete type
pub trait AsAny: Any {
    /// `&self` as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// `&mut self` as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A domain-object instance that can be wrapped by an adapter
///
/// `memento` and `restore` exchange the persisted state with the storage
/// collaborator. Types that are never persisted can keep the defaults.
pub trait DomainObject: AsAny + Send + Sync {
    /// Runtime type discriminator used to load the specification
    fn type_name(&self) -> &str;

    /// Immutable value types are wrapped with the `Value` resolve-state
    fn is_value(&self) -> bool {
        false
    }

    /// Snapshot of persisted fields
    fn memento(&self) -> JsonValue {
        JsonValue::Null
    }

    /// Load persisted fields (used when resolving a ghost)
    fn restore(&mut self, _memento: &JsonValue) {}
}

/// Shared handle to a raw domain instance
#[derive(Clone)]
pub struct Pojo(Arc<RwLock<dyn DomainObject>>);

impl Pojo {
    /// Wrap a freshly constructed instance
    pub fn new<T: DomainObject>(object: T) -> Self {
        Pojo(Arc::new(RwLock::new(object)))
    }

    /// Address-based identity of the underlying instance
    pub fn instance_id(&self) -> PojoId {
        PojoId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// True if both handles point at the same instance
    pub fn ptr_eq(&self, other: &Pojo) -> bool {
        self.instance_id() == other.instance_id()
    }

    /// Runtime type name of the instance
    pub fn type_name(&self) -> String {
        self.0.read().type_name().to_string()
    }

    /// Whether the instance is a value type
    pub fn is_value(&self) -> bool {
        self.0.read().is_value()
    }

    pub(crate) fn memento(&self) -> JsonValue {
        self.0.read().memento()
    }

    pub(crate) fn restore(&self, memento: &JsonValue) {
        self.0.write().restore(memento)
    }

    pub(crate) fn read<T: DomainObject, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.0.read();
        let object: &dyn DomainObject = &*guard;
        object.as_any().downcast_ref::<T>().map(f)
    }

    pub(crate) fn write<T: DomainObject, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.0.write();
        let object: &mut dyn DomainObject = &mut *guard;
        object.as_any_mut().downcast_mut::<T>().map(f)
    }
}

impl fmt::Debug for Pojo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pojo")
            .field("type_name", &self.type_name())
            .field("instance_id", &self.instance_id())
            .finish()
    }
}

/// Address identity of a raw instance, stable while any handle is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PojoId(usize);
