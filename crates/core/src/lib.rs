//! Core types and traits for causeway
//!
//! This crate defines the foundational types used throughout the system:
//! - Identity: immutable identity of a domain object (transient or persistent)
//! - Version: optimistic-concurrency stamp
//! - ResolveState: adapter lifecycle state machine
//! - Specification / Member / Consent: runtime type descriptors and access checks
//! - DomainObject / Pojo: raw domain instances
//! - ObjectAdapter: the wrapper presentation layers hold instead of raw instances
//! - Notification: change records handed to storage
//! - Error: error taxonomy and presentation classification
//! - Traits: collaborator seams (IdentityGenerator, VersionSource, ObjectStore)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod error;
pub mod identity;
pub mod notification;
pub mod object;
pub mod principal;
pub mod resolve;
pub mod specification;
pub mod traits;
pub mod version;

pub use adapter::{AdapterMark, AdapterRef, ObjectAdapter};
pub use error::{Error, ErrorClass, Result};
pub use identity::{Identity, IdentityKey, IdentityState};
pub use notification::{Notification, NotificationKind, StoredRecord};
pub use object::{DomainObject, Pojo, PojoId};
pub use principal::Principal;
pub use resolve::ResolveState;
pub use specification::{
    Consent, Intent, Member, MemberInfo, Specification, SpecificationCache, SpecificationLoader,
};
pub use traits::{IdentityGenerator, ObjectStore, VersionSource};
pub use version::Version;
