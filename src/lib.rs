//! Causeway - object identity map and unit-of-work engine
//!
//! Causeway sits under a runtime metamodel framework. It wraps raw domain
//! instances in adapters, guarantees one adapter per identity within a
//! session, tracks each adapter's resolve-state and version, and collects
//! change notifications into transactions that reach storage all at once or
//! not at all.
//!
//! # Quick Start
//!
//! ```ignore
//! use causeway::{Pojo, Principal, Runtime, RuntimeConfig, Specification, SpecificationCache};
//! use std::sync::Arc;
//!
//! let specs = SpecificationCache::new().with(Specification::new("Customer"));
//! let runtime = Runtime::in_memory(RuntimeConfig::default(), Arc::new(specs));
//!
//! runtime.in_session(Principal::new("ann"), |session| {
//!     session.transaction(|s| {
//!         let customer = s.persist(Pojo::new(Customer::default()))?;
//!         let seen = customer.version();
//!         s.update(&customer, seen.as_ref(), |c: &mut Customer| c.name = "Acme".into())
//!     })
//! })?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! causeway-core         identities, versions, adapters, errors, collaborator traits
//! causeway-storage      in-memory storage collaborator
//! causeway-concurrency  transactions, lock checks, version sources
//! causeway-engine       identity map, session, runtime
//! ```

pub use causeway_concurrency::{
    check_lock, check_lock_opt, MessageBroker, RevertedCreation, SequenceVersionSource,
    Transaction, TransactionManager, TransactionMetrics, TransactionOutcome, TransactionState,
    TxnIdAllocator, UpdateNotifier,
};
pub use causeway_core::*;
pub use causeway_engine::*;
pub use causeway_storage::{CommittedBatch, InMemoryObjectStore};
