//! Unit-of-work layer for causeway
//!
//! This crate implements optimistic concurrency for object graphs:
//! - Transaction: ordered change notifications plus rollback marks
//! - TransactionManager: start/flush/end/abort against an `ObjectStore`
//! - check_lock: stale-version detection
//! - SequenceVersionSource: monotonic version stamps
//!
//! Conflicts between sessions are detected twice: early by `check_lock`
//! against the version a caller read, and at commit time by storage
//! comparing each notification's base version with the committed one.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;
pub mod version_source;

pub use manager::{TransactionManager, TransactionMetrics, TransactionOutcome, TxnIdAllocator};
pub use transaction::{
    MessageBroker, PendingChange, RevertedCreation, Transaction, TransactionState,
    UpdateNotifier,
};
pub use validation::{check_lock, check_lock_opt};
pub use version_source::SequenceVersionSource;
