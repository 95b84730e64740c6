//! Collaborator seams
//!
//! The core consumes identity allocation, version stamping and durable
//! storage through these traits so each can be swapped (for example with
//! deterministic test doubles) without touching the identity map or the
//! transaction manager.
//!
//! Thread safety: implementations are shared between sessions and must be
//! `Send + Sync`.

use crate::error::Result;
use crate::identity::Identity;
use crate::notification::{Notification, StoredRecord};
use crate::version::Version;

/// Allocates identities
pub trait IdentityGenerator: Send + Sync {
    /// New transient identity for an instance of `type_name`
    fn new_transient_identity(&self, type_name: &str) -> Identity;

    /// Persistent identity replacing `transient` (the key may change)
    fn convert_transient_to_persistent(&self, transient: &Identity) -> Identity;
}

/// Produces version stamps
pub trait VersionSource: Send + Sync {
    /// Next version for `identity`, which currently holds `previous`
    ///
    /// The result must be newer than `previous` and than every version this
    /// source handed out before.
    fn next_version(&self, identity: &Identity, previous: Option<&Version>, user: Option<&str>)
        -> Version;
}

/// Durable storage behind the transaction manager
///
/// Flushed notifications are staged per transaction and stay invisible to
/// [`ObjectStore::load`] until [`ObjectStore::commit`] applies all of them
/// together. A failed commit applies none.
pub trait ObjectStore: Send + Sync {
    /// Open a staging area for `txn_id`
    fn begin(&self, txn_id: u64) -> Result<()>;

    /// Stage an ordered batch
    fn flush(&self, txn_id: u64, batch: &[Notification]) -> Result<()>;

    /// Validate and apply everything staged for `txn_id`, in order
    fn commit(&self, txn_id: u64) -> Result<()>;

    /// Drop everything staged for `txn_id`
    fn abort(&self, txn_id: u64);

    /// Committed state of one object
    fn load(&self, identity: &Identity) -> Result<Option<StoredRecord>>;
}
