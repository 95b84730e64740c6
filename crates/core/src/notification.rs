//! Change notifications exchanged with the storage collaborator

use crate::identity::Identity;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// What happened to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A transient object was made persistent
    Created,
    /// A field or collection of a persistent object changed
    Changed,
    /// The object was removed from storage
    Destroyed,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::Created => "created",
            NotificationKind::Changed => "changed",
            NotificationKind::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// One recorded change, in the form storage sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Object the change applies to
    pub identity: Identity,
    /// Kind of change
    pub kind: NotificationKind,
    /// Version the change was derived from (`None` for `Created`)
    pub base_version: Option<Version>,
    /// Version the object holds after the change
    pub version: Version,
    /// Persisted state after the change (`Null` for `Destroyed`)
    pub memento: JsonValue,
}

/// Committed state of one object as held by storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Object identity
    pub identity: Identity,
    /// Last committed version
    pub version: Version,
    /// Last committed state
    pub memento: JsonValue,
    /// True once a `Destroyed` notification was committed
    pub destroyed: bool,
}
