//! Error types for causeway
//!
//! Every violation of the identity-map, resolve-state or transaction contract
//! is raised synchronously as one of these variants. The core never retries;
//! presentation layers map each error to a user-facing signal via
//! [`Error::class`].

use crate::identity::Identity;
use crate::resolve::ResolveState;
use crate::version::Version;
use thiserror::Error;

/// Result type alias for causeway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the object identity map and unit-of-work engine
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The raw instance is already wrapped by an adapter
    #[error("Instance is already wrapped by adapter {identity}")]
    DuplicateAdapter {
        /// Identity of the existing adapter
        identity: Identity,
    },

    /// Operation requires a different adapter or identity state
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The resolve-state machine rejected a transition
    #[error("Illegal resolve transition for {identity}: {from} -> {to}")]
    IllegalResolveTransition {
        /// Adapter whose transition was rejected
        identity: Identity,
        /// State the adapter is in (unchanged)
        from: ResolveState,
        /// State that was requested
        to: ResolveState,
    },

    /// A caller-supplied version is stale relative to the adapter or storage
    #[error("Concurrency conflict on {identity}: supplied {supplied}, current {current}")]
    Concurrency {
        /// Object whose version differs
        identity: Identity,
        /// Version the writer based its change on
        supplied: Version,
        /// Version currently held
        current: Version,
    },

    /// end/flush called with nothing active
    #[error("No active transaction")]
    NoActiveTransaction,

    /// start called while a transaction is already active
    #[error("Transaction {txn_id} is already active")]
    TransactionAlreadyActive {
        /// Identifier of the active transaction
        txn_id: u64,
    },

    /// Session closed while its transaction was still active
    #[error("Session closed with transaction {txn_id} still active")]
    SessionClosedWithActiveTransaction {
        /// Identifier of the abandoned transaction
        txn_id: u64,
    },

    /// A version update did not move the stamp forward
    #[error("Version for {identity} must advance past {current}, got {proposed}")]
    NonMonotonicVersion {
        /// Adapter being stamped
        identity: Identity,
        /// Version currently held
        current: Version,
        /// Rejected version
        proposed: Version,
    },

    /// The specification loader does not know the type
    #[error("No specification for type '{0}'")]
    UnknownSpecification(String),

    /// No adapter exists for the identity in this session
    #[error("Object not found: {0}")]
    ObjectNotFound(Identity),

    /// Identity string could not be parsed
    #[error("Invalid identity string '{0}'")]
    InvalidIdentity(String),

    /// The wrapped instance is not of the requested Rust type
    #[error("Adapter {identity} does not wrap a {expected}")]
    TypeMismatch {
        /// Adapter that was accessed
        identity: Identity,
        /// Requested type name
        expected: &'static str,
    },

    /// A member access check vetoed the operation
    #[error("Access to '{member}' vetoed: {reason}")]
    Vetoed {
        /// Member identifier
        member: String,
        /// Human-readable reason
        reason: String,
    },

    /// Storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Convenience constructor for [`Error::IllegalState`]
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Error::IllegalState(msg.into())
    }

    /// Convenience constructor for [`Error::Storage`]
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Presentation-layer classification of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Concurrency { .. } => ErrorClass::Conflict,
            Error::ObjectNotFound(_) | Error::InvalidIdentity(_) => ErrorClass::NotFound,
            Error::Vetoed { .. } => ErrorClass::Forbidden,
            _ => ErrorClass::Internal,
        }
    }

    /// Whether the caller may reload and retry the user-level operation
    ///
    /// Only version conflicts qualify. Everything else is contract misuse.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Concurrency { .. })
    }
}

/// User-facing signal a presentation layer must raise for an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Stale version; the user should reload and retry
    Conflict,
    /// Identity unknown or malformed
    NotFound,
    /// A member access check vetoed the request
    Forbidden,
    /// Misuse of the core's contract
    Internal,
}

impl ErrorClass {
    /// HTTP status equivalent
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorClass::Conflict => 409,
            ErrorClass::NotFound => 404,
            ErrorClass::Forbidden => 403,
            ErrorClass::Internal => 500,
        }
    }
}
