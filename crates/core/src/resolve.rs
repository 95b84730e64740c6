//! Resolve-state machine
//!
//! Lifecycle states an adapter passes through. The machine is total: every
//! pair not listed below is illegal and must be rejected.
//!
//! ```text
//! Transient -> Ghost | Resolved   (remap as persistent)
//! Ghost     -> Resolved           (resolve)
//! Resolved  -> Resolved           (update)
//! Ghost     -> Destroyed          (delete)
//! Resolved  -> Destroyed          (delete)
//! ```
//!
//! `Value` and `Destroyed` have no outgoing edges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolveState {
    /// In memory only, not yet persisted
    Transient,
    /// Known to exist in storage, fields not loaded
    Ghost,
    /// Fully loaded
    Resolved,
    /// Immutable value wrapper, no lifecycle
    Value,
    /// Underlying instance removed from storage
    Destroyed,
}

impl ResolveState {
    /// Every state, for exhaustive checks
    pub const ALL: [ResolveState; 5] = [
        ResolveState::Transient,
        ResolveState::Ghost,
        ResolveState::Resolved,
        ResolveState::Value,
        ResolveState::Destroyed,
    ];

    /// Whether the machine allows `self -> to`
    pub const fn can_transition_to(self, to: ResolveState) -> bool {
        use ResolveState::*;
        matches!(
            (self, to),
            (Transient, Ghost)
                | (Transient, Resolved)
                | (Ghost, Resolved)
                | (Resolved, Resolved)
                | (Ghost, Destroyed)
                | (Resolved, Destroyed)
        )
    }

    /// Whether a transient identity may carry this state
    ///
    /// Only `Transient` does. All other states require a persistent identity.
    pub const fn allows_transient_identity(self) -> bool {
        matches!(self, ResolveState::Transient)
    }

    /// True for `Transient`
    pub const fn is_transient(self) -> bool {
        matches!(self, ResolveState::Transient)
    }

    /// True for `Ghost`
    pub const fn is_ghost(self) -> bool {
        matches!(self, ResolveState::Ghost)
    }

    /// True for `Resolved`
    pub const fn is_resolved(self) -> bool {
        matches!(self, ResolveState::Resolved)
    }

    /// True for `Destroyed`
    pub const fn is_destroyed(self) -> bool {
        matches!(self, ResolveState::Destroyed)
    }

    /// True for `Value`
    pub const fn is_value(self) -> bool {
        matches!(self, ResolveState::Value)
    }
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolveState::Transient => "Transient",
            ResolveState::Ghost => "Ghost",
            ResolveState::Resolved => "Resolved",
            ResolveState::Value => "Value",
            ResolveState::Destroyed => "Destroyed",
        };
        f.write_str(name)
    }
}
