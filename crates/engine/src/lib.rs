//! Engine for causeway
//!
//! This crate ties the lower layers together:
//! - IdentityMap: per-session adapter registry (one adapter per identity)
//! - Identity generators: sequence and uuid schemes
//! - Session: identity map + transaction manager + principal
//! - Runtime: session factory over shared collaborators
//! - SessionStack: nested "current session" helper for host boundaries
//! - Configuration and tracing setup
//!
//! The engine holds no global state. Every session is created from a
//! [`Runtime`] value and passed explicitly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod generators;
pub mod identity_map;
pub mod runtime;
pub mod session;
pub mod telemetry;

pub use config::{GhostPolicy, IdentityScheme, LoggingConfig, RuntimeConfig};
pub use context::SessionStack;
pub use generators::{SequenceIdentityGenerator, UuidIdentityGenerator};
pub use identity_map::{IdentityMap, Loaded};
pub use runtime::Runtime;
pub use session::{Session, SessionOptions};
pub use telemetry::init_tracing;
