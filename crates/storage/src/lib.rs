//! Storage layer for causeway
//!
//! This crate implements the reference storage collaborator:
//! - InMemoryObjectStore: committed records behind a `parking_lot::RwLock`
//! - Per-transaction staging so flushed notifications stay invisible until commit
//! - All-or-nothing commit with first-committer-wins version validation
//! - Fault injection hooks for exercising abort paths in tests
//!
//! Real deployments put a database behind the `ObjectStore` trait; this
//! implementation is what the engine's tests and demos run against.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;

pub use memory::{CommittedBatch, InMemoryObjectStore};
