//! End-to-end scenarios for the identity map and unit of work
//!
//! Each module exercises one guarantee through the public `causeway` facade.

#[path = "../common/mod.rs"]
mod common;

mod abort;
mod atomicity;
mod identity_map;
mod lifecycle;
mod resolve_state;
mod versions;
