//! Persistence contracts and their SQLite implementations.
//!
//! # Invariants
//! - Collection replacement is all-or-nothing.
//! - Store APIs report membership changes as tagged values so callers can
//!   assert idempotence directly.

pub mod install_store;
