//! Domain records shared by the store, the registry client and the bridge.
//!
//! # Invariants
//! - Every experiment and installed add-on is keyed by its `AddonId`.
//! - `InstalledAddon` values only ever describe ids present in the catalog
//!   at the time they were written.

pub mod addon;
pub mod experiment;
pub mod identity;
pub mod sync;
