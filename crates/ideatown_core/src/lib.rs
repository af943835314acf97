//! Core of the Idea Town experiment agent.
//!
//! Keeps locally installed experiment add-ons and the registry's record of
//! them converging, and bridges lifecycle events to an attached web UI.

pub mod bridge;
pub mod config;
pub mod db;
pub mod host;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use bridge::protocol::{LoadReason, UnloadReason};
pub use bridge::{
    AllowedOrigins, BridgeError, InboundCommand, MessageBridge, OutboundMessage, UiSurface,
};
pub use config::AgentConfig;
pub use host::{HostError, HostEvent, HostInstall, HostPackageManager, HostResult, InstallPhase};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::addon::InstalledAddon;
pub use model::experiment::{AddonId, ExperimentRecord};
pub use model::identity::ClientIdentity;
pub use model::sync::{DesiredState, ServerInstallation, SyncMethod, SyncOutcome};
pub use registry::{ExperimentRegistry, RegistryClient, RegistryError, RegistryResult};
pub use repo::install_store::{
    InstallStore, MembershipChange, SqliteInstallStore, StoreError, StoreResult,
};
pub use service::agent::{CommandEffect, ExperimentAgent};
pub use service::listener::ListenerEffect;
pub use service::reconciler::{mismatch_set, HostAction, Mismatch, Reconciler, SyncReport};
pub use service::{AgentError, AgentResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
