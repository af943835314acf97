//! Reconciliation use-cases and the composition root.
//!
//! # Responsibility
//! - Keep the installed set, the host and the registry converging.
//! - Contain every registry and host failure at this boundary.
//!
//! # Invariants
//! - Only the reconciler and the lifecycle listener write the install store.
//! - Ids outside the catalog never reach the host package manager.

use crate::bridge::BridgeError;
use crate::host::HostError;
use crate::registry::RegistryError;
use crate::repo::install_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod agent;
pub mod listener;
pub mod reconciler;

pub type AgentResult<T> = Result<T, AgentError>;

/// Failure surfaced by agent use-cases.
#[derive(Debug)]
pub enum AgentError {
    Store(StoreError),
    Registry(RegistryError),
    Host(HostError),
    Bridge(BridgeError),
    OriginNotAllowed(String),
}

impl Display for AgentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Host(err) => write!(f, "{err}"),
            Self::Bridge(err) => write!(f, "{err}"),
            Self::OriginNotAllowed(url) => write!(f, "page is not an allowed origin: {url}"),
        }
    }
}

impl Error for AgentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Host(err) => Some(err),
            Self::Bridge(err) => Some(err),
            Self::OriginNotAllowed(_) => None,
        }
    }
}

impl From<StoreError> for AgentError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RegistryError> for AgentError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<HostError> for AgentError {
    fn from(value: HostError) -> Self {
        Self::Host(value)
    }
}

impl From<BridgeError> for AgentError {
    fn from(value: BridgeError) -> Self {
        Self::Bridge(value)
    }
}
