//! Host package-manager boundary.
//!
//! # Responsibility
//! - Describe the operations the agent needs from the host package manager.
//! - Define the closed set of lifecycle events the host delivers.
//!
//! # Invariants
//! - Events are plain values dispatched through one handler; no callback
//!   objects are registered with the host.

use crate::model::addon::InstalledAddon;
use crate::model::experiment::AddonId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mime type passed to the host for experiment packages.
pub const XPI_MIME_TYPE: &str = "application/x-xpinstall";

pub type HostResult<T> = Result<T, HostError>;

/// Failure reported by the host package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Unavailable(String),
    NotFound(AddonId),
    Rejected(String),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "host package manager unavailable: {message}"),
            Self::NotFound(id) => write!(f, "host package not found: {id}"),
            Self::Rejected(message) => write!(f, "host rejected operation: {message}"),
        }
    }
}

impl Error for HostError {}

/// Operations the agent performs against the host package manager.
pub trait HostPackageManager {
    fn list_installed_packages(&self) -> HostResult<Vec<InstalledAddon>>;
    fn get_by_id(&self, addon_id: &str) -> HostResult<Option<InstalledAddon>>;
    /// Starts an install; progress arrives later as `HostEvent`s.
    fn install_from_url(&mut self, url: &str, mime_type: &str) -> HostResult<()>;
    fn uninstall(&mut self, addon: &InstalledAddon) -> HostResult<()>;
}

/// Snapshot of an in-flight host install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInstall {
    #[serde(default)]
    pub name: Option<String>,
    /// Host error code; `0` when no error occurred.
    #[serde(default)]
    pub error: i32,
    /// Host install state code.
    #[serde(default)]
    pub state: i32,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub max_progress: i64,
}

/// Install transitions that carry no add-on object yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    New,
    Started,
    DownloadStarted,
    DownloadProgress,
    DownloadEnded,
    DownloadCancelled,
    DownloadFailed,
    Failed,
    Cancelled,
}

/// Lifecycle event emitted by the host package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Uninstalling(InstalledAddon),
    Uninstalled(InstalledAddon),
    Install {
        phase: InstallPhase,
        install: HostInstall,
    },
    InstallEnded {
        install: HostInstall,
        addon: InstalledAddon,
    },
}

impl HostEvent {
    /// Add-on the event refers to, when the host has produced one.
    pub fn addon_id(&self) -> Option<&str> {
        match self {
            Self::Uninstalling(addon)
            | Self::Uninstalled(addon)
            | Self::InstallEnded { addon, .. } => Some(addon.addon_id.as_str()),
            Self::Install { .. } => None,
        }
    }
}
