//! Wire vocabulary spoken between the agent and the attached UI.
//!
//! Messages travel as `{"type": <event name>, "data": <payload>}` objects.

use crate::host::{HostInstall, InstallPhase};
use crate::model::addon::InstalledAddon;
use crate::model::experiment::AddonId;
use crate::model::identity::ClientIdentity;
use crate::model::sync::ServerInstallation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Command sent by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum InboundCommand {
    InstallExperiment(InstallRequest),
    UninstallExperiment(UninstallRequest),
    UninstallAll,
    SyncInstalled(Vec<ServerInstallation>),
}

impl InboundCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InstallExperiment(_) => "install-experiment",
            Self::UninstallExperiment(_) => "uninstall-experiment",
            Self::UninstallAll => "uninstall-all",
            Self::SyncInstalled(_) => "sync-installed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstallRequest {
    pub addon_id: AddonId,
    pub xpi_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UninstallRequest {
    pub addon_id: AddonId,
}

/// Why the agent was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadReason {
    Install,
    Enable,
    Upgrade,
    Downgrade,
    Startup,
}

impl LoadReason {
    /// Self notification announced to the first attached surface, if any.
    pub fn announcement(self) -> Option<SelfEvent> {
        match self {
            Self::Install => Some(SelfEvent::Installed),
            Self::Enable => Some(SelfEvent::Enabled),
            Self::Upgrade => Some(SelfEvent::Upgraded),
            Self::Downgrade | Self::Startup => None,
        }
    }
}

/// Why the agent is being unloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadReason {
    Uninstall,
    Disable,
    Shutdown,
    Upgrade,
    Downgrade,
}

/// Lifecycle of the agent itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfEvent {
    Installed,
    Enabled,
    Upgraded,
    Uninstalled,
}

/// Normalized install-progress record.
///
/// Add-on fields are present only once the host has produced an add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallProgress {
    pub name: String,
    pub error: i32,
    pub state: i32,
    pub version: String,
    pub progress: i64,
    pub max_progress: i64,
    #[serde(flatten)]
    pub addon: Option<AddonDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonDetails {
    pub id: AddonId,
    pub description: Option<String>,
    #[serde(rename = "homepageURL")]
    pub homepage_url: Option<String>,
    #[serde(rename = "iconURL")]
    pub icon_url: Option<String>,
    pub size: Option<u64>,
    pub signed_state: Option<i32>,
    pub permissions: Option<u32>,
}

impl InstallProgress {
    pub fn new(install: &HostInstall, addon: Option<&InstalledAddon>) -> Self {
        Self {
            name: install.name.clone().unwrap_or_default(),
            error: install.error,
            state: install.state,
            version: install.version.clone().unwrap_or_default(),
            progress: install.progress,
            max_progress: install.max_progress,
            addon: addon.map(|addon| AddonDetails {
                id: addon.addon_id.clone(),
                description: addon.description.clone(),
                homepage_url: addon.homepage_url.clone(),
                icon_url: addon.icon_url.clone(),
                size: addon.size,
                signed_state: addon.signed_state,
                permissions: addon.permissions,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UninstallNotice {
    pub id: AddonId,
    pub name: String,
    pub version: String,
}

impl From<&InstalledAddon> for UninstallNotice {
    fn from(addon: &InstalledAddon) -> Self {
        Self {
            id: addon.addon_id.clone(),
            name: addon.name.clone(),
            version: addon.version.clone(),
        }
    }
}

/// Reply to `sync-installed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncInstalledResult {
    #[serde(rename = "clientUUID")]
    pub client_uuid: ClientIdentity,
    pub installed: BTreeMap<AddonId, InstalledAddon>,
}

/// Notification sent to the UI. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Install {
        phase: InstallPhase,
        progress: InstallProgress,
    },
    InstallEnded(InstallProgress),
    UninstallStarted(UninstallNotice),
    UninstallEnded(UninstallNotice),
    SelfLifecycle(SelfEvent),
    SyncInstalledResult(SyncInstalledResult),
}

impl OutboundMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Install { phase, .. } => match phase {
                InstallPhase::New => "addon-install:install-new",
                InstallPhase::Started => "addon-install:install-started",
                InstallPhase::DownloadStarted => "addon-install:download-started",
                InstallPhase::DownloadProgress => "addon-install:download-progress",
                InstallPhase::DownloadEnded => "addon-install:download-ended",
                InstallPhase::DownloadCancelled => "addon-install:download-cancelled",
                InstallPhase::DownloadFailed => "addon-install:download-failed",
                InstallPhase::Failed => "addon-install:install-failed",
                InstallPhase::Cancelled => "addon-install:install-cancelled",
            },
            Self::InstallEnded(_) => "addon-install:install-ended",
            Self::UninstallStarted(_) => "addon-uninstall:uninstall-started",
            Self::UninstallEnded(_) => "addon-uninstall:uninstall-ended",
            Self::SelfLifecycle(event) => match event {
                SelfEvent::Installed => "addon-self:installed",
                SelfEvent::Enabled => "addon-self:enabled",
                SelfEvent::Upgraded => "addon-self:upgraded",
                SelfEvent::Uninstalled => "addon-self:uninstalled",
            },
            Self::SyncInstalledResult(_) => "sync-installed-result",
        }
    }

    /// Payload value; `None` for events without data.
    pub fn payload(&self) -> serde_json::Result<Option<Value>> {
        let value = match self {
            Self::Install { progress, .. } | Self::InstallEnded(progress) => {
                serde_json::to_value(progress)?
            }
            Self::UninstallStarted(notice) | Self::UninstallEnded(notice) => {
                serde_json::to_value(notice)?
            }
            Self::SyncInstalledResult(result) => serde_json::to_value(result)?,
            Self::SelfLifecycle(_) => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Serializes the `{type, data}` envelope.
    pub fn to_wire(&self) -> serde_json::Result<String> {
        let envelope = match self.payload()? {
            Some(data) => json!({ "type": self.event_name(), "data": data }),
            None => json!({ "type": self.event_name() }),
        };
        serde_json::to_string(&envelope)
    }
}
