//! Per-item sync vocabulary.

use crate::model::experiment::AddonId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Installed state the registry should record for one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Installed,
    Absent,
}

impl DesiredState {
    /// Desired state derived from local installed-set membership.
    pub fn from_membership(installed_locally: bool) -> Self {
        if installed_locally {
            Self::Installed
        } else {
            Self::Absent
        }
    }

    pub fn method(self) -> SyncMethod {
        match self {
            Self::Installed => SyncMethod::Put,
            Self::Absent => SyncMethod::Delete,
        }
    }
}

/// HTTP verb of a per-item sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    Put,
    Delete,
}

impl SyncMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl Display for SyncMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one per-item sync call. Diagnostic only; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub addon_id: AddonId,
    pub method: SyncMethod,
    /// `None` when the request never produced a response (transport failure).
    pub http_status: Option<u16>,
}

impl SyncOutcome {
    /// Whether the registry now agrees with the requested state.
    ///
    /// Any status below 400 counts. A DELETE answered with 404 (never
    /// existed) or 410 (already gone) counts as well.
    pub fn is_success(&self) -> bool {
        match (self.method, self.http_status) {
            (_, Some(status)) if status < 400 => true,
            (SyncMethod::Delete, Some(404 | 410)) => true,
            _ => false,
        }
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }
}

/// One `{client_id, addon_id}` pair from the server's installation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInstallation {
    pub client_id: String,
    pub addon_id: AddonId,
}
