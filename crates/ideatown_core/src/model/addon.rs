//! Locally installed experiment add-ons.

use crate::model::experiment::AddonId;
use serde::{Deserialize, Serialize};

/// Host package-manager view of one installed add-on.
///
/// The same shape is reported by the host and persisted in the installed
/// set; serialized field names follow the host's camelCase vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledAddon {
    #[serde(rename = "id")]
    pub addon_id: AddonId,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "homepageURL")]
    pub homepage_url: Option<String>,
    #[serde(default, rename = "iconURL")]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub signed_state: Option<i32>,
    #[serde(default)]
    pub permissions: Option<u32>,
    /// Host install state code, when the host reports one.
    #[serde(default)]
    pub state: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl InstalledAddon {
    /// Minimal record with the required identity fields set.
    pub fn new(
        addon_id: impl Into<AddonId>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            addon_id: addon_id.into(),
            name: name.into(),
            version: version.into(),
            description: None,
            homepage_url: None,
            icon_url: None,
            size: None,
            signed_state: None,
            permissions: None,
            state: None,
            is_active: true,
        }
    }
}
