//! Experiment catalog records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Package-manager identifier of an experiment add-on.
pub type AddonId = String;

/// One entry of the registry catalog.
///
/// Only `addon_id` and `installations_url` carry meaning for reconciliation;
/// every other registry field is kept verbatim in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub addon_id: AddonId,
    /// Collection URL; the per-client resource is `{installations_url}{client_id}`.
    pub installations_url: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ExperimentRecord {
    pub fn new(addon_id: impl Into<AddonId>, installations_url: impl Into<String>) -> Self {
        Self {
            addon_id: addon_id.into(),
            installations_url: installations_url.into(),
            metadata: Map::new(),
        }
    }

    /// URL of this client's installation resource for the experiment.
    pub fn installation_url(&self, client_id: &str) -> String {
        format!("{}{}", self.installations_url, client_id)
    }
}

/// `GET {base}/api/experiments` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    pub results: Vec<ExperimentRecord>,
}

#[cfg(test)]
mod tests {
    use super::{CatalogPage, ExperimentRecord};

    #[test]
    fn unknown_registry_fields_are_kept_as_metadata() {
        let page: CatalogPage = serde_json::from_str(
            r#"{"results":[{"addon_id":"a@x","installations_url":"https://r/i/","title":"A","id":3}]}"#,
        )
        .unwrap();
        let record = &page.results[0];
        assert_eq!(record.addon_id, "a@x");
        assert_eq!(record.metadata["title"], "A");
        assert_eq!(record.metadata["id"], 3);
    }

    #[test]
    fn installation_url_appends_client_id() {
        let record = ExperimentRecord::new("a@x", "https://r/api/experiments/1/installations/");
        assert_eq!(
            record.installation_url("abc"),
            "https://r/api/experiments/1/installations/abc"
        );
    }
}
