//! HTTP client for the experiment registry API.

use crate::model::experiment::{CatalogPage, ExperimentRecord};
use crate::model::identity::ClientIdentity;
use crate::model::sync::{DesiredState, SyncMethod, SyncOutcome};
use crate::registry::credentials::CredentialProvider;
use crate::registry::transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::registry::{ExperimentRegistry, RegistryError, RegistryResult};
use log::{info, warn};
use url::Url;

const CATALOG_PATH: &str = "/api/experiments";

/// Registry client bound to one base URL.
///
/// Every request carries `Accept: application/json` plus the credential
/// headers the provider returns for the registry host.
pub struct RegistryClient<T: HttpTransport, C: CredentialProvider> {
    base_url: String,
    hostname: String,
    transport: T,
    credentials: C,
}

impl<T: HttpTransport, C: CredentialProvider> RegistryClient<T, C> {
    /// # Errors
    /// Returns `InvalidBaseUrl` when `base_url` does not parse or has no host.
    pub fn new(base_url: &str, transport: T, credentials: C) -> RegistryResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed =
            Url::parse(trimmed).map_err(|err| RegistryError::InvalidBaseUrl(err.to_string()))?;
        let hostname = parsed
            .host_str()
            .ok_or_else(|| RegistryError::InvalidBaseUrl(format!("`{trimmed}` has no host")))?
            .to_string();

        Ok(Self {
            base_url: trimmed.to_string(),
            hostname,
            transport,
            credentials,
        })
    }

    pub fn catalog_url(&self) -> String {
        format!("{}{CATALOG_PATH}", self.base_url)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        headers.extend(self.credentials.headers_for_host(&self.hostname));
        HttpRequest {
            method,
            url,
            headers,
        }
    }
}

impl<T: HttpTransport, C: CredentialProvider> ExperimentRegistry for RegistryClient<T, C> {
    fn fetch_catalog(&self) -> RegistryResult<Vec<ExperimentRecord>> {
        let request = self.request(HttpMethod::Get, self.catalog_url());
        let response = self
            .transport
            .execute(&request)
            .map_err(RegistryError::Network)?;

        if response.status >= 400 {
            warn!(
                "event=catalog_fetch module=registry status=error http_status={}",
                response.status
            );
            return Err(RegistryError::Http {
                status: response.status,
            });
        }

        let page: CatalogPage = serde_json::from_str(&response.body)
            .map_err(|err| RegistryError::InvalidPayload(err.to_string()))?;
        info!(
            "event=catalog_fetch module=registry status=ok experiments={}",
            page.results.len()
        );
        Ok(page.results)
    }

    fn sync_installation(
        &self,
        experiment: &ExperimentRecord,
        client: ClientIdentity,
        desired: DesiredState,
    ) -> SyncOutcome {
        let method = desired.method();
        let http_method = match method {
            SyncMethod::Put => HttpMethod::Put,
            SyncMethod::Delete => HttpMethod::Delete,
        };
        let request = self.request(
            http_method,
            experiment.installation_url(&client.to_string()),
        );

        let http_status = match self.transport.execute(&request) {
            Ok(response) => Some(response.status),
            Err(err) => {
                warn!(
                    "event=installation_sync module=registry status=error addon_id={} method={} error={}",
                    experiment.addon_id, method, err
                );
                None
            }
        };

        let outcome = SyncOutcome {
            addon_id: experiment.addon_id.clone(),
            method,
            http_status,
        };
        if outcome.is_success() {
            info!(
                "event=installation_sync module=registry status=ok addon_id={} method={} http_status={}",
                outcome.addon_id,
                method,
                http_status.unwrap_or_default()
            );
        } else if let Some(status) = http_status {
            warn!(
                "event=installation_sync module=registry status=error addon_id={} method={} http_status={}",
                outcome.addon_id, method, status
            );
        }
        outcome
    }
}
