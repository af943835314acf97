//! Remote experiment registry access.
//!
//! # Responsibility
//! - Fetch the experiment catalog.
//! - Mirror one experiment's installed state for this client (PUT/DELETE).
//!
//! # Invariants
//! - Catalog failures propagate as `RegistryError` and are never retried here.
//! - Per-item sync never fails: every status, including transport failure,
//!   is reported as a `SyncOutcome`.

use crate::model::experiment::ExperimentRecord;
use crate::model::identity::ClientIdentity;
use crate::model::sync::{DesiredState, SyncOutcome};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod client;
pub mod credentials;
pub mod transport;

pub use client::RegistryClient;
pub use credentials::{Cookie, CookieCredentials, CookieJar, CredentialProvider, InMemoryCookieJar};
pub use transport::{BlockingHttpTransport, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure of a registry call that the caller must handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry could not be reached.
    Network(String),
    /// The registry answered a catalog fetch with an error status.
    Http { status: u16 },
    /// The response body did not have the expected shape.
    InvalidPayload(String),
    /// The configured base URL is unusable.
    InvalidBaseUrl(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "registry unreachable: {message}"),
            Self::Http { status } => write!(f, "registry responded with status {status}"),
            Self::InvalidPayload(message) => write!(f, "invalid registry payload: {message}"),
            Self::InvalidBaseUrl(message) => write!(f, "invalid registry base url: {message}"),
        }
    }
}

impl Error for RegistryError {}

/// Registry operations the reconciler depends on.
pub trait ExperimentRegistry {
    /// Returns the complete current catalog.
    fn fetch_catalog(&self) -> RegistryResult<Vec<ExperimentRecord>>;

    /// Records `desired` for `experiment` under this client's identity.
    fn sync_installation(
        &self,
        experiment: &ExperimentRecord,
        client: ClientIdentity,
        desired: DesiredState,
    ) -> SyncOutcome;
}
