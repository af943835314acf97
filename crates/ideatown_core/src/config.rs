//! Runtime configuration resolved from the environment.
//!
//! | variable                   | default                              |
//! |----------------------------|--------------------------------------|
//! | `IDEATOWN_BASE_URL`        | `http://localhost:8000`              |
//! | `IDEATOWN_ALLOWED_ORIGINS` | `{base_url}/*`                       |
//! | `IDEATOWN_DB_PATH`         | `<temp dir>/ideatown_store.sqlite3`  |
//! | `IDEATOWN_LOG_LEVEL`       | `default_log_level()`                |
//! | `IDEATOWN_LOG_DIR`         | unset (file logging disabled)        |
//!
//! Blank values count as unset.

use crate::bridge::AllowedOrigins;
use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const STORE_FILE_NAME: &str = "ideatown_store.sqlite3";

/// Resolved agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Registry base URL without trailing slash.
    pub base_url: String,
    /// Page patterns allowed to attach as a UI surface.
    pub allowed_origins: Vec<String>,
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let base_url = value("IDEATOWN_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = value("IDEATOWN_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec![format!("{base_url}/*")]);

        Self {
            allowed_origins,
            db_path: value("IDEATOWN_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(STORE_FILE_NAME)),
            log_level: value("IDEATOWN_LOG_LEVEL")
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: value("IDEATOWN_LOG_DIR").map(PathBuf::from),
            base_url,
        }
    }

    /// Compiles `allowed_origins`.
    pub fn origins(&self) -> Result<AllowedOrigins, regex::Error> {
        AllowedOrigins::new(&self.allowed_origins)
    }
}
