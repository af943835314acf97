//! Client identity presented to the registry.
//!
//! # Invariants
//! - Generated once and never replaced for the lifetime of an installation.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque random token identifying this client to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(Uuid);

impl ClientIdentity {
    /// Creates a fresh random (v4) identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a persisted identity; `None` for malformed input.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for ClientIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::ClientIdentity;

    #[test]
    fn generated_identities_are_distinct_v4_values() {
        let first = ClientIdentity::generate();
        let second = ClientIdentity::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let identity = ClientIdentity::generate();
        assert_eq!(ClientIdentity::parse(&identity.to_string()), Some(identity));
        assert_eq!(ClientIdentity::parse("not-a-uuid"), None);
    }
}
