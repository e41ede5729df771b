//! Container-side model: the inspector interface and the records it yields.
//!
//! Everything in here is runtime-agnostic. The Docker Engine backend lives
//! in [`crate::docker`]; tests substitute in-memory fleets.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// Compose service-name label carried by containers started from a compose
/// deployment.
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

/// Environment variable a container exports to opt into matching against
/// the status registry. Its value is the join label.
pub const MICROSERVICE_LABEL_ENV: &str = "MICROSERVICE_LABEL";

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier.
///
/// # Examples
///
/// ```
/// # use cnf_discovery::container::{ContainerID, Error};
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or its
    /// length exceeds [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a container listing.
///
/// Carries just enough to drive the per-container inspection loop and to
/// spot the orchestrator container without a second round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: ContainerID,
    pub labels: HashMap<String, String>,
}

/// Full metadata of one inspected container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: ContainerID,
    /// Container name as reported by the runtime. Docker keeps the leading
    /// slash; it is carried verbatim.
    pub name: String,
    pub labels: HashMap<String, String>,
    /// Raw `KEY=VALUE` environment entries in their original order.
    pub env: Vec<String>,
    pub image: String,
    /// Per-network `(network name, IP address)` attachments in scan order.
    pub networks: Vec<(String, String)>,
    /// Primary IP address as reported by the runtime, possibly empty.
    pub ip_address: Option<String>,
}

impl ContainerRecord {
    /// Value of the compose service label, or the empty string when the
    /// container carries none.
    pub fn service_name(&self) -> &str {
        self.labels
            .get(COMPOSE_SERVICE_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Value of the microservice label environment variable, if exported.
    pub fn microservice_label(&self) -> Option<&str> {
        env_value(&self.env, MICROSERVICE_LABEL_ENV)
    }
}

/// Looks up the value of `name` in a raw `KEY=VALUE` environment sequence.
///
/// Only an exact `name=` prefix matches, so `FOO` never matches a `FOOBAR=`
/// entry. The first matching entry wins and its value is returned even when
/// empty.
pub fn env_value<'a>(env: &'a [String], name: &str) -> Option<&'a str> {
    env.iter().find_map(|entry| {
        entry
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

/// Listing and inspection capability of a container runtime.
///
/// The discovery engine only ever lists the running fleet and inspects
/// single containers; lifecycle operations are out of its reach.
pub trait ContainerInspector {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists the currently running containers.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = std::result::Result<Vec<ContainerSummary>, Self::Error>> + Send;

    /// Fetches the full metadata of one container.
    fn inspect(
        &self,
        id: &ContainerID,
    ) -> impl std::future::Future<Output = std::result::Result<ContainerRecord, Self::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| (*e).to_owned()).collect()
    }

    #[test]
    fn test_container_id_accepts_full_length_id() {
        let id = "a".repeat(CONTAINER_ID_MAX_LEN);
        assert!(ContainerID::new(&id).is_ok());
    }

    #[test]
    fn test_container_id_rejects_empty_and_oversized() {
        assert!(matches!(
            ContainerID::new(""),
            Err(Error::InvalidContainerID(_))
        ));
        let oversized = "a".repeat(CONTAINER_ID_MAX_LEN + 1);
        assert!(matches!(
            ContainerID::new(oversized),
            Err(Error::InvalidContainerID(_))
        ));
    }

    #[test]
    fn test_env_value_requires_exact_key() {
        let entries = env(&["MICROSERVICE_LABELS=no", "MICROSERVICE_LABEL=cnf1"]);
        assert_eq!(env_value(&entries, "MICROSERVICE_LABEL"), Some("cnf1"));
    }

    #[test]
    fn test_env_value_first_match_wins_and_may_be_empty() {
        let entries = env(&["MICROSERVICE_LABEL=", "MICROSERVICE_LABEL=late"]);
        assert_eq!(env_value(&entries, "MICROSERVICE_LABEL"), Some(""));
    }

    #[test]
    fn test_env_value_missing_key() {
        let entries = env(&["PATH=/usr/bin", "HOME=/root"]);
        assert_eq!(env_value(&entries, "MICROSERVICE_LABEL"), None);
    }

    #[test]
    fn test_service_name_defaults_to_empty() {
        let record = ContainerRecord {
            id: ContainerID::new("abc123").unwrap(),
            name: "/plain".to_owned(),
            labels: HashMap::new(),
            env: Vec::new(),
            image: "busybox:latest".to_owned(),
            networks: Vec::new(),
            ip_address: None,
        };
        assert_eq!(record.service_name(), "");
        assert_eq!(record.microservice_label(), None);
    }
}
