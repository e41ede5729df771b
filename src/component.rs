//! Output model of a discovery pass.
//!
//! A [`Component`] is the normalized view of one running container after it
//! has been reconciled against the orchestrator's status registry. The
//! classification vocabulary lives here as well: [`ComponentMode`] and the
//! deployment-supplied [`ModeMap`] that folds reported mode indicators into
//! managed submodes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::status::StatusRecord;

/// Metadata key carrying the container identifier.
pub const METADATA_CONTAINER_ID: &str = "containerID";
/// Metadata key carrying the container name as reported by the runtime.
pub const METADATA_CONTAINER_NAME: &str = "containerName";
/// Metadata key carrying the compose service name.
pub const METADATA_SERVICE_NAME: &str = "containerServiceName";
/// Metadata key carrying the container image reference.
pub const METADATA_IMAGE: &str = "dockerImage";
/// Metadata key carrying the resolved container IP address, when one exists.
pub const METADATA_IP_ADDRESS: &str = "containerIPAddress";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("managed mode name must not be empty")]
    EmptyManagedMode,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Named submode of a managed component.
///
/// The set of valid submodes is defined by the [`ModeMap`] a deployment
/// ships, not by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct ManagedMode(String);

impl ManagedMode {
    /// Creates a new `ManagedMode` from the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyManagedMode`] if the name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyManagedMode);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ManagedMode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for ManagedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role assigned to a discovered component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentMode {
    /// The container exports no microservice label. It belongs to the
    /// deployment but does not participate in the platform.
    Auxiliary,
    /// The container is labeled but not registered with the orchestrator.
    Standalone,
    /// The container is registered and its reported mode indicator maps to a
    /// configured submode.
    Managed(ManagedMode),
    /// The container is registered but the reported mode indicator has no
    /// entry in the mode map.
    Unknown,
}

impl fmt::Display for ComponentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentMode::Auxiliary => f.write_str("auxiliary"),
            ComponentMode::Standalone => f.write_str("standalone"),
            ComponentMode::Managed(mode) => write!(f, "{mode}"),
            ComponentMode::Unknown => f.write_str("unknown"),
        }
    }
}

impl serde::Serialize for ComponentMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Mapping from reported mode indicators to managed submodes.
///
/// The table is configuration. The shipped binary reads it from
/// `CNF_MODE_MAP` as a JSON object of indicator to submode name; library
/// consumers build it programmatically. An empty map is valid and classifies
/// every matched component as [`ComponentMode::Unknown`].
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(transparent)]
pub struct ModeMap {
    entries: HashMap<String, ManagedMode>,
}

impl ModeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one indicator entry, replacing any previous mapping.
    pub fn insert(&mut self, indicator: impl Into<String>, mode: ManagedMode) {
        self.entries.insert(indicator.into(), mode);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classifies a reported mode indicator.
    ///
    /// Indicators without an entry classify as [`ComponentMode::Unknown`].
    /// The miss is logged because it usually means the deployed map is stale.
    pub fn classify(&self, indicator: &str) -> ComponentMode {
        match self.entries.get(indicator) {
            Some(mode) => ComponentMode::Managed(mode.clone()),
            None => {
                log::warn!("no mode map entry for reported mode `{indicator}`");
                ComponentMode::Unknown
            }
        }
    }
}

impl<S: Into<String>> FromIterator<(S, ManagedMode)> for ModeMap {
    fn from_iter<T: IntoIterator<Item = (S, ManagedMode)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// One discovered component.
///
/// `H` is the opaque management-handle type produced by the dialer. Handles
/// exist only for matched components and are never serialized.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(bound(serialize = ""))]
pub struct Component<H> {
    /// Registry label for matched components, compose service name
    /// otherwise.
    pub name: String,
    pub mode: ComponentMode,
    /// Container metadata keyed by the `METADATA_*` constants.
    pub metadata: BTreeMap<String, String>,
    /// The matched status record, absent for auxiliary and standalone
    /// components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<StatusRecord>,
    #[serde(skip)]
    pub management: Option<H>,
}
