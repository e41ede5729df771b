//! Pure classification of one inspected container against the status table.
//!
//! No I/O happens here. Given the same record, table and mode map the
//! functions always produce the same classification, which is what makes a
//! whole discovery pass deterministic.
//!
//! The rules, in order:
//!
//! 1. No microservice label environment variable: the container is
//!    auxiliary.
//! 2. Labeled but absent from the table: standalone.
//! 3. Labeled and present: the component takes the registry record's label
//!    as its name and the mode map's reading of the reported mode
//!    indicator.
//!
//! Metadata is attached unconditionally in all three cases.

use std::collections::BTreeMap;

use crate::component::{
    Component, ComponentMode, METADATA_CONTAINER_ID, METADATA_CONTAINER_NAME, METADATA_IMAGE,
    METADATA_IP_ADDRESS, METADATA_SERVICE_NAME, ModeMap,
};
use crate::container::ContainerRecord;
use crate::status::{StatusRecord, StatusTable};

/// Classification of one container, before any management handle is
/// attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub name: String,
    pub mode: ComponentMode,
    pub metadata: BTreeMap<String, String>,
    pub info: Option<StatusRecord>,
}

impl Classification {
    /// Converts into the output entity, attaching the optional handle.
    pub fn into_component<H>(self, management: Option<H>) -> Component<H> {
        Component {
            name: self.name,
            mode: self.mode,
            metadata: self.metadata,
            info: self.info,
            management,
        }
    }

    /// Reclassifies as standalone, dropping the registry match.
    ///
    /// Used by the degrade dial policy. The result is indistinguishable
    /// from the classification an unmatched labeled container gets.
    pub fn degrade_to_standalone(mut self) -> Self {
        self.name = self
            .metadata
            .get(METADATA_SERVICE_NAME)
            .cloned()
            .unwrap_or_default();
        self.mode = ComponentMode::Standalone;
        self.info = None;
        self
    }
}

/// Classifies one inspected container.
pub fn classify(record: &ContainerRecord, table: &StatusTable, modes: &ModeMap) -> Classification {
    let metadata = build_metadata(record);

    let Some(label) = record.microservice_label() else {
        return Classification {
            name: record.service_name().to_owned(),
            mode: ComponentMode::Auxiliary,
            metadata,
            info: None,
        };
    };

    match table.lookup(label) {
        Some(info) => Classification {
            name: info.label.clone(),
            mode: modes.classify(&info.mode),
            metadata,
            info: Some(info.clone()),
        },
        None => Classification {
            name: record.service_name().to_owned(),
            mode: ComponentMode::Standalone,
            metadata,
            info: None,
        },
    }
}

/// Builds the metadata mapping for one container.
///
/// The id, name, service name and image keys are always present, the
/// service name possibly with an empty value. The IP key is only inserted
/// when an address could be resolved.
fn build_metadata(record: &ContainerRecord) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert(METADATA_CONTAINER_ID.to_owned(), record.id.to_string());
    metadata.insert(METADATA_CONTAINER_NAME.to_owned(), record.name.clone());
    metadata.insert(
        METADATA_SERVICE_NAME.to_owned(),
        record.service_name().to_owned(),
    );
    metadata.insert(METADATA_IMAGE.to_owned(), record.image.clone());
    if let Some(ip) = resolve_ip(record) {
        metadata.insert(METADATA_IP_ADDRESS.to_owned(), ip.to_owned());
    }
    metadata
}

/// Resolves the advertised container address: the primary IP when non-empty,
/// otherwise the first non-empty per-network address in attachment order.
fn resolve_ip(record: &ContainerRecord) -> Option<&str> {
    record
        .ip_address
        .as_deref()
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            record
                .networks
                .iter()
                .map(|(_, ip)| ip.as_str())
                .find(|ip| !ip.is_empty())
        })
}
