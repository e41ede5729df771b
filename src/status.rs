//! Status registry: the wire model served at [`STATUS_PATH`] and the fetch
//! step that turns one GET into decoded records.
//!
//! The endpoint replies with a JSON array of [`StatusRecord`]s, one per
//! process currently registered with the orchestrator. Reconciliation only
//! ever needs label lookups, so the records are folded into a
//! [`StatusTable`] right after fetching.

use std::collections::HashMap;

use crate::error::BoxError;

/// Path of the orchestrator's status endpoint.
pub const STATUS_PATH: &str = "/status/info";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("status request failed: {0}")]
    Fetch(#[source] BoxError),
    #[error("decoding status reply failed: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Self-reported registration of one managed process.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusRecord {
    /// Join key matching a container's microservice label.
    pub label: String,
    /// Opaque operating-mode indicator, folded into a component mode through
    /// the configured mode map.
    pub mode: String,
    #[serde(rename = "managementIP")]
    pub management_ip: String,
    #[serde(rename = "managementPort")]
    pub management_port: u16,
}

/// Transport able to perform one GET against the orchestrator.
///
/// Implementations resolve to the response body only for successful
/// responses and surface everything else, non-2xx statuses included, as
/// their error type.
pub trait StatusTransport {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = std::result::Result<Vec<u8>, Self::Error>> + Send;
}

/// Performs the status GET and decodes the reply.
///
/// # Errors
///
/// Returns [`Error::Fetch`] carrying the transport failure, or
/// [`Error::Decode`] when the body is not a JSON array of records.
pub async fn fetch<T: StatusTransport>(transport: &T) -> Result<Vec<StatusRecord>> {
    let body = transport
        .get(STATUS_PATH)
        .await
        .map_err(|source| Error::Fetch(Box::new(source)))?;
    let records = serde_json::from_slice(&body).map_err(Error::Decode)?;
    Ok(records)
}

/// Label-keyed lookup table over one fetch's records.
///
/// Labels are expected to be unique. On duplicates the last record wins,
/// mirroring how the registry itself would overwrite a re-registration.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    records: HashMap<String, StatusRecord>,
}

impl StatusTable {
    pub fn from_records(records: impl IntoIterator<Item = StatusRecord>) -> Self {
        let mut table = HashMap::new();
        for record in records {
            table.insert(record.label.clone(), record);
        }
        Self { records: table }
    }

    pub fn lookup(&self, label: &str) -> Option<&StatusRecord> {
        self.records.get(label)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
