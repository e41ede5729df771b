//! Discovery engine: one call reconciles the running fleet with the status
//! registry and yields the classified component list.
//!
//! The pass is strictly phased. The registry is fetched first, then the
//! fleet is listed, then every container is inspected and classified in
//! listing order. Any transport, decode or handle failure aborts the whole
//! pass (unless the dial policy says otherwise), so callers either get the
//! complete view or an error, never a silently partial one.

pub mod reconcile;

use tokio_util::sync::CancellationToken;

use crate::component::{Component, ModeMap};
use crate::container::{ContainerInspector, ContainerRecord};
use crate::error::BoxError;
use crate::mgmt::ManagementDial;
use crate::status::{self, StatusTable, StatusTransport};

pub use reconcile::{Classification, classify};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connectivity failure while fetching the registry or talking to the
    /// container runtime.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),
    /// The status endpoint replied, but not with a JSON array of records.
    #[error("decoding status reply failed: {0}")]
    Decode(#[source] serde_json::Error),
    /// Building the management handle for a matched component failed.
    #[error("building management client for `{label}` failed: {source}")]
    HandleConstruction {
        label: String,
        #[source]
        source: BoxError,
    },
    /// The caller's token fired before the pass completed.
    #[error("discovery cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<status::Error> for Error {
    fn from(err: status::Error) -> Self {
        match err {
            status::Error::Fetch(source) => Error::Transport(source),
            status::Error::Decode(source) => Error::Decode(source),
        }
    }
}

/// Reaction to a failed management-handle construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialPolicy {
    /// Abort the whole pass.
    #[default]
    Abort,
    /// Reclassify the affected component as standalone and continue.
    Degrade,
}

/// The discovery engine, generic over its three collaborators.
///
/// Construction is cheap and connection-free; every
/// [`discover`](Self::discover) call recomputes the view from scratch.
pub struct Discoverer<T, I, D> {
    transport: T,
    inspector: I,
    dialer: D,
    modes: ModeMap,
    policy: DialPolicy,
}

impl<T, I, D> Discoverer<T, I, D>
where
    T: StatusTransport,
    I: ContainerInspector,
    D: ManagementDial,
{
    pub fn new(transport: T, inspector: I, dialer: D, modes: ModeMap) -> Self {
        Self {
            transport,
            inspector,
            dialer,
            modes,
            policy: DialPolicy::default(),
        }
    }

    /// Sets the reaction to management dial failures.
    pub fn with_dial_policy(mut self, policy: DialPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs one full discovery pass.
    ///
    /// The output carries one component per listed container, in listing
    /// order. The token is raced against every in-flight call, so
    /// cancellation never yields partial results.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] for registry or runtime connectivity failures,
    /// [`Error::Decode`] for a malformed status reply,
    /// [`Error::HandleConstruction`] under [`DialPolicy::Abort`] and
    /// [`Error::Cancelled`] when the token fires first.
    pub async fn discover(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Component<D::Handle>>> {
        let records = guard(cancel, status::fetch(&self.transport)).await??;
        log::debug!("fetched {} status records", records.len());
        let table = StatusTable::from_records(records);

        let summaries = guard(cancel, self.inspector.list())
            .await?
            .map_err(|source| Error::Transport(Box::new(source)))?;
        log::debug!("found {} running containers", summaries.len());

        let mut components = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let record = guard(cancel, self.inspector.inspect(&summary.id))
                .await?
                .map_err(|source| Error::Transport(Box::new(source)))?;
            components.push(self.assemble(&table, record)?);
        }

        Ok(components)
    }

    fn assemble(
        &self,
        table: &StatusTable,
        record: ContainerRecord,
    ) -> Result<Component<D::Handle>> {
        let classification = reconcile::classify(&record, table, &self.modes);
        log::trace!(
            "metadata for container `{}`: {:?}",
            record.name,
            classification.metadata
        );

        let Some(info) = classification.info.as_ref() else {
            return Ok(classification.into_component(None));
        };

        match self.dialer.dial(&info.management_ip, info.management_port) {
            Ok(handle) => Ok(classification.into_component(Some(handle))),
            Err(source) => match self.policy {
                DialPolicy::Abort => Err(Error::HandleConstruction {
                    label: info.label.clone(),
                    source: Box::new(source),
                }),
                DialPolicy::Degrade => {
                    log::warn!(
                        "management client for `{}` failed, degrading to standalone: {source}",
                        info.label
                    );
                    Ok(classification.degrade_to_standalone().into_component(None))
                }
            },
        }
    }
}

/// Races a collaborator call against the cancellation token.
async fn guard<F: std::future::Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}
