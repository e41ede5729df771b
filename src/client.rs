//! Batteries-included assembly: wires the default collaborators and runs
//! discovery against a live deployment.

use tokio_util::sync::CancellationToken;

use crate::component::{Component, ModeMap};
use crate::container::{COMPOSE_SERVICE_LABEL, ContainerInspector};
use crate::discovery::{self, DialPolicy, Discoverer};
use crate::docker::DockerInspector;
use crate::http::{DEFAULT_HTTP_PORT, HttpTransport, TlsOptions};
use crate::mgmt::{HttpManagementDial, ManagementClient};

/// Host used when no orchestrator container could be located.
pub const FALLBACK_HOST: &str = "127.0.0.1";

/// Compose service name the orchestrator container is expected to run
/// under.
pub const DEFAULT_ORCHESTRATOR_SERVICE: &str = "orchestrator";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to container runtime: {0}")]
    Runtime(#[source] bollard::errors::Error),
    #[error("failed to locate orchestrator container: {0}")]
    OrchestratorLookup(#[source] bollard::errors::Error),
    #[error("failed to build status transport: {0}")]
    Transport(#[source] crate::http::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Connection options, defaults matching the reference deployment.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    http_port: u16,
    tls: Option<TlsOptions>,
    orchestrator_service: String,
    modes: ModeMap,
    dial_policy: DialPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            tls: None,
            orchestrator_service: DEFAULT_ORCHESTRATOR_SERVICE.to_owned(),
            modes: ModeMap::default(),
            dial_policy: DialPolicy::default(),
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port of the orchestrator's status endpoint.
    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Enables TLS for the status transport.
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Compose service name identifying the orchestrator container.
    pub fn with_orchestrator_service(mut self, service: impl Into<String>) -> Self {
        self.orchestrator_service = service.into();
        self
    }

    /// Mode map folding reported mode indicators into managed submodes.
    pub fn with_mode_map(mut self, modes: ModeMap) -> Self {
        self.modes = modes;
        self
    }

    /// Reaction to management dial failures during discovery.
    pub fn with_dial_policy(mut self, policy: DialPolicy) -> Self {
        self.dial_policy = policy;
        self
    }
}

/// Discovery client wired to the Docker Engine and the orchestrator's HTTP
/// status endpoint.
pub struct Client {
    inspector: DockerInspector,
    transport: HttpTransport,
    host: String,
    modes: ModeMap,
    dial_policy: DialPolicy,
}

impl Client {
    /// Connects to the container runtime and prepares the status transport.
    ///
    /// The management host is autodetected from the orchestrator
    /// container's first non-empty network address. Without one the client
    /// falls back to [`FALLBACK_HOST`] and logs a warning, which keeps
    /// single-host deployments working out of the box.
    ///
    /// # Errors
    ///
    /// Fails when the runtime is unreachable, the orchestrator lookup
    /// errors, or the transport cannot be built from the TLS options.
    pub async fn connect(options: ClientOptions) -> Result<Self> {
        let inspector = DockerInspector::from_env().map_err(Error::Runtime)?;

        let host = resolve_management_host(&inspector, &options.orchestrator_service)
            .await
            .map_err(Error::OrchestratorLookup)?;

        let transport = match &options.tls {
            Some(tls) => HttpTransport::with_tls(&host, options.http_port, tls),
            None => HttpTransport::new(&host, options.http_port),
        }
        .map_err(Error::Transport)?;

        Ok(Self {
            inspector,
            transport,
            host,
            modes: options.modes,
            dial_policy: options.dial_policy,
        })
    }

    /// The resolved management host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Runs one discovery pass against the live deployment.
    ///
    /// # Errors
    ///
    /// Propagates the engine's error taxonomy unchanged.
    pub async fn discover(
        &self,
        cancel: &CancellationToken,
    ) -> discovery::Result<Vec<Component<ManagementClient>>> {
        Discoverer::new(
            self.transport.clone(),
            self.inspector.clone(),
            HttpManagementDial::new(),
            self.modes.clone(),
        )
        .with_dial_policy(self.dial_policy)
        .discover(cancel)
        .await
    }
}

/// Resolves the management host: the orchestrator's address when one is
/// found, [`FALLBACK_HOST`] (with a warning) otherwise.
async fn resolve_management_host<I: ContainerInspector>(
    inspector: &I,
    service: &str,
) -> std::result::Result<String, I::Error> {
    match find_orchestrator_host(inspector, service).await? {
        Some(host) => {
            log::debug!("found orchestrator management address: {host}");
            Ok(host)
        }
        None => {
            log::warn!(
                "could not find orchestrator management address, falling back to: {FALLBACK_HOST}"
            );
            Ok(FALLBACK_HOST.to_owned())
        }
    }
}

/// Locates the orchestrator's management address: the first listed
/// container whose compose service label matches `service` contributes its
/// first non-empty network address. Only that one candidate is considered.
async fn find_orchestrator_host<I: ContainerInspector>(
    inspector: &I,
    service: &str,
) -> std::result::Result<Option<String>, I::Error> {
    let summaries = inspector.list().await?;
    for summary in summaries {
        if summary.labels.get(COMPOSE_SERVICE_LABEL).map(String::as_str) != Some(service) {
            continue;
        }
        let record = inspector.inspect(&summary.id).await?;
        let host = record
            .networks
            .iter()
            .map(|(_, ip)| ip)
            .find(|ip| !ip.is_empty())
            .cloned();
        return Ok(host);
    }
    Ok(None)
}
