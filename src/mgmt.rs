//! Management-plane handles for matched components.
//!
//! A handle is constructed from the address a component self-reported, so
//! construction validates eagerly instead of waiting for the first request
//! to blow up.

use url::Url;

use crate::http::authority;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid management endpoint `{authority}`: {source}")]
    Endpoint {
        authority: String,
        #[source]
        source: url::ParseError,
    },
}

/// Constructor turning a management address into an opaque per-component
/// handle.
///
/// Dialing is synchronous. It validates and prepares the endpoint, it does
/// not connect; the discovery engine decides through its dial policy what a
/// failure means for the pass.
pub trait ManagementDial {
    type Handle;
    type Error: std::error::Error + Send + Sync + 'static;

    fn dial(&self, host: &str, port: u16) -> std::result::Result<Self::Handle, Self::Error>;
}

/// Handle for one managed component's control endpoint.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    base: Url,
    client: reqwest::Client,
}

impl ManagementClient {
    /// Builds a handle against `http://host:port/` with a dedicated HTTP
    /// client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Endpoint`] when `host:port` does not form a valid
    /// URL authority, an empty host included.
    pub fn new(host: &str, port: u16) -> std::result::Result<Self, Error> {
        Self::with_client(reqwest::Client::new(), host, port)
    }

    /// Builds a handle reusing an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        host: &str,
        port: u16,
    ) -> std::result::Result<Self, Error> {
        let authority = authority(host, port);
        let raw = format!("http://{authority}/");
        let base = Url::parse(&raw).map_err(|source| Error::Endpoint { authority, source })?;
        Ok(Self { base, client })
    }

    /// The validated base URL of the component's control endpoint.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Performs one GET relative to the base URL and returns the body.
    ///
    /// # Errors
    ///
    /// Returns the underlying HTTP error; non-2xx statuses are errors, the
    /// same contract the status transport follows.
    pub async fn get(&self, path: &str) -> std::result::Result<Vec<u8>, reqwest::Error> {
        let url = format!("{}{}", self.base, path.trim_start_matches('/'));
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Dialer producing [`ManagementClient`] handles that share one HTTP client.
#[derive(Debug, Clone)]
pub struct HttpManagementDial {
    client: reqwest::Client,
}

impl HttpManagementDial {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpManagementDial {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagementDial for HttpManagementDial {
    type Handle = ManagementClient;
    type Error = Error;

    fn dial(&self, host: &str, port: u16) -> std::result::Result<ManagementClient, Error> {
        ManagementClient::with_client(self.client.clone(), host, port)
    }
}
