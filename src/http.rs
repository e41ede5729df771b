//! Default HTTP transport for the status endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::status::StatusTransport;

/// Default port of the orchestrator's status endpoint.
pub const DEFAULT_HTTP_PORT: u16 = 9191;

/// Client-side timeout applied to every status request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read TLS material `{}`: {source}", path.display())]
    ReadTlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TLS material: {0}")]
    Tls(#[source] reqwest::Error),
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// TLS configuration for the status transport.
///
/// All fields are independent: a CA bundle without a client pair gives
/// plain server verification, a pair without a CA uses the system roots.
/// The client pair is only applied when both halves are present.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub ca: Option<PathBuf>,
    pub skip_verify: bool,
}

/// Status transport backed by a shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a plain-HTTP transport against `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] when the underlying client cannot be
    /// constructed.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::build(host, port, None)
    }

    /// Builds an HTTPS transport configured from the TLS options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadTlsMaterial`] when a referenced file cannot be
    /// read, [`Error::Tls`] when its content is not usable PEM, and
    /// [`Error::Build`] when the client cannot be constructed.
    pub fn with_tls(host: &str, port: u16, tls: &TlsOptions) -> Result<Self> {
        Self::build(host, port, Some(tls))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(host: &str, port: u16, tls: Option<&TlsOptions>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(DEFAULT_HTTP_TIMEOUT);
        let scheme = if tls.is_some() { "https" } else { "http" };
        if let Some(tls) = tls {
            builder = configure_tls(builder, tls)?;
        }
        let client = builder.build().map_err(Error::Build)?;
        Ok(Self {
            client,
            base_url: format!("{scheme}://{}", authority(host, port)),
        })
    }
}

fn configure_tls(
    mut builder: reqwest::ClientBuilder,
    tls: &TlsOptions,
) -> Result<reqwest::ClientBuilder> {
    if let Some(ca) = &tls.ca {
        let pem = read_tls_material(ca)?;
        let cert = reqwest::Certificate::from_pem(&pem).map_err(Error::Tls)?;
        builder = builder.add_root_certificate(cert);
    }
    if let (Some(cert), Some(key)) = (&tls.cert, &tls.key) {
        let mut pem = read_tls_material(key)?;
        pem.extend_from_slice(&read_tls_material(cert)?);
        let identity = reqwest::Identity::from_pem(&pem).map_err(Error::Tls)?;
        builder = builder.identity(identity);
    }
    if tls.skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    Ok(builder)
}

fn read_tls_material(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::ReadTlsMaterial {
        path: path.to_path_buf(),
        source,
    })
}

/// Formats a `host:port` authority, bracketing bare IPv6 literals.
pub(crate) fn authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

impl StatusTransport for HttpTransport {
    type Error = reqwest::Error;

    async fn get(&self, path: &str) -> std::result::Result<Vec<u8>, Self::Error> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use axum::{Json, Router, routing::get};

    use crate::status::{self, STATUS_PATH};

    async fn serve(router: Router) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });
        port
    }

    #[test]
    fn test_authority_formatting() {
        assert_eq!(authority("10.0.0.5", 9191), "10.0.0.5:9191");
        assert_eq!(authority("::1", 9191), "[::1]:9191");
        assert_eq!(authority("[::1]", 9191), "[::1]:9191");
    }

    #[test]
    fn test_base_url_uses_scheme_per_tls() {
        let plain = HttpTransport::new("10.0.0.5", 9191).unwrap();
        assert_eq!(plain.base_url(), "http://10.0.0.5:9191");

        let tls = TlsOptions {
            skip_verify: true,
            ..TlsOptions::default()
        };
        let secured = HttpTransport::with_tls("10.0.0.5", 9191, &tls).unwrap();
        assert_eq!(secured.base_url(), "https://10.0.0.5:9191");
    }

    #[tokio::test]
    async fn test_fetch_against_live_endpoint() {
        let router = Router::new().route(
            STATUS_PATH,
            get(|| async {
                Json(serde_json::json!([{
                    "label": "cnf1",
                    "mode": "primary",
                    "managementIP": "10.0.0.5",
                    "managementPort": 9191,
                }]))
            }),
        );
        let port = serve(router).await;

        let transport = HttpTransport::new("127.0.0.1", port).unwrap();
        let records = status::fetch(&transport).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "cnf1");
        assert_eq!(records[0].management_port, 9191);
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_as_fetch_error() {
        let port = serve(Router::new()).await;

        let transport = HttpTransport::new("127.0.0.1", port).unwrap();
        let err = status::fetch(&transport).await.unwrap_err();
        assert!(matches!(err, status::Error::Fetch(_)));
    }

    #[test]
    fn test_missing_tls_material_is_reported_with_path() {
        let tls = TlsOptions {
            ca: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..TlsOptions::default()
        };
        let err = HttpTransport::with_tls("127.0.0.1", 9191, &tls).unwrap_err();
        match err {
            Error::ReadTlsMaterial { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/ca.pem"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tls_material_from_files_builds_client() {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("client.crt");
        let key_path = dir.path().join("client.key");
        let ca_path = dir.path().join("ca.crt");
        std::fs::File::create(&cert_path)
            .unwrap()
            .write_all(cert.pem().as_bytes())
            .unwrap();
        std::fs::File::create(&key_path)
            .unwrap()
            .write_all(key_pair.serialize_pem().as_bytes())
            .unwrap();
        std::fs::File::create(&ca_path)
            .unwrap()
            .write_all(cert.pem().as_bytes())
            .unwrap();

        let tls = TlsOptions {
            cert: Some(cert_path),
            key: Some(key_path),
            ca: Some(ca_path),
            skip_verify: false,
        };
        let transport = HttpTransport::with_tls("10.0.0.5", 9191, &tls).unwrap();
        assert_eq!(transport.base_url(), "https://10.0.0.5:9191");
    }
}
