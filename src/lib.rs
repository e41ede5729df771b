use std::env;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

/// CNF discovery: reconciles the containers running on a host with the
/// orchestrator's status registry and reports each one as a classified
/// component.
///
/// This library provides the discovery engine (generic over the container
/// runtime, the status transport and the management dialer), the default
/// Docker and HTTP backends, and a batteries-included [`client::Client`]
/// for talking to a live deployment.
pub mod client;
pub mod component;
pub mod container;
pub mod discovery;
pub mod docker;
pub mod error;
pub mod http;
pub mod mgmt;
pub mod status;

use client::{Client, ClientOptions};
use http::TlsOptions;

/// Runs one discovery pass configured from the environment and prints the
/// component list as pretty JSON.
///
/// Recognized environment variables:
/// - `CNF_STATUS_PORT`: port of the orchestrator's status endpoint.
/// - `CNF_ORCHESTRATOR_SERVICE`: compose service name of the orchestrator
///   container.
/// - `CNF_MODE_MAP`: JSON object mapping reported mode indicators to
///   managed submode names.
/// - `CNF_TLS_CERT`, `CNF_TLS_KEY`, `CNF_TLS_CA`, `CNF_TLS_SKIP_VERIFY`:
///   TLS material for the status transport; setting any of the path
///   variables, or a truthy `CNF_TLS_SKIP_VERIFY` (`1` or `true`),
///   switches the transport to HTTPS.
///
/// The Docker connection honors `DOCKER_HOST`. A Ctrl-C received while the
/// pass is running cancels it.
///
/// # Errors
///
/// Possible errors include:
/// - Malformed configuration values (port, mode map).
/// - Failure to connect to the container runtime.
/// - An unreachable status endpoint or a malformed status reply.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut options = ClientOptions::new();
    if let Ok(port) = env::var("CNF_STATUS_PORT") {
        options = options.with_http_port(port.parse()?);
    }
    if let Ok(service) = env::var("CNF_ORCHESTRATOR_SERVICE") {
        options = options.with_orchestrator_service(service);
    }
    if let Ok(raw) = env::var("CNF_MODE_MAP") {
        options = options.with_mode_map(serde_json::from_str(&raw)?);
    }
    if let Some(tls) = tls_options_from_env() {
        options = options.with_tls(tls);
    }

    let client = Client::connect(options).await?;
    log::debug!("management host: {}", client.host());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let components = client.discover(&cancel).await?;
    println!("{}", serde_json::to_string_pretty(&components)?);

    Ok(())
}

/// Builds TLS options when any of the TLS environment variables is set.
fn tls_options_from_env() -> Option<TlsOptions> {
    let cert: Option<PathBuf> = env::var_os("CNF_TLS_CERT").map(PathBuf::from);
    let key: Option<PathBuf> = env::var_os("CNF_TLS_KEY").map(PathBuf::from);
    let ca: Option<PathBuf> = env::var_os("CNF_TLS_CA").map(PathBuf::from);
    let skip_verify = env::var("CNF_TLS_SKIP_VERIFY")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if cert.is_none() && key.is_none() && ca.is_none() && !skip_verify {
        return None;
    }
    Some(TlsOptions {
        cert,
        key,
        ca,
        skip_verify,
    })
}
