/// Entry point for the CNF discovery tool.
///
/// This binary runs one discovery pass against the local deployment: it
/// lists the running containers, matches them against the orchestrator's
/// status registry and prints the classified component list as JSON.
///
/// # Errors
///
/// Returns an error if configuration is malformed or the container runtime
/// or status endpoint cannot be reached.
///
/// # Examples
///
/// ```bash
/// CNF_MODE_MAP='{"primary": "orchestrator"}' cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    cnf_discovery::run().await
}
