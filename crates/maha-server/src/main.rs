use std::path::PathBuf;

use maha_core::config::OrchestratorConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maha_server=info,maha_core=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MAHA_CONFIG").ok())
        .map(PathBuf::from);

    let config = match OrchestratorConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let state = maha_server::create_app_state(config).await;

    if let Err(e) = maha_server::start_server_with_state(state.clone()).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    // Keep MCP subprocesses alive until the process is told to stop, then
    // give them a graceful shutdown window.
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => tracing::error!("failed to listen for shutdown signal: {}", e),
    }
    state.mcp_manager.shutdown_all().await;
}
