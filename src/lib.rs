pub mod api; // REST router, middleware, server lifecycle
pub mod config;
pub mod core_state; // Shared state: config + operator sessions
pub mod models;
pub mod db;
pub mod patients;
pub mod doctors;
pub mod appointments;
pub mod expenses;
pub mod ledger; // Payment records, installments, selection rule
pub mod receipt;
pub mod reports; // Dashboard and report reducers
pub mod spreadsheet; // .xlsx/.csv import and export

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the clinic server and block until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env()?;
    if app_config.uses_default_password() {
        tracing::warn!("CLINIC_ADMIN_PASSWORD is not set; the default password is in use");
    }

    let bind_addr = app_config.bind_addr;
    let core = Arc::new(core_state::CoreState::new(app_config));
    core.initialize()?;

    let server = api::start_api_server_on(core, bind_addr).await?;
    tracing::info!(addr = %server.addr, "Dashboard available at http://{}/", server.addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received, shutting down");
    server.stop().await;
    Ok(())
}
