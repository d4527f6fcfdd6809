pub mod client;
pub mod db;
pub mod models;
pub mod navigation;
pub mod providers;
pub mod recording;
pub mod results;
pub mod server;
pub mod session;
pub mod settings;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use settings::AppSettings;

/// Initialises `env_logger` from `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Runs the HTTP server until Ctrl-C.
pub async fn run_server(settings: AppSettings) -> Result<()> {
    log::info!("Rehearsal server starting up...");

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Shutdown requested");
                on_signal.cancel();
            }
            Err(err) => log::warn!("Failed to listen for Ctrl-C: {err}"),
        }
    });

    server::serve(&settings, shutdown).await
}
