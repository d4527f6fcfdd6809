//! HTTP surface: registration, upload, results and the static pages.

mod error;
mod handlers;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use log::{info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    providers::{
        AnalysisProvider, MailchimpClient, MailingList, MockAnalysisProvider, RegistrationService,
        UnconfiguredMailingList,
    },
    settings::AppSettings,
};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<RegistrationService>,
    pub analysis: Arc<dyn AnalysisProvider>,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        registration: RegistrationService,
        analysis: Arc<dyn AnalysisProvider>,
        static_dir: PathBuf,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            registration: Arc::new(registration),
            analysis,
            static_dir,
            max_upload_bytes,
        }
    }

    /// Wires the mock analysis provider and whichever mailing list the
    /// settings allow.
    pub fn from_settings(settings: &AppSettings) -> Self {
        let mailing_list: Arc<dyn MailingList> =
            match MailchimpClient::from_settings(&settings.mailing_list) {
                Ok(client) => Arc::new(client),
                Err(err) => {
                    warn!("Mailing list disabled: {err:#}");
                    Arc::new(UnconfiguredMailingList)
                }
            };

        Self::new(
            RegistrationService::new(mailing_list, settings.mailing_list.tag.clone()),
            Arc::new(MockAnalysisProvider::new()),
            settings.server.static_dir.clone(),
            settings.server.max_upload_bytes,
        )
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/api/register", post(handlers::register))
        .route("/api/upload", post(handlers::upload))
        .route("/api/results/:session_id", get(handlers::results))
        .fallback(handlers::static_page)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serves on an already bound listener until `shutdown` fires.
pub async fn serve_on(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr().context("listener has no address")?;
    info!("Rehearsal server listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("rehearsal server error")?;

    info!("Rehearsal server stopped");
    Ok(())
}

pub async fn serve(settings: &AppSettings, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(&settings.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.bind_addr))?;
    serve_on(listener, AppState::from_settings(settings), shutdown).await
}
