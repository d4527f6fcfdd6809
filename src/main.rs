//! rehearsal - record practice takes and get coaching feedback
//!
//! `serve` runs the HTTP server; the other commands play the browser's part
//! against a running server.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;

use rehearsal_lib::{
    client::ApiClient,
    models::RegistrationRequest,
    navigation::{Navigation, FALLBACK_SESSION_ID},
    recording::{FileCaptureDevice, FlowError, RecordingFlow},
    results::{ResultsPoller, ResultsView},
    session::{LocalTakeStore, SessionStore, TakeGate},
    settings::AppSettings,
};

#[derive(Parser, Debug)]
#[command(name = "rehearsal")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the settings file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server URL used by client commands
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind, e.g. 127.0.0.1:3000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Register and get a fresh session id
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        role: String,
    },

    /// Record a take from a media file, upload it and show the results
    Record {
        /// Media file standing in for the camera
        file: PathBuf,

        #[arg(short, long)]
        session_id: Option<String>,

        /// Keep the recording open this many seconds before stopping
        #[arg(long, default_value = "0")]
        seconds: u64,

        /// Media type reported for the take
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Load the results page for a session
    Results {
        #[arg(short, long)]
        session_id: Option<String>,
    },

    /// Show how many takes a session has used
    Takes {
        #[arg(short, long)]
        session_id: Option<String>,
    },

    /// Clear a session's take counter
    Reset {
        #[arg(short, long)]
        session_id: Option<String>,
    },
}

struct App {
    settings: AppSettings,
    gate: TakeGate,
}

#[tokio::main]
async fn main() -> Result<()> {
    rehearsal_lib::init_logging();
    let cli = Cli::parse();

    let settings_path = match cli.config {
        Some(path) => path,
        None => AppSettings::default_path()?,
    };
    let mut settings = AppSettings::load(&settings_path)?;
    settings.apply_env_overrides();
    if let Some(base_url) = cli.base_url {
        settings.client.base_url = base_url;
    }
    settings.validate().context("invalid settings")?;

    let app = App {
        gate: TakeGate::new(settings.takes.free_take_limit),
        settings,
    };

    match cli.command {
        Commands::Serve { bind } => {
            let mut settings = app.settings;
            if let Some(bind) = bind {
                settings.server.bind_addr = bind;
            }
            rehearsal_lib::run_server(settings).await
        }
        Commands::Register { name, email, role } => register(&app, name, email, role).await,
        Commands::Record {
            file,
            session_id,
            seconds,
            media_type,
        } => {
            let mut device = FileCaptureDevice::new(file);
            if let Some(media_type) = media_type {
                device = device.with_media_type(media_type);
            }
            record(&app, &session_or_fallback(session_id), device, seconds).await
        }
        Commands::Results { session_id } => {
            let store = open_store(&app.settings)?;
            show_results(&app, store, &session_or_fallback(session_id)).await
        }
        Commands::Takes { session_id } => {
            let session_id = session_or_fallback(session_id);
            let store = open_store(&app.settings)?;
            let takes = store.get(&session_id).await;
            let decision = app.gate.evaluate(takes);
            println!("Session {session_id}: {takes} of {} takes used", app.gate.limit());
            println!("{}", decision.message);
            Ok(())
        }
        Commands::Reset { session_id } => {
            let session_id = session_or_fallback(session_id);
            open_store(&app.settings)?.reset(&session_id).await;
            println!("Session {session_id}: take counter cleared");
            Ok(())
        }
    }
}

fn session_or_fallback(session_id: Option<String>) -> String {
    session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_SESSION_ID.to_string())
}

fn open_store(settings: &AppSettings) -> Result<Arc<dyn SessionStore>> {
    let store = LocalTakeStore::open(settings.store_path()?);
    if store.is_degraded() {
        warn!("Take counters will not persist for this run");
    }
    Ok(Arc::new(store))
}

fn client(settings: &AppSettings) -> Result<ApiClient> {
    ApiClient::new(&settings.client.base_url)
}

async fn register(app: &App, name: String, email: String, role: String) -> Result<()> {
    let response = client(&app.settings)?
        .register(&RegistrationRequest { name, email, role })
        .await?;

    open_store(&app.settings)?.reset(&response.session_id).await;

    println!("Session id: {}", response.session_id);
    println!("Next: {}", Navigation::record(&response.session_id).href());
    Ok(())
}

async fn record(
    app: &App,
    session_id: &str,
    device: FileCaptureDevice,
    seconds: u64,
) -> Result<()> {
    let store = open_store(&app.settings)?;
    let api = client(&app.settings)?;

    let mut flow = match RecordingFlow::enter(session_id, store.as_ref(), &app.gate, device).await {
        Ok(flow) => flow,
        Err(FlowError::LimitReached { message, redirect }) => {
            println!("{message}");
            println!("Results: {}", redirect.href());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(message) = &flow.state().status_message {
        println!("{message}");
    }

    flow.request_permission().await?;
    flow.start().await?;
    println!("Recording…");
    if seconds > 0 {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }
    let blob = flow.stop().await?;
    println!("Stopped: {} bytes captured", blob.len());

    let next = flow.submit(&api).await?;
    println!("Next: {}", next.href());

    show_results(app, store, session_id).await
}

async fn show_results(app: &App, store: Arc<dyn SessionStore>, session_id: &str) -> Result<()> {
    let source = Arc::new(client(&app.settings)?);
    let poller = ResultsPoller::new(
        store,
        source,
        app.gate,
        app.settings.poll_timing(),
        app.settings.takes.booking_url.clone(),
    );

    let mut views = poller.subscribe();
    let printer = tokio::spawn(async move {
        println!("{}", ResultsView::Processing.render_text());
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            println!("{}", view.render_text());
        }
    });

    let view = poller.run(session_id).await;
    if let Err(err) = printer.await {
        warn!("Results printer failed: {err}");
    }

    if let ResultsView::Error { reason } = view {
        anyhow::bail!("results unavailable: {reason}");
    }
    Ok(())
}
