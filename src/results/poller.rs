use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    models::Report,
    navigation::Navigation,
    session::{SessionStore, TakeGate},
};

use super::view::{RenderedReport, ResultAction, ResultsView};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Results request failed: {0}")]
    Network(String),
    #[error("Results HTTP {0}")]
    Status(u16),
    #[error("Results payload invalid: {0}")]
    Decode(String),
}

/// Where the results page gets its report from.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_report(&self, session_id: &str) -> Result<Report, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub watchdog: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1800),
            max_delay: Duration::from_millis(3200),
            watchdog: Duration::from_millis(6000),
        }
    }
}

impl PollTiming {
    /// Uniform pick in `[min_delay, max_delay)`, whole milliseconds.
    pub fn pick_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min_ms = self.min_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        if max_ms <= min_ms {
            return self.min_delay;
        }
        Duration::from_millis(rng.gen_range(min_ms..max_ms))
    }
}

/// Loads and renders the report for one results page load.
///
/// `run` consumes the poller, so a page load fetches once and bumps the take
/// counter at most once. Views are published on a watch channel so a renderer
/// can follow the interim "still working" state.
pub struct ResultsPoller {
    store: Arc<dyn SessionStore>,
    source: Arc<dyn ReportSource>,
    gate: TakeGate,
    timing: PollTiming,
    booking_url: String,
    rng: StdRng,
    view: Arc<watch::Sender<ResultsView>>,
}

impl ResultsPoller {
    pub fn new(
        store: Arc<dyn SessionStore>,
        source: Arc<dyn ReportSource>,
        gate: TakeGate,
        timing: PollTiming,
        booking_url: impl Into<String>,
    ) -> Self {
        let (view_tx, _) = watch::channel(ResultsView::Processing);
        Self {
            store,
            source,
            gate,
            timing,
            booking_url: booking_url.into(),
            rng: StdRng::from_entropy(),
            view: Arc::new(view_tx),
        }
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultsView> {
        self.view.subscribe()
    }

    pub async fn run(mut self, session_id: &str) -> ResultsView {
        let delay = self.timing.pick_delay(&mut self.rng);
        debug!(
            "Results for session {session_id}: fetch in {}ms, watchdog at {}ms",
            delay.as_millis(),
            self.timing.watchdog.as_millis()
        );

        let settled = Arc::new(Mutex::new(false));
        let cancel = CancellationToken::new();
        // Dropping this load before it settles also stops the watchdog.
        let _watchdog_guard = cancel.clone().drop_guard();
        let watchdog = spawn_watchdog(
            self.timing.watchdog,
            session_id.to_string(),
            settled.clone(),
            cancel.clone(),
            self.view.clone(),
        );

        time::sleep(delay).await;
        let outcome = self.source.fetch_report(session_id).await;

        *lock(&settled) = true;
        cancel.cancel();
        if let Err(err) = watchdog.await {
            warn!("Results watchdog task failed: {err}");
        }

        let view = match outcome {
            Ok(report) => self.render_success(session_id, report).await,
            Err(err) => {
                warn!("Results fetch failed for session {session_id}: {err}");
                ResultsView::Error {
                    reason: err.to_string(),
                }
            }
        };

        self.view.send_replace(view.clone());
        view
    }

    async fn render_success(&self, session_id: &str, report: Report) -> ResultsView {
        let take_number = self.store.get(session_id).await.saturating_add(1);
        self.store.set(session_id, take_number).await;

        let gate = self.gate.evaluate(take_number);
        info!(
            "Session {session_id} finished take {take_number}; more takes allowed: {}",
            gate.allowed
        );

        let action = if gate.allowed {
            ResultAction::Retry {
                href: Navigation::record(session_id).href(),
            }
        } else {
            ResultAction::BookReview {
                url: self.booking_url.clone(),
                notice: format!(
                    "You've used all {} rehearsal takes.",
                    self.gate.limit()
                ),
            }
        };

        ResultsView::Report(Box::new(RenderedReport {
            report,
            take_number,
            progress_label: self.gate.progress_label(take_number),
            take_note: TakeGate::note_for_take(take_number).to_string(),
            gate,
            action,
        }))
    }
}

fn lock(settled: &Mutex<bool>) -> MutexGuard<'_, bool> {
    settled.lock().unwrap_or_else(PoisonError::into_inner)
}

fn spawn_watchdog(
    after: Duration,
    session_id: String,
    settled: Arc<Mutex<bool>>,
    cancel: CancellationToken,
    view: Arc<watch::Sender<ResultsView>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = time::sleep(after) => raise_still_working(&settled, &view, &session_id),
        }
    })
}

fn raise_still_working(
    settled: &Mutex<bool>,
    view: &watch::Sender<ResultsView>,
    session_id: &str,
) {
    // Checked and published under the lock so settlement always wins.
    let guard = lock(settled);
    if !*guard {
        warn!("Results for session {session_id} still pending after watchdog");
        view.send_replace(ResultsView::still_working(session_id));
    }
}
