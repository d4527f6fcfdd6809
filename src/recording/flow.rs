use async_trait::async_trait;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    models::UploadAck,
    navigation::Navigation,
    session::{SessionStore, TakeGate},
};

use super::{
    capture::{CaptureConstraints, CaptureDevice, CaptureError, CaptureEvent, MediaBlob},
    state::{RecordingState, RecordingStatus},
};

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum FlowError {
    /// The session already used its free takes; show results instead.
    #[error("{message}")]
    LimitReached {
        message: String,
        redirect: Navigation,
    },
    #[error("cannot {action} while {status}")]
    InvalidTransition {
        status: RecordingStatus,
        action: &'static str,
    },
    #[error("recording is disabled after a camera/mic error; reload to try again")]
    StartDisabled,
    #[error("Camera/mic error: {0}")]
    Capture(#[from] CaptureError),
}

/// Destination for finished takes.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, session_id: &str, blob: &MediaBlob) -> anyhow::Result<UploadAck>;
}

/// Drives one recording attempt from device permission to the results page.
pub struct RecordingFlow<D: CaptureDevice> {
    state: RecordingState,
    device: D,
    collector: Option<JoinHandle<Result<Vec<Vec<u8>>, CaptureError>>>,
    blob: Option<MediaBlob>,
}

impl<D: CaptureDevice> RecordingFlow<D> {
    /// Opens the flow for `session_id`, refusing sessions that hit the take
    /// limit before any device is touched.
    pub async fn enter(
        session_id: impl Into<String>,
        store: &dyn SessionStore,
        gate: &TakeGate,
        device: D,
    ) -> Result<Self, FlowError> {
        let session_id = session_id.into();
        let takes = store.get(&session_id).await;
        let decision = gate.evaluate(takes);

        if !decision.allowed {
            info!(
                "Session {} already recorded {} takes; redirecting to results",
                session_id, takes
            );
            return Err(FlowError::LimitReached {
                message: decision.message,
                redirect: Navigation::results(session_id),
            });
        }

        let mut state = RecordingState::new(session_id);
        state.status_message = Some(decision.message);

        Ok(Self {
            state,
            device,
            collector: None,
            blob: None,
        })
    }

    pub fn state(&self) -> &RecordingState {
        &self.state
    }

    pub fn status(&self) -> RecordingStatus {
        self.state.status
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    pub async fn request_permission(&mut self) -> Result<(), FlowError> {
        self.transition(RecordingStatus::AwaitingPermission, "request device access")?;

        match self
            .device
            .request_access(CaptureConstraints::default())
            .await
        {
            Ok(()) => {
                self.transition(RecordingStatus::Ready, "mark device ready")?;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub async fn start(&mut self) -> Result<(), FlowError> {
        if self.state.start_disabled {
            return Err(FlowError::StartDisabled);
        }
        self.ensure_transition(RecordingStatus::Recording, "start recording")?;

        self.blob = None;
        self.state.begin_capture();

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        self.collector = Some(tokio::spawn(collect_chunks(events_rx)));

        if let Err(err) = self.device.start(events_tx).await {
            self.abort_collector();
            return Err(self.fail(err));
        }

        info!("Recording started for session {}", self.state.session_id);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<&MediaBlob, FlowError> {
        self.ensure_transition(RecordingStatus::Stopped, "stop recording")?;

        if let Err(err) = self.device.stop().await {
            self.abort_collector();
            return Err(self.fail(err));
        }

        let chunks = match self.collector.take() {
            Some(handle) => match handle.await {
                Ok(Ok(chunks)) => chunks,
                Ok(Err(err)) => return Err(self.fail(err)),
                Err(join_err) => {
                    return Err(self.fail(CaptureError::Failed(format!(
                        "capture collector failed: {join_err}"
                    ))))
                }
            },
            None => Vec::new(),
        };

        self.state.chunk_count = chunks.len();
        self.state.captured_bytes = chunks.iter().map(Vec::len).sum();
        self.state.status = RecordingStatus::Stopped;
        self.state.status_message = Some("Stopped".into());

        info!(
            "Recording stopped for session {}: {} chunks, {} bytes",
            self.state.session_id, self.state.chunk_count, self.state.captured_bytes
        );

        let blob = MediaBlob::from_chunks(chunks, self.device.media_type());
        let blob: &MediaBlob = self.blob.insert(blob);
        Ok(blob)
    }

    /// Uploads the take and hands back the results page. Upload failures are
    /// logged only; the take counter is never touched here.
    pub async fn submit(&mut self, uploader: &dyn Uploader) -> Result<Navigation, FlowError> {
        self.transition(RecordingStatus::Uploading, "upload")?;
        self.state.status_message = Some("Uploading…".into());

        let blob = match self.blob.take() {
            Some(blob) => blob,
            None => MediaBlob::from_chunks(Vec::new(), self.device.media_type()),
        };

        match uploader.upload(&self.state.session_id, &blob).await {
            Ok(ack) => info!(
                "Upload for session {} acknowledged ({}, {} bytes)",
                self.state.session_id, ack.status, ack.bytes
            ),
            Err(err) => error!(
                "Upload failed for session {}: {err:#}",
                self.state.session_id
            ),
        }

        self.transition(RecordingStatus::Done, "finish")?;
        self.state.status_message = None;
        Ok(Navigation::results(self.state.session_id.clone()))
    }

    fn ensure_transition(
        &self,
        next: RecordingStatus,
        action: &'static str,
    ) -> Result<(), FlowError> {
        if self.state.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                status: self.state.status,
                action,
            })
        }
    }

    fn transition(&mut self, next: RecordingStatus, action: &'static str) -> Result<(), FlowError> {
        self.ensure_transition(next, action)?;
        debug!("Recording flow {} -> {}", self.state.status, next);
        self.state.status = next;
        Ok(())
    }

    fn fail(&mut self, err: CaptureError) -> FlowError {
        let flow_error = FlowError::Capture(err);
        error!(
            "Recording failed for session {}: {flow_error}",
            self.state.session_id
        );
        self.state.fail(flow_error.to_string());
        flow_error
    }

    fn abort_collector(&mut self) {
        if let Some(handle) = self.collector.take() {
            handle.abort();
        }
    }
}

async fn collect_chunks(
    mut events: mpsc::Receiver<CaptureEvent>,
) -> Result<Vec<Vec<u8>>, CaptureError> {
    let mut chunks = Vec::new();

    while let Some(event) = events.recv().await {
        match event {
            CaptureEvent::Started => debug!("Capture device started"),
            CaptureEvent::Data(chunk) => {
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
            }
            CaptureEvent::Stopped => return Ok(chunks),
            CaptureEvent::Failed(err) => return Err(err),
        }
    }

    warn!("Capture device closed without a stop event");
    Ok(chunks)
}
