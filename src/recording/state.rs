use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecordingStatus {
    Idle,
    AwaitingPermission,
    Ready,
    Recording,
    Stopped,
    Uploading,
    Done,
    Error,
}

impl Default for RecordingStatus {
    fn default() -> Self {
        RecordingStatus::Idle
    }
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Idle => "idle",
            RecordingStatus::AwaitingPermission => "awaiting-permission",
            RecordingStatus::Ready => "ready",
            RecordingStatus::Recording => "recording",
            RecordingStatus::Stopped => "stopped",
            RecordingStatus::Uploading => "uploading",
            RecordingStatus::Done => "done",
            RecordingStatus::Error => "error",
        }
    }

    /// Whether `next` is a legal step from this status. `Error` is reachable
    /// from anywhere except a finished flow.
    pub fn can_transition_to(&self, next: RecordingStatus) -> bool {
        use RecordingStatus::*;

        match (self, next) {
            (Done, _) => false,
            (_, Error) => true,
            (Idle, AwaitingPermission)
            | (AwaitingPermission, Ready)
            | (Ready, Recording)
            | (Recording, Stopped)
            | (Stopped, Uploading)
            | (Uploading, Done) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingState {
    pub status: RecordingStatus,
    pub session_id: String,
    /// Set once device access fails; the start control stays disabled for
    /// the rest of this flow.
    pub start_disabled: bool,
    pub status_message: Option<String>,
    pub chunk_count: usize,
    pub captured_bytes: usize,
}

impl RecordingState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    pub fn begin_capture(&mut self) {
        self.status = RecordingStatus::Recording;
        self.chunk_count = 0;
        self.captured_bytes = 0;
        self.status_message = Some("Recording…".into());
    }

    pub fn fail(&mut self, message: String) {
        self.status = RecordingStatus::Error;
        self.start_disabled = true;
        self.status_message = Some(message);
    }
}
