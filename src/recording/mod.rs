pub mod capture;
pub mod flow;
pub mod state;

pub use capture::{
    CaptureConstraints, CaptureDevice, CaptureError, CaptureEvent, FileCaptureDevice, MediaBlob,
    ScriptedCaptureDevice,
};
pub use flow::{FlowError, RecordingFlow, Uploader};
pub use state::{RecordingState, RecordingStatus};
