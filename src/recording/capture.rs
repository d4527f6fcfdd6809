use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use log::{debug, info};
use thiserror::Error;
use tokio::{io::AsyncReadExt, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MEDIA_TYPE: &str = "video/webm";
pub const DEFAULT_FILE_NAME: &str = "rehearsal.webm";
const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture failed: {0}")]
    Failed(String),
}

/// What the caller asks the device for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Started,
    Data(Vec<u8>),
    Stopped,
    Failed(CaptureError),
}

/// Finalized recording handed to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl MediaBlob {
    pub fn from_chunks(chunks: Vec<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: chunks.concat(),
            media_type: media_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An audio/video source that reports its output as a stream of events.
///
/// `start` must emit `Started`, then any number of `Data` chunks in capture
/// order. `stop` flushes what is buffered and finishes with `Stopped`.
#[async_trait]
pub trait CaptureDevice: Send {
    async fn request_access(&mut self, constraints: CaptureConstraints) -> Result<(), CaptureError>;

    async fn start(&mut self, events: mpsc::Sender<CaptureEvent>) -> Result<(), CaptureError>;

    async fn stop(&mut self) -> Result<(), CaptureError>;

    fn media_type(&self) -> &str {
        DEFAULT_MEDIA_TYPE
    }
}

/// Replays a media file from disk as if it were being recorded.
pub struct FileCaptureDevice {
    path: PathBuf,
    chunk_bytes: usize,
    media_type: String,
    file: Option<tokio::fs::File>,
    stop_token: Option<CancellationToken>,
    reader: Option<JoinHandle<()>>,
}

impl FileCaptureDevice {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            file: None,
            stop_token: None,
            reader: None,
        }
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }
}

#[async_trait]
impl CaptureDevice for FileCaptureDevice {
    async fn request_access(&mut self, constraints: CaptureConstraints) -> Result<(), CaptureError> {
        if !constraints.audio && !constraints.video {
            return Err(CaptureError::DeviceUnavailable(
                "no audio or video track requested".into(),
            ));
        }

        let file = tokio::fs::File::open(&self.path).await.map_err(|err| {
            let detail = format!("{}: {err}", self.path.display());
            match err.kind() {
                ErrorKind::PermissionDenied => CaptureError::PermissionDenied(detail),
                _ => CaptureError::DeviceUnavailable(detail),
            }
        })?;

        info!("Capture source opened: {}", self.path.display());
        self.file = Some(file);
        Ok(())
    }

    async fn start(&mut self, events: mpsc::Sender<CaptureEvent>) -> Result<(), CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::Failed("capture source not opened".into()))?;

        let stop_token = CancellationToken::new();
        let stopped = stop_token.clone();
        let chunk_bytes = self.chunk_bytes;

        let reader = tokio::spawn(async move {
            if events.send(CaptureEvent::Started).await.is_err() {
                return;
            }

            let mut buffer = vec![0u8; chunk_bytes];
            loop {
                match file.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(read) => {
                        if events
                            .send(CaptureEvent::Data(buffer[..read].to_vec()))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = events
                            .send(CaptureEvent::Failed(CaptureError::Failed(err.to_string())))
                            .await;
                        return;
                    }
                }
            }

            debug!("Capture source exhausted, waiting for stop");
            stopped.cancelled().await;
            let _ = events.send(CaptureEvent::Stopped).await;
        });

        self.stop_token = Some(stop_token);
        self.reader = Some(reader);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(token) = self.stop_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.reader.take() {
            handle
                .await
                .map_err(|err| CaptureError::Failed(format!("capture task failed: {err}")))?;
        }
        Ok(())
    }

    fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// Device with a fixed outcome, used for demos and tests.
pub struct ScriptedCaptureDevice {
    access: Result<(), CaptureError>,
    chunks: Vec<Vec<u8>>,
    events: Option<mpsc::Sender<CaptureEvent>>,
}

impl ScriptedCaptureDevice {
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            access: Ok(()),
            chunks,
            events: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            access: Err(CaptureError::PermissionDenied(reason.into())),
            chunks: Vec::new(),
            events: None,
        }
    }
}

#[async_trait]
impl CaptureDevice for ScriptedCaptureDevice {
    async fn request_access(&mut self, _constraints: CaptureConstraints) -> Result<(), CaptureError> {
        self.access.clone()
    }

    async fn start(&mut self, events: mpsc::Sender<CaptureEvent>) -> Result<(), CaptureError> {
        self.access.clone()?;
        let closed = |_| CaptureError::Failed("capture consumer went away".into());
        events.send(CaptureEvent::Started).await.map_err(closed)?;
        for chunk in std::mem::take(&mut self.chunks) {
            events.send(CaptureEvent::Data(chunk)).await.map_err(closed)?;
        }
        self.events = Some(events);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(events) = self.events.take() {
            events
                .send(CaptureEvent::Stopped)
                .await
                .map_err(|_| CaptureError::Failed("capture consumer went away".into()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_concatenates_in_order() {
        let blob = MediaBlob::from_chunks(vec![b"ab".to_vec(), b"c".to_vec()], DEFAULT_MEDIA_TYPE);
        assert_eq!(blob.bytes, b"abc");
        assert_eq!(blob.media_type, "video/webm");

        let empty = MediaBlob::from_chunks(Vec::new(), DEFAULT_MEDIA_TYPE);
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }

    #[tokio::test]
    async fn missing_file_is_reported_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = FileCaptureDevice::new(dir.path().join("missing.webm"));
        let err = device
            .request_access(CaptureConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn file_device_streams_chunks_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.webm");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut device = FileCaptureDevice::new(path).with_chunk_bytes(4);
        device.request_access(CaptureConstraints::default()).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        device.start(tx).await.unwrap();
        device.stop().await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                CaptureEvent::Started,
                CaptureEvent::Data(b"0123".to_vec()),
                CaptureEvent::Data(b"4567".to_vec()),
                CaptureEvent::Data(b"89".to_vec()),
                CaptureEvent::Stopped,
            ]
        );
    }
}
