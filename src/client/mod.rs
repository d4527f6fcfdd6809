//! HTTP client for the rehearsal server, used by the CLI in place of a browser.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::{
    models::{RegistrationRequest, RegistrationResponse, Report, UploadAck},
    recording::{capture::DEFAULT_FILE_NAME, MediaBlob, Uploader},
    results::{FetchError, ReportSource},
};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("base URL {base_url} cannot carry paths");
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL cannot carry paths"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn register(&self, request: &RegistrationRequest) -> Result<RegistrationResponse> {
        let url = self.endpoint(&["api", "register"])?;
        self.http
            .post(url)
            .json(request)
            .send()
            .await
            .context("registration request failed")?
            .error_for_status()
            .context("registration rejected")?
            .json()
            .await
            .context("registration response was not JSON")
    }
}

#[async_trait]
impl Uploader for ApiClient {
    async fn upload(&self, session_id: &str, blob: &MediaBlob) -> Result<UploadAck> {
        let url = self.endpoint(&["api", "upload"])?;
        let video = Part::bytes(blob.bytes.clone())
            .file_name(DEFAULT_FILE_NAME)
            .mime_str(&blob.media_type)
            .with_context(|| format!("invalid media type {}", blob.media_type))?;
        let form = Form::new()
            .part("video", video)
            .text("sessionId", session_id.to_string());

        debug!("Uploading {} bytes for session {session_id}", blob.len());
        self.http
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("upload request failed")?
            .error_for_status()
            .context("upload rejected")?
            .json()
            .await
            .context("upload response was not JSON")
    }
}

#[async_trait]
impl ReportSource for ApiClient {
    async fn fetch_report(&self, session_id: &str) -> Result<Report, FetchError> {
        let url = self
            .endpoint(&["api", "results", session_id])
            .map_err(|err| FetchError::Network(err.to_string()))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<Report>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path_and_escape_ids() {
        let client = ApiClient::new("http://localhost:3000/rehearsal/").unwrap();
        assert_eq!(
            client.endpoint(&["api", "results", "a b/c"]).unwrap().as_str(),
            "http://localhost:3000/rehearsal/api/results/a%20b%2Fc"
        );

        let client = ApiClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.endpoint(&["api", "register"]).unwrap().as_str(),
            "http://localhost:3000/api/register"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:someone@example.com").is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) is not expected to run an HTTP server locally.
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.fetch_report("test").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)), "{err:?}");
    }
}
