use std::path::{Component, Path, PathBuf};

use axum::{
    extract::{multipart::Multipart, FromRequest, Path as UrlPath, Request, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Form, Json,
};
use log::{debug, info};

use crate::models::{RegistrationRequest, RegistrationResponse, Report, UploadAck};

use super::{error::ApiError, AppState};

/// Accepts JSON or a url-encoded form body.
pub async fn register(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let registration = if is_form(&request) {
        let Form(registration) = Form::<RegistrationRequest>::from_request(request, &state)
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        registration
    } else {
        let Json(registration) = Json::<RegistrationRequest>::from_request(request, &state)
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        registration
    };
    Ok(Json(state.registration.register(&registration).await))
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// Accepts the recording and acknowledges it. The bytes are counted, not kept.
pub async fn upload(mut multipart: Multipart) -> Result<Json<UploadAck>, ApiError> {
    let mut session_id = None;
    let mut bytes = 0u64;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("video") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.body_text()))?;
                bytes += data.len() as u64;
            }
            Some("sessionId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.body_text()))?;
                session_id = Some(text).filter(|s| !s.is_empty());
            }
            other => debug!("Ignoring upload field {other:?}"),
        }
    }

    info!(
        "Received upload for session {}: {bytes} bytes",
        session_id.as_deref().unwrap_or("unknown")
    );

    Ok(Json(UploadAck {
        status: "ok".into(),
        session_id,
        bytes,
    }))
}

pub async fn results(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
) -> Result<Json<Report>, ApiError> {
    let report = state.analysis.analyze(&session_id).await?;
    Ok(Json(report))
}

pub async fn static_page(State(state): State<AppState>, uri: Uri) -> Result<Response, ApiError> {
    let relative = resolve_static_path(uri.path()).ok_or(ApiError::NotFound)?;
    let path = state.static_dir.join(&relative);

    match tokio::fs::read(&path).await {
        Ok(body) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(&relative))],
            body,
        )
            .into_response()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ApiError::NotFound),
        Err(err) => Err(ApiError::Internal(format!(
            "reading {}: {err}",
            path.display()
        ))),
    }
}

/// Maps a request path to a file under the public directory.
///
/// `/` serves `index.html`. Anything that would leave the directory is refused.
fn resolve_static_path(request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    let trimmed = if trimmed.is_empty() {
        "index.html"
    } else {
        trimmed
    };

    let mut resolved = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if resolved.as_os_str().is_empty() {
        None
    } else {
        Some(resolved)
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}
