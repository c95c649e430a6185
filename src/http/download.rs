use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::http::state::AppState;

/// Archive bytes are read from disk and sent in chunks of this size.
pub const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

const NOT_READY_MESSAGE: &str = "Archive not ready. Please try again.";

fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// GET /request-archive: start a background build of the current listing.
///
/// Always redirects back to the gallery; a request that lands while a build is
/// running is dropped and the gallery shows the in-progress notice instead.
pub async fn request_archive(State(state): State<AppState>) -> Response {
    let snapshot = state.snapshot().await;
    match state.archive.request_build(snapshot.entries.clone()) {
        Some(_detached) => {
            tracing::info!("Archive build started for {} files", snapshot.len());
        }
        None => {
            tracing::debug!("Archive request ignored; build in progress");
        }
    }
    redirect_home()
}

/// GET /clear-archive
pub async fn clear_archive(State(state): State<AppState>) -> Response {
    state.archive.clear_build();
    redirect_home()
}

/// GET /download: stream the published archive from disk.
///
/// A client that disconnects mid-transfer just drops the body stream.
pub async fn download_archive(State(state): State<AppState>) -> Response {
    let Some(path) = state.archive.ready_path() else {
        return plain_text(StatusCode::NOT_FOUND, NOT_READY_MESSAGE.to_string());
    };

    // Cleared between the status read and open: same as never built.
    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return plain_text(StatusCode::NOT_FOUND, NOT_READY_MESSAGE.to_string());
        }
        Err(e) => {
            tracing::error!("Failed to open archive {}: {}", path.display(), e);
            return plain_text(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}"));
        }
    };
    let size = match file.metadata().await {
        Ok(m) => m.len(),
        Err(e) => {
            tracing::error!("Failed to stat archive {}: {}", path.display(), e);
            return plain_text(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}"));
        }
    };

    let format = state.archive.format();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    let disposition = format!("attachment; filename=\"{}\"", format.download_filename());
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    tracing::info!("Streaming archive {} ({} bytes)", path.display(), size);
    let stream = ReaderStream::with_capacity(file, DOWNLOAD_CHUNK_SIZE);
    (StatusCode::OK, headers, Body::from_stream(stream)).into_response()
}
