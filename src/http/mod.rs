pub mod download;
pub mod gallery;
pub mod pagination;
pub mod state;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use crate::http::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Anything not routed below is a file under the output root.
    let static_files = ServeDir::new(state.index.root());

    Router::new()
        .route("/", get(gallery::serve_gallery))
        .route("/index.html", get(gallery::serve_gallery))
        .route("/favicon.ico", get(not_found))
        .route("/robots.txt", get(not_found))
        .route("/request-archive", get(download::request_archive))
        .route("/clear-archive", get(download::clear_archive))
        .route("/download", get(download::download_archive))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
