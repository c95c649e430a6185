use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use preview_gallery::archive::{ArchiveBuilder, ArchiveFormat};
use preview_gallery::http::{build_router, state::AppState};
use preview_gallery::media::index::MediaIndex;

struct TestApp {
    _root: tempfile::TempDir,
    _archives: tempfile::TempDir,
    state: AppState,
}

fn make_app(files: &[&str], page_size: usize, format: ArchiveFormat) -> TestApp {
    let root = tempfile::tempdir().unwrap();
    for rel in files {
        let path = root.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("bytes of {rel}")).unwrap();
    }
    let archives = tempfile::tempdir().unwrap();
    let state = AppState {
        index: Arc::new(MediaIndex::new(root.path())),
        archive: ArchiveBuilder::new(format, archives.path()),
        page_size,
    };
    TestApp {
        _root: root,
        _archives: archives,
        state,
    }
}

impl TestApp {
    async fn get(&self, uri: &str) -> axum::response::Response {
        build_router(self.state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn wait_for_archive(&self) -> PathBuf {
        for _ in 0..500 {
            if !self.state.archive.is_generating() {
                if let Some(path) = self.state.archive.ready_path() {
                    return path;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("archive was not built in time");
    }
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_text(response: axum::response::Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn header<'a>(response: &'a axum::response::Response, name: &str) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// ── GET / ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn gallery_status_200_html() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let ct = header(&response, "content-type");
    assert!(ct.contains("text/html"), "Expected text/html, got: {ct}");
}

#[tokio::test]
async fn index_html_serves_gallery() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    let text = body_text(app.get("/index.html").await).await;
    assert!(text.contains("Total images: 1"), "Expected gallery page:\n{text}");
}

#[tokio::test]
async fn empty_output_directory() {
    let app = make_app(&[], 10, ArchiveFormat::Zip);
    let text = body_text(app.get("/").await).await;
    assert!(text.contains("No images found"), "{text}");
    assert!(text.contains("Total images: 0 — Page 1 / 1"), "{text}");

    let response = app.get("/download").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gallery_links_each_file() {
    let app = make_app(&["a.png", "sub dir/b.webm", "notes.txt"], 10, ArchiveFormat::Zip);
    let text = body_text(app.get("/").await).await;
    assert!(text.contains("href=\"/a.png\""), "{text}");
    assert!(text.contains("href=\"/sub%20dir/b.webm\""), "{text}");
    assert!(!text.contains("notes.txt"), "{text}");
    assert!(text.contains("Total images: 2"), "{text}");
}

#[tokio::test]
async fn gallery_page_parameter_is_clamped_and_lenient() {
    let files: Vec<String> = (0..25).map(|i| format!("img_{i:02}.png")).collect();
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let app = make_app(&refs, 10, ArchiveFormat::Zip);

    let page3 = body_text(app.get("/?page=3").await).await;
    assert!(page3.contains("Page 3 / 3"));
    assert_eq!(page3.matches("<img ").count(), 5);

    let beyond = body_text(app.get("/?page=4").await).await;
    assert!(beyond.contains("Page 3 / 3"));

    let junk = body_text(app.get("/?page=abc").await).await;
    assert!(junk.contains("Page 1 / 3"));
    assert_eq!(junk.matches("<img ").count(), 10);

    let repeated = app.get("/?page=2&page=3").await;
    assert_eq!(repeated.status(), StatusCode::OK);
    assert!(body_text(repeated).await.contains("Page 2 / 3"));

    for uri in ["/?page", "/?page=%ff", "/?other=1"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(body_text(response).await.contains("Page 1 / 3"), "{uri}");
    }
}

#[tokio::test]
async fn unpaginated_gallery_shows_all() {
    let files: Vec<String> = (0..25).map(|i| format!("img_{i:02}.png")).collect();
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let app = make_app(&refs, 0, ArchiveFormat::Zip);

    let text = body_text(app.get("/").await).await;
    assert!(text.contains("Page 1 / 1"));
    assert_eq!(text.matches("<img ").count(), 25);
}

// ── Fixed 404s ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn favicon_and_robots_return_404() {
    let app = make_app(&[], 10, ArchiveFormat::Zip);
    for uri in ["/favicon.ico", "/robots.txt"] {
        assert_eq!(app.get(uri).await.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

// ── Archive lifecycle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn request_archive_redirects_home() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    let response = app.get("/request-archive").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(header(&response, "location"), "/");
    app.wait_for_archive().await;
}

#[tokio::test]
async fn download_before_request_is_404_with_message() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    let response = app.get("/download").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(header(&response, "content-type").starts_with("text/plain"));
    let text = body_text(response).await;
    assert!(text.contains("not ready"), "{text}");
}

#[tokio::test]
async fn zip_download_streams_built_archive() {
    let app = make_app(&["a.png", "sub/b.jpg", "skip.txt"], 10, ArchiveFormat::Zip);

    let idle = body_text(app.get("/").await).await;
    assert!(idle.contains("href=\"/request-archive\""));

    app.get("/request-archive").await;
    let path = app.wait_for_archive().await;

    let ready = body_text(app.get("/").await).await;
    assert!(ready.contains("href=\"/download\""), "{ready}");
    assert!(!ready.contains("href=\"/request-archive\""), "{ready}");

    let response = app.get("/download").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "application/zip");
    assert_eq!(
        header(&response, "content-disposition"),
        "attachment; filename=\"comfyui_preview_gallery.zip\""
    );
    let length: usize = header(&response, "content-length").parse().unwrap();

    let bytes = body_bytes(response).await;
    assert_eq!(bytes.len(), length);
    assert_eq!(length as u64, std::fs::metadata(&path).unwrap().len());

    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let names: BTreeSet<&str> = archive.file_names().collect();
    assert_eq!(names, BTreeSet::from(["a.png", "sub/b.jpg"]));
}

#[tokio::test]
async fn tar_download_uses_tar_headers() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Tar);
    app.get("/request-archive").await;
    app.wait_for_archive().await;

    let response = app.get("/download").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "application/x-tar");
    assert!(header(&response, "content-disposition").contains("comfyui_preview_gallery.tar"));

    let bytes = body_bytes(response).await;
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.png".to_string()]);
}

#[tokio::test]
async fn clear_archive_makes_download_404() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    app.get("/request-archive").await;
    let path = app.wait_for_archive().await;

    let response = app.get("/clear-archive").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(header(&response, "location"), "/");
    assert!(!path.exists());

    assert_eq!(app.get("/download").await.status(), StatusCode::NOT_FOUND);
    let text = body_text(app.get("/").await).await;
    assert!(text.contains("href=\"/request-archive\""));
}

#[tokio::test]
async fn rebuild_after_clear_uses_new_path() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    app.get("/request-archive").await;
    let first = app.wait_for_archive().await;

    app.get("/clear-archive").await;
    app.get("/request-archive").await;
    let second = app.wait_for_archive().await;

    assert_ne!(first, second);
}

// ── Static fallback ───────────────────────────────────────────────────────────

#[tokio::test]
async fn other_paths_serve_files_from_root() {
    let app = make_app(&["sub/b.jpg"], 10, ArchiveFormat::Zip);
    let response = app.get("/sub/b.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"bytes of sub/b.jpg");
}

#[tokio::test]
async fn missing_static_file_returns_404() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    assert_eq!(app.get("/nope.png").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_fallback_cannot_escape_root() {
    let app = make_app(&["a.png"], 10, ArchiveFormat::Zip);
    assert_eq!(app.get("/../outside.png").await.status(), StatusCode::NOT_FOUND);
}
