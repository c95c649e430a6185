use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::archive::{ArchiveFormat, ArchiveStatus};
use crate::http::pagination::{parse_page, Pagination};
use crate::http::state::AppState;
use crate::media::library::{IndexSnapshot, MediaEntry};
use crate::media::mime::MediaKind;

const TITLE: &str = "ComfyUI Preview Gallery";

const CSS: &str = r#"
body{font-family:system-ui,-apple-system,"Segoe UI",Roboto,"Helvetica Neue",Arial;padding:16px;}
.meta{margin-bottom:8px;color:#666;}
.meta a{margin-right:16px;}
.pending{color:#666;}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(180px,1fr));gap:12px;}
.grid a{display:block;overflow:hidden;border-radius:8px;background:#111;padding:4px;}
.grid img,.grid video{width:100%;height:180px;object-fit:cover;display:block;background:#222;}
.pager{margin:12px 0;padding:8px;background:#f5f5f5;border-radius:6px;}
.pager a{margin:0 6px;text-decoration:none;color:#06c;}
.pager strong{margin:0 6px;}
"#;

fn first_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// GET / and /index.html
pub async fn serve_gallery(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let snapshot = state.snapshot().await;
    // Raw pairs: a repeated or junk `page` must not turn into a 400.
    let page = parse_page(first_param(&params, "page"));
    let status = state.archive.status();
    let markup = render(
        &snapshot,
        page,
        state.page_size,
        &status,
        state.archive.format(),
    );
    Html(markup.into_string()).into_response()
}

/// Render one gallery page. `requested_page` is clamped to the available pages.
pub fn render(
    snapshot: &IndexSnapshot,
    requested_page: usize,
    page_size: usize,
    status: &ArchiveStatus,
    format: ArchiveFormat,
) -> Markup {
    let pagination = Pagination::new(snapshot.len(), page_size, requested_page);
    let items = &snapshot.entries[pagination.window()];
    let pager = render_pager(&pagination);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width,initial-scale=1";
                title { (TITLE) }
                style { (PreEscaped(CSS)) }
            }
            body {
                h1 { (TITLE) }
                div.meta {
                    "Total images: " (pagination.total_items)
                    " — Page " (pagination.page) " / " (pagination.total_pages)
                }
                div.meta { (render_download(status, format)) }
                div.pager { (pager) }
                @if items.is_empty() {
                    p.empty { "No images found." }
                } @else {
                    div.grid {
                        @for entry in items {
                            (render_tile(entry))
                        }
                    }
                }
                div.pager { (pager) }
            }
        }
    }
}

/// Exactly one of: download link, in-progress notice, or request link.
fn render_download(status: &ArchiveStatus, format: ArchiveFormat) -> Markup {
    let label = format.label();
    html! {
        @match status {
            ArchiveStatus::Ready(_) => {
                a href="/download" { "Download " (label) }
                a href="/clear-archive" { "Delete " (label) }
            }
            ArchiveStatus::Generating => {
                span.pending { "Generating " (label) "... (please wait)" }
            }
            ArchiveStatus::Idle => {
                a href="/request-archive" { "Request " (label) " (prepare download)" }
            }
        }
    }
}

fn render_pager(pagination: &Pagination) -> Markup {
    let mut parts: Vec<Markup> = Vec::new();

    if pagination.has_prev() {
        parts.push(page_link(1, "First"));
        parts.push(page_link(pagination.page - 1, "Prev"));
    }
    for n in pagination.nearby_pages() {
        if n == pagination.page {
            parts.push(html! { strong { (n) } });
        } else {
            parts.push(page_link(n, &n.to_string()));
        }
    }
    if pagination.has_next() {
        parts.push(page_link(pagination.page + 1, "Next"));
        parts.push(page_link(pagination.total_pages, "Last"));
    }

    html! {
        @for (i, part) in parts.iter().enumerate() {
            @if i > 0 { " | " }
            (part)
        }
    }
}

fn page_link(page: usize, text: &str) -> Markup {
    html! {
        a href={ "/?page=" (page) } { (text) }
    }
}

/// Each tile opens the original file in a new tab. Nothing is fetched until the
/// tile nears the viewport (native lazy loading for images, no preload for video).
fn render_tile(entry: &MediaEntry) -> Markup {
    let href = media_href(&entry.relative_path);
    html! {
        a href=(href) target="_blank" rel="noopener" title=(entry.relative_path) {
            @match entry.kind {
                MediaKind::Image => {
                    img src=(href) alt=(entry.relative_path) loading="lazy" decoding="async";
                }
                MediaKind::Video => {
                    video src=(href) preload="none" muted playsinline {}
                }
            }
        }
    }
}

/// Absolute URL path for a root-relative file, each segment percent-encoded.
fn media_href(relative_path: &str) -> String {
    let encoded: Vec<_> = relative_path
        .split('/')
        .map(urlencoding::encode)
        .collect();
    format!("/{}", encoded.join("/"))
}
