use std::path::Path;

/// Every MIME type the gallery indexes, in allow-list order.
pub const SUPPORTED_MIMES: &[&str] = &[
    // Image
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/bmp",
    // Video
    "video/mp4",
    "video/x-msvideo",
    "video/webm",
];

/// Media kind classification for discovered files.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Classify a file path by its extension into a (MediaKind, MIME type) pair.
///
/// Returns `None` for anything outside the allow-list (silent skip, no logging at
/// this layer). Extensions are matched case-insensitively.
pub fn classify(path: &Path) -> Option<(MediaKind, &'static str)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();

    let result = match ext.as_str() {
        "png" => (MediaKind::Image, "image/png"),
        "jpg" | "jpeg" => (MediaKind::Image, "image/jpeg"),
        "gif" => (MediaKind::Image, "image/gif"),
        "webp" => (MediaKind::Image, "image/webp"),
        "bmp" => (MediaKind::Image, "image/bmp"),

        "mp4" => (MediaKind::Video, "video/mp4"),
        "avi" => (MediaKind::Video, "video/x-msvideo"),
        "webm" => (MediaKind::Video, "video/webm"),

        _ => return None,
    };

    Some(result)
}
