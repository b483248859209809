//! Content types for served files.

use std::path::Path;

/// Content type for HTML documents.
pub(crate) const HTML: &str = "text/html";

/// Fallback for unknown or missing extensions.
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

/// Extension to content type table (extensions are lowercase).
const TABLE: &[(&str, &str)] = &[
    ("html", HTML),
    ("htm", HTML),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("webp", "image/webp"),
    ("txt", "text/plain"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("wasm", "application/wasm"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

/// Return the content type for `path` based on its extension.
pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return OCTET_STREAM;
    };

    TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map_or(OCTET_STREAM, |&(_, mime)| mime)
}

/// Whether responses of this type go through script injection.
pub(crate) fn is_html(content_type: &str) -> bool {
    content_type == HTML
}
