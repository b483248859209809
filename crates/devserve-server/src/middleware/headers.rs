//! Response headers middleware.
//!
//! Adds headers to every file server response:
//! - Cache-Control
//! - X-Content-Type-Options

use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, X_CONTENT_TYPE_OPTIONS};
use tower_http::set_header::SetResponseHeaderLayer;

/// Cache-Control header value.
///
/// Browsers must revalidate on every reload or edits would not show up.
const CACHE_CONTROL_VALUE: &str = "no-cache";

/// Create layer that adds Cache-Control header.
pub(crate) fn no_cache_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE))
}

/// Create layer that adds X-Content-Type-Options header.
pub(crate) fn content_type_options_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"))
}
