//! Error types for the HTTP server.

use std::io;
use std::path::{Path, PathBuf};

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::mime;

/// Per-request error, contained to a single response.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Nothing to serve at the resolved path.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Request resolves outside the served root.
    #[error("Forbidden path: {}", .0.display())]
    Forbidden(PathBuf),

    /// Unexpected I/O failure while reading the file.
    #[error("Failed to read {}: {source}", path.display())]
    Internal {
        /// File being served.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ServeError {
    /// Classify an I/O error hit while serving `path`.
    pub(crate) fn from_io(source: io::Error, path: PathBuf) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Internal { path, source }
        }
    }

    /// Resolved path the request was refused or failed for.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::Forbidden(path) | Self::Internal { path, .. } => path,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::NotFound(_) => "<h1>404 - File Not Found</h1>".to_owned(),
            Self::Forbidden(_) => "<h1>403 - Forbidden</h1>".to_owned(),
            Self::Internal { source, .. } => format!(
                "<h1>500 - Internal Server Error</h1><p>{}</p>",
                escape_html(&source.to_string())
            ),
        };

        (self.status(), [(header::CONTENT_TYPE, mime::HTML)], body).into_response()
    }
}

/// Startup and runtime error of the server process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Served root could not be created or resolved.
    #[error("Failed to prepare served root {}: {source}", path.display())]
    Root {
        /// Configured root directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Listener could not be bound (typically the port is taken).
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Accept loop failed.
    #[error("Server error: {0}")]
    Serve(#[from] io::Error),
}

/// File watcher could not be started.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Watched root could not be created.
    #[error("Failed to create watched root {}: {source}", path.display())]
    Root {
        /// Root directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Recursive watching is not available for this path or platform.
    #[error("File watching unavailable: {0}")]
    Notify(#[from] notify::Error),
}

impl ServerError {
    /// Whether this is a bind failure because the address is already in use.
    #[must_use]
    pub fn is_addr_in_use(&self) -> bool {
        matches!(self, Self::Bind { source, .. } if source.kind() == io::ErrorKind::AddrInUse)
    }
}

/// Escape text for inclusion in an HTML error page.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
