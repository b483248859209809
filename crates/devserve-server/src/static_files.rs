//! Static file serving.
//!
//! Resolves request paths inside the served root and streams files back.
//! HTML goes through [`InjectSession`] so the page connects to the live
//! reload listener; everything else is streamed straight from disk.
//!
//! # Path resolution
//!
//! 1. Drop the query, percent-decode, map `/` to `index.html`.
//! 2. Join onto the root and collapse `.`/`..` lexically. Anything that lands
//!    outside the root is `403`, even if the target does not exist.
//! 3. Stat: missing is `404`, a directory retries once with `index.html`.
//! 4. Canonicalize and check the root prefix again so symlinks cannot escape.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use crate::error::ServeError;
use crate::inject::InjectSession;
use crate::mime;
use crate::state::AppState;

/// File served for `/` and for directory requests.
const INDEX_FILE: &str = "index.html";

/// Read size used while buffering HTML for injection.
const CHUNK_SIZE: usize = 8 * 1024;

/// Create router that serves every path and method from the root.
pub(crate) fn static_router() -> Router<Arc<AppState>> {
    Router::new().fallback(serve_file)
}

/// Serve the file addressed by the request URI.
async fn serve_file(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    match serve(&state, uri.path()).await {
        Ok((path, response)) => {
            tracing::info!(status = 200, path = %path.display(), "Served file");
            response
        }
        Err(err) => {
            tracing::info!(
                status = err.status().as_u16(),
                path = %err.path().display(),
                error = %err,
                "Request failed"
            );
            err.into_response()
        }
    }
}

async fn serve(state: &AppState, request_path: &str) -> Result<(PathBuf, Response), ServeError> {
    let path = resolve_path(&state.root, request_path).await?;
    let content_type = mime::content_type_for(&path);

    let file = open_file(&path).await?;

    let response = match state.reload_script.as_deref() {
        Some(script) if mime::is_html(content_type) => {
            injected_response(file, &path, script).await?
        }
        _ => streamed_response(file, &path, content_type).await?,
    };

    Ok((path, response))
}

/// Resolve a request path to a file inside `root`.
///
/// `root` must already be canonical.
pub(crate) async fn resolve_path(root: &Path, request_path: &str) -> Result<PathBuf, ServeError> {
    let without_query = request_path
        .split_once('?')
        .map_or(request_path, |(path, _)| path);
    let decoded = percent_decode_str(without_query).decode_utf8_lossy();

    let relative = decoded.trim_start_matches('/');
    let wants_directory = relative.ends_with('/');
    let relative = if relative.is_empty() {
        INDEX_FILE
    } else {
        relative
    };

    let candidate = normalize(&root.join(relative));
    if !candidate.starts_with(root) {
        return Err(ServeError::Forbidden(candidate));
    }

    // Any stat failure (missing, not a directory, unreadable parent) means
    // there is nothing to serve
    let metadata = fs::metadata(&candidate)
        .await
        .map_err(|_| ServeError::NotFound(candidate.clone()))?;

    let file = if metadata.is_dir() {
        let index = candidate.join(INDEX_FILE);
        match fs::metadata(&index).await {
            Ok(meta) if meta.is_file() => index,
            _ => return Err(ServeError::NotFound(index)),
        }
    } else if wants_directory {
        // `Path::join` drops the trailing slash, so `/page.html/` would
        // otherwise serve the file
        return Err(ServeError::NotFound(candidate));
    } else {
        candidate
    };

    let canonical = fs::canonicalize(&file)
        .await
        .map_err(|e| ServeError::from_io(e, file.clone()))?;
    if !canonical.starts_with(root) {
        return Err(ServeError::Forbidden(canonical));
    }

    Ok(canonical)
}

/// Open a resolved file before the response head is committed, so a file
/// removed since the stat is still a clean 404.
async fn open_file(path: &Path) -> Result<File, ServeError> {
    File::open(path)
        .await
        .map_err(|e| ServeError::from_io(e, path.to_path_buf()))
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Buffer an HTML file through the injection session.
async fn injected_response(
    mut file: File,
    path: &Path,
    script: &str,
) -> Result<Response, ServeError> {
    let mut session = InjectSession::new(script);
    let mut chunk = vec![0; CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut chunk)
            .await
            .map_err(|e| ServeError::from_io(e, path.to_path_buf()))?;
        if read == 0 {
            break;
        }
        session.push(&chunk[..read]);
    }

    Ok(([(header::CONTENT_TYPE, mime::HTML)], session.finish()).into_response())
}

/// Stream a file without buffering it.
///
/// Read errors after this point abort the connection; the head is already sent.
async fn streamed_response(
    file: File,
    path: &Path,
    content_type: &'static str,
) -> Result<Response, ServeError> {
    let metadata = file
        .metadata()
        .await
        .map_err(|e| ServeError::from_io(e, path.to_path_buf()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ServeError::Internal {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })
}
