//! Application state.
//!
//! Shared state for the file server handlers.

use std::path::PathBuf;

/// State shared by every file request.
pub(crate) struct AppState {
    /// Canonical served root. Every served file lives below it.
    pub(crate) root: PathBuf,
    /// Reload client injected into HTML (`None` when live reload is off).
    pub(crate) reload_script: Option<String>,
}
