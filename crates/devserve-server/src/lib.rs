//! Static file server with live reload for devserve.
//!
//! Serves a directory over HTTP, watches it for changes and tells every open
//! browser tab to reload. HTML responses are rewritten on the fly so each page
//! carries the small client that listens for the reload signal.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use devserve_server::{ServerConfig, run_server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = ServerConfig {
//!         root: PathBuf::from("public"),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► file server (port)
//!    │                   │
//!    │                   ├─► static_files: resolve inside root, stream bytes
//!    │                   └─► inject: HTML gets the reload client
//!    │
//!    └──WebSocket──► reload listener (reload_port)
//!                        │
//!                        └─► BroadcastHub ◄── DirectoryWatcher ◄── notify
//! ```

mod app;
mod error;
pub mod inject;
pub mod live_reload;
mod middleware;
mod mime;
mod state;
mod static_files;

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::{ServeError, ServerError, WatchError};
use live_reload::{BroadcastHub, DirectoryWatcher};
use state::AppState;

/// Message broadcast to browsers when something under the root changed.
pub const RELOAD_MESSAGE: &str = "reload";

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind both listeners to.
    pub host: String,
    /// Port of the HTTP file server.
    pub port: u16,
    /// Port of the live reload WebSocket listener.
    pub reload_port: u16,
    /// Directory to serve and watch.
    pub root: PathBuf,
    /// Enable live reload.
    pub live_reload_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            reload_port: 3001,
            root: PathBuf::from("public"),
            live_reload_enabled: true,
        }
    }
}

/// Create server configuration from devserve config.
#[must_use]
pub fn server_config_from_config(config: &devserve_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        reload_port: config.server.reload_port,
        root: config.root_resolved.dir.clone(),
        live_reload_enabled: config.live_reload.enabled,
    }
}

/// Live reload half of a bound server.
struct LiveReload {
    listener: TcpListener,
    addr: SocketAddr,
    hub: Arc<BroadcastHub>,
    watcher: Option<DirectoryWatcher>,
}

/// Server with both listeners bound, ready to serve.
pub struct DevServer {
    root: PathBuf,
    http: TcpListener,
    http_addr: SocketAddr,
    live_reload: Option<LiveReload>,
}

impl DevServer {
    /// Prepare the root, bind the listeners and start the watcher.
    ///
    /// A watcher that cannot start is logged and leaves the server running
    /// without reloads. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or either port cannot
    /// be bound.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let root = prepare_root(&config.root)?;

        let live_reload = if config.live_reload_enabled {
            let listener = bind_listener(&config.host, config.reload_port).await?;
            let addr = listener.local_addr()?;
            let hub = Arc::new(BroadcastHub::new());
            let watcher = start_watcher(&root, Arc::clone(&hub));
            Some(LiveReload {
                listener,
                addr,
                hub,
                watcher,
            })
        } else {
            None
        };

        let http = bind_listener(&config.host, config.port).await?;
        let http_addr = http.local_addr()?;

        Ok(Self {
            root,
            http,
            http_addr,
            live_reload,
        })
    }

    /// Canonical served root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Address of the HTTP file server.
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Address of the live reload listener (`None` when disabled).
    #[must_use]
    pub fn reload_addr(&self) -> Option<SocketAddr> {
        self.live_reload.as_ref().map(|lr| lr.addr)
    }

    /// Hub shared by the listener and the watcher (`None` when disabled).
    #[must_use]
    pub fn hub(&self) -> Option<Arc<BroadcastHub>> {
        self.live_reload.as_ref().map(|lr| Arc::clone(&lr.hub))
    }

    /// Whether file changes are being watched.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.live_reload
            .as_ref()
            .is_some_and(|lr| lr.watcher.is_some())
    }

    /// Serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if either accept loop fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            shutdown.await;
            trigger.cancel();
        });

        let reload_script = self
            .live_reload
            .as_ref()
            .map(|lr| inject::reload_script(lr.addr.port()));
        let state = Arc::new(AppState {
            root: self.root,
            reload_script,
        });

        let http = axum::serve(self.http, app::create_router(state))
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .into_future();

        match self.live_reload {
            Some(LiveReload {
                listener,
                hub,
                watcher,
                ..
            }) => {
                let reload = axum::serve(listener, app::create_reload_router(hub))
                    .with_graceful_shutdown(token.cancelled_owned())
                    .into_future();
                tokio::try_join!(http, reload)?;
                // Keep watching until both servers are down
                drop(watcher);
            }
            None => http.await?,
        }

        Ok(())
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails to start or stops unexpectedly.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let server = DevServer::bind(&config).await?;

    tracing::info!(address = %server.http_addr(), root = %server.root().display(), "Starting server");
    if let Some(addr) = server.reload_addr() {
        tracing::info!(address = %addr, watching = server.is_watching(), "Live reload listening");
    }

    server.serve(shutdown_signal()).await
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create the root if missing and return its canonical path.
fn prepare_root(root: &Path) -> Result<PathBuf, ServerError> {
    let to_error = |source| ServerError::Root {
        path: root.to_path_buf(),
        source,
    };

    if !root.exists() {
        std::fs::create_dir_all(root).map_err(to_error)?;
        tracing::info!(root = %root.display(), "Created served root");
    }
    root.canonicalize().map_err(to_error)
}

/// Bind a listener, reporting the requested address on failure.
async fn bind_listener(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })
}

/// Start the watcher; a failure only disables reloads.
fn start_watcher(root: &Path, hub: Arc<BroadcastHub>) -> Option<DirectoryWatcher> {
    match DirectoryWatcher::start(root, hub) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            tracing::error!(error = %err, "Live reload disabled, serving files only");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_config(root: &Path) -> ServerConfig {
        ServerConfig {
            port: 0,
            reload_port: 0,
            root: root.to_path_buf(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_server_config_from_config() {
        let mut config = devserve_config::Config::default();
        config.server.port = 8080;
        config.server.reload_port = 8081;
        config.live_reload.enabled = false;

        let server_config = server_config_from_config(&config);

        assert_eq!(server_config.port, 8080);
        assert_eq!(server_config.reload_port, 8081);
        assert_eq!(server_config.root, config.root_resolved.dir);
        assert!(!server_config.live_reload_enabled);
    }

    #[test]
    fn test_prepare_root_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("new/site");

        let prepared = prepare_root(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(prepared, root.canonicalize().unwrap());
    }

    #[test]
    fn test_prepare_root_below_file_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();

        let result = prepare_root(&file.join("site"));

        assert!(matches!(result, Err(ServerError::Root { .. })));
    }

    #[tokio::test]
    async fn test_watcher_failure_degrades_to_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let not_a_dir = temp_dir.path().join("file");
        std::fs::write(&not_a_dir, "x").unwrap();

        assert!(start_watcher(&not_a_dir, Arc::new(BroadcastHub::new())).is_none());
    }

    #[tokio::test]
    async fn test_bind_with_live_reload() {
        let temp_dir = tempfile::tempdir().unwrap();

        let server = DevServer::bind(&test_config(temp_dir.path())).await.unwrap();

        let reload_addr = server.reload_addr().unwrap();
        assert_ne!(server.http_addr().port(), 0);
        assert_ne!(reload_addr.port(), 0);
        assert_ne!(server.http_addr(), reload_addr);
        assert!(server.is_watching());
        assert!(server.hub().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bind_without_live_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            live_reload_enabled: false,
            ..test_config(temp_dir.path())
        };

        let server = DevServer::bind(&config).await.unwrap();

        assert!(server.reload_addr().is_none());
        assert!(server.hub().is_none());
        assert!(!server.is_watching());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            port: taken.local_addr().unwrap().port(),
            ..test_config(temp_dir.path())
        };

        let Err(err) = DevServer::bind(&config).await else {
            panic!("bind on a taken port succeeded");
        };

        assert!(err.is_addr_in_use(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let temp_dir = tempfile::tempdir().unwrap();
        let server = DevServer::bind(&test_config(temp_dir.path())).await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
