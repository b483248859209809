//! `devserve serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use devserve_config::{CliSettings, Config};
use devserve_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover devserve.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// HTTP port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Live reload WebSocket port (overrides config).
    #[arg(long)]
    reload_port: Option<u16>,

    /// Enable verbose output (request and reload logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let live_reload_enabled = self.resolve_live_reload_enabled();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            reload_port: self.reload_port,
            root_dir: self.root,
            live_reload_enabled,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(
            config_path = ?config.config_path,
            host = %config.server.host,
            port = config.server.port,
            reload_port = config.server.reload_port,
            root = %config.root_resolved.dir.display(),
            live_reload = config.live_reload.enabled,
            "Configuration loaded"
        );

        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }
        output.highlight(&format!(
            "Serving on http://{}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!("Root: {}", config.root_resolved.dir.display()));
        if config.live_reload.enabled {
            output.info(&format!(
                "Live reload: ws://{}:{}/",
                config.server.host, config.server.reload_port
            ));
        } else {
            output.warning("Live reload: disabled");
        }

        run_server(server_config_from_config(&config)).await?;

        Ok(())
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}
