//! CLI error types.

use devserve_config::ConfigError;
use devserve_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Server(String),
}

impl From<ServerError> for CliError {
    fn from(err: ServerError) -> Self {
        if err.is_addr_in_use() {
            return Self::Server(format!(
                "{err} (is another devserve already running? try --port / --reload-port)"
            ));
        }
        Self::Server(err.to_string())
    }
}
