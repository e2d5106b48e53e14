//! Errors reported by the `pyrpc` commands

use pyrpc_config::ConfigError;
use pyrpc_python::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Invalid call target '{0}': expected module:function")]
    InvalidTarget(String),

    #[error("Invalid {what}: {reason}")]
    InvalidArguments { what: &'static str, reason: String },

    #[error("Remote call failed:\n{0}")]
    CallFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
