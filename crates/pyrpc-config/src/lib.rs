//! Configuration for the pyrpc interpreter bridge
//!
//! The configuration is a small TOML file that tells the bridge which
//! internal module supplies the RPC entry points and how to prepare the
//! embedded interpreter before that module is imported.

mod config;
mod errors;
pub mod venv_paths;

pub use config::{Config, CONFIG_ENV_VAR, DEFAULT_MODULE_PATH, SUPPORTED_KEYS};
pub use errors::ConfigError;
