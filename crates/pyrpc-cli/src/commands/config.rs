use crate::errors::CliError;
use crate::GlobalOpts;
use clap::Subcommand;
use colored::*;
use pyrpc_config::{Config, SUPPORTED_KEYS};
use pyrpc_logger as logger;
use std::fs;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print every configured value
    Show,
    /// Set a single key
    Set { key: String, value: String },
    /// Get or set the path to the config file.
    /// If `new_path` is provided, later runs read their config from there.
    /// If omitted, print the current configuration file path.
    Path {
        /// Optional new config path to set
        new_path: Option<String>,
    },
}

pub fn handle_config(action: ConfigAction, opts: &GlobalOpts) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => show(opts),
        ConfigAction::Set { key, value } => set(&key, &value),
        ConfigAction::Path { new_path } => path(new_path),
    }
}

fn show(opts: &GlobalOpts) -> Result<(), CliError> {
    let config = Config::load()?;
    println!("{}", "Configuration:".bold().green());
    for (key, value) in config.values_iter() {
        println!("  {}: {}", key.cyan(), value);
    }
    if opts.verbosity_level() > 0 {
        println!("  {} {}", "file:".dimmed(), Config::path().display());
    }
    Ok(())
}

fn set(key: &str, value: &str) -> Result<(), CliError> {
    let mut config = Config::load()?;
    if let Err(e) = config.set(key, value) {
        if !SUPPORTED_KEYS.contains(&key) {
            logger::info(&format!(
                "Currently supported keys: {}",
                SUPPORTED_KEYS.join(", ")
            ));
        }
        return Err(e.into());
    }
    config.save()?;
    logger::success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn path(new_path: Option<String>) -> Result<(), CliError> {
    let config_path = Config::path();
    logger::debug(&format!("Reading config from: {}", config_path.display()));

    match new_path {
        Some(p) => {
            let pointer_path = Config::pointer_path();
            if let Some(parent) = pointer_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&pointer_path, p.as_bytes())?;
            logger::success(&format!("Config path set to {}", p));
        }
        None => {
            println!("{}", config_path.display());

            let pointer_path = Config::pointer_path();
            if let Ok(contents) = fs::read_to_string(&pointer_path) {
                let trimmed = contents.trim();
                if !trimmed.is_empty() && config_path.as_os_str() != trimmed {
                    println!("{} {}", "pointer-ignored".yellow(), trimmed);
                }
            }
        }
    }
    Ok(())
}
