use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "PYRPC_CONFIG";

/// Module imported for the RPC entry points when nothing else is configured
pub const DEFAULT_MODULE_PATH: &str = "pyrpc_internal";

const DEFAULT_SLOW_LOCK_WARN_MS: u64 = 100;
const POINTER_FILE: &str = ".pyrpc_config_path";

/// Keys accepted by [`Config::get`] and [`Config::set`]
pub const SUPPORTED_KEYS: &[&str] = &[
    "module-path",
    "install-builtin-module",
    "venv-path",
    "python-paths",
    "slow-lock-warn-ms",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Dotted path of the module exposing the four RPC entry points
    pub module_path: String,
    /// Register the bundled module as `pyrpc_internal` unless that name is already importable
    pub install_builtin_module: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<String>,
    /// Extra directories added to `sys.path` before the module is imported
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub python_paths: Vec<String>,
    /// Interpreter lock waits longer than this are reported as warnings
    pub slow_lock_warn_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_path: DEFAULT_MODULE_PATH.to_string(),
            install_builtin_module: true,
            venv_path: None,
            python_paths: Vec::new(),
            slow_lock_warn_ms: DEFAULT_SLOW_LOCK_WARN_MS,
        }
    }
}

impl Config {
    /// Resolve the config file location.
    ///
    /// `PYRPC_CONFIG` wins when set and non-empty. Otherwise a pointer file
    /// next to the default location may redirect to another file.
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        let default = Self::default_path();
        if let Some(pointer) = Self::pointer_target(&default) {
            return pointer;
        }
        default
    }

    /// Default config file path (platform-appropriate)
    pub fn default_path() -> PathBuf {
        config_dir().join("pyrpc.toml")
    }

    /// Pointer file that redirects the config location
    pub fn pointer_path() -> PathBuf {
        config_dir().join(POINTER_FILE)
    }

    fn pointer_target(default: &Path) -> Option<PathBuf> {
        let pointer = default.parent()?.join(POINTER_FILE);
        let contents = fs::read_to_string(pointer).ok()?;
        let trimmed = contents.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "module-path" => Some(self.module_path.clone()),
            "install-builtin-module" => Some(self.install_builtin_module.to_string()),
            "venv-path" => self.venv_path.clone(),
            "python-paths" => {
                (!self.python_paths.is_empty()).then(|| self.python_paths.join(","))
            }
            "slow-lock-warn-ms" => Some(self.slow_lock_warn_ms.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "module-path" => {
                let trimmed = value.trim();
                if trimmed.is_empty() || trimmed.split('.').any(str::is_empty) {
                    return Err(invalid(key, value, "expected a dotted module path"));
                }
                self.module_path = trimmed.to_string();
            }
            "install-builtin-module" => {
                self.install_builtin_module = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(key, value, "expected true or false"))?;
            }
            "venv-path" => {
                let trimmed = value.trim();
                self.venv_path = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            "python-paths" => {
                self.python_paths = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "slow-lock-warn-ms" => {
                self.slow_lock_warn_ms = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(key, value, "expected milliseconds"))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        SUPPORTED_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    pub fn slow_lock_warn(&self) -> Duration {
        Duration::from_millis(self.slow_lock_warn_ms)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir().map(|home| home.join(".config"));

    #[cfg(target_os = "windows")]
    let base = dirs::config_dir();

    base.unwrap_or_else(|| PathBuf::from(".")).join("pyrpc")
}
