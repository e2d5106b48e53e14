//! Interpreter preparation before the RPC entry points are resolved
//!
//! Runs once, while the handler is being constructed and the interpreter
//! lock is held:
//! - add configured search paths and the venv `site-packages` to `sys.path`
//! - register the bundled internal module when it is enabled and not shadowed

use crate::errors::{format_python_error, BridgeError};
use pyo3::exceptions::PyModuleNotFoundError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyrpc_config::venv_paths::resolve_site_packages;
use pyrpc_config::Config;
use pyrpc_logger as logger;
use std::ffi::CString;
use std::path::{Path, PathBuf};

/// Name the bundled internal module is registered under
pub const BUILTIN_MODULE_NAME: &str = "pyrpc_internal";

const BUILTIN_MODULE_SOURCE: &str = include_str!("../python/pyrpc_internal.py");

pub(crate) fn prepare_interpreter(py: Python<'_>, config: &Config) -> Result<(), BridgeError> {
    for path in search_paths(config)? {
        add_site_dir(py, &path)?;
    }

    if config.install_builtin_module {
        install_builtin_module(py)?;
    }
    Ok(())
}

fn search_paths(config: &Config) -> Result<Vec<PathBuf>, BridgeError> {
    let mut paths: Vec<PathBuf> = config.python_paths.iter().map(PathBuf::from).collect();

    if let Some(ref venv) = config.venv_path {
        let site_packages = resolve_site_packages(Path::new(venv)).map_err(|e| {
            BridgeError::Initialization(format!("Failed to resolve venv site-packages: {}", e))
        })?;
        logger::debug(&format!("site_packages: {}", site_packages.display()));
        paths.push(site_packages);
    }
    Ok(paths)
}

fn add_site_dir(py: Python<'_>, path: &Path) -> Result<(), BridgeError> {
    let site = PyModule::import(py, "site")
        .map_err(|e| BridgeError::Import("site".to_string(), format!("{}", e)))?;
    let path_str = path.to_str().ok_or_else(|| {
        BridgeError::Initialization(format!("Non UTF-8 search path: {}", path.display()))
    })?;
    site.call_method1("addsitedir", (path_str,)).map_err(|e| {
        BridgeError::Initialization(format!("Failed to add site directory {}: {}", path_str, e))
    })?;
    logger::debug(&format!("Added {} to sys.path", path_str));
    Ok(())
}

/// Register the bundled module unless something importable already owns its name
fn install_builtin_module(py: Python<'_>) -> Result<(), BridgeError> {
    match PyModule::import(py, BUILTIN_MODULE_NAME) {
        Ok(_) => {
            logger::debug(&format!(
                "{} already importable, bundled module not installed",
                BUILTIN_MODULE_NAME
            ));
            return Ok(());
        }
        Err(e) if e.is_instance_of::<PyModuleNotFoundError>(py) => {}
        Err(e) => {
            return Err(BridgeError::Import(
                BUILTIN_MODULE_NAME.to_string(),
                format_python_error(py, &e),
            ));
        }
    }

    let code = CString::new(BUILTIN_MODULE_SOURCE).map_err(|e| {
        BridgeError::Initialization(format!("Failed to prepare bundled module source: {}", e))
    })?;
    let module_name = CString::new(BUILTIN_MODULE_NAME).map_err(|e| {
        BridgeError::Initialization(format!("Invalid bundled module name: {}", e))
    })?;
    PyModule::from_code(py, &code, c"pyrpc_internal.py", &module_name).map_err(|e| {
        BridgeError::Import(BUILTIN_MODULE_NAME.to_string(), format_python_error(py, &e))
    })?;

    logger::debug(&format!("Registered bundled module {}", BUILTIN_MODULE_NAME));
    Ok(())
}
