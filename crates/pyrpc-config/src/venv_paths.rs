//! Locate the `site-packages` directory of a configured virtual environment
//!
//! The bridge adds this directory to the embedded interpreter's search path
//! so the internal RPC module and user code can be imported from the venv.

use std::fs;
use std::path::{Path, PathBuf};

/// "Lib" on Windows, "lib" on Unix
#[cfg(windows)]
pub const PYTHON_LIB_DIR: &str = "Lib";
#[cfg(not(windows))]
pub const PYTHON_LIB_DIR: &str = "lib";

pub const SITE_PACKAGES: &str = "site-packages";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenvPathError {
    /// The venv path does not exist or is not a directory
    VenvNotFound(PathBuf),
    /// A required directory inside the venv is missing
    PathResolution(String),
}

impl std::fmt::Display for VenvPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenvPathError::VenvNotFound(path) => {
                write!(f, "Virtual environment not found: {}", path.display())
            }
            VenvPathError::PathResolution(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for VenvPathError {}

/// Resolve the site-packages path for a virtual environment
///
/// - **Unix/macOS**: `<venv>/lib/python3.X/site-packages`
/// - **Windows**: `<venv>/Lib/site-packages`
pub fn resolve_site_packages(venv_path: &Path) -> Result<PathBuf, VenvPathError> {
    if !venv_path.is_dir() {
        return Err(VenvPathError::VenvNotFound(venv_path.to_path_buf()));
    }

    let lib_dir = venv_path.join(PYTHON_LIB_DIR);
    if !lib_dir.is_dir() {
        return Err(VenvPathError::PathResolution(format!(
            "lib directory not found: {}",
            lib_dir.display()
        )));
    }

    let site_packages = if cfg!(windows) {
        lib_dir.join(SITE_PACKAGES)
    } else {
        // Pick the highest python3.X directory if several exist
        let mut versions: Vec<PathBuf> = fs::read_dir(&lib_dir)
            .map_err(|e| VenvPathError::PathResolution(format!("Failed to read lib dir: {}", e)))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("python"))
            .map(|e| e.path())
            .collect();
        versions.sort();
        versions
            .pop()
            .ok_or_else(|| {
                VenvPathError::PathResolution(format!(
                    "No python3.X directory found in {}",
                    lib_dir.display()
                ))
            })?
            .join(SITE_PACKAGES)
    };

    if !site_packages.is_dir() {
        return Err(VenvPathError::PathResolution(format!(
            "site-packages not found: {}",
            site_packages.display()
        )));
    }
    Ok(site_packages)
}
