//! Console and log-file logging shared by the pyrpc crates
//!
//! Every message is appended to a log file (when one is configured) with a
//! timestamp and a source tag. Console output is gated by the verbosity
//! level, except for warnings and errors which are always shown unless the
//! logger is quiet.

use colored::Colorize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static QUIET: Mutex<bool> = Mutex::new(false);

pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

pub fn set_verbosity(verbosity: u8) {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
}

pub fn get_quiet() -> bool {
    QUIET.lock().ok().map(|v| *v).unwrap_or(false)
}

/// Suppress warnings and errors on the console (the log file still gets them)
pub fn set_quiet(quiet: bool) {
    if let Ok(mut v) = QUIET.lock() {
        *v = quiet;
    }
}

/// Initialize the logger with a verbosity level, logging to the default file
pub fn init_with_verbosity(verbosity: u8, quiet: bool) -> Result<(), String> {
    set_verbosity(verbosity);
    set_quiet(quiet);

    let log_dir = get_log_dir()?;
    init_with_file(&log_dir.join("pyrpc.log"))
}

/// Direct the log to `log_file`, truncating whatever a previous run left there
pub fn init_with_file(log_file: &Path) -> Result<(), String> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;
    }

    if log_file.exists() {
        fs::remove_file(log_file).map_err(|e| format!("Failed to truncate log file: {}", e))?;
    }

    let mut guard = LOG_FILE
        .lock()
        .map_err(|e| format!("Logger state poisoned: {}", e))?;
    *guard = Some(log_file.to_path_buf());
    Ok(())
}

fn get_log_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let log_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("pyrpc");

    #[cfg(target_os = "windows")]
    let log_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("pyrpc");

    Ok(log_dir)
}

fn write_to_log(message: &str) {
    let Ok(guard) = LOG_FILE.lock() else {
        return;
    };
    if let Some(ref log_path) = *guard {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let thread = std::thread::current();
            let thread_name = thread.name().unwrap_or("unnamed");
            let _ = writeln!(file, "[{}] [{}] {}", timestamp, thread_name, message);
        }
    }
}

/// Log an informational message (to console if verbose >= 1, always to file)
pub fn info(message: &str) {
    write_to_log(&format!("INFO {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{}", message);
    }
}

/// Log a debug message (to console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    write_to_log(&format!("DEBUG {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{} {}", "DEBUG:".blue().bold(), message);
    }
}

pub fn warn(message: &str) {
    write_to_log(&format!("WARN {}", message));
    if !get_quiet() {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }
}

pub fn error(message: &str) {
    write_to_log(&format!("ERROR {}", message));
    if !get_quiet() {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
}

/// User-facing confirmation
pub fn success(message: &str) {
    write_to_log(&format!("SUCCESS {}", message));
    if !get_quiet() {
        eprintln!("{} {}", "\u{2714}".green().bold(), message);
    }
}

/// Trace-level step (console only at -vv)
pub fn step(message: &str) {
    if get_verbosity() >= 2 {
        eprintln!("TRACE: {}", message);
    }
    write_to_log(&format!("STEP: {}", message));
}

pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}

pub fn show_log_path() {
    match get_log_path() {
        Some(path) => eprintln!("Log file: {}", path.display()),
        None => eprintln!("Log file location not available"),
    }
}
