//! Integration tests for the pyrpc binary

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[cfg(unix)]
const EXECUTABLE_NAME: &str = "pyrpc";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "pyrpc.exe";

const TOOLS_MODULE: &str = r#"
def greet(name, punctuation="!"):
    return "hello " + name + punctuation


def explode():
    raise RuntimeError("tools exploded")
"#;

/// Isolated home directory with its own config file and log
struct Harness {
    home: TempDir,
    config_path: PathBuf,
}

impl Harness {
    fn new() -> io::Result<Self> {
        let home = TempDir::new()?;
        let config_path = home.path().join(".config").join("pyrpc").join("pyrpc.toml");
        Ok(Self { home, config_path })
    }

    /// Harness whose config adds a directory holding `tools.py` to `sys.path`
    fn with_tools_module() -> io::Result<Self> {
        let harness = Self::new()?;
        let tools_dir = harness.home.path().join("tools");
        fs::create_dir_all(&tools_dir)?;
        fs::write(tools_dir.join("tools.py"), TOOLS_MODULE)?;
        harness.write_config(&format!(
            "python-paths = [\"{}\"]\n",
            tools_dir.to_string_lossy().replace('\\', "\\\\")
        ))?;
        Ok(harness)
    }

    fn write_config(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, contents)
    }

    fn home_path(&self) -> &Path {
        self.home.path()
    }

    fn command(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("pyrpc");
        cmd.env("HOME", self.home_path());
        cmd.env("PYRPC_CONFIG", &self.config_path);
        cmd.arg("--log-file").arg(self.home_path().join("pyrpc.log"));
        cmd
    }
}

#[test]
fn test_version() -> io::Result<()> {
    Harness::new()?
        .command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pyrpc"));
    Ok(())
}

#[test]
fn test_help() -> io::Result<()> {
    Harness::new()?
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pyrpc runs Python functions"));
    Ok(())
}

#[test]
fn test_call_help() -> io::Result<()> {
    Harness::new()?
        .command()
        .args(["call", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Usage: {} call",
            EXECUTABLE_NAME
        )));
    Ok(())
}

#[test]
fn test_invalid_command() -> io::Result<()> {
    Harness::new()?.command().arg("invalid").assert().failure();
    Ok(())
}

#[test]
fn test_config_no_action() -> io::Result<()> {
    Harness::new()?
        .command()
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn test_config_show_defaults() -> io::Result<()> {
    Harness::new()?
        .command()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration:"))
        .stdout(predicate::str::contains("pyrpc_internal"))
        .stdout(predicate::str::contains("slow-lock-warn-ms"));
    Ok(())
}

#[test]
fn test_config_path_follows_env() -> io::Result<()> {
    let harness = Harness::new()?;
    harness
        .command()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            harness.config_path.to_string_lossy().to_string(),
        ));
    Ok(())
}

#[test]
fn test_config_set_persists() -> io::Result<()> {
    let harness = Harness::new()?;
    harness
        .command()
        .args(["config", "set", "slow-lock-warn-ms", "250"])
        .assert()
        .success();

    let written = fs::read_to_string(&harness.config_path)?;
    assert!(written.contains("slow-lock-warn-ms = 250"), "{}", written);

    harness
        .command()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("250"));
    Ok(())
}

#[test]
fn test_config_set_rejects_unknown_key() -> io::Result<()> {
    let harness = Harness::new()?;
    harness
        .command()
        .args(["config", "set", "cache-path", "/tmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key: cache-path"));
    assert!(!harness.config_path.exists());
    Ok(())
}

#[test]
fn test_config_set_rejects_bad_value() -> io::Result<()> {
    Harness::new()?
        .command()
        .args(["config", "set", "install-builtin-module", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected true or false"));
    Ok(())
}

#[test]
fn test_check_lists_entry_points() -> io::Result<()> {
    Harness::new()?
        .command()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("pyrpc_internal"))
        .stdout(predicate::str::contains("_run_function"))
        .stdout(predicate::str::contains("_load_return_value"))
        .stdout(predicate::str::contains("serialize"))
        .stdout(predicate::str::contains("_handle_exception"));
    Ok(())
}

#[test]
fn test_check_missing_module_fails() -> io::Result<()> {
    let harness = Harness::new()?;
    harness.write_config("module-path = \"pyrpc_missing_module\"\ninstall-builtin-module = false\n")?;
    harness
        .command()
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("pyrpc_missing_module"));
    Ok(())
}

#[test]
fn test_call_builtin_function() -> io::Result<()> {
    Harness::new()?
        .command()
        .args(["call", "operator:add", "[2, 3]"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));
    Ok(())
}

#[test]
fn test_call_module_from_python_paths() -> io::Result<()> {
    Harness::with_tools_module()?
        .command()
        .args(["call", "tools:greet", "[\"rpc\"]", "--kwargs", "{\"punctuation\": \"?\"}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'hello rpc?'"));
    Ok(())
}

#[test]
fn test_call_reports_remote_exception() -> io::Result<()> {
    Harness::with_tools_module()?
        .command()
        .args(["call", "tools:explode"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Remote call failed"))
        .stderr(predicate::str::contains("tools exploded"))
        .stderr(predicate::str::contains("Exception handler re-raised"));
    Ok(())
}

#[test]
fn test_call_rejects_malformed_target() -> io::Result<()> {
    Harness::new()?
        .command()
        .args(["call", "operator.add", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected module:function"));
    Ok(())
}

#[test]
fn test_call_rejects_non_array_arguments() -> io::Result<()> {
    Harness::new()?
        .command()
        .args(["call", "operator:add", "{\"a\": 1}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a JSON array"));
    Ok(())
}
