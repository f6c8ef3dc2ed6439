//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory so project files can be patched
/// in place without touching the fixtures.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create an empty test environment.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Copy a fixture to `relative_path` and return its location.
  pub fn with_fixture(&self, name: &str, relative_path: &str) -> PathBuf {
    self.write_file(relative_path, &fixture_content(name))
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Read a file relative to the temp directory.
  pub fn read_file(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.path(relative_path)).unwrap()
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Get a Command for the csproj-patcher binary, logging disabled.
  pub fn patcher_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("csproj-patcher");
    cmd.env("RUST_LOG", "off");
    cmd.current_dir(self.temp.path());
    cmd
  }
}
