//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
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

/// Isolated project directory holding a `kiln.json`.
pub struct TestEnv {
  pub temp: TempDir,
  pub manifest_path: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file, copied to `kiln.json`.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let manifest_path = temp.path().join("kiln.json");
    std::fs::write(&manifest_path, fixture_content(name)).unwrap();
    Self { temp, manifest_path }
  }

  /// Path relative to the project directory.
  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn read_file(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.path(relative_path)).unwrap()
  }

  /// Rewrite a file after a pause so its mtime is strictly newer than
  /// anything written before.
  pub fn touch_later(&self, relative_path: &str, content: &str) {
    thread::sleep(Duration::from_millis(50));
    self.write_file(relative_path, content);
  }

  /// Get a Command for the kiln binary running in the project directory.
  ///
  /// Clears `KILN_SETTINGS` and `RUST_LOG` so the caller's environment does
  /// not leak into the test.
  pub fn kiln_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("kiln");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("KILN_SETTINGS");
    cmd.env_remove("RUST_LOG");
    cmd
  }

  /// Run `kiln build <target> --json` with extra arguments and return the
  /// trace groups.
  pub fn build_trace(&self, target: &str, extra: &[&str]) -> Vec<Vec<String>> {
    let output = self
      .kiln_cmd()
      .args(["build", target, "--json"])
      .args(extra)
      .output()
      .unwrap();
    assert!(
      output.status.success(),
      "build failed: {}",
      String::from_utf8_lossy(&output.stderr)
    );

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    serde_json::from_value(report["trace"].clone()).unwrap()
  }
}

/// Shorthand for building expected traces.
pub fn trace(groups: &[&[&str]]) -> Vec<Vec<String>> {
  groups
    .iter()
    .map(|group| group.iter().map(|name| name.to_string()).collect())
    .collect()
}
