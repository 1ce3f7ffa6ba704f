//! Shared helpers for file-backed build scenarios.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use kiln_lib::rule::kinds::FileRule;
use kiln_lib::{BuildError, Engine, Trace};
use serde_json::Value;
use tempfile::TempDir;

/// Pause long enough for the next file write or setting change to carry a
/// strictly later stamp.
const TICK: Duration = Duration::from_millis(20);

/// An engine whose file rules live in a private directory.
pub struct Workspace {
  pub temp: TempDir,
  pub engine: Engine,
}

impl Workspace {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      engine: Engine::new(),
    }
  }

  pub fn path(&self, name: &str) -> PathBuf {
    self.temp.path().join(name)
  }

  /// Register a file rule for `name` with the given prerequisites.
  pub fn file(&mut self, name: &str, prerequisites: &[&str]) {
    let rule = self
      .engine
      .create_rule(name, FileRule::new().in_dir(self.temp.path()))
      .unwrap();
    for prerequisite in prerequisites {
      rule.add_prerequisite(*prerequisite);
    }
  }

  /// Create or update `name`, then wait one tick.
  pub fn touch(&self, name: &str) {
    OpenOptions::new()
      .create(true)
      .append(true)
      .open(self.path(name))
      .unwrap()
      .set_modified(std::time::SystemTime::now())
      .unwrap();
    thread::sleep(TICK);
  }

  /// Set a setting, then wait one tick.
  pub fn set(&mut self, name: &str, value: impl Into<Value>) {
    self.engine.set_setting_value(name, value);
    thread::sleep(TICK);
  }

  pub fn build(&self, target: &str) -> Result<Trace, BuildError> {
    self.engine.build(target)
  }
}
