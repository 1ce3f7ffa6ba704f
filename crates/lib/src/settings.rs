//! Versioned key/value settings.
//!
//! Every write that changes a value records the time of the change. Targets
//! that declare a setting are rebuilt when the setting changed after their last
//! build, so writing an equal value keeps the previous stamp.
//!
//! # Storage Layout
//!
//! ```text
//! {
//!   "values":     { "<name>": <json value>, ... },
//!   "timestamps": { "<name>": <nanoseconds since epoch>, ... }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::BuildError;
use crate::util::time::{MISSING_TIMESTAMP, Timestamp, now_nanos};

/// Errors raised while persisting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to create settings directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read settings file: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write settings file: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse settings file: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize settings: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Setting values together with the stamp of their most recent change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsStore {
  #[serde(default)]
  values: BTreeMap<String, Value>,
  #[serde(default)]
  timestamps: BTreeMap<String, Timestamp>,
}

impl SettingsStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `value` under `name`.
  ///
  /// Does nothing if the stored value is already equal. Otherwise the value
  /// is replaced and stamped with a time later than every stamp in the store.
  /// Returns whether the value changed.
  pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
    let name = name.into();
    let value = value.into();

    if self.values.get(&name) == Some(&value) {
      debug!(setting = %name, "setting unchanged");
      return false;
    }

    let stamp = self.next_stamp();
    debug!(setting = %name, stamp, "setting changed");
    self.values.insert(name.clone(), value);
    self.timestamps.insert(name, stamp);
    true
  }

  /// Current value of `name`.
  pub fn get(&self, name: &str) -> Result<&Value, BuildError> {
    self
      .values
      .get(name)
      .ok_or_else(|| BuildError::NoSuchSetting(name.to_string()))
  }

  pub fn exists(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  /// Stamp of the last change to `name`, or `-1` if it was never set.
  pub fn last_changed(&self, name: &str) -> Timestamp {
    self.timestamps.get(name).copied().unwrap_or(MISSING_TIMESTAMP)
  }

  /// Values for the given names, failing on the first unknown one.
  pub fn values_for<'a>(
    &self,
    names: impl IntoIterator<Item = &'a String>,
  ) -> Result<BTreeMap<String, Value>, BuildError> {
    names
      .into_iter()
      .map(|name| Ok((name.clone(), self.get(name)?.clone())))
      .collect()
  }

  /// Iterate `(name, value, stamp)` in name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value, Timestamp)> {
    self
      .values
      .iter()
      .map(|(name, value)| (name.as_str(), value, self.last_changed(name)))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Write the store to `path` as JSON.
  ///
  /// Writes to a sibling `.tmp` file first, then renames it over `path`.
  pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(SettingsError::CreateDir)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = Path::new(&temp_name);

    let content = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
    fs::write(temp_path, &content).map_err(SettingsError::Write)?;
    fs::rename(temp_path, path).map_err(SettingsError::Write)?;

    debug!(path = %path.display(), count = self.len(), "saved settings");
    Ok(())
  }

  /// Read a store previously written by [`SettingsStore::save`].
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    let content = fs::read_to_string(path).map_err(SettingsError::Read)?;
    let store: SettingsStore = serde_json::from_str(&content).map_err(SettingsError::Parse)?;
    debug!(path = %path.display(), count = store.len(), "loaded settings");
    Ok(store)
  }

  /// Like [`SettingsStore::load`], but a missing file yields an empty store.
  pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
    match Self::load(path) {
      Err(SettingsError::Read(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
      other => other,
    }
  }

  fn next_stamp(&self) -> Timestamp {
    let latest = self.timestamps.values().copied().max().unwrap_or(MISSING_TIMESTAMP);
    // Saturates at `i64::MAX` so a maximal stored stamp cannot wrap.
    now_nanos().max(latest.saturating_add(1))
  }
}
