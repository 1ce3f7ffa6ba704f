//! Loading a build description into an engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use kiln_lib::consts::DEFAULT_SETTINGS_FILENAME;
use kiln_lib::{Engine, Manifest, SettingsStore};

/// A build description registered into an engine, with its settings file.
pub struct Project {
  pub engine: Engine,
  pub manifest: Manifest,
  pub settings_path: PathBuf,
}

impl Project {
  /// Load the build description at `file` and the settings it builds with.
  ///
  /// Rule targets resolve against the directory holding `file`.
  pub fn open(file: &Path, settings: Option<&Path>) -> Result<Self> {
    let manifest_path =
      dunce::canonicalize(file).with_context(|| format!("Build description not found: {}", file.display()))?;
    let root = manifest_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    let manifest = Manifest::load(&manifest_path)
      .with_context(|| format!("Failed to load build description: {}", manifest_path.display()))?;

    let settings_path = settings_path(&manifest_path, settings);
    let store = SettingsStore::load_or_default(&settings_path)
      .with_context(|| format!("Failed to load settings: {}", settings_path.display()))?;
    debug!(path = %settings_path.display(), settings = store.len(), "loaded settings");

    let mut engine = Engine::with_settings(store);
    manifest
      .register(&mut engine, &root)
      .with_context(|| format!("Invalid build description: {}", manifest_path.display()))?;

    Ok(Self {
      engine,
      manifest,
      settings_path,
    })
  }

  /// Copy the description's setting values into the engine.
  pub fn apply_manifest_settings(&mut self) -> usize {
    let changed = self.manifest.apply_settings(&mut self.engine);
    if changed > 0 {
      info!(changed, "settings updated from build description");
    }
    changed
  }

  pub fn save_settings(&self) -> Result<()> {
    self
      .engine
      .save_settings(&self.settings_path)
      .with_context(|| format!("Failed to save settings: {}", self.settings_path.display()))
  }
}

/// The explicit settings path, or the default file next to `file`.
pub fn settings_path(file: &Path, settings: Option<&Path>) -> PathBuf {
  if let Some(path) = settings {
    return path.to_path_buf();
  }
  let dir = file
    .parent()
    .filter(|parent| !parent.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new("."));
  dir.join(DEFAULT_SETTINGS_FILENAME)
}
