//! Implementation of the `kiln set` command.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use kiln_lib::{Manifest, SettingsStore};

use crate::output::{print_info, print_success, print_warning};
use crate::project::settings_path;

/// Parse `raw` as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
  serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Set a setting value and persist it.
///
/// Rules declaring the setting rebuild on their next build only if the value
/// actually changed.
pub fn cmd_set(file: &Path, settings: Option<&Path>, name: &str, raw: &str) -> Result<()> {
  let path = settings_path(file, settings);
  let mut store =
    SettingsStore::load_or_default(&path).with_context(|| format!("Failed to load settings: {}", path.display()))?;

  let value = parse_value(raw);
  if !store.set(name, value.clone()) {
    print_info(&format!("{} is already {}", name, value));
    return Ok(());
  }

  store
    .save(&path)
    .with_context(|| format!("Failed to save settings: {}", path.display()))?;
  print_success(&format!("{} = {}", name, value));

  if let Ok(manifest) = Manifest::load(file)
    && manifest.settings.contains_key(name)
  {
    print_warning(&format!(
      "{} is also set in {}; the next build will restore that value",
      name,
      file.display()
    ));
  }
  Ok(())
}
