//! Implementation of the `kiln settings` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use serde_json::Value;

use kiln_lib::SettingsStore;

use crate::output::{format_stamp, print_info, print_json};
use crate::project::settings_path;

#[derive(Serialize)]
struct SettingEntry<'a> {
  name: &'a str,
  value: &'a Value,
  changed: i64,
}

/// List persisted settings with the time of their last change.
pub fn cmd_settings(file: &Path, settings: Option<&Path>, json: bool) -> Result<()> {
  let path = settings_path(file, settings);
  let store =
    SettingsStore::load_or_default(&path).with_context(|| format!("Failed to load settings: {}", path.display()))?;

  let entries: Vec<SettingEntry<'_>> = store
    .iter()
    .map(|(name, value, changed)| SettingEntry { name, value, changed })
    .collect();

  if json {
    return print_json(&entries);
  }

  if entries.is_empty() {
    print_info(&format!("No settings in {}", path.display()));
    return Ok(());
  }

  for entry in &entries {
    println!(
      "{} = {} {}",
      entry.name,
      entry.value,
      format!("(changed {})", format_stamp(entry.changed)).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  Ok(())
}
