//! JSON build descriptions.
//!
//! A manifest lists setting values and rules. Registering it into an
//! [`Engine`] creates one rule per entry, with file-backed kinds resolving
//! their targets against the manifest's directory.
//!
//! # Example
//!
//! ```json
//! {
//!   "settings": { "cc": "gcc" },
//!   "rules": [
//!     { "targets": "app", "kind": "command", "command": "$KILN_SETTING_CC -o app main.o",
//!       "prerequisites": ["main.o"], "settings": ["cc"] },
//!     { "targets": "main.o", "kind": "command", "command": "$KILN_SETTING_CC -c main.c",
//!       "prerequisites": ["main.c"], "settings": ["cc"] },
//!     { "targets": "main.c" },
//!     { "targets": "all", "kind": "phony", "prerequisites": ["app"] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::BuildError;
use crate::rule::RuleKind;
use crate::rule::kinds::{CommandRule, FileRule, PhonyRule};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse build description: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("rule {target} of kind {kind} requires a command")]
  MissingCommand { target: String, kind: &'static str },

  #[error("rule {target} of kind file cannot have a command; use kind command")]
  UnexpectedCommand { target: String },

  #[error(transparent)]
  Build(#[from] BuildError),
}

/// One target name or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Targets {
  One(String),
  Many(Vec<String>),
}

impl Targets {
  pub fn names(&self) -> Vec<String> {
    match self {
      Targets::One(name) => vec![name.clone()],
      Targets::Many(names) => names.clone(),
    }
  }

  fn primary(&self) -> String {
    match self {
      Targets::One(name) => name.clone(),
      Targets::Many(names) => names.first().cloned().unwrap_or_default(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKindDef {
  /// Files that are touched when built.
  #[default]
  File,
  /// Never up to date; runs `command` if one is given.
  Phony,
  /// Files produced by `command`.
  Command,
}

impl RuleKindDef {
  fn as_str(self) -> &'static str {
    match self {
      RuleKindDef::File => "file",
      RuleKindDef::Phony => "phony",
      RuleKindDef::Command => "command",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
  pub targets: Targets,
  #[serde(default)]
  pub kind: RuleKindDef,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub command: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shell: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub prerequisites: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub settings: Vec<String>,
  #[serde(default)]
  pub force: bool,
}

impl RuleDef {
  /// Construct the rule kind, resolving file targets against `base_dir`.
  fn kind(&self, base_dir: &Path) -> Result<Arc<dyn RuleKind>, ManifestError> {
    let kind: Arc<dyn RuleKind> = match (self.kind, &self.command) {
      (RuleKindDef::File, None) => Arc::new(FileRule::new().in_dir(base_dir)),
      (RuleKindDef::File, Some(_)) => {
        return Err(ManifestError::UnexpectedCommand {
          target: self.targets.primary(),
        });
      }
      (RuleKindDef::Phony, None) => Arc::new(PhonyRule),
      (RuleKindDef::Phony, Some(command)) => Arc::new(self.with_shell(CommandRule::phony(command).in_dir(base_dir))),
      (RuleKindDef::Command, Some(command)) => Arc::new(self.with_shell(CommandRule::new(command).in_dir(base_dir))),
      (RuleKindDef::Command, None) => {
        return Err(ManifestError::MissingCommand {
          target: self.targets.primary(),
          kind: self.kind.as_str(),
        });
      }
    };
    Ok(kind)
  }

  fn with_shell(&self, rule: CommandRule) -> CommandRule {
    match &self.shell {
      Some(shell) => rule.with_shell(shell),
      None => rule,
    }
  }
}

/// A parsed build description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
  #[serde(default)]
  pub settings: BTreeMap<String, Value>,
  #[serde(default)]
  pub rules: Vec<RuleDef>,
}

impl Manifest {
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let manifest = Self::parse(&content)?;
    debug!(path = %path.display(), rules = manifest.rules.len(), "loaded build description");
    Ok(manifest)
  }

  pub fn parse(content: &str) -> Result<Self, ManifestError> {
    serde_json::from_str(content).map_err(ManifestError::Parse)
  }

  /// Register every rule into `engine`.
  ///
  /// All kinds are constructed before the first rule is registered, so an
  /// invalid entry leaves the engine untouched.
  pub fn register(&self, engine: &mut Engine, base_dir: &Path) -> Result<(), ManifestError> {
    let kinds = self
      .rules
      .iter()
      .map(|def| def.kind(base_dir))
      .collect::<Result<Vec<_>, _>>()?;

    for (def, kind) in self.rules.iter().zip(kinds) {
      let rule = engine.create_rule_shared(def.targets.names(), kind)?;
      for prerequisite in &def.prerequisites {
        rule.add_prerequisite(prerequisite);
      }
      for setting in &def.settings {
        rule.add_setting(setting);
      }
      rule.set_force_rebuild(def.force);
    }

    info!(rules = self.rules.len(), "registered build description");
    Ok(())
  }

  /// Copy the manifest's setting values into `engine`. Returns how many
  /// values changed.
  pub fn apply_settings(&self, engine: &mut Engine) -> usize {
    self
      .settings
      .iter()
      .filter(|(name, value)| engine.set_setting_value(name.as_str(), (*value).clone()))
      .count()
  }
}
