//! Crate-level error type.
//!
//! Configuration errors (`DuplicateTarget`, `NoSuchRule`, `CyclicDependency`,
//! `NoSuchSetting`) are raised before any build action runs. Execution errors
//! abort the remaining schedule.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::execute::Trace;
use crate::rule::RuleError;
use crate::settings::SettingsError;

/// Errors raised while registering rules or building targets.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A target name is already owned by another rule.
  #[error("trying to add a duplicate rule: {0}")]
  DuplicateTarget(String),

  /// A rule was created without any target names.
  #[error("a rule must own at least one target")]
  EmptyRule,

  /// A build target or prerequisite references an unregistered name.
  #[error("no rule to build {0}")]
  NoSuchRule(String),

  /// A target transitively depends on itself.
  #[error("cyclic dependency detected for {target}: {}", path.join(" -> "))]
  CyclicDependency {
    /// The target that was re-entered.
    target: String,
    /// The visit path from the root, ending with `target`.
    path: Vec<String>,
  },

  /// A rule declares a setting that was never given a value.
  #[error("no setting named {0}")]
  NoSuchSetting(String),

  /// A rule's build action failed; no further groups were started.
  #[error("failed to build {}: {source}", targets.join(", "))]
  BuildActionFailed {
    /// Names owned by the failed rule(s).
    targets: Vec<String>,
    /// Groups that completed before the failing group.
    completed: Trace,
    /// The first failure reported by a rule.
    #[source]
    source: RuleError,
  },

  /// A parallel build task panicked or was cancelled.
  #[error("build task failed: {0}")]
  TaskFailed(String),

  /// The dot graph could not be written.
  #[error("failed to write graph to {path}: {source}")]
  Export {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Settings could not be loaded or saved.
  #[error(transparent)]
  Settings(#[from] SettingsError),
}

impl BuildError {
  /// Returns true for errors detected before any build action ran.
  pub fn is_configuration_error(&self) -> bool {
    matches!(
      self,
      BuildError::DuplicateTarget(_)
        | BuildError::EmptyRule
        | BuildError::NoSuchRule(_)
        | BuildError::CyclicDependency { .. }
        | BuildError::NoSuchSetting(_)
    )
  }
}
