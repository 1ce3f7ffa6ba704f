//! Rules and the capability interface of rule kinds.
//!
//! A [`Rule`] owns one or more target names, the prerequisites and settings
//! those targets depend on, and a [`RuleKind`] deciding how the outputs are
//! checked and produced. All names owned by one rule are aliases: they share
//! one plan node and are built together.

pub mod kinds;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use crate::util::time::{MISSING_TIMESTAMP, Timestamp};

/// Handle to a rule inside a [`RuleRegistry`](crate::registry::RuleRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) usize);

/// Errors raised by a rule kind's build action.
#[derive(Debug, Error)]
pub enum RuleError {
  /// I/O error while producing outputs.
  #[error("io error: {0}")]
  Io(#[from] io::Error),

  /// Command execution failed.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// The build action succeeded but did not produce its output.
  #[error("{target} does not exist after a successful build")]
  PostconditionViolated { target: String },

  /// A caller-supplied recipe reported a failure.
  #[error("{0}")]
  Recipe(String),
}

/// Everything a build action receives.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildContext {
  /// All names owned by the rule being built.
  pub targets: Vec<String>,
  /// Prerequisite names, all already satisfied.
  pub prerequisites: Vec<String>,
  /// Values of the settings the rule declared, and only those.
  pub settings: BTreeMap<String, Value>,
}

/// How a kind of rule checks and produces its outputs.
///
/// Implementations are shared across worker threads by the parallel executor.
pub trait RuleKind: fmt::Debug + Send + Sync {
  /// Short name used in logs and plan listings.
  fn kind_name(&self) -> &'static str;

  /// Whether the outputs named by `targets` currently exist.
  fn exists(&self, targets: &[String]) -> bool;

  /// When the outputs were last built, or [`MISSING_TIMESTAMP`].
  fn last_build_time(&self, _targets: &[String]) -> Timestamp {
    MISSING_TIMESTAMP
  }

  /// Produce the outputs.
  fn build(&self, ctx: &BuildContext) -> Result<(), RuleError>;
}

/// A build unit owning one or more target names.
#[derive(Debug, Clone)]
pub struct Rule {
  id: RuleId,
  names: Vec<String>,
  prerequisites: BTreeSet<String>,
  settings: BTreeSet<String>,
  force_rebuild: bool,
  kind: Arc<dyn RuleKind>,
}

impl Rule {
  pub(crate) fn new(id: RuleId, names: Vec<String>, kind: Arc<dyn RuleKind>) -> Self {
    Self {
      id,
      names,
      prerequisites: BTreeSet::new(),
      settings: BTreeSet::new(),
      force_rebuild: false,
      kind,
    }
  }

  pub fn id(&self) -> RuleId {
    self.id
  }

  /// Target names in registration order. Never empty.
  pub fn names(&self) -> &[String] {
    &self.names
  }

  /// The first registered name.
  pub fn primary_name(&self) -> &str {
    &self.names[0]
  }

  pub fn prerequisites(&self) -> &BTreeSet<String> {
    &self.prerequisites
  }

  pub fn declared_settings(&self) -> &BTreeSet<String> {
    &self.settings
  }

  pub fn force_rebuild(&self) -> bool {
    self.force_rebuild
  }

  pub fn kind_name(&self) -> &'static str {
    self.kind.kind_name()
  }

  pub fn add_prerequisite(&mut self, name: impl Into<String>) -> &mut Self {
    self.prerequisites.insert(name.into());
    self
  }

  pub fn add_setting(&mut self, name: impl Into<String>) -> &mut Self {
    self.settings.insert(name.into());
    self
  }

  pub fn set_force_rebuild(&mut self, force_rebuild: bool) -> &mut Self {
    self.force_rebuild = force_rebuild;
    self
  }

  pub fn exists(&self) -> bool {
    self.kind.exists(&self.names)
  }

  pub fn last_build_time(&self) -> Timestamp {
    self.kind.last_build_time(&self.names)
  }

  /// Run the build action with the given setting values.
  pub fn build(&self, settings: BTreeMap<String, Value>) -> Result<(), RuleError> {
    self.kind.build(&self.context(settings))
  }

  pub(crate) fn context(&self, settings: BTreeMap<String, Value>) -> BuildContext {
    BuildContext {
      targets: self.names.clone(),
      prerequisites: self.prerequisites.iter().cloned().collect(),
      settings,
    }
  }

  pub(crate) fn shared_kind(&self) -> Arc<dyn RuleKind> {
    Arc::clone(&self.kind)
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let prerequisites: Vec<&str> = self.prerequisites.iter().map(String::as_str).collect();
    write!(f, "Rule[{}: {}]", self.names.join(", "), prerequisites.join(", "))
  }
}

/// Conversion of the accepted target-name shapes into a list of names.
///
/// A single string is shorthand for a one-element list.
pub trait IntoTargets {
  fn into_targets(self) -> Vec<String>;
}

impl IntoTargets for &str {
  fn into_targets(self) -> Vec<String> {
    vec![self.to_string()]
  }
}

impl IntoTargets for String {
  fn into_targets(self) -> Vec<String> {
    vec![self]
  }
}

impl IntoTargets for &String {
  fn into_targets(self) -> Vec<String> {
    vec![self.clone()]
  }
}

impl IntoTargets for Vec<String> {
  fn into_targets(self) -> Vec<String> {
    self
  }
}

impl IntoTargets for Vec<&str> {
  fn into_targets(self) -> Vec<String> {
    self.into_iter().map(str::to_string).collect()
  }
}

impl IntoTargets for &[&str] {
  fn into_targets(self) -> Vec<String> {
    self.iter().map(|name| name.to_string()).collect()
  }
}

impl IntoTargets for &[String] {
  fn into_targets(self) -> Vec<String> {
    self.to_vec()
  }
}

impl<const N: usize> IntoTargets for [&str; N] {
  fn into_targets(self) -> Vec<String> {
    self.iter().map(|name| name.to_string()).collect()
  }
}
