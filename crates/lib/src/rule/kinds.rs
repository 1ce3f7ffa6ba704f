//! Concrete rule kinds.
//!
//! - [`FileRule`]: outputs are files; building touches them.
//! - [`PhonyRule`]: never exists, building does nothing.
//! - [`RecipeRule`]: file outputs produced by a caller-supplied closure.
//! - [`CommandRule`]: file outputs produced by a shell command.
//!
//! Target names of file-backed kinds are paths, resolved against an optional
//! base directory.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, info};

use crate::consts::{PREREQUISITES_ENV, SETTING_ENV_PREFIX, TARGETS_ENV};
use crate::util::time::{MISSING_TIMESTAMP, Timestamp, modified_nanos};

use super::{BuildContext, RuleError, RuleKind};

/// Resolves target names to output paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Outputs {
  base_dir: Option<PathBuf>,
}

impl Outputs {
  fn path(&self, target: &str) -> PathBuf {
    match &self.base_dir {
      Some(base) => base.join(target),
      None => PathBuf::from(target),
    }
  }

  fn exist(&self, targets: &[String]) -> bool {
    targets.iter().all(|target| self.path(target).exists())
  }

  /// The oldest modification time among the outputs.
  fn last_build_time(&self, targets: &[String]) -> Timestamp {
    targets
      .iter()
      .map(|target| modified_nanos(&self.path(target)))
      .try_fold(Timestamp::MAX, |oldest, stamp| stamp.map(|stamp| oldest.min(stamp)))
      .filter(|_| !targets.is_empty())
      .unwrap_or(MISSING_TIMESTAMP)
  }

  fn check(&self, targets: &[String]) -> Result<(), RuleError> {
    match targets.iter().find(|target| !self.path(target).exists()) {
      Some(target) => Err(RuleError::PostconditionViolated { target: target.clone() }),
      None => Ok(()),
    }
  }

  fn touch(&self, targets: &[String]) -> Result<(), RuleError> {
    for target in targets {
      let path = self.path(target);
      if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
      {
        fs::create_dir_all(parent)?;
      }
      let file = OpenOptions::new().create(true).append(true).open(&path)?;
      file.set_modified(SystemTime::now())?;
      debug!(path = %path.display(), "touched output");
    }
    Ok(())
  }
}

/// Outputs are files that are created or touched when built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRule {
  outputs: Outputs,
}

impl FileRule {
  pub fn new() -> Self {
    Self::default()
  }

  /// Resolve target paths relative to `dir`.
  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.outputs.base_dir = Some(dir.into());
    self
  }
}

impl RuleKind for FileRule {
  fn kind_name(&self) -> &'static str {
    "file"
  }

  fn exists(&self, targets: &[String]) -> bool {
    self.outputs.exist(targets)
  }

  fn last_build_time(&self, targets: &[String]) -> Timestamp {
    self.outputs.last_build_time(targets)
  }

  fn build(&self, ctx: &BuildContext) -> Result<(), RuleError> {
    self.outputs.touch(&ctx.targets)
  }
}

/// A target that always needs building and whose build does nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhonyRule;

impl RuleKind for PhonyRule {
  fn kind_name(&self) -> &'static str {
    "phony"
  }

  fn exists(&self, _targets: &[String]) -> bool {
    false
  }

  fn build(&self, _ctx: &BuildContext) -> Result<(), RuleError> {
    Ok(())
  }
}

type Recipe = dyn Fn(&BuildContext) -> Result<(), RuleError> + Send + Sync;

/// File outputs produced by a closure.
///
/// After the closure returns successfully every output must exist.
#[derive(Clone)]
pub struct RecipeRule {
  outputs: Outputs,
  recipe: Arc<Recipe>,
}

impl RecipeRule {
  pub fn new<F>(recipe: F) -> Self
  where
    F: Fn(&BuildContext) -> Result<(), RuleError> + Send + Sync + 'static,
  {
    Self {
      outputs: Outputs::default(),
      recipe: Arc::new(recipe),
    }
  }

  /// Resolve target paths relative to `dir`.
  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.outputs.base_dir = Some(dir.into());
    self
  }
}

impl fmt::Debug for RecipeRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RecipeRule").field("outputs", &self.outputs).finish_non_exhaustive()
  }
}

impl RuleKind for RecipeRule {
  fn kind_name(&self) -> &'static str {
    "recipe"
  }

  fn exists(&self, targets: &[String]) -> bool {
    self.outputs.exist(targets)
  }

  fn last_build_time(&self, targets: &[String]) -> Timestamp {
    self.outputs.last_build_time(targets)
  }

  fn build(&self, ctx: &BuildContext) -> Result<(), RuleError> {
    (self.recipe)(ctx)?;
    self.outputs.check(&ctx.targets)
  }
}

/// Outputs produced by running a shell command.
///
/// The command runs in the rule's directory with the target names,
/// prerequisite names and declared settings exported as environment variables.
/// A phony command rule never exists and skips the output check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRule {
  command: String,
  outputs: Outputs,
  shell: Option<String>,
  phony: bool,
}

impl CommandRule {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
      outputs: Outputs::default(),
      shell: None,
      phony: false,
    }
  }

  /// A command whose targets are not files.
  pub fn phony(command: impl Into<String>) -> Self {
    Self {
      phony: true,
      ..Self::new(command)
    }
  }

  /// Run in `dir` and resolve target paths relative to it.
  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.outputs.base_dir = Some(dir.into());
    self
  }

  /// Use `shell` instead of the platform default.
  pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
    self.shell = Some(shell.into());
    self
  }

  pub fn command(&self) -> &str {
    &self.command
  }
}

impl RuleKind for CommandRule {
  fn kind_name(&self) -> &'static str {
    if self.phony { "phony-command" } else { "command" }
  }

  fn exists(&self, targets: &[String]) -> bool {
    !self.phony && self.outputs.exist(targets)
  }

  fn last_build_time(&self, targets: &[String]) -> Timestamp {
    if self.phony {
      return MISSING_TIMESTAMP;
    }
    self.outputs.last_build_time(targets)
  }

  fn build(&self, ctx: &BuildContext) -> Result<(), RuleError> {
    info!(cmd = %self.command, "executing command");

    let (shell_cmd, shell_args) = get_shell(self.shell.as_deref());

    let mut command = Command::new(&shell_cmd);
    command
      .args(&shell_args)
      .arg(&self.command)
      .env(TARGETS_ENV, ctx.targets.join(" "))
      .env(PREREQUISITES_ENV, ctx.prerequisites.join(" "));

    if let Some(dir) = &self.outputs.base_dir {
      command.current_dir(dir);
    }

    for (name, value) in &ctx.settings {
      command.env(setting_env_name(name), setting_env_value(value));
    }

    debug!(shell = %shell_cmd, "spawning process");
    let output = command.output()?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(RuleError::CmdFailed {
        cmd: self.command.clone(),
        code: output.status.code(),
      });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
      debug!(stdout = %stdout.trim(), "command output");
    }

    if self.phony {
      return Ok(());
    }
    self.outputs.check(&ctx.targets)
  }
}

/// Environment variable carrying the value of setting `name`.
///
/// Characters that are not ASCII alphanumerics become underscores.
pub fn setting_env_name(name: &str) -> String {
  let suffix: String = name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
    .collect();
  format!("{}{}", SETTING_ENV_PREFIX, suffix)
}

/// Strings are exported verbatim, everything else as JSON text.
fn setting_env_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Get the shell command and arguments for the current platform.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}
