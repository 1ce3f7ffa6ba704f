//! Test utilities for kiln-lib.
//!
//! [`ScriptedRule`] is a rule kind whose existence and build time are fixed
//! up front, so staleness can be tested without touching the filesystem.
//! Every build is recorded in a shared [`BuildLog`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::rule::{BuildContext, MISSING_TIMESTAMP, RuleError, RuleKind, Timestamp};

/// Shared record of the builds performed by scripted rules.
#[derive(Debug, Clone, Default)]
pub struct BuildLog {
  entries: Arc<Mutex<Vec<BuildContext>>>,
}

impl BuildLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Primary target of every build, in the order they ran.
  pub fn built(&self) -> Vec<String> {
    self.entries.lock().unwrap().iter().map(|ctx| ctx.targets[0].clone()).collect()
  }

  /// Settings handed to the build of `target`.
  pub fn settings_for(&self, target: &str) -> Option<BTreeMap<String, Value>> {
    self
      .entries
      .lock()
      .unwrap()
      .iter()
      .find(|ctx| ctx.targets.iter().any(|t| t == target))
      .map(|ctx| ctx.settings.clone())
  }

  fn record(&self, ctx: &BuildContext) {
    self.entries.lock().unwrap().push(ctx.clone());
  }
}

#[derive(Debug, Clone)]
pub struct ScriptedRule {
  exists: bool,
  time: Timestamp,
  failure: Option<String>,
  delay: Option<Duration>,
  log: BuildLog,
}

impl ScriptedRule {
  /// Output does not exist.
  pub fn missing(log: &BuildLog) -> Self {
    Self {
      exists: false,
      time: MISSING_TIMESTAMP,
      failure: None,
      delay: None,
      log: log.clone(),
    }
  }

  /// Output exists and was built at `time`.
  pub fn built_at(time: Timestamp, log: &BuildLog) -> Self {
    Self {
      exists: true,
      time,
      ..Self::missing(log)
    }
  }

  /// Build fails with `message`.
  pub fn failing(mut self, message: &str) -> Self {
    self.failure = Some(message.to_string());
    self
  }

  /// Build sleeps for `delay` before finishing.
  pub fn slow(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }
}

impl RuleKind for ScriptedRule {
  fn kind_name(&self) -> &'static str {
    "scripted"
  }

  fn exists(&self, _targets: &[String]) -> bool {
    self.exists
  }

  fn last_build_time(&self, _targets: &[String]) -> Timestamp {
    self.time
  }

  fn build(&self, ctx: &BuildContext) -> Result<(), RuleError> {
    if let Some(delay) = self.delay {
      thread::sleep(delay);
    }
    if let Some(message) = &self.failure {
      return Err(RuleError::Recipe(message.clone()));
    }
    self.log.record(ctx);
    Ok(())
  }
}
