//! Types for build execution.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The groups of targets executed by one build, in order.
///
/// Targets within a group had all prerequisites satisfied when the group
/// started and do not depend on each other. Names within a group are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
  groups: Vec<Vec<String>>,
}

impl Trace {
  pub fn groups(&self) -> &[Vec<String>] {
    &self.groups
  }

  pub fn into_groups(self) -> Vec<Vec<String>> {
    self.groups
  }

  /// Number of groups.
  pub fn len(&self) -> usize {
    self.groups.len()
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }

  /// Number of target names built, aliases counted separately.
  pub fn target_count(&self) -> usize {
    self.groups.iter().map(Vec::len).sum()
  }

  /// Index of the group that built `target`.
  pub fn group_of(&self, target: &str) -> Option<usize> {
    self.groups.iter().position(|group| group.iter().any(|name| name == target))
  }

  pub fn contains(&self, target: &str) -> bool {
    self.group_of(target).is_some()
  }

  pub(crate) fn push_group(&mut self, mut group: Vec<String>) {
    group.sort();
    self.groups.push(group);
  }
}

impl<S: AsRef<str>> PartialEq<Vec<Vec<S>>> for Trace {
  fn eq(&self, other: &Vec<Vec<S>>) -> bool {
    self.groups.len() == other.len()
      && self
        .groups
        .iter()
        .zip(other)
        .all(|(ours, theirs)| ours.len() == theirs.len() && ours.iter().zip(theirs).all(|(a, b)| a == b.as_ref()))
  }
}

impl fmt::Display for Trace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let groups: Vec<String> = self.groups.iter().map(|group| format!("[{}]", group.join(", "))).collect();
    write!(f, "{}", groups.join(" -> "))
  }
}

/// Configuration for parallel execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of build actions running at once.
  pub parallelism: usize,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
