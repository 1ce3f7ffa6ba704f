//! Rule registration.
//!
//! Rules live in an arena; every target name maps to the [`RuleId`] of the
//! rule that owns it, so all aliases of a multi-target rule resolve to the
//! same rule.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::BuildError;
use crate::rule::{IntoTargets, Rule, RuleId, RuleKind};

#[derive(Debug, Default)]
pub struct RuleRegistry {
  rules: Vec<Rule>,
  by_name: HashMap<String, RuleId>,
}

impl RuleRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a rule owning `names`.
  ///
  /// Fails with `DuplicateTarget` if any name already belongs to a rule; in
  /// that case nothing is registered. Repeated names within `names` are
  /// collapsed.
  pub fn create_rule(&mut self, names: impl IntoTargets, kind: impl RuleKind + 'static) -> Result<&mut Rule, BuildError> {
    self.create_rule_shared(names, Arc::new(kind))
  }

  /// Like [`RuleRegistry::create_rule`] for a kind that is already shared.
  pub fn create_rule_shared(
    &mut self,
    names: impl IntoTargets,
    kind: Arc<dyn RuleKind>,
  ) -> Result<&mut Rule, BuildError> {
    let mut unique: Vec<String> = Vec::new();
    for name in names.into_targets() {
      if !unique.contains(&name) {
        unique.push(name);
      }
    }

    if unique.is_empty() {
      return Err(BuildError::EmptyRule);
    }
    if let Some(taken) = unique.iter().find(|name| self.by_name.contains_key(*name)) {
      return Err(BuildError::DuplicateTarget(taken.clone()));
    }

    let id = RuleId(self.rules.len());
    for name in &unique {
      self.by_name.insert(name.clone(), id);
    }
    debug!(targets = %unique.join(", "), kind = kind.kind_name(), "registered rule");
    self.rules.push(Rule::new(id, unique, kind));

    Ok(&mut self.rules[id.0])
  }

  /// The rule owning `name`.
  pub fn lookup(&self, name: &str) -> Result<&Rule, BuildError> {
    self
      .resolve(name)
      .map(|id| &self.rules[id.0])
      .ok_or_else(|| BuildError::NoSuchRule(name.to_string()))
  }

  pub fn lookup_mut(&mut self, name: &str) -> Result<&mut Rule, BuildError> {
    match self.resolve(name) {
      Some(id) => Ok(&mut self.rules[id.0]),
      None => Err(BuildError::NoSuchRule(name.to_string())),
    }
  }

  /// The id of the rule owning `name`, if any.
  pub fn resolve(&self, name: &str) -> Option<RuleId> {
    self.by_name.get(name).copied()
  }

  pub fn get(&self, id: RuleId) -> Option<&Rule> {
    self.rules.get(id.0)
  }

  pub fn get_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
    self.rules.get_mut(id.0)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.by_name.contains_key(name)
  }

  /// Number of rules (not target names).
  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// All rules in registration order.
  pub fn iter(&self) -> impl Iterator<Item = &Rule> {
    self.rules.iter()
  }
}
