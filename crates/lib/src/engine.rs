//! The build engine: rules, settings, and build entry points.
//!
//! An [`Engine`] owns the rule registry and the settings store for the
//! lifetime of a build session. Every call to [`Engine::build`] computes a
//! fresh [`Plan`] and [`Trace`]; nothing from one build carries into the next
//! except what the rules observe on disk and the settings stamps.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::BuildError;
use crate::execute::{self, ExecuteConfig, Trace};
use crate::export::{self, RenameFn};
use crate::graph::{GraphBuilder, Plan};
use crate::registry::RuleRegistry;
use crate::rule::{IntoTargets, Rule, RuleId, RuleKind};
use crate::settings::SettingsStore;

/// Where and how to write the dot graph of each build.
pub struct GraphExport {
  pub path: PathBuf,
  pub rename: Option<Arc<RenameFn>>,
}

impl fmt::Debug for GraphExport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GraphExport")
      .field("path", &self.path)
      .field("rename", &self.rename.is_some())
      .finish()
  }
}

#[derive(Debug, Default)]
pub struct Engine {
  registry: RuleRegistry,
  settings: SettingsStore,
  graph_export: Option<GraphExport>,
}

impl Engine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from an existing settings store.
  pub fn with_settings(settings: SettingsStore) -> Self {
    Self {
      settings,
      ..Self::default()
    }
  }

  pub fn registry(&self) -> &RuleRegistry {
    &self.registry
  }

  pub fn settings(&self) -> &SettingsStore {
    &self.settings
  }

  pub fn settings_mut(&mut self) -> &mut SettingsStore {
    &mut self.settings
  }

  /// Register a rule owning `names`. See [`RuleRegistry::create_rule`].
  pub fn create_rule(&mut self, names: impl IntoTargets, kind: impl RuleKind + 'static) -> Result<&mut Rule, BuildError> {
    self.registry.create_rule(names, kind)
  }

  /// Register a rule whose kind is already shared.
  pub fn create_rule_shared(
    &mut self,
    names: impl IntoTargets,
    kind: Arc<dyn RuleKind>,
  ) -> Result<&mut Rule, BuildError> {
    self.registry.create_rule_shared(names, kind)
  }

  pub fn rule(&self, target: &str) -> Result<&Rule, BuildError> {
    self.registry.lookup(target)
  }

  pub fn rule_mut(&mut self, target: &str) -> Result<&mut Rule, BuildError> {
    self.registry.lookup_mut(target)
  }

  /// Make `target` depend on `prerequisite`.
  ///
  /// The prerequisite does not have to be registered yet; unknown names are
  /// reported when a build reaches them.
  pub fn add_prerequisite(&mut self, target: &str, prerequisite: impl Into<String>) -> Result<(), BuildError> {
    self.rule_mut(target)?.add_prerequisite(prerequisite);
    Ok(())
  }

  /// Make `target` depend on the primary name of another rule.
  pub fn add_prerequisite_rule(&mut self, target: &str, prerequisite: RuleId) -> Result<(), BuildError> {
    let name = self
      .registry
      .get(prerequisite)
      .map(|rule| rule.primary_name().to_string())
      .ok_or_else(|| BuildError::NoSuchRule(format!("{prerequisite:?}")))?;
    self.add_prerequisite(target, name)
  }

  pub fn add_setting(&mut self, target: &str, setting: impl Into<String>) -> Result<(), BuildError> {
    self.rule_mut(target)?.add_setting(setting);
    Ok(())
  }

  pub fn set_force_rebuild(&mut self, target: &str, force_rebuild: bool) -> Result<(), BuildError> {
    self.rule_mut(target)?.set_force_rebuild(force_rebuild);
    Ok(())
  }

  /// Set a setting value. Returns true if the stored value changed.
  pub fn set_setting_value(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
    self.settings.set(name, value)
  }

  /// Replace the settings with the contents of `path`.
  pub fn load_settings(&mut self, path: &Path) -> Result<(), BuildError> {
    self.settings = SettingsStore::load(path)?;
    Ok(())
  }

  pub fn save_settings(&self, path: &Path) -> Result<(), BuildError> {
    self.settings.save(path)?;
    Ok(())
  }

  /// Write a dot graph of every subsequent build's plan to `path`.
  pub fn set_graph_export(&mut self, path: impl Into<PathBuf>, rename: Option<Arc<RenameFn>>) {
    self.graph_export = Some(GraphExport {
      path: path.into(),
      rename,
    });
  }

  pub fn clear_graph_export(&mut self) {
    self.graph_export = None;
  }

  /// Compute the plan for `target` without running anything.
  pub fn plan(&self, target: &str) -> Result<Plan, BuildError> {
    GraphBuilder::new(&self.registry, &self.settings).build(target)
  }

  /// Bring `target` up to date, one rule at a time.
  pub fn build(&self, target: &str) -> Result<Trace, BuildError> {
    let plan = self.prepare(target)?;
    execute::execute_plan(&plan, &self.registry, &self.settings)
  }

  /// Bring `target` up to date, running independent rules concurrently.
  pub async fn build_parallel(&self, target: &str, config: &ExecuteConfig) -> Result<Trace, BuildError> {
    let plan = self.prepare(target)?;
    execute::execute_plan_parallel(&plan, &self.registry, &self.settings, config).await
  }

  fn prepare(&self, target: &str) -> Result<Plan, BuildError> {
    info!(target = %target, rules = self.registry.len(), "planning build");
    let plan = self.plan(target)?;
    if let Some(graph) = &self.graph_export {
      export::write_dot(&plan, graph.rename.as_deref(), &graph.path)?;
    }
    debug!(stale = ?plan.stale_targets(), "plan ready");
    Ok(plan)
  }
}
