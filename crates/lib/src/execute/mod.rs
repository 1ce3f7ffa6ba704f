//! Build execution.
//!
//! A [`Plan`] is executed group by group. Each group holds every stale node
//! whose prerequisites are all satisfied; nodes that did not need a build are
//! satisfied from the start. When a rule finishes, all of its names become
//! satisfied at once and are recorded together in the group's [`Trace`] entry.
//!
//! [`execute_plan`] runs one rule at a time. [`execute_plan_parallel`] runs the
//! members of a group on the blocking pool, bounded by
//! [`ExecuteConfig::parallelism`], and waits for the whole group before
//! starting the next.

pub mod types;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::BuildError;
use crate::graph::{NodeId, Plan, PlanNode};
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleError};
use crate::settings::SettingsStore;

pub use types::{ExecuteConfig, Trace};

/// Satisfied names and the stale nodes still waiting to run.
struct Schedule<'a> {
  satisfied: HashSet<&'a str>,
  pending: Vec<(NodeId, &'a PlanNode)>,
}

impl<'a> Schedule<'a> {
  fn new(plan: &'a Plan) -> Self {
    let mut satisfied = HashSet::new();
    let mut pending = Vec::new();
    for (id, node) in plan.nodes() {
      if node.needs_build {
        pending.push((id, node));
      } else {
        satisfied.extend(node.names.iter().map(String::as_str));
      }
    }
    Self { satisfied, pending }
  }

  /// Pending nodes whose prerequisites are all satisfied.
  fn next_group(&self) -> Vec<(NodeId, &'a PlanNode)> {
    self
      .pending
      .iter()
      .filter(|(_, node)| {
        node
          .prerequisites
          .iter()
          .all(|name| self.satisfied.contains(name.as_str()))
      })
      .copied()
      .collect()
  }

  fn complete(&mut self, group: &[(NodeId, &'a PlanNode)]) {
    for (id, node) in group {
      self.satisfied.extend(node.names.iter().map(String::as_str));
      self.pending.retain(|(pending, _)| pending != id);
    }
  }
}

/// Look up the rule behind `node` and the setting values it declared.
fn resolve<'r>(
  node: &PlanNode,
  registry: &'r RuleRegistry,
  settings: &SettingsStore,
) -> Result<(&'r Rule, BTreeMap<String, Value>), BuildError> {
  let rule = registry
    .get(node.rule)
    .ok_or_else(|| BuildError::NoSuchRule(node.names.join(", ")))?;
  let values = settings.values_for(rule.declared_settings())?;
  Ok((rule, values))
}

fn log_outcome(targets: &[String], result: &Result<(), RuleError>, elapsed: Duration) {
  let targets = targets.join(", ");
  match result {
    Ok(()) => info!(target = %targets, elapsed_ms = elapsed.as_millis() as u64, "built"),
    Err(e) => error!(target = %targets, error = %e, elapsed_ms = elapsed.as_millis() as u64, "build failed"),
  }
}

/// Execute the stale nodes of `plan` one at a time.
pub fn execute_plan(plan: &Plan, registry: &RuleRegistry, settings: &SettingsStore) -> Result<Trace, BuildError> {
  let mut schedule = Schedule::new(plan);
  let mut trace = Trace::default();

  info!(target = %plan.root(), stale = schedule.pending.len(), "starting build");

  loop {
    let group = schedule.next_group();
    if group.is_empty() {
      break;
    }
    debug!(group = trace.len(), rules = group.len(), "executing group");

    let mut names = Vec::new();
    for (_, node) in &group {
      let (rule, values) = resolve(node, registry, settings)?;
      info!(target = %rule.names().join(", "), kind = rule.kind_name(), "building");

      let start = Instant::now();
      let result = rule.build(values);
      log_outcome(rule.names(), &result, start.elapsed());

      if let Err(source) = result {
        if !names.is_empty() {
          debug!(target = %rule.names().join(", "), built = %names.join(", "), "group members built before failure");
        }
        return Err(BuildError::BuildActionFailed {
          targets: rule.names().to_vec(),
          completed: trace,
          source,
        });
      }
      names.extend(node.names.iter().cloned());
    }

    schedule.complete(&group);
    trace.push_group(names);
  }

  info!(target = %plan.root(), groups = trace.len(), built = trace.target_count(), "build complete");
  Ok(trace)
}

/// Execute the stale nodes of `plan`, running each group concurrently.
///
/// When a member of a group fails, the rest of the group is still awaited and
/// no later group starts. The first failure observed is returned.
pub async fn execute_plan_parallel(
  plan: &Plan,
  registry: &RuleRegistry,
  settings: &SettingsStore,
  config: &ExecuteConfig,
) -> Result<Trace, BuildError> {
  let mut schedule = Schedule::new(plan);
  let mut trace = Trace::default();
  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));

  info!(
    target = %plan.root(),
    stale = schedule.pending.len(),
    parallelism = config.parallelism,
    "starting parallel build"
  );

  loop {
    let group = schedule.next_group();
    if group.is_empty() {
      break;
    }
    debug!(group = trace.len(), rules = group.len(), "executing group");

    let mut join_set = JoinSet::new();
    for (_, node) in &group {
      let (rule, values) = resolve(node, registry, settings)?;
      let ctx = rule.context(values);
      let kind = rule.shared_kind();
      let permit = Arc::clone(&semaphore)
        .acquire_owned()
        .await
        .map_err(|e| BuildError::TaskFailed(e.to_string()))?;

      info!(target = %ctx.targets.join(", "), kind = kind.kind_name(), "building");
      join_set.spawn_blocking(move || {
        let _permit = permit;
        let start = Instant::now();
        let result = kind.build(&ctx);
        (ctx.targets, result, start.elapsed())
      });
    }

    let mut names = Vec::new();
    let mut failure: Option<(Vec<String>, RuleError)> = None;
    let mut task_error: Option<String> = None;

    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((targets, result, elapsed)) => {
          log_outcome(&targets, &result, elapsed);
          match result {
            Ok(()) => names.extend(targets),
            Err(source) => {
              if failure.is_none() {
                failure = Some((targets, source));
              }
            }
          }
        }
        Err(e) => {
          error!(error = %e, "build task panicked");
          if task_error.is_none() {
            task_error = Some(e.to_string());
          }
        }
      }
    }

    if let Some((targets, source)) = failure {
      return Err(BuildError::BuildActionFailed {
        targets,
        completed: trace,
        source,
      });
    }
    if let Some(message) = task_error {
      return Err(BuildError::TaskFailed(message));
    }

    schedule.complete(&group);
    trace.push_group(names);
  }

  info!(target = %plan.root(), groups = trace.len(), built = trace.target_count(), "build complete");
  Ok(trace)
}
