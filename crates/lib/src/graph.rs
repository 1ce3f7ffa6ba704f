//! Build plan construction.
//!
//! [`GraphBuilder`] walks the prerequisites of a requested target depth-first
//! and records, for every reachable target, whether it needs building and when
//! it was last built. The result is a [`Plan`].
//!
//! A target needs building when any of these hold:
//! - its rule forces a rebuild
//! - its output does not exist
//! - a declared setting changed after its last build
//! - a prerequisite needs building
//! - a prerequisite was built after it
//!
//! Nodes live in an arena. All names of a multi-target rule map to the same
//! [`NodeId`], so a node is expanded once however many aliases reach it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, btree_set};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, trace};

use crate::error::BuildError;
use crate::registry::RuleRegistry;
use crate::rule::{MISSING_TIMESTAMP, Rule, RuleId, Timestamp};
use crate::settings::SettingsStore;

/// Index of a node in a [`Plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Resolved build state of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
  /// The rule this node was computed from.
  pub rule: RuleId,
  /// Every target name owned by the rule.
  pub names: Vec<String>,
  /// Prerequisite target names.
  pub prerequisites: BTreeSet<String>,
  /// Whether the rule must run in this build.
  pub needs_build: bool,
  /// Last build time of the outputs, `-1` if they do not exist.
  pub last_build_time: Timestamp,
}

/// Every target reachable from a requested root, mapped to its node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
  root: String,
  nodes: Vec<PlanNode>,
  index: BTreeMap<String, NodeId>,
}

impl Plan {
  /// The target the plan was computed for.
  pub fn root(&self) -> &str {
    &self.root
  }

  pub fn node(&self, name: &str) -> Option<&PlanNode> {
    self.index.get(name).map(|id| &self.nodes[id.0])
  }

  pub fn node_id(&self, name: &str) -> Option<NodeId> {
    self.index.get(name).copied()
  }

  pub fn get(&self, id: NodeId) -> Option<&PlanNode> {
    self.nodes.get(id.0)
  }

  /// Nodes in the order their expansion finished (prerequisites first).
  pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PlanNode)> {
    self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
  }

  /// All reachable target names, sorted, aliases included.
  pub fn targets(&self) -> impl Iterator<Item = &str> {
    self.index.keys().map(String::as_str)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn needs_build(&self, name: &str) -> Option<bool> {
    self.node(name).map(|node| node.needs_build)
  }

  /// Target names that a build would execute, sorted.
  pub fn stale_targets(&self) -> Vec<&str> {
    self
      .index
      .iter()
      .filter(|(_, id)| self.nodes[id.0].needs_build)
      .map(|(name, _)| name.as_str())
      .collect()
  }

  /// Number of target names (aliases counted separately).
  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  /// Number of distinct nodes (one per rule).
  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// The plan as a directed graph with one node per target name and an edge
  /// from each prerequisite to each dependent.
  pub fn to_graph(&self) -> DiGraph<String, ()> {
    let mut graph = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

    for name in self.targets() {
      indices.insert(name, graph.add_node(name.to_string()));
    }

    for (name, id) in &self.index {
      let dependent = indices[name.as_str()];
      for prerequisite in &self.nodes[id.0].prerequisites {
        if let Some(&source) = indices.get(prerequisite.as_str()) {
          graph.add_edge(source, dependent, ());
        }
      }
    }

    graph
  }

  /// Store a finished node under every one of its names.
  fn insert(&mut self, node: PlanNode) -> NodeId {
    let id = NodeId(self.nodes.len());
    for name in &node.names {
      self.index.insert(name.clone(), id);
    }
    self.nodes.push(node);
    id
  }
}

/// A rule whose prerequisites are still being visited.
struct Frame<'a> {
  target: String,
  rule: &'a Rule,
  prerequisites: btree_set::Iter<'a, String>,
  needs_build: bool,
  last_build_time: Timestamp,
}

impl Frame<'_> {
  /// Fold a visited prerequisite's result into this node.
  fn absorb(&mut self, prerequisite: &str, (needs_build, time): (bool, Timestamp)) {
    if needs_build || time > self.last_build_time {
      debug!(target = %self.target, prerequisite = %prerequisite, "prerequisite is newer or stale");
      self.needs_build = true;
    }
  }
}

/// Outcome of reaching a target during the walk.
enum Visit<'a> {
  Memoized((bool, Timestamp)),
  Expand(Frame<'a>),
}

/// Targets and rules on the current walk path.
struct InProgress {
  names: HashSet<String>,
  rules: HashSet<RuleId>,
}

/// Memoized depth-first walk producing a [`Plan`].
pub struct GraphBuilder<'a> {
  registry: &'a RuleRegistry,
  settings: &'a SettingsStore,
  plan: Plan,
}

impl<'a> GraphBuilder<'a> {
  pub fn new(registry: &'a RuleRegistry, settings: &'a SettingsStore) -> Self {
    Self {
      registry,
      settings,
      plan: Plan::default(),
    }
  }

  /// Walk everything reachable from `target` and return the finished plan.
  pub fn build(mut self, target: &str) -> Result<Plan, BuildError> {
    self.plan.root = target.to_string();
    let mut visit_path = Vec::new();
    let (needs_build, _) = self.compute_subgraph(target, &mut visit_path)?;
    debug!(
      target = %target,
      needs_build,
      targets = self.plan.len(),
      stale = self.plan.stale_targets().len(),
      "computed build plan"
    );
    Ok(self.plan)
  }

  /// Compute `(needs_build, last_build_time)` for `target`.
  ///
  /// `visit_path` holds the targets between the root and `target`. Re-entering
  /// one of them is a cycle. A target that already has a node returns the
  /// memoized result without revisiting prerequisites.
  ///
  /// The walk keeps its own stack, so chain depth is bounded by memory rather
  /// than the thread stack. `visit_path` is restored before returning.
  pub fn compute_subgraph(
    &mut self,
    target: &str,
    visit_path: &mut Vec<String>,
  ) -> Result<(bool, Timestamp), BuildError> {
    let base = visit_path.len();
    let result = self.walk(target, visit_path);
    visit_path.truncate(base);
    result
  }

  fn walk(&mut self, target: &str, visit_path: &mut Vec<String>) -> Result<(bool, Timestamp), BuildError> {
    let registry = self.registry;
    let mut in_progress = InProgress {
      names: visit_path.iter().cloned().collect(),
      rules: visit_path.iter().filter_map(|name| registry.resolve(name)).collect(),
    };
    let mut stack: Vec<Frame<'a>> = Vec::new();

    match self.visit(target, visit_path, &in_progress)? {
      Visit::Memoized(result) => return Ok(result),
      Visit::Expand(frame) => push(&mut stack, frame, visit_path, &mut in_progress),
    }

    let mut finished = (false, MISSING_TIMESTAMP);
    while let Some(next) = stack.last_mut().map(|frame| frame.prerequisites.next()) {
      if let Some(prerequisite) = next {
        match self.visit(prerequisite, visit_path, &in_progress)? {
          Visit::Memoized(result) => {
            if let Some(parent) = stack.last_mut() {
              parent.absorb(prerequisite, result);
            }
          }
          Visit::Expand(frame) => push(&mut stack, frame, visit_path, &mut in_progress),
        }
        continue;
      }

      // All prerequisites of the top frame are done.
      if let Some(frame) = stack.pop() {
        visit_path.pop();
        in_progress.names.remove(&frame.target);
        in_progress.rules.remove(&frame.rule.id());

        let result = (frame.needs_build, frame.last_build_time);
        self.plan.insert(PlanNode {
          rule: frame.rule.id(),
          names: frame.rule.names().to_vec(),
          prerequisites: frame.rule.prerequisites().clone(),
          needs_build: frame.needs_build,
          last_build_time: frame.last_build_time,
        });

        match stack.last_mut() {
          Some(parent) => parent.absorb(&frame.target, result),
          None => finished = result,
        }
      }
    }

    Ok(finished)
  }

  /// Check `target` for cycles and memoized results, or evaluate the rule's
  /// own staleness ahead of its prerequisites.
  fn visit(&self, target: &str, visit_path: &[String], in_progress: &InProgress) -> Result<Visit<'a>, BuildError> {
    if in_progress.names.contains(target) {
      return Err(cycle(target, visit_path));
    }

    if let Some(node) = self.plan.node(target) {
      trace!(target = %target, "plan node memoized");
      return Ok(Visit::Memoized((node.needs_build, node.last_build_time)));
    }

    let registry = self.registry;
    let rule = registry.lookup(target)?;

    // An alias of a rule that is still being expanded.
    if in_progress.rules.contains(&rule.id()) {
      return Err(cycle(target, visit_path));
    }

    let mut needs_build = rule.force_rebuild();
    if needs_build {
      debug!(target = %target, "forced rebuild");
    }

    let last_build_time = if rule.exists() {
      rule.last_build_time()
    } else {
      debug!(target = %target, "output does not exist");
      needs_build = true;
      MISSING_TIMESTAMP
    };

    // Every setting is checked, even once the target is known to be stale.
    for setting in rule.declared_settings() {
      if !self.settings.exists(setting) {
        return Err(BuildError::NoSuchSetting(setting.clone()));
      }
      if self.settings.last_changed(setting) > last_build_time {
        debug!(target = %target, setting = %setting, "setting changed since last build");
        needs_build = true;
      }
    }

    // Every prerequisite is visited so the plan covers all reachable targets.
    Ok(Visit::Expand(Frame {
      target: target.to_string(),
      rule,
      prerequisites: rule.prerequisites().iter(),
      needs_build,
      last_build_time,
    }))
  }
}

fn push<'a>(stack: &mut Vec<Frame<'a>>, frame: Frame<'a>, visit_path: &mut Vec<String>, in_progress: &mut InProgress) {
  visit_path.push(frame.target.clone());
  in_progress.names.insert(frame.target.clone());
  in_progress.rules.insert(frame.rule.id());
  stack.push(frame);
}

fn cycle(target: &str, visit_path: &[String]) -> BuildError {
  let mut path = visit_path.to_vec();
  path.push(target.to_string());
  BuildError::CyclicDependency {
    target: target.to_string(),
    path,
  }
}
