//! Graphviz rendering of a build plan.

use std::fs;
use std::path::Path;

use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::error::BuildError;
use crate::graph::Plan;

/// Maps a target name to its label; `None` hides the node and its edges.
pub type RenameFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Render `plan` as a `digraph build_tree` with one edge from each
/// prerequisite to its dependent.
pub fn to_dot(plan: &Plan, rename: Option<&RenameFn>) -> String {
  let graph = plan.to_graph();
  let label = |name: &str| match rename {
    Some(rename) => rename(name),
    None => Some(name.to_string()),
  };
  let labels: Vec<Option<String>> = graph.node_indices().map(|ix| label(&graph[ix])).collect();

  let mut lines = vec!["digraph build_tree {".to_string(), "graph [rankdir=\"LR\"]".to_string()];
  for ix in graph.node_indices() {
    if let Some(label) = &labels[ix.index()] {
      lines.push(format!("node_{} [label=\"{}\"]", ix.index() + 1, escape(label)));
    }
  }
  for edge in graph.edge_references() {
    let (source, target) = (edge.source().index(), edge.target().index());
    if labels[source].is_some() && labels[target].is_some() {
      lines.push(format!("node_{} -> node_{}", source + 1, target + 1));
    }
  }
  lines.push("}".to_string());

  let mut dot = lines.join("\n");
  dot.push('\n');
  dot
}

/// Write the dot rendering of `plan` to `path`.
pub fn write_dot(plan: &Plan, rename: Option<&RenameFn>, path: &Path) -> Result<(), BuildError> {
  let export_err = |source| BuildError::Export {
    path: path.to_path_buf(),
    source,
  };
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).map_err(export_err)?;
  }
  fs::write(path, to_dot(plan, rename)).map_err(export_err)?;
  debug!(path = %path.display(), targets = plan.len(), "wrote dot graph");
  Ok(())
}

fn escape(label: &str) -> String {
  label.replace('\\', "\\\\").replace('"', "\\\"")
}
