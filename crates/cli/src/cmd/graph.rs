//! Implementation of the `kiln graph` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use kiln_lib::export;

use crate::output::print_success;
use crate::project::Project;

/// Print the dot graph of `target`'s plan, or write it to `output`.
pub fn cmd_graph(file: &Path, settings: Option<&Path>, target: &str, output: Option<PathBuf>) -> Result<()> {
  let mut project = Project::open(file, settings)?;
  project.apply_manifest_settings();

  let plan = project
    .engine
    .plan(target)
    .with_context(|| format!("Failed to plan {}", target))?;

  match output {
    Some(path) => {
      export::write_dot(&plan, None, &path).context("Failed to write graph")?;
      print_success(&format!("Wrote graph of {} target(s) to {}", plan.len(), path.display()));
    }
    None => print!("{}", export::to_dot(&plan, None)),
  }
  Ok(())
}
