//! Implementation of the `kiln build` command.
//!
//! Applies the build description's settings, brings the target up to date
//! and prints the groups that were executed.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use kiln_lib::{BuildError, ExecuteConfig, Trace};

use crate::output::{format_duration, print_info, print_json, print_success, print_trace};
use crate::project::Project;

#[derive(Serialize)]
struct BuildReport<'a> {
  target: &'a str,
  trace: &'a Trace,
  elapsed_ms: u64,
}

/// Execute the build command.
///
/// `jobs` of `1` runs rules one at a time; any other value runs each group
/// concurrently with at most that many rules in flight (default: CPU count).
pub fn cmd_build(
  file: &Path,
  settings: Option<&Path>,
  target: &str,
  jobs: Option<usize>,
  dot: Option<PathBuf>,
  json: bool,
) -> Result<()> {
  let mut project = Project::open(file, settings)?;
  project.apply_manifest_settings();
  project.save_settings()?;

  if let Some(dot) = dot {
    project.engine.set_graph_export(dot, None);
  }

  let config = match jobs {
    Some(parallelism) => ExecuteConfig { parallelism },
    None => ExecuteConfig::default(),
  };

  let start = Instant::now();
  let result = if config.parallelism <= 1 {
    project.engine.build(target)
  } else {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    rt.block_on(project.engine.build_parallel(target, &config))
  };
  let elapsed = start.elapsed();

  let trace = match result {
    Ok(trace) => trace,
    Err(err) => {
      if let BuildError::BuildActionFailed { completed, .. } = &err
        && !json
      {
        print_trace(completed);
      }
      return Err(err).with_context(|| format!("Build of {} failed", target));
    }
  };

  if json {
    return print_json(&BuildReport {
      target,
      trace: &trace,
      elapsed_ms: elapsed.as_millis() as u64,
    });
  }

  if trace.is_empty() {
    print_info(&format!("{} is up to date", target));
    return Ok(());
  }

  print_trace(&trace);
  print_success(&format!(
    "Built {} target(s) in {} group(s) in {}",
    trace.target_count(),
    trace.len(),
    format_duration(elapsed)
  ));
  Ok(())
}
