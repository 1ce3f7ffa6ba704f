//! Implementation of the `kiln plan` command.
//!
//! Computes the build plan for a target without running any rule and lists
//! every reachable target with its state.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::output::{format_stamp, print_info, print_json, symbols};
use crate::project::Project;

#[derive(Serialize)]
struct PlanEntry<'a> {
  target: &'a str,
  kind: &'static str,
  needs_build: bool,
  last_build_time: i64,
  prerequisites: Vec<&'a str>,
}

pub fn cmd_plan(file: &Path, settings: Option<&Path>, target: &str, json: bool) -> Result<()> {
  let mut project = Project::open(file, settings)?;
  project.apply_manifest_settings();

  let plan = project
    .engine
    .plan(target)
    .with_context(|| format!("Failed to plan {}", target))?;

  let mut entries = Vec::new();
  for name in plan.targets() {
    let Some(node) = plan.node(name) else { continue };
    let kind = project.engine.rule(name).map(|rule| rule.kind_name()).unwrap_or("unknown");
    entries.push(PlanEntry {
      target: name,
      kind,
      needs_build: node.needs_build,
      last_build_time: node.last_build_time,
      prerequisites: node.prerequisites.iter().map(String::as_str).collect(),
    });
  }

  if json {
    return print_json(&entries);
  }

  for entry in &entries {
    let symbol = if entry.needs_build {
      symbols::STALE.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string()
    } else {
      symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
    };
    println!(
      "{} {} ({}, built {})",
      symbol,
      entry.target,
      entry.kind.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      format_stamp(entry.last_build_time)
    );
  }

  let stale = plan.stale_targets().len();
  print_info(&format!("{} of {} target(s) would be built", stale, plan.len()));
  Ok(())
}
