mod cmd;
mod output;
mod project;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kiln_lib::consts::{DEFAULT_MANIFEST, SETTINGS_PATH_ENV};

use crate::output::print_error;

/// kiln - incremental build engine
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase log output (-v info, -vv debug); RUST_LOG overrides
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  /// Build description file
  #[arg(short = 'f', long = "file", global = true, default_value = DEFAULT_MANIFEST)]
  file: PathBuf,

  /// Settings file (default: .kiln-settings.json next to the build description)
  #[arg(long, global = true, env = SETTINGS_PATH_ENV)]
  settings: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Bring a target up to date
  Build {
    /// Target to build
    target: String,

    /// Maximum rules running at once (1 builds sequentially)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write the dot graph of the plan to this path before building
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Print the trace as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show which targets a build would run (dry-run)
  Plan {
    /// Target to plan
    target: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Render the dependency graph of a target in dot format
  Graph {
    /// Target to render
    target: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Set a setting value (parsed as JSON, otherwise taken as a string)
  Set {
    /// Setting name
    name: String,

    /// New value
    value: String,
  },

  /// List settings and when they last changed
  Settings {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let file = cli.file.as_path();
  let settings = cli.settings.as_deref();

  let result = match cli.command {
    Commands::Build {
      target,
      jobs,
      dot,
      json,
    } => cmd::cmd_build(file, settings, &target, jobs, dot, json),
    Commands::Plan { target, json } => cmd::cmd_plan(file, settings, &target, json),
    Commands::Graph { target, output } => cmd::cmd_graph(file, settings, &target, output),
    Commands::Set { name, value } => cmd::cmd_set(file, settings, &name, &value),
    Commands::Settings { json } => cmd::cmd_settings(file, settings, json),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
