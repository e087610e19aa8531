mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{BuildArgs, PathArgs};
use crate::output::print_error;

/// haul - package build orchestration
#[derive(Parser)]
#[command(name = "haul")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project file, or a directory to search upward from
  #[arg(long, global = true)]
  project: Option<PathBuf>,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build project packages and their dependencies
  Build(BuildArgs),

  /// Print the locations a build uses
  Path(PathArgs),

  /// Query information about the build
  Query {
    /// Keys and list indices selecting part of the document
    selectors: Vec<String>,
  },

  /// Show platform and project details
  Info {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(err) = run(cli) {
    print_error(&format!("{:#}", err));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let project = cli.project.as_deref();
  match cli.command {
    Commands::Build(args) => cmd::cmd_build(project, &args),
    Commands::Path(args) => cmd::cmd_path(project, &args),
    Commands::Query { selectors } => cmd::cmd_query(project, &selectors),
    Commands::Info { json } => cmd::cmd_info(project, json),
  }
}
