mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use remake_lib::{DEFAULT_CONFIG_FILE, Mode, RunConfig};
use tracing_subscriber::EnvFilter;

use crate::cmd::{RunOptions, cmd_run};

/// ReMake - a make-like build tool scripted in Lua
#[derive(Parser)]
#[command(name = "remake")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Report skipped steps and enable debug logging
  #[arg(short, long)]
  verbose: bool,

  /// Show what would run without running it (implies --verbose)
  #[arg(short = 'n', long)]
  dry_run: bool,

  /// Delete the targets instead of building them
  #[arg(short, long, conflicts_with = "rebuild")]
  clean: bool,

  /// Clean the targets, then build them again
  #[arg(short, long)]
  rebuild: bool,

  /// Build script evaluated in each directory
  #[arg(short = 'f', long, default_value = DEFAULT_CONFIG_FILE)]
  config_file: String,

  /// Run as if started in this directory
  #[arg(short = 'C', long = "directory", default_value = ".")]
  directory: PathBuf,

  /// Targets to bring up to date (default: the targets the script declares)
  targets: Vec<String>,
}

impl Cli {
  fn run_config(&self) -> RunConfig {
    let mode = if self.clean {
      Mode::Clean
    } else if self.rebuild {
      Mode::Rebuild
    } else {
      Mode::Build
    };
    RunConfig::new(mode, self.dry_run, self.verbose)
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  let config = cli.run_config();

  let default_filter = if config.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let options = RunOptions {
    directory: cli.directory,
    config_file: cli.config_file,
    targets: cli.targets,
    config,
  };

  match cmd_run(&options) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      output::print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
