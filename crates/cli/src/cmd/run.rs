//! Implementation of the `remake` run.
//!
//! Evaluates the build script of a directory and builds, cleans or rebuilds the
//! requested targets.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use remake_lib::{EngineError, Mode, RunConfig, Session};
use tracing::info;

use crate::output::{format_duration, print_info, print_success};

pub struct RunOptions {
  pub directory: PathBuf,
  pub config_file: String,
  pub targets: Vec<String>,
  pub config: RunConfig,
}

// Convert EngineError to anyhow::Error (works around mlua not being Send+Sync),
// keeping the innermost engine error as the message.
fn engine_err(err: EngineError) -> anyhow::Error {
  anyhow::anyhow!("{}", err.root_cause())
}

/// Execute one run.
///
/// Progress lines go to stdout as the engine produces them, followed by a one
/// line summary.
pub fn cmd_run(options: &RunOptions) -> Result<()> {
  let start = Instant::now();
  let config = options.config;

  let session = Session::new(config, Box::new(io::stdout())).map_err(engine_err)?;
  let context = session.run(&options.directory, &options.config_file, &options.targets).map_err(engine_err)?;

  let elapsed = format_duration(start.elapsed());
  // Sub-builds record their own scopes, the top-level one included.
  let ran: usize = session.stack().completed().iter().map(|c| c.executed().len()).sum();
  info!(ran, top_level = context.executed().len(), elapsed = %elapsed, "run finished");

  match (config.mode, config.dry_run) {
    (Mode::Clean, true) => print_info("Dry run, nothing was deleted"),
    (Mode::Clean, false) => print_success(&format!("Clean complete ({elapsed})")),
    (_, true) => print_info(&format!("Dry run, {ran} rule(s) would run")),
    (_, false) if ran == 0 => print_info("Nothing to be done"),
    (_, false) => print_success(&format!("{ran} rule(s) run in {elapsed}")),
  }

  Ok(())
}
