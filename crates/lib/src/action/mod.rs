//! Actions run by builders.
//!
//! A builder either renders a shell command template or calls a
//! [`NativeAction`]. Native actions are implemented in Rust (the builtin file
//! actions under [`actions`]) or supplied by build scripts as Lua functions.

pub mod actions;
pub mod builtin;

use std::collections::BTreeMap;
use std::io::Write;

use thiserror::Error;

use crate::path::BuildPath;

/// Extra keyword arguments passed from a rule to its action.
pub type Kwargs = BTreeMap<String, serde_json::Value>;

/// Failure raised while running an action.
#[derive(Debug, Error)]
pub enum ActionError {
  #[error("command `{cmd}` failed with exit code {code:?}: {stderr}")]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("invalid arguments: {0}")]
  InvalidArguments(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("walk error: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("lua error: {0}")]
  Lua(#[from] mlua::Error),
}

/// An action implemented as code rather than a shell command.
pub trait NativeAction {
  /// Name shown in progress output.
  fn name(&self) -> &str;

  /// Run the action for a concrete rule.
  ///
  /// Anything written to `out` ends up in the engine's output sink.
  fn run(
    &self,
    deps: &[BuildPath],
    targets: &[BuildPath],
    out: &mut dyn Write,
    kwargs: &Kwargs,
  ) -> Result<(), ActionError>;
}

/// Custom staleness decision replacing the modification-time comparison.
///
/// Evaluated once per rule over all of its targets.
pub trait RebuildCheck {
  fn should_rebuild(&self, targets: &[BuildPath], deps: &[BuildPath]) -> Result<bool, ActionError>;
}

impl<F> RebuildCheck for F
where
  F: Fn(&[BuildPath], &[BuildPath]) -> Result<bool, ActionError>,
{
  fn should_rebuild(&self, targets: &[BuildPath], deps: &[BuildPath]) -> Result<bool, ActionError> {
    self(targets, deps)
  }
}

/// Collect the real filesystem paths of `paths`, skipping virtual entries.
pub(crate) fn real_paths(paths: &[BuildPath]) -> impl Iterator<Item = &std::path::Path> {
  paths.iter().filter_map(BuildPath::as_real)
}
