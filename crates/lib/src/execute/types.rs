//! Types for plan execution.

use std::rc::Rc;

use thiserror::Error;

use crate::action::ActionError;
use crate::path::BuildPath;
use crate::rule::{RegistrationError, Rule};

/// Errors that abort a build, clean or rebuild run.
#[derive(Debug, Error)]
pub enum EngineError {
  /// A real target is missing and no rule in scope produces it.
  #[error("no rule to make target `{target}`")]
  NoRuleToMakeTarget { target: String },

  /// Cleaning met a rule-less target that is not on disk.
  #[error("ground dependency `{target}` is missing while cleaning")]
  GroundDependencyMissingOnClean { target: String },

  /// A rule's dependency vanished between planning and execution.
  #[error("dependency `{dep}` of `{rule}` is not ready")]
  DependencyNotReady { dep: String, rule: String },

  /// The action ran but the filesystem does not reflect it.
  #[error("target {target} not {} by rule `{rule}`", polarity(.destructive))]
  ActionPostconditionFailure {
    target: String,
    rule: String,
    destructive: bool,
  },

  /// The action itself failed.
  #[error("rule `{rule}` failed: {source}")]
  ActionExecutionFailure {
    rule: String,
    #[source]
    source: ActionError,
  },

  /// A ground entry of the plan is gone by the time it is reached.
  #[error("unable to find build path for `{target}`")]
  MissingGroundDependency { target: String },

  #[error("dependency cycle: {}", .chain.join(" -> "))]
  DependencyCycle { chain: Vec<String> },

  /// A pattern rule was asked to expand a target it does not match.
  #[error("target `{target}` does not match pattern `{pattern}`")]
  PatternExpansion { target: String, pattern: String },

  #[error("registration error: {0}")]
  Registration(#[from] RegistrationError),

  #[error("script error: {0}")]
  Script(#[from] mlua::Error),

  #[error("io error at {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("output error: {0}")]
  Output(#[from] std::io::Error),
}

fn polarity(destructive: &bool) -> &'static str {
  if *destructive { "destroyed" } else { "created" }
}

impl EngineError {
  /// The innermost engine error, looking through Lua callback wrapping.
  ///
  /// Errors raised inside a nested sub-build travel back through the script
  /// that requested it as Lua errors.
  pub fn root_cause(&self) -> &EngineError {
    match self {
      EngineError::Script(err) => find_engine_error(err).map(EngineError::root_cause).unwrap_or(self),
      _ => self,
    }
  }
}

fn find_engine_error(err: &mlua::Error) -> Option<&EngineError> {
  match err {
    mlua::Error::CallbackError { cause, .. } => find_engine_error(cause),
    mlua::Error::WithContext { cause, .. } => find_engine_error(cause),
    mlua::Error::BadArgument { cause, .. } => find_engine_error(cause),
    mlua::Error::ExternalError(inner) => inner.downcast_ref::<EngineError>(),
    _ => None,
  }
}

/// A rule that ran (or, in dry-run, would have run) for a set of targets.
#[derive(Debug, Clone)]
pub struct ExecutedRule {
  pub targets: Vec<BuildPath>,
  pub rule: Rc<Rule>,
}

impl PartialEq for ExecutedRule {
  fn eq(&self, other: &Self) -> bool {
    self.targets == other.targets && *self.rule == *other.rule
  }
}
