//! Named rules and pattern rules.

mod pattern;

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info};

use crate::action::Kwargs;
use crate::action::actions::execute_cmd;
use crate::builder::{Action, Builder};
use crate::config::RunConfig;
use crate::execute::types::EngineError;
use crate::path::BuildPath;
use crate::stale;

pub use pattern::PatternRule;

/// Errors raised while a build script registers rules.
#[derive(Debug, Error)]
pub enum RegistrationError {
  #[error("a rule needs at least one target")]
  NoTargets,

  #[error("`{0}` cannot be a target")]
  InvalidTarget(String),

  #[error("`{0}` cannot be a dependency")]
  InvalidDependency(String),

  #[error("pattern `{0}` must contain exactly one `*`")]
  WildcardCount(String),

  #[error("pattern rule `{0}` needs at least one dependency pattern")]
  NoPatternDeps(String),

  #[error("target `{target}` already has a different rule in this scope")]
  ConflictingRule { target: String },

  #[error("invalid glob: {0}")]
  Glob(#[from] glob::PatternError),
}

/// A concrete rule: produce `targets` from `deps` with `builder`.
#[derive(Debug, Clone)]
pub struct Rule {
  targets: Vec<BuildPath>,
  deps: Vec<BuildPath>,
  builder: Rc<Builder>,
  kwargs: Kwargs,
}

impl Rule {
  /// Targets must be real paths or virtual targets, dependencies real paths or
  /// virtual dependencies.
  pub fn new(targets: Vec<BuildPath>, deps: Vec<BuildPath>, builder: Rc<Builder>) -> Result<Self, RegistrationError> {
    if targets.is_empty() {
      return Err(RegistrationError::NoTargets);
    }
    if let Some(bad) = targets.iter().find(|t| matches!(t, BuildPath::VirtualDep(_) | BuildPath::Glob(_))) {
      return Err(RegistrationError::InvalidTarget(bad.to_string()));
    }
    if let Some(bad) = deps.iter().find(|d| matches!(d, BuildPath::VirtualTarget(_) | BuildPath::Glob(_))) {
      return Err(RegistrationError::InvalidDependency(bad.to_string()));
    }
    Ok(Self {
      targets,
      deps,
      builder,
      kwargs: Kwargs::new(),
    })
  }

  pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
    self.kwargs = kwargs;
    self
  }

  pub fn targets(&self) -> &[BuildPath] {
    &self.targets
  }

  pub fn deps(&self) -> &[BuildPath] {
    &self.deps
  }

  pub fn builder(&self) -> &Rc<Builder> {
    &self.builder
  }

  /// The declared target equal to `candidate`, compared by string form.
  pub fn matches(&self, candidate: &BuildPath) -> Option<&BuildPath> {
    let wanted = candidate.to_string();
    self.targets.iter().find(|target| target.to_string() == wanted)
  }

  /// Whether this rule shares a target with `other`.
  pub fn overlaps(&self, other: &Rule) -> Option<&BuildPath> {
    self.targets.iter().find(|target| other.matches(target).is_some())
  }

  pub fn action_name(&self) -> String {
    self.builder.describe(&self.deps, &self.targets)
  }

  /// Whether any target has to be (re)built.
  pub fn is_stale(&self) -> Result<bool, EngineError> {
    match self.builder.rebuild_check() {
      Some(check) => check
        .should_rebuild(&self.targets, &self.deps)
        .map_err(|source| EngineError::ActionExecutionFailure {
          rule: self.action_name(),
          source,
        }),
      None => Ok(self.targets.iter().any(|target| stale::should_rebuild(target, &self.deps))),
    }
  }

  /// Bring the targets up to date.
  ///
  /// Returns `false` when nothing was stale. Under dry-run the action is only
  /// announced and the dependency and post-condition checks are skipped.
  pub fn apply(&self, config: &RunConfig, cwd: Option<&Path>, out: &mut dyn Write) -> Result<bool, EngineError> {
    let name = self.action_name();
    if !self.is_stale()? {
      debug!(rule = %name, "targets are up to date");
      return Ok(false);
    }

    if config.dry_run {
      info!(rule = %name, "dry-run, not executing");
      return Ok(true);
    }

    for dep in self.deps.iter().filter(|d| !d.is_virtual()) {
      if !dep.is_file_or_dir() {
        return Err(EngineError::DependencyNotReady {
          dep: dep.to_string(),
          rule: name,
        });
      }
    }

    self.run_action(cwd, out).map_err(|source| EngineError::ActionExecutionFailure {
      rule: name.clone(),
      source,
    })?;

    self.check_postcondition(&name)?;
    Ok(true)
  }

  fn run_action(&self, cwd: Option<&Path>, out: &mut dyn Write) -> Result<(), crate::action::ActionError> {
    match self.builder.action() {
      Action::ShellTemplate(_) => {
        let command = self.builder.render(&self.deps, &self.targets).unwrap_or_default().join(" ");
        let stdout = execute_cmd(&command, cwd)?;
        if !stdout.is_empty() {
          writeln!(out, "{stdout}")?;
        }
        Ok(())
      }
      Action::Native(native) => native.run(&self.deps, &self.targets, out, &self.kwargs),
    }
  }

  fn check_postcondition(&self, name: &str) -> Result<(), EngineError> {
    let destructive = self.builder.is_destructive();
    for target in self.targets.iter().filter(|t| !t.is_virtual()) {
      let present = target.is_file_or_dir();
      if present == destructive {
        return Err(EngineError::ActionPostconditionFailure {
          target: target.to_string(),
          rule: name.to_string(),
          destructive,
        });
      }
    }
    Ok(())
  }
}

// Keyword arguments do not take part in rule identity.
impl PartialEq for Rule {
  fn eq(&self, other: &Self) -> bool {
    self.targets == other.targets && self.deps == other.deps && *self.builder == *other.builder
  }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.action_name())
  }
}

/// The rule a plan entry or graph node was resolved with.
#[derive(Debug, Clone)]
pub enum RuleRef {
  Named(Rc<Rule>),
  Pattern(Rc<PatternRule>),
}

impl RuleRef {
  /// The concrete rule to apply for `target`.
  ///
  /// Pattern rules are expanded into an ephemeral rule for that target.
  pub fn concrete(&self, target: &BuildPath) -> Result<Rc<Rule>, EngineError> {
    match self {
      RuleRef::Named(rule) => Ok(rule.clone()),
      RuleRef::Pattern(rule) => rule.expand(target).map(Rc::new),
    }
  }
}

impl PartialEq for RuleRef {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (RuleRef::Named(a), RuleRef::Named(b)) => Rc::ptr_eq(a, b) || **a == **b,
      (RuleRef::Pattern(a), RuleRef::Pattern(b)) => Rc::ptr_eq(a, b) || **a == **b,
      _ => false,
    }
  }
}
