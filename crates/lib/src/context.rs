//! Build scopes.
//!
//! Every build script evaluation gets its own [`Context`] holding the builders,
//! rules and targets it registered. Contexts are stacked for nested sub-builds
//! and rule lookup walks the stack from the innermost scope outwards.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::builder::Builder;
use crate::execute::types::ExecutedRule;
use crate::path::BuildPath;
use crate::plan::PlanEntry;
use crate::rule::{PatternRule, RegistrationError, Rule};

/// Registry of one build script invocation.
#[derive(Debug, Clone, Default)]
pub struct Context {
  cwd: Option<PathBuf>,
  builders: Vec<Rc<Builder>>,
  named_rules: Vec<Rc<Rule>>,
  pattern_rules: Vec<Rc<PatternRule>>,
  targets: Vec<BuildPath>,
  plan: Option<Vec<PlanEntry>>,
  executed: Vec<ExecutedRule>,
}

impl Context {
  pub fn new(cwd: impl Into<PathBuf>) -> Self {
    Self {
      cwd: Some(cwd.into()),
      ..Default::default()
    }
  }

  /// Directory of the script, `None` for the root scope.
  pub fn cwd(&self) -> Option<&Path> {
    self.cwd.as_deref()
  }

  pub fn builders(&self) -> &[Rc<Builder>] {
    &self.builders
  }

  pub fn named_rules(&self) -> &[Rc<Rule>] {
    &self.named_rules
  }

  pub fn pattern_rules(&self) -> &[Rc<PatternRule>] {
    &self.pattern_rules
  }

  pub fn targets(&self) -> &[BuildPath] {
    &self.targets
  }

  /// The optimized plan, once the scope has been executed.
  pub fn plan(&self) -> Option<&[PlanEntry]> {
    self.plan.as_deref()
  }

  /// Rules that ran (or would have run under dry-run) in this scope.
  pub fn executed(&self) -> &[ExecutedRule] {
    &self.executed
  }

  pub fn add_builder(&mut self, builder: Rc<Builder>) {
    if !self.builders.iter().any(|b| Rc::ptr_eq(b, &builder)) {
      self.builders.push(builder);
    }
  }

  /// Register a named rule.
  ///
  /// Re-registering an identical rule returns the existing one. A different
  /// rule claiming an already claimed target is rejected.
  pub fn add_rule(&mut self, rule: Rule) -> Result<Rc<Rule>, RegistrationError> {
    for existing in &self.named_rules {
      if **existing == rule {
        return Ok(existing.clone());
      }
      if let Some(target) = rule.overlaps(existing) {
        return Err(RegistrationError::ConflictingRule {
          target: target.to_string(),
        });
      }
    }
    let rule = Rc::new(rule);
    self.named_rules.push(rule.clone());
    Ok(rule)
  }

  pub fn add_pattern_rule(&mut self, rule: PatternRule) -> Rc<PatternRule> {
    if let Some(existing) = self.pattern_rules.iter().find(|r| ***r == rule) {
      return existing.clone();
    }
    let rule = Rc::new(rule);
    self.pattern_rules.push(rule.clone());
    rule
  }

  /// Declare targets, skipping ones already declared.
  pub fn add_targets(&mut self, targets: impl IntoIterator<Item = BuildPath>) {
    for target in targets {
      if !self.targets.contains(&target) {
        self.targets.push(target);
      }
    }
  }

  pub(crate) fn finish(&mut self, plan: Vec<PlanEntry>, executed: Vec<ExecutedRule>) {
    self.plan = Some(plan);
    self.executed = executed;
  }
}

/// The stack of active scopes.
///
/// A root scope without a directory sits at the bottom and is never popped.
#[derive(Debug)]
pub struct ScopeStack {
  contexts: Vec<Context>,
  completed: Vec<Context>,
}

impl Default for ScopeStack {
  fn default() -> Self {
    Self::new()
  }
}

impl ScopeStack {
  pub fn new() -> Self {
    Self {
      contexts: vec![Context::default()],
      completed: Vec::new(),
    }
  }

  pub fn push(&mut self, cwd: impl Into<PathBuf>) {
    let context = Context::new(cwd);
    debug!(cwd = ?context.cwd(), depth = self.contexts.len(), "entering scope");
    self.contexts.push(context);
  }

  /// Remove and return the innermost scope. The root scope stays.
  pub fn pop(&mut self) -> Option<Context> {
    if self.contexts.len() <= 1 {
      return None;
    }
    let context = self.contexts.pop()?;
    debug!(cwd = ?context.cwd(), "leaving scope");
    Some(context)
  }

  pub fn current(&self) -> &Context {
    // The root scope is never removed.
    &self.contexts[self.contexts.len() - 1]
  }

  pub fn current_mut(&mut self) -> &mut Context {
    let last = self.contexts.len() - 1;
    &mut self.contexts[last]
  }

  /// Active scopes, oldest first.
  pub fn all(&self) -> &[Context] {
    &self.contexts
  }

  pub fn depth(&self) -> usize {
    self.contexts.len()
  }

  /// Directory relative paths resolve against: the innermost scope with a
  /// directory, else the process working directory.
  pub fn base_dir(&self) -> PathBuf {
    self
      .contexts
      .iter()
      .rev()
      .find_map(|c| c.cwd().map(Path::to_path_buf))
      .or_else(|| std::env::current_dir().ok())
      .unwrap_or_default()
  }

  pub fn add_builder(&mut self, builder: Rc<Builder>) {
    self.current_mut().add_builder(builder);
  }

  pub fn add_rule(&mut self, rule: Rule) -> Result<Rc<Rule>, RegistrationError> {
    self.current_mut().add_rule(rule)
  }

  pub fn add_pattern_rule(&mut self, rule: PatternRule) -> Rc<PatternRule> {
    self.current_mut().add_pattern_rule(rule)
  }

  pub fn add_targets(&mut self, targets: impl IntoIterator<Item = BuildPath>) {
    self.current_mut().add_targets(targets);
  }

  /// Turn a name given on the command line into a path.
  ///
  /// Names of virtual targets known to any active scope stay virtual, anything
  /// else is a path relative to `base`.
  pub fn resolve_name(&self, base: &Path, name: &str) -> BuildPath {
    let wanted = BuildPath::virtual_target(name);
    let known = self.contexts.iter().any(|context| {
      context.targets().contains(&wanted)
        || context.named_rules().iter().any(|rule| rule.targets().contains(&wanted))
    });
    if known { wanted } else { BuildPath::real(base, name) }
  }

  /// Keep a finished sub-build scope for later inspection.
  pub(crate) fn record_completed(&mut self, context: Context) {
    self.completed.push(context);
  }

  /// Scopes popped so far, in completion order.
  pub fn completed(&self) -> &[Context] {
    &self.completed
  }

  /// The most recently completed scope rooted at `cwd`.
  pub fn find_completed(&self, cwd: &Path) -> Option<&Context> {
    self.completed.iter().rev().find(|c| c.cwd() == Some(cwd))
  }
}
