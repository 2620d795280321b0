//! Builders: how a rule turns its dependencies into its targets.

use std::fmt;
use std::rc::Rc;

use crate::action::{NativeAction, RebuildCheck};
use crate::path::{BuildPath, Capture, GlobPattern, WILDCARD};

/// Sentinel replaced by every target of the rule.
pub const ALL_TARGETS: &str = "$@";

/// Sentinel replaced by the first dependency of the rule.
pub const FIRST_DEP: &str = "$^";

/// Sentinel replaced by every dependency of the rule.
pub const ALL_DEPS: &str = "$<";

/// What a builder runs.
#[derive(Clone)]
pub enum Action {
  /// Argument tokens of a shell command, possibly containing sentinels.
  ShellTemplate(Vec<String>),
  /// Code invoked directly with the rule's paths.
  Native(Rc<dyn NativeAction>),
}

impl Action {
  /// Split a command line into template tokens.
  pub fn template(command: &str) -> Self {
    Action::ShellTemplate(command.split_whitespace().map(str::to_string).collect())
  }
}

impl fmt::Debug for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Action::ShellTemplate(tokens) => f.debug_tuple("ShellTemplate").field(tokens).finish(),
      Action::Native(native) => f.debug_tuple("Native").field(&native.name()).finish(),
    }
  }
}

// Templates compare token by token, native actions by identity.
impl PartialEq for Action {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Action::ShellTemplate(a), Action::ShellTemplate(b)) => a == b,
      (Action::Native(a), Action::Native(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
      _ => false,
    }
  }
}

impl Eq for Action {}

#[derive(Clone)]
pub struct Builder {
  action: Action,
  destructive: bool,
  rebuild_check: Option<Rc<dyn RebuildCheck>>,
}

impl Builder {
  pub fn new(action: Action) -> Self {
    Self {
      action,
      destructive: false,
      rebuild_check: None,
    }
  }

  /// A builder running `command` through the shell.
  pub fn shell(command: &str) -> Self {
    Self::new(Action::template(command))
  }

  pub fn native(action: impl NativeAction + 'static) -> Self {
    Self::new(Action::Native(Rc::new(action)))
  }

  /// Mark the builder as removing its targets instead of producing them.
  pub fn destructive(mut self, destructive: bool) -> Self {
    self.destructive = destructive;
    self
  }

  /// Replace the modification-time staleness check.
  pub fn with_rebuild_check(mut self, check: Rc<dyn RebuildCheck>) -> Self {
    self.rebuild_check = Some(check);
    self
  }

  pub fn action(&self) -> &Action {
    &self.action
  }

  pub fn is_destructive(&self) -> bool {
    self.destructive
  }

  pub fn rebuild_check(&self) -> Option<&Rc<dyn RebuildCheck>> {
    self.rebuild_check.as_ref()
  }

  /// Substitute the sentinels of a template action.
  ///
  /// Only the first token equal to each sentinel is replaced. Later copies stay
  /// literal. Returns `None` for native actions.
  pub fn render(&self, deps: &[BuildPath], targets: &[BuildPath]) -> Option<Vec<String>> {
    let Action::ShellTemplate(tokens) = &self.action else {
      return None;
    };

    let mut rendered = Vec::with_capacity(tokens.len());
    let (mut targets_done, mut first_done, mut deps_done) = (false, false, false);
    for token in tokens {
      match token.as_str() {
        ALL_TARGETS if !targets_done => {
          targets_done = true;
          rendered.extend(targets.iter().map(ToString::to_string));
        }
        FIRST_DEP if !first_done => {
          first_done = true;
          rendered.extend(deps.first().map(ToString::to_string));
        }
        ALL_DEPS if !deps_done => {
          deps_done = true;
          rendered.extend(deps.iter().map(ToString::to_string));
        }
        _ => rendered.push(token.clone()),
      }
    }
    Some(rendered)
  }

  /// A copy of this builder with the pattern wildcard filled in from `capture`
  /// in every template token carrying exactly one wildcard.
  ///
  /// Path tokens are anchored in the directory of the matched target, so the
  /// command sees absolute paths whatever directory it runs in. Option tokens
  /// (leading `-`) only receive the stem.
  pub fn substitute_wildcard(&self, capture: &Capture<'_>) -> Self {
    let action = match &self.action {
      Action::ShellTemplate(tokens) => Action::ShellTemplate(
        tokens
          .iter()
          .map(|token| {
            if token.matches(WILDCARD).count() != 1 {
              token.clone()
            } else if token.starts_with('-') {
              token.replacen(WILDCARD, capture.stem, 1)
            } else {
              GlobPattern::new(token.as_str()).instantiate(capture)
            }
          })
          .collect(),
      ),
      Action::Native(native) => Action::Native(native.clone()),
    };
    Self {
      action,
      destructive: self.destructive,
      rebuild_check: self.rebuild_check.clone(),
    }
  }

  /// Human-readable description of the action for a concrete rule.
  pub fn describe(&self, deps: &[BuildPath], targets: &[BuildPath]) -> String {
    match &self.action {
      Action::ShellTemplate(_) => self.render(deps, targets).unwrap_or_default().join(" "),
      Action::Native(native) => format!(
        "{}([{}], [{}])",
        native.name(),
        join(deps),
        join(targets)
      ),
    }
  }
}

fn join(paths: &[BuildPath]) -> String {
  paths.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Debug for Builder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Builder")
      .field("action", &self.action)
      .field("destructive", &self.destructive)
      .field("rebuild_check", &self.rebuild_check.is_some())
      .finish()
  }
}

impl PartialEq for Builder {
  fn eq(&self, other: &Self) -> bool {
    self.action == other.action && self.destructive == other.destructive
  }
}

impl Eq for Builder {}
