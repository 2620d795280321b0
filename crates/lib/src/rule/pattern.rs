use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};

use super::{RegistrationError, Rule};
use crate::action::Kwargs;
use crate::builder::Builder;
use crate::execute::types::EngineError;
use crate::path::{BuildPath, GlobPattern, normalize};

/// A generic rule such as `*.o <- *.c`, instantiated per concrete target.
#[derive(Debug, Clone)]
pub struct PatternRule {
  target: GlobPattern,
  deps: Vec<GlobPattern>,
  builder: Rc<Builder>,
  exclude: Vec<String>,
  kwargs: Kwargs,
}

impl PatternRule {
  /// Every pattern must carry exactly one wildcard and at least one dependency
  /// pattern is required.
  pub fn new(target: &str, deps: &[String], builder: Rc<Builder>) -> Result<Self, RegistrationError> {
    let target = single_wildcard(target)?;
    if deps.is_empty() {
      return Err(RegistrationError::NoPatternDeps(target.to_string()));
    }
    let deps = deps
      .iter()
      .map(|d| single_wildcard(d))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self {
      target,
      deps,
      builder,
      exclude: Vec::new(),
      kwargs: Kwargs::new(),
    })
  }

  /// Concrete targets this rule never applies to, compared by string form.
  pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
    self.exclude = exclude;
    self
  }

  pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
    self.kwargs = kwargs;
    self
  }

  pub fn target(&self) -> &GlobPattern {
    &self.target
  }

  pub fn deps(&self) -> &[GlobPattern] {
    &self.deps
  }

  pub fn builder(&self) -> &Rc<Builder> {
    &self.builder
  }

  pub fn exclude(&self) -> &[String] {
    &self.exclude
  }

  /// Try the pattern on `candidate`.
  ///
  /// Returns the candidate with its instantiated dependencies. The dependency
  /// list is empty when the rule does not apply: virtual candidates, excluded
  /// candidates and candidates the target pattern does not match.
  pub fn matches(&self, candidate: &BuildPath) -> (BuildPath, Vec<BuildPath>) {
    if candidate.is_virtual() {
      return (candidate.clone(), Vec::new());
    }
    let name = candidate.to_string();
    if self.exclude.iter().any(|excluded| *excluded == name) {
      trace!(target = %name, pattern = %self.target, "excluded from pattern rule");
      return (candidate.clone(), Vec::new());
    }
    let Some(capture) = self.target.capture(&name) else {
      return (candidate.clone(), Vec::new());
    };
    let deps = self
      .deps
      .iter()
      .map(|dep| BuildPath::Real(normalize(Path::new(&dep.instantiate(&capture)))))
      .collect();
    (candidate.clone(), deps)
  }

  /// Instantiate the rule for a concrete target.
  ///
  /// The returned rule is ephemeral: it is never registered anywhere.
  pub fn expand(&self, target: &BuildPath) -> Result<Rule, EngineError> {
    let mismatch = || EngineError::PatternExpansion {
      target: target.to_string(),
      pattern: self.target.to_string(),
    };
    if target.is_virtual() {
      return Err(mismatch());
    }
    let name = target.to_string();
    let capture = self.target.capture(&name).ok_or_else(mismatch)?;

    let deps = self
      .deps
      .iter()
      .map(|dep| BuildPath::Real(normalize(Path::new(&dep.instantiate(&capture)))))
      .collect();
    let builder = Rc::new(self.builder.substitute_wildcard(&capture));

    let rule = Rule::new(vec![target.clone()], deps, builder)?.with_kwargs(self.kwargs.clone());
    debug!(target = %target, rule = %rule.action_name(), "expanded pattern rule");
    Ok(rule)
  }

  /// Targets this rule can produce from dependencies found under `cwd`.
  ///
  /// Relative dependency patterns are searched recursively below `cwd`.
  pub fn all_targets(&self, cwd: &Path) -> Result<Vec<BuildPath>, RegistrationError> {
    let mut targets = Vec::new();
    for dep in &self.deps {
      let pattern = if dep.is_absolute() {
        dep.as_str().to_string()
      } else {
        format!("{}/**/{}", glob::Pattern::escape(&cwd.to_string_lossy()), dep.as_str())
      };

      for found in glob::glob(&pattern)?.filter_map(Result::ok) {
        let found = normalize(&found).to_string_lossy().to_string();
        let Some(capture) = dep.capture(&found) else {
          continue;
        };
        let target = BuildPath::Real(PathBuf::from(self.target.instantiate(&capture)));
        if !self.exclude.contains(&target.to_string()) && !targets.contains(&target) {
          targets.push(target);
        }
      }
    }
    targets.sort();
    Ok(targets)
  }
}

fn single_wildcard(pattern: &str) -> Result<GlobPattern, RegistrationError> {
  let glob = GlobPattern::new(pattern);
  if glob.wildcard_count() != 1 {
    return Err(RegistrationError::WildcardCount(pattern.to_string()));
  }
  Ok(glob)
}

impl PartialEq for PatternRule {
  fn eq(&self, other: &Self) -> bool {
    self.target == other.target
      && self.deps == other.deps
      && *self.builder == *other.builder
      && self.exclude == other.exclude
  }
}

impl Eq for PatternRule {}

impl fmt::Display for PatternRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let deps: Vec<&str> = self.deps.iter().map(GlobPattern::as_str).collect();
    write!(f, "{} <- {}", self.target, deps.join(" "))
  }
}
