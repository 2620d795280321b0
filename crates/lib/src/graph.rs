//! Dependency resolution.
//!
//! [`find_build_path`] turns a requested target into a tree of
//! [`DependencyNode`]s by looking up rules through the scope stack.

use tracing::{debug, trace};

use crate::config::RunConfig;
use crate::context::ScopeStack;
use crate::execute::types::EngineError;
use crate::path::BuildPath;
use crate::rule::RuleRef;

/// A target together with the rule producing it and the subtrees of its
/// dependencies. Ground nodes have no rule and no children.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
  pub target: BuildPath,
  pub rule: Option<RuleRef>,
  pub children: Vec<DependencyNode>,
}

impl DependencyNode {
  pub fn ground(target: BuildPath) -> Self {
    Self {
      target,
      rule: None,
      children: Vec::new(),
    }
  }

  pub fn is_ground(&self) -> bool {
    self.rule.is_none()
  }
}

/// Resolve `target` into a dependency tree.
///
/// Scopes are searched innermost first. Within a scope named rules win over
/// pattern rules, and the first match wins. Targets no rule produces are
/// ground leaves; whether a missing one is acceptable depends on `config`.
pub fn find_build_path(stack: &ScopeStack, target: &BuildPath, config: &RunConfig) -> Result<DependencyNode, EngineError> {
  let mut visiting = Vec::new();
  resolve(stack, target, config, &mut visiting)
}

fn resolve(
  stack: &ScopeStack,
  target: &BuildPath,
  config: &RunConfig,
  visiting: &mut Vec<BuildPath>,
) -> Result<DependencyNode, EngineError> {
  if visiting.contains(target) {
    let mut chain: Vec<String> = visiting.iter().map(ToString::to_string).collect();
    chain.push(target.to_string());
    return Err(EngineError::DependencyCycle { chain });
  }

  visiting.push(target.clone());
  let node = resolve_unvisited(stack, target, config, visiting);
  visiting.pop();
  node
}

fn resolve_unvisited(
  stack: &ScopeStack,
  target: &BuildPath,
  config: &RunConfig,
  visiting: &mut Vec<BuildPath>,
) -> Result<DependencyNode, EngineError> {
  for context in stack.all().iter().rev() {
    for rule in context.named_rules() {
      if let Some(matched) = rule.matches(target) {
        trace!(target = %target, rule = %rule.action_name(), "named rule matched");
        let children = resolve_children(stack, rule.deps(), config, visiting)?;
        return Ok(DependencyNode {
          target: matched.clone(),
          rule: Some(RuleRef::Named(rule.clone())),
          children,
        });
      }
    }

    for rule in context.pattern_rules() {
      let (matched, deps) = rule.matches(target);
      if deps.is_empty() {
        continue;
      }
      trace!(target = %target, pattern = %rule, "pattern rule matched");
      let children = resolve_children(stack, &deps, config, visiting)?;
      return Ok(DependencyNode {
        target: matched,
        rule: Some(RuleRef::Pattern(rule.clone())),
        children,
      });
    }
  }

  ground(target, config)
}

fn resolve_children(
  stack: &ScopeStack,
  deps: &[BuildPath],
  config: &RunConfig,
  visiting: &mut Vec<BuildPath>,
) -> Result<Vec<DependencyNode>, EngineError> {
  let mut children: Vec<DependencyNode> = Vec::with_capacity(deps.len());
  for dep in deps {
    let child = resolve(stack, dep, config, visiting)?;
    if !children.contains(&child) {
      children.push(child);
    }
  }
  Ok(children)
}

fn ground(target: &BuildPath, config: &RunConfig) -> Result<DependencyNode, EngineError> {
  if target.exists() {
    return Ok(DependencyNode::ground(target.clone()));
  }
  if config.is_clean() {
    return Err(EngineError::GroundDependencyMissingOnClean {
      target: target.to_string(),
    });
  }
  if config.dry_run {
    debug!(target = %target, "missing ground dependency tolerated in dry-run");
    let leaf = if target.is_virtual() {
      target.clone()
    } else {
      BuildPath::virtual_dep(target.to_string())
    };
    return Ok(DependencyNode::ground(leaf));
  }
  if target.is_virtual() {
    return Ok(DependencyNode::ground(target.clone()));
  }
  Err(EngineError::NoRuleToMakeTarget {
    target: target.to_string(),
  })
}
