//! Turning dependency trees into an ordered execution plan.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::RunConfig;
use crate::context::ScopeStack;
use crate::execute::types::EngineError;
use crate::graph::{DependencyNode, find_build_path};
use crate::path::BuildPath;
use crate::rule::RuleRef;

/// One step of the plan: targets to bring up to date with one rule, or a
/// ground target to check when `rule` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
  pub targets: Vec<BuildPath>,
  pub rule: Option<RuleRef>,
}

impl PlanEntry {
  pub fn is_ground(&self) -> bool {
    self.rule.is_none()
  }
}

/// Flatten trees so that every node comes after all of its descendants.
///
/// Trees are walked last to first, each breadth-first, and every visited node
/// is put in front of the plan.
pub fn sort_deps(trees: &[DependencyNode]) -> Vec<PlanEntry> {
  let mut plan = VecDeque::new();
  for tree in trees.iter().rev() {
    let mut queue = VecDeque::from([tree]);
    while let Some(node) = queue.pop_front() {
      plan.push_front(PlanEntry {
        targets: vec![node.target.clone()],
        rule: node.rule.clone(),
      });
      queue.extend(node.children.iter());
    }
  }
  plan.into()
}

/// Remove redundant entries, then fold entries of the same named rule.
pub fn optimize_deps(plan: Vec<PlanEntry>) -> Vec<PlanEntry> {
  merge_same_rule(drop_redundant(plan))
}

// An entry goes when an earlier entry is identical, or when it is ground and
// every one of its targets is already covered by an earlier entry.
fn drop_redundant(plan: Vec<PlanEntry>) -> Vec<PlanEntry> {
  let mut kept = Vec::with_capacity(plan.len());
  for (index, entry) in plan.iter().enumerate() {
    let earlier = &plan[..index];
    let duplicate = earlier.contains(entry);
    let covered = entry.is_ground()
      && entry
        .targets
        .iter()
        .all(|target| earlier.iter().any(|e| e.targets.contains(target)));
    if !duplicate && !covered {
      kept.push(entry.clone());
    }
  }
  kept
}

// Every later entry of the same named rule is folded into its first entry.
// The first entry already follows the rule's dependencies and precedes any
// consumer of its targets. Pattern instantiations stay one entry per target.
fn merge_same_rule(plan: Vec<PlanEntry>) -> Vec<PlanEntry> {
  let mut merged: Vec<PlanEntry> = Vec::with_capacity(plan.len());
  for entry in plan {
    let existing = match &entry.rule {
      Some(rule @ RuleRef::Named(_)) => merged.iter_mut().find(|e| e.rule.as_ref() == Some(rule)),
      _ => None,
    };
    match existing {
      Some(existing) => {
        for target in entry.targets {
          if !existing.targets.contains(&target) {
            existing.targets.push(target);
          }
        }
      }
      None => merged.push(entry),
    }
  }
  merged
}

/// Resolve, linearize and optimize the plan for `targets`.
pub fn generate_dependency_list(
  stack: &ScopeStack,
  targets: &[BuildPath],
  config: &RunConfig,
) -> Result<Vec<PlanEntry>, EngineError> {
  let trees = targets
    .iter()
    .map(|target| find_build_path(stack, target, config))
    .collect::<Result<Vec<_>, _>>()?;
  let plan = optimize_deps(sort_deps(&trees));
  debug!(targets = targets.len(), steps = plan.len(), "generated plan");
  Ok(plan)
}
