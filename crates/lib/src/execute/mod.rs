//! Plan execution.
//!
//! [`build_deps`] walks an optimized plan in order and applies each rule,
//! [`clean_deps`] deletes what the rules of a plan produce. Rebuild runs both
//! over the same plan.

pub mod types;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::action::actions::fs::remove_path;
use crate::config::RunConfig;
use crate::path::BuildPath;
use crate::plan::PlanEntry;
use crate::rule::{Rule, RuleRef};

pub use types::{EngineError, ExecutedRule};

/// Build every entry of `plan` in order.
///
/// Returns the rules that ran. Under dry-run every ruled entry is reported and
/// recorded without running anything.
pub fn build_deps(
  plan: &[PlanEntry],
  config: &RunConfig,
  cwd: Option<&Path>,
  out: &mut dyn Write,
) -> Result<Vec<ExecutedRule>, EngineError> {
  info!(steps = plan.len(), dry_run = config.dry_run, "building");
  let total = plan.len();
  let mut executed = Vec::new();

  for (index, entry) in plan.iter().enumerate() {
    let step = format!("[{}/{}]", index + 1, total);
    let Some(rule) = &entry.rule else {
      check_ground(entry, config, &step, out)?;
      continue;
    };

    for (targets, concrete) in concretize(entry, rule)? {
      let name = concrete.action_name();
      if config.dry_run {
        writeln!(out, "{step} DRY-RUN {name}")?;
        executed.push(ExecutedRule { targets, rule: concrete });
        continue;
      }

      if concrete.apply(config, cwd, out)? {
        writeln!(out, "{step} {name}")?;
        executed.push(ExecutedRule { targets, rule: concrete });
      } else {
        debug!(rule = %name, "skipped, up to date");
        if config.verbose {
          writeln!(out, "{step} SKIP {name}")?;
        }
      }
    }
  }

  Ok(executed)
}

/// Delete the existing real targets produced by the rules of `plan`.
///
/// Ground entries and virtual targets are left alone. Returns the deleted
/// paths, or under dry-run the paths that would be deleted.
pub fn clean_deps(plan: &[PlanEntry], config: &RunConfig, out: &mut dyn Write) -> Result<Vec<PathBuf>, EngineError> {
  info!(steps = plan.len(), dry_run = config.dry_run, "cleaning");
  let mut removed = Vec::new();

  for entry in plan {
    let Some(rule) = &entry.rule else {
      continue;
    };

    for (targets, _) in concretize(entry, rule)? {
      for path in targets.iter().filter_map(BuildPath::as_real) {
        if !path.exists() {
          continue;
        }
        if config.dry_run {
          writeln!(out, "DRY-RUN CLEAN {}", path.display())?;
        } else {
          remove_path(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
          })?;
          writeln!(out, "CLEAN {}", path.display())?;
        }
        removed.push(path.to_path_buf());
      }
    }
  }

  Ok(removed)
}

fn check_ground(entry: &PlanEntry, config: &RunConfig, step: &str, out: &mut dyn Write) -> Result<(), EngineError> {
  for target in &entry.targets {
    if config.dry_run {
      debug!(target = %target, "ground dependency");
      writeln!(out, "{step} DRY-RUN Dependency: {target}")?;
      continue;
    }
    if target.is_virtual() || target.exists() {
      if config.verbose {
        writeln!(out, "{step} SKIP {target} exists")?;
      }
      continue;
    }
    return Err(EngineError::MissingGroundDependency {
      target: target.to_string(),
    });
  }
  Ok(())
}

// Named rules apply once for the whole entry, pattern rules once per target.
fn concretize(entry: &PlanEntry, rule: &RuleRef) -> Result<Vec<(Vec<BuildPath>, Rc<Rule>)>, EngineError> {
  match rule {
    RuleRef::Named(named) => Ok(vec![(entry.targets.clone(), named.clone())]),
    RuleRef::Pattern(_) => entry
      .targets
      .iter()
      .map(|target| Ok((vec![target.clone()], rule.concrete(target)?)))
      .collect(),
  }
}
