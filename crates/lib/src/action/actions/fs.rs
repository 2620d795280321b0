//! Filesystem actions: copy, move, remove and mkdir.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

use crate::action::{ActionError, Kwargs, NativeAction, real_paths};
use crate::path::BuildPath;

/// Copies dependencies to targets pairwise, or a single dependency to every
/// target. Directories are copied recursively.
#[derive(Debug, Default)]
pub struct CopyAction;

impl NativeAction for CopyAction {
  fn name(&self) -> &str {
    "copy"
  }

  fn run(&self, deps: &[BuildPath], targets: &[BuildPath], _out: &mut dyn Write, _kwargs: &Kwargs) -> Result<(), ActionError> {
    for (source, target) in pairs(deps, targets, "copy")? {
      if source.is_dir() {
        copy_dir(source, target)?;
      } else {
        ensure_parent(target)?;
        fs::copy(source, target)?;
      }
      debug!(from = %source.display(), to = %target.display(), "copied");
    }
    Ok(())
  }
}

/// Directory-aware staleness for [`CopyAction`].
///
/// A directory copy is stale when any file under the source directory is
/// missing from the target or newer than its copy.
pub fn copy_should_rebuild(targets: &[BuildPath], deps: &[BuildPath]) -> Result<bool, ActionError> {
  // Let the action report malformed argument lists.
  let Ok(pairs) = pairs(deps, targets, "copy") else {
    return Ok(true);
  };

  for (source, target) in pairs {
    if !target.exists() {
      return Ok(true);
    }
    if !source.is_dir() {
      if newer(source, target) {
        return Ok(true);
      }
      continue;
    }

    for entry in WalkDir::new(source) {
      let entry = entry?;
      if !entry.file_type().is_file() {
        continue;
      }
      let Ok(relative) = entry.path().strip_prefix(source) else {
        continue;
      };
      let copy = target.join(relative);
      if !copy.exists() || newer(entry.path(), &copy) {
        return Ok(true);
      }
    }
  }
  Ok(false)
}

/// Renames dependencies to targets pairwise.
#[derive(Debug, Default)]
pub struct MoveAction;

impl NativeAction for MoveAction {
  fn name(&self) -> &str {
    "move"
  }

  fn run(&self, deps: &[BuildPath], targets: &[BuildPath], _out: &mut dyn Write, _kwargs: &Kwargs) -> Result<(), ActionError> {
    let pairs = pairs(deps, targets, "move")?;
    if pairs.len() != real_paths(deps).count() {
      return Err(ActionError::InvalidArguments(
        "move needs one dependency per target".to_string(),
      ));
    }
    for (source, target) in pairs {
      ensure_parent(target)?;
      fs::rename(source, target)?;
      debug!(from = %source.display(), to = %target.display(), "moved");
    }
    Ok(())
  }
}

/// Deletes its targets. Dependencies are ignored.
#[derive(Debug, Default)]
pub struct RemoveAction;

impl NativeAction for RemoveAction {
  fn name(&self) -> &str {
    "remove"
  }

  fn run(&self, _deps: &[BuildPath], targets: &[BuildPath], _out: &mut dyn Write, _kwargs: &Kwargs) -> Result<(), ActionError> {
    for target in real_paths(targets) {
      remove_path(target)?;
      debug!(path = %target.display(), "removed");
    }
    Ok(())
  }
}

/// A removal is pending as long as any target is still there.
pub fn remove_should_rebuild(targets: &[BuildPath], _deps: &[BuildPath]) -> Result<bool, ActionError> {
  Ok(targets.iter().any(BuildPath::exists))
}

/// Creates every target as a directory, including missing parents.
#[derive(Debug, Default)]
pub struct MkdirAction;

impl NativeAction for MkdirAction {
  fn name(&self) -> &str {
    "mkdir"
  }

  fn run(&self, _deps: &[BuildPath], targets: &[BuildPath], _out: &mut dyn Write, _kwargs: &Kwargs) -> Result<(), ActionError> {
    for target in real_paths(targets) {
      fs::create_dir_all(target)?;
    }
    Ok(())
  }
}

/// Delete a file or a whole directory tree.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
  if path.is_dir() {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  }
}

fn copy_dir(source: &Path, target: &Path) -> Result<(), ActionError> {
  for entry in WalkDir::new(source) {
    let entry = entry?;
    let Ok(relative) = entry.path().strip_prefix(source) else {
      continue;
    };
    let destination: PathBuf = target.join(relative);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&destination)?;
    } else {
      ensure_parent(&destination)?;
      fs::copy(entry.path(), &destination)?;
    }
  }
  Ok(())
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
  match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
    _ => Ok(()),
  }
}

/// Line up real dependencies with real targets.
fn pairs<'a>(deps: &'a [BuildPath], targets: &'a [BuildPath], action: &str) -> Result<Vec<(&'a Path, &'a Path)>, ActionError> {
  let sources: Vec<&Path> = real_paths(deps).collect();
  let outputs: Vec<&Path> = real_paths(targets).collect();
  if let [single] = sources[..] {
    return Ok(outputs.into_iter().map(|target| (single, target)).collect());
  }
  if sources.is_empty() || sources.len() != outputs.len() {
    return Err(ActionError::InvalidArguments(format!(
      "{action} cannot pair {} dependencies with {} targets",
      sources.len(),
      outputs.len()
    )));
  }
  Ok(sources.into_iter().zip(outputs).collect())
}

fn modified(path: &Path) -> Option<SystemTime> {
  fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn newer(a: &Path, b: &Path) -> bool {
  match (modified(a), modified(b)) {
    (Some(a), Some(b)) => a > b,
    _ => true,
  }
}
