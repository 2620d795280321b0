//! Modification-time staleness.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::trace;

use crate::path::BuildPath;

/// Whether `target` has to be (re)built from `deps`.
///
/// Virtual targets are always stale, as are real targets that do not exist.
/// Otherwise a target is stale when any real dependency was modified strictly
/// after it. Virtual dependencies carry no timestamp and are skipped.
pub fn should_rebuild(target: &BuildPath, deps: &[BuildPath]) -> bool {
  let Some(target) = target.as_real() else {
    return true;
  };
  let Some(built) = modified(target) else {
    return true;
  };

  for dep in deps.iter().filter_map(BuildPath::as_real) {
    match modified(dep) {
      Some(changed) if changed > built => {
        trace!(target = %target.display(), dep = %dep.display(), "dependency is newer");
        return true;
      }
      Some(_) => {}
      None => return true,
    }
  }
  false
}

fn modified(path: &Path) -> Option<SystemTime> {
  fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
