//! Gzip-compressed tarball creation.

use std::fs::{self, File};
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::action::{ActionError, Kwargs, NativeAction, real_paths};
use crate::path::BuildPath;

/// Packs every real dependency into the `.tar.gz` named by the single target.
///
/// Entries are stored under their file names; directories keep their tree.
#[derive(Debug, Default)]
pub struct ArchiveAction;

impl NativeAction for ArchiveAction {
  fn name(&self) -> &str {
    "archive"
  }

  fn run(&self, deps: &[BuildPath], targets: &[BuildPath], _out: &mut dyn Write, _kwargs: &Kwargs) -> Result<(), ActionError> {
    let mut outputs = real_paths(targets);
    let (Some(archive), None) = (outputs.next(), outputs.next()) else {
      return Err(ActionError::InvalidArguments(
        "archive expects exactly one target".to_string(),
      ));
    };

    if let Some(parent) = archive.parent() {
      fs::create_dir_all(parent)?;
    }

    let encoder = GzEncoder::new(File::create(archive)?, Compression::default());
    let mut tarball = tar::Builder::new(encoder);

    for source in real_paths(deps) {
      let Some(name) = source.file_name() else {
        return Err(ActionError::InvalidArguments(format!(
          "cannot archive {}",
          source.display()
        )));
      };
      if source.is_dir() {
        tarball.append_dir_all(name, source)?;
      } else {
        tarball.append_path_with_name(source, name)?;
      }
      debug!(archive = %archive.display(), entry = %source.display(), "archived");
    }

    tarball.into_inner()?.finish()?;
    Ok(())
  }
}
