//! Ready-made builders backed by the native file actions.

use std::rc::Rc;

use crate::action::actions::archive::ArchiveAction;
use crate::action::actions::fs::{
  CopyAction, MkdirAction, MoveAction, RemoveAction, copy_should_rebuild, remove_should_rebuild,
};
use crate::builder::Builder;

/// Names of the builtin builders, as exposed to build scripts.
pub const BUILTIN_NAMES: [&str; 5] = ["copy", "move", "remove", "mkdir", "archive"];

pub fn copy() -> Builder {
  Builder::native(CopyAction).with_rebuild_check(Rc::new(copy_should_rebuild))
}

pub fn move_() -> Builder {
  Builder::native(MoveAction)
}

pub fn remove() -> Builder {
  Builder::native(RemoveAction)
    .destructive(true)
    .with_rebuild_check(Rc::new(remove_should_rebuild))
}

pub fn mkdir() -> Builder {
  Builder::native(MkdirAction)
}

pub fn archive() -> Builder {
  Builder::native(ArchiveAction)
}

/// Look up a builtin builder by name.
pub fn by_name(name: &str) -> Option<Builder> {
  match name {
    "copy" => Some(copy()),
    "move" => Some(move_()),
    "remove" => Some(remove()),
    "mkdir" => Some(mkdir()),
    "archive" => Some(archive()),
    _ => None,
  }
}
