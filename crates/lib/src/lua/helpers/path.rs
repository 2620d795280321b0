use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;

use crate::eval::SessionState;
use crate::path::{absolutize, normalize};

/// Create the `remake.path` table.
///
/// `absolute` and `glob` resolve relative paths against the directory of the
/// script currently being evaluated.
pub fn create_path_helpers(lua: &Lua, state: Rc<SessionState>) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  // remake.path.join(...)
  path.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| {
      let mut joined = PathBuf::new();
      for segment in segments {
        if let LuaValue::String(s) = segment {
          joined.push(&*s.to_str()?);
        }
      }
      Ok(display(&joined))
    })?,
  )?;

  path.set(
    "dirname",
    lua.create_function(|_, p: String| Ok(Path::new(&p).parent().map(display).unwrap_or_default()))?,
  )?;

  path.set(
    "basename",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // Extension including the dot, empty when there is none.
  path.set(
    "extname",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .extension()
          .map(|e| format!(".{}", e.to_string_lossy()))
          .unwrap_or_default(),
      )
    })?,
  )?;

  // Swap the extension, `ext` given with or without the dot.
  path.set(
    "with_ext",
    lua.create_function(|_, (p, ext): (String, String)| {
      Ok(display(&Path::new(&p).with_extension(ext.trim_start_matches('.'))))
    })?,
  )?;

  path.set(
    "is_absolute",
    lua.create_function(|_, p: String| Ok(Path::new(&p).is_absolute()))?,
  )?;

  path.set(
    "normalize",
    lua.create_function(|_, p: String| Ok(display(&normalize(Path::new(&p)))))?,
  )?;

  path.set(
    "relative",
    lua.create_function(|_, (from, to): (String, String)| Ok(relative(Path::new(&from), Path::new(&to))))?,
  )?;

  let st = state.clone();
  path.set(
    "absolute",
    lua.create_function(move |_, p: String| {
      let base = st.stack.borrow().base_dir();
      Ok(display(&absolutize(&base, Path::new(&p))))
    })?,
  )?;

  // remake.path.glob(pattern) - sorted absolute matches
  path.set(
    "glob",
    lua.create_function(move |_, pattern: String| {
      let base = state.stack.borrow().base_dir();
      let full = if Path::new(&pattern).is_absolute() {
        pattern
      } else {
        format!("{}/{}", glob::Pattern::escape(&base.to_string_lossy()), pattern)
      };
      let mut matches: Vec<String> = glob::glob(&full)
        .map_err(LuaError::external)?
        .filter_map(Result::ok)
        .map(|p| display(&normalize(&p)))
        .collect();
      matches.sort();
      Ok(matches)
    })?,
  )?;

  Ok(path)
}

fn display(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

fn relative(from: &Path, to: &Path) -> String {
  let from: Vec<Component> = from.components().collect();
  let to: Vec<Component> = to.components().collect();
  let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

  let mut relative = PathBuf::new();
  for _ in common..from.len() {
    relative.push("..");
  }
  for component in &to[common..] {
    relative.push(component);
  }

  if relative.as_os_str().is_empty() {
    ".".to_string()
  } else {
    display(&relative)
  }
}
