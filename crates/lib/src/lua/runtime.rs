use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;

use crate::eval::SessionState;
use crate::lua::globals::{self, REMAKE_GLOBAL};

/// Create a Lua runtime with the `remake` global registered.
///
/// `./lua/?.lua` is added to `package.path` so scripts can share modules.
pub fn create_runtime(state: Rc<SessionState>) -> LuaResult<Lua> {
  let lua = Lua::new();
  let package: LuaTable = lua.globals().get("package")?;
  let package_path: String = package.get("path")?;
  package.set("path", format!("./lua/?.lua;./lua/?/init.lua;{package_path}"))?;

  globals::register_globals(&lua, state)?;

  Ok(lua)
}

/// Evaluate the build script at `path`.
///
/// `remake.dir` is set to the script's directory first.
pub fn load_file(lua: &Lua, path: &Path) -> LuaResult<()> {
  let canonical_path = dunce::canonicalize(path)
    .map_err(|e| LuaError::external(format!("cannot canonicalize '{}': {}", path.display(), e)))?;
  let content = std::fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  set_dir(lua, canonical_path.parent().unwrap_or(Path::new("")))?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .exec()
}

/// Point `remake.dir` at `dir`.
pub fn set_dir(lua: &Lua, dir: &Path) -> LuaResult<()> {
  let remake: LuaTable = lua.globals().get(REMAKE_GLOBAL)?;
  remake.set("dir", dir.to_string_lossy().into_owned())
}
