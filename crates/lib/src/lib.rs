//! remake-lib: a Lua-scripted build engine
//!
//! This crate provides the engine behind `remake`:
//! - `Rule` / `PatternRule`: named and generic recipes turning deps into targets
//! - `ScopeStack`: nested build scopes, one per evaluated directory
//! - `find_build_path` / `generate_dependency_list`: dependency resolution and ordering
//! - `build_deps` / `clean_deps`: plan execution
//! - `Session`: the Lua runtime driving all of the above from `ReMakeFile.lua`

pub mod action;
pub mod builder;
pub mod config;
pub mod context;
pub mod eval;
pub mod execute;
pub mod graph;
pub mod lua;
pub mod path;
pub mod plan;
pub mod rule;
pub mod stale;
pub mod util;

pub use config::{DEFAULT_CONFIG_FILE, Mode, RunConfig};
pub use eval::Session;
pub use execute::{EngineError, ExecutedRule};
