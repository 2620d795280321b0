//! Run configuration.
//!
//! A [`RunConfig`] is built once per invocation and passed by reference to the
//! graph builder, the execution engine and rule application. Nothing in the
//! engine reads mode flags from global state.

use std::fmt;

/// Conventional name of the build script evaluated in each directory.
pub const DEFAULT_CONFIG_FILE: &str = "ReMakeFile.lua";

/// What a run does with the resolved plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
  /// Build stale targets.
  #[default]
  Build,
  /// Delete rule-produced targets.
  Clean,
  /// Clean, then build over the same plan.
  Rebuild,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Build => "build",
      Mode::Clean => "clean",
      Mode::Rebuild => "rebuild",
    }
  }

  pub fn cleans(self) -> bool {
    matches!(self, Mode::Clean | Mode::Rebuild)
  }

  pub fn builds(self) -> bool {
    matches!(self, Mode::Build | Mode::Rebuild)
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Immutable settings for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunConfig {
  pub mode: Mode,
  /// Log what would happen without touching the filesystem.
  pub dry_run: bool,
  pub verbose: bool,
}

impl RunConfig {
  /// Dry runs are always verbose.
  pub fn new(mode: Mode, dry_run: bool, verbose: bool) -> Self {
    Self {
      mode,
      dry_run,
      verbose: verbose || dry_run,
    }
  }

  pub fn build() -> Self {
    Self::new(Mode::Build, false, false)
  }

  pub fn clean() -> Self {
    Self::new(Mode::Clean, false, false)
  }

  pub fn rebuild() -> Self {
    Self::new(Mode::Rebuild, false, false)
  }

  pub fn with_dry_run(self) -> Self {
    Self::new(self.mode, true, self.verbose)
  }

  /// Whether the graph builder applies clean-mode policy to missing ground
  /// dependencies. A rebuild resolves like a build.
  pub fn is_clean(&self) -> bool {
    self.mode == Mode::Clean
  }
}
