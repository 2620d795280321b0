//! Tagged path model.
//!
//! Everything the engine resolves, orders or executes is a [`BuildPath`]:
//!
//! - [`BuildPath::Real`] - an absolute, lexically normalized filesystem path
//! - [`BuildPath::VirtualTarget`] / [`BuildPath::VirtualDep`] - named logical entities
//! - [`BuildPath::Glob`] - a single-wildcard template used by pattern rules
//!
//! Real paths are made absolute when a rule or target is declared. Virtual names
//! and glob patterns are kept verbatim.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// The wildcard marker of a [`GlobPattern`].
pub const WILDCARD: char = '*';

/// Type marker for virtual targets handed to Lua scripts.
pub const VIRTUAL_TARGET_TYPE: &str = "VirtualTarget";

/// Type marker for virtual dependencies handed to Lua scripts.
pub const VIRTUAL_DEP_TYPE: &str = "VirtualDep";

/// A target, dependency or pattern known to the engine.
#[derive(Debug, Clone)]
pub enum BuildPath {
  Real(PathBuf),
  VirtualTarget(String),
  VirtualDep(String),
  Glob(GlobPattern),
}

impl BuildPath {
  /// Make `path` absolute against `base` and normalize it lexically.
  pub fn real(base: &Path, path: impl AsRef<Path>) -> Self {
    BuildPath::Real(absolutize(base, path.as_ref()))
  }

  pub fn virtual_target(name: impl Into<String>) -> Self {
    BuildPath::VirtualTarget(name.into())
  }

  pub fn virtual_dep(name: impl Into<String>) -> Self {
    BuildPath::VirtualDep(name.into())
  }

  pub fn glob(pattern: impl Into<String>) -> Self {
    BuildPath::Glob(GlobPattern::new(pattern))
  }

  pub fn is_virtual(&self) -> bool {
    matches!(self, BuildPath::VirtualTarget(_) | BuildPath::VirtualDep(_))
  }

  pub fn as_real(&self) -> Option<&Path> {
    match self {
      BuildPath::Real(path) => Some(path),
      _ => None,
    }
  }

  /// Whether this entity currently exists on the filesystem.
  ///
  /// Virtual entities and patterns never exist.
  pub fn exists(&self) -> bool {
    self.as_real().is_some_and(Path::exists)
  }

  /// Whether the path exists as a regular file or a directory.
  pub fn is_file_or_dir(&self) -> bool {
    self.as_real().is_some_and(|p| p.is_file() || p.is_dir())
  }

  fn rank(&self) -> u8 {
    match self {
      BuildPath::Real(_) => 0,
      BuildPath::VirtualTarget(_) | BuildPath::VirtualDep(_) => 1,
      BuildPath::Glob(_) => 2,
    }
  }

  fn key(&self) -> &str {
    match self {
      BuildPath::Real(path) => path.to_str().unwrap_or_default(),
      BuildPath::VirtualTarget(name) | BuildPath::VirtualDep(name) => name,
      BuildPath::Glob(glob) => glob.as_str(),
    }
  }
}

impl fmt::Display for BuildPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildPath::Real(path) => write!(f, "{}", path.display()),
      BuildPath::VirtualTarget(name) | BuildPath::VirtualDep(name) => f.write_str(name),
      BuildPath::Glob(glob) => f.write_str(glob.as_str()),
    }
  }
}

// A VirtualTarget and a VirtualDep with the same name denote the same entity.
impl PartialEq for BuildPath {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (BuildPath::Real(a), BuildPath::Real(b)) => a.as_os_str() == b.as_os_str(),
      (BuildPath::Glob(a), BuildPath::Glob(b)) => a == b,
      (a, b) if a.is_virtual() && b.is_virtual() => a.key() == b.key(),
      _ => false,
    }
  }
}

impl Eq for BuildPath {}

impl Hash for BuildPath {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.rank().hash(state);
    match self {
      BuildPath::Real(path) => path.as_os_str().hash(state),
      _ => self.key().hash(state),
    }
  }
}

impl PartialOrd for BuildPath {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for BuildPath {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (BuildPath::Real(a), BuildPath::Real(b)) => a.as_os_str().cmp(b.as_os_str()),
      _ => (self.rank(), self.key()).cmp(&(other.rank(), other.key())),
    }
  }
}

/// A path template holding a single [`WILDCARD`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobPattern {
  pattern: String,
}

/// The part of a concrete path that matched a [`GlobPattern`].
///
/// `anchor` is the directory portion in front of the pattern's literal prefix,
/// `stem` is what the wildcard stood for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture<'a> {
  pub anchor: &'a str,
  pub stem: &'a str,
}

impl GlobPattern {
  pub fn new(pattern: impl Into<String>) -> Self {
    Self {
      pattern: pattern.into(),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.pattern
  }

  pub fn wildcard_count(&self) -> usize {
    self.pattern.matches(WILDCARD).count()
  }

  /// Literal text before the wildcard.
  pub fn prefix(&self) -> &str {
    self
      .pattern
      .split_once(WILDCARD)
      .map(|(prefix, _)| prefix)
      .unwrap_or(&self.pattern)
  }

  /// Literal text after the wildcard.
  pub fn suffix(&self) -> &str {
    self
      .pattern
      .split_once(WILDCARD)
      .map(|(_, suffix)| suffix)
      .unwrap_or("")
  }

  pub fn is_absolute(&self) -> bool {
    Path::new(self.prefix()).is_absolute()
  }

  /// Match a concrete path against the pattern.
  ///
  /// The literal prefix must start the path or directly follow a separator, the
  /// wildcard covers a non-empty span without separators, and the literal suffix
  /// must end the path. The right-most alignment wins.
  pub fn capture<'a>(&self, candidate: &'a str) -> Option<Capture<'a>> {
    if self.wildcard_count() != 1 {
      return None;
    }
    let prefix = self.prefix();
    let head = candidate.strip_suffix(self.suffix())?;

    let starts = std::iter::once(0).chain(head.char_indices().filter(|(_, c)| is_separator(*c)).map(|(i, _)| i + 1));
    let mut starts: Vec<usize> = starts.collect();
    starts.reverse();

    for start in starts {
      let Some(stem) = head[start..].strip_prefix(prefix) else {
        continue;
      };
      if stem.is_empty() || stem.contains(is_separator) {
        continue;
      }
      return Some(Capture {
        anchor: &head[..start],
        stem,
      });
    }
    None
  }

  /// Substitute a captured wildcard span into this pattern.
  ///
  /// Relative patterns are re-anchored in the directory the capture came from.
  pub fn instantiate(&self, capture: &Capture<'_>) -> String {
    let body = match self.pattern.split_once(WILDCARD) {
      Some((prefix, suffix)) => format!("{prefix}{}{suffix}", capture.stem),
      None => self.pattern.clone(),
    };
    if self.is_absolute() {
      body
    } else {
      format!("{}{}", capture.anchor, body)
    }
  }

  /// Extract the wildcard span of `matched` (a concrete path matching `self`)
  /// and substitute it into `dep`.
  pub fn instantiate_from(&self, matched: &str, dep: &GlobPattern) -> Option<PathBuf> {
    let capture = self.capture(matched)?;
    Some(PathBuf::from(dep.instantiate(&capture)))
  }
}

impl fmt::Display for GlobPattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.pattern)
  }
}

fn is_separator(c: char) -> bool {
  std::path::is_separator(c)
}

/// Join `path` onto `base` unless it is already absolute, then drop `.` and
/// resolve `..` components without touching the filesystem.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    normalize(path)
  } else {
    normalize(&base.join(path))
  }
}

/// Lexical normalization of `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !normalized.pop() {
          normalized.push(component);
        }
      }
      _ => normalized.push(component),
    }
  }
  normalized
}
