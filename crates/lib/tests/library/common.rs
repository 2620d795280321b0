use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use remake_lib::path::BuildPath;
use remake_lib::{RunConfig, Session};
use tempfile::TempDir;

/// Output sink that stays readable after the session took ownership of it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
  pub fn contents(&self) -> String {
    String::from_utf8_lossy(&self.0.borrow()).into_owned()
  }
}

impl Write for SharedBuffer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.borrow_mut().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// A temporary project directory with its canonical path.
pub struct Project {
  _temp: TempDir,
  pub root: PathBuf,
}

impl Project {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    Self { _temp: temp, root }
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root.join(relative)
  }

  /// Write `ReMakeFile.lua` into `dir` (relative to the root).
  pub fn script(&self, dir: &str, body: &str) {
    let dir = self.path(dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("ReMakeFile.lua"), body).unwrap();
  }

  pub fn file(&self, relative: &str, contents: &str) {
    let path = self.path(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
  }

  /// Push the modification time of `relative` into the future.
  pub fn bump(&self, relative: &str) {
    let file = File::options().append(true).open(self.path(relative)).unwrap();
    file
      .set_modified(SystemTime::now() + Duration::from_secs(60))
      .unwrap();
  }

  /// Set the modification time of `relative` to `secs` seconds ago.
  pub fn age(&self, relative: &str, secs: u64) {
    let file = File::options().append(true).open(self.path(relative)).unwrap();
    file
      .set_modified(SystemTime::now() - Duration::from_secs(secs))
      .unwrap();
  }

  /// Paths relative to the project root, for readable assertions.
  pub fn names(&self, paths: &[BuildPath]) -> Vec<String> {
    paths
      .iter()
      .map(|path| match path.as_real() {
        Some(real) => real.strip_prefix(&self.root).unwrap().to_string_lossy().into_owned(),
        None => path.to_string(),
      })
      .collect()
  }

  pub fn read(&self, relative: &str) -> String {
    fs::read_to_string(self.path(relative)).unwrap()
  }

  pub fn exists(&self, relative: &str) -> bool {
    self.path(relative).exists()
  }

  pub fn session(&self, config: RunConfig) -> (Session, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let session = Session::new(config, Box::new(buffer.clone())).unwrap();
    (session, buffer)
  }
}

pub fn run(project: &Project, config: RunConfig) -> (remake_lib::context::Context, String) {
  let (session, buffer) = project.session(config);
  let context = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap();
  (context, buffer.contents())
}
