//! Test utilities for remake-lib.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::SystemTime;

/// An output sink whose contents stay readable after it was handed away.
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

/// Create `path` (or reuse it) and set its modification time.
pub fn touch_at(path: &Path, time: SystemTime) {
  let file = File::options()
    .create(true)
    .append(true)
    .open(path)
    .expect("open file for touching");
  file.set_modified(time).expect("set modification time");
}
