//! Filesystem operations performed by the build.
//!
//! The build only ever needs a handful of operations, all expressed by
//! [`FileSystem`]. Directory preparation is clean-slate: a directory that is
//! about to be populated is removed and recreated.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::process::LogHandle;

#[derive(Debug, Error)]
#[error("failed to {action} {}: {source}", path.display())]
pub struct FsError {
  pub action: &'static str,
  pub path: PathBuf,
  #[source]
  pub source: io::Error,
}

impl FsError {
  fn new<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
    move |source| Self {
      action,
      path: path.to_path_buf(),
      source,
    }
  }
}

pub trait FileSystem: Send + Sync {
  /// Remove `path` if present, then create it (and its parents) empty.
  fn recreate_dir(&self, path: &Path) -> Result<(), FsError>;

  /// Remove a file or directory tree; missing paths are not an error.
  fn remove(&self, path: &Path) -> Result<(), FsError>;

  /// Copy the tree rooted at `from` into `to`, creating `to`.
  fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), FsError>;

  /// Create or truncate a log file.
  fn create_log_file(&self, path: &Path) -> Result<LogHandle, FsError>;

  /// Write a file, creating parent directories.
  fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;

  fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
  fn recreate_dir(&self, path: &Path) -> Result<(), FsError> {
    self.remove(path)?;
    fs::create_dir_all(path).map_err(FsError::new("create directory", path))
  }

  fn remove(&self, path: &Path) -> Result<(), FsError> {
    let meta = match fs::symlink_metadata(path) {
      Ok(meta) => meta,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
      Err(e) => return Err(FsError::new("inspect", path)(e)),
    };
    if meta.is_dir() {
      fs::remove_dir_all(path).map_err(FsError::new("remove directory", path))
    } else {
      fs::remove_file(path).map_err(FsError::new("remove file", path))
    }
  }

  fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), FsError> {
    fs::create_dir_all(to).map_err(FsError::new("create directory", to))?;

    for entry in WalkDir::new(from).min_depth(1).sort_by_file_name() {
      let entry = entry.map_err(|e| {
        let path = e.path().unwrap_or(from).to_path_buf();
        FsError {
          action: "walk",
          path,
          source: e.into(),
        }
      })?;
      let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
      let dest = to.join(relative);

      if entry.file_type().is_dir() {
        fs::create_dir_all(&dest).map_err(FsError::new("create directory", &dest))?;
      } else {
        // Symlinks are copied as the file they point at.
        fs::copy(entry.path(), &dest).map_err(FsError::new("copy", entry.path()))?;
      }
    }
    Ok(())
  }

  fn create_log_file(&self, path: &Path) -> Result<LogHandle, FsError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(FsError::new("create directory", parent))?;
    }
    LogHandle::create(path).map_err(FsError::new("create log file", path))
  }

  fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(FsError::new("create directory", parent))?;
    }
    fs::write(path, contents).map_err(FsError::new("write", path))
  }

  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn recreate_dir_empties_existing_content() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("build");
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("stale.o"), "x").unwrap();

    LocalFs.recreate_dir(&dir).unwrap();

    assert!(dir.is_dir());
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
  }

  #[test]
  fn remove_missing_path_is_ok() {
    let temp = TempDir::new().unwrap();
    LocalFs.remove(&temp.path().join("absent")).unwrap();
  }

  #[test]
  fn copy_tree_preserves_structure() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("include");
    fs::create_dir_all(src.join("git2/sys")).unwrap();
    fs::write(src.join("git2.h"), "top").unwrap();
    fs::write(src.join("git2/sys/repository.h"), "nested").unwrap();

    let dest = temp.path().join("out/include");
    LocalFs.copy_tree(&src, &dest).unwrap();

    assert_eq!(fs::read_to_string(dest.join("git2.h")).unwrap(), "top");
    assert_eq!(fs::read_to_string(dest.join("git2/sys/repository.h")).unwrap(), "nested");
  }

  #[test]
  fn copy_tree_of_missing_source_fails_with_path() {
    let temp = TempDir::new().unwrap();
    let err = LocalFs
      .copy_tree(&temp.path().join("missing"), &temp.path().join("dest"))
      .unwrap_err();
    assert_eq!(err.action, "walk");
    assert!(err.to_string().contains("missing"));
  }

  #[test]
  fn log_file_is_truncated_on_creation() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t/build.log");
    LocalFs.write(&path, b"old output").unwrap();

    let log = LocalFs.create_log_file(&path).unwrap();

    assert_eq!(log.path(), path);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
  }
}
