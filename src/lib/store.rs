//! Central store location and env file editing.
//!
//! The central store is a single directory (by default `~/env`) holding one
//! subdirectory per project. Project directories are created lazily and never
//! deleted by this tool. The editor rewrites env files by whole-file replace
//! through a sibling temporary file, so a crash mid-write never leaves a torn
//! file behind.

use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::parse::EnvFile;

/// Filename used by the single-key set operation.
pub const DEFAULT_ENV_FILENAME: &str = ".env";

const CENTRAL_DIR_NAME: &str = "env";

/// Root directory of the central store, resolved once at startup and passed
/// around explicitly so tests can point it at a temporary directory.
#[derive(Debug, Clone)]
pub struct StoreRoot {
  path: PathBuf,
}

impl StoreRoot {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Resolves the default root, `~/env`.
  pub fn from_home() -> Result<Self, StoreError> {
    let home = dirs::home_dir().ok_or(StoreError::HomeNotFound)?;
    Ok(Self::new(home.join(CENTRAL_DIR_NAME)))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Returns the project's directory under the root, creating the root and
  /// the subdirectory if either is missing. Idempotent.
  ///
  /// The project name is used verbatim as a directory name, so names that
  /// would escape the root are rejected.
  pub fn project_dir(&self, project: &str) -> Result<PathBuf, StoreError> {
    if project.is_empty()
      || project == "."
      || project == ".."
      || project.contains(['/', '\\'])
    {
      return Err(StoreError::InvalidProjectName(project.to_string()));
    }

    let dir = self.path.join(project);

    #[cfg(feature = "tracing")]
    debug!(?dir, "Resolved project env directory");

    std::fs::create_dir_all(&dir).map_err(StoreError::CreateDir)?;

    Ok(dir)
  }
}

/// Outcome of [`upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
  /// The key was not present and has been appended.
  Added,
  /// The key was present and its value has been replaced.
  Updated,
  /// The key was present and the caller declined the overwrite. Nothing was
  /// written; this is a no-op, not a failure.
  Declined,
}

/// Returns whether `key` is assigned somewhere in the file at `path`.
/// A missing file counts as "not present".
pub fn key_exists(path: &Path, key: &str) -> Result<bool, StoreError> {
  if !path.exists() {
    return Ok(false);
  }

  let content = std::fs::read_to_string(path).map_err(StoreError::Read)?;

  Ok(EnvFile::from(content.as_str()).contains_key(key))
}

/// Sets `key` to `value` in the env file at `path`, creating the file if it
/// does not exist.
///
/// When the key is already assigned, `confirm` decides whether to overwrite;
/// a `false` answer leaves the file untouched and returns
/// [`SetOutcome::Declined`].
pub fn upsert(
  path: &Path,
  key: &str,
  value: &str,
  mut confirm: impl FnMut(&str) -> std::io::Result<bool>,
) -> Result<SetOutcome, StoreError> {
  let content = if path.exists() {
    std::fs::read_to_string(path).map_err(StoreError::Read)?
  } else {
    String::new()
  };

  let mut file = EnvFile::from(content.as_str());

  let outcome = if file.contains_key(key) {
    if !confirm(key).map_err(StoreError::Prompt)? {
      #[cfg(feature = "tracing")]
      info!("Overwrite of {} declined, leaving file untouched", key);

      return Ok(SetOutcome::Declined);
    }
    SetOutcome::Updated
  } else {
    SetOutcome::Added
  };

  file.set(key, value);
  write_atomic(path, &file.to_string())?;

  #[cfg(feature = "tracing")]
  info!(?path, "Wrote env file");

  Ok(outcome)
}

/// Whole-file replace via a sibling temp file and rename.
fn write_atomic(path: &Path, content: &str) -> Result<(), StoreError> {
  let dir = path
    .parent()
    .ok_or_else(|| StoreError::InvalidPath(path.to_path_buf()))?;

  let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(StoreError::Write)?;
  tmp.write_all(content.as_bytes()).map_err(StoreError::Write)?;
  tmp.persist(path).map_err(|e| StoreError::Write(e.error))?;

  Ok(())
}

/// Errors from store location and env file editing.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The home directory could not be determined
  #[error("Could not determine the home directory")]
  HomeNotFound,
  /// The project name would escape the central root
  #[error("Invalid project name: {0:?}")]
  InvalidProjectName(String),
  /// Error creating the central root or a project directory
  #[error("Failed to create store directory: {0}")]
  CreateDir(std::io::Error),
  /// Error reading an env file
  #[error("Failed to read env file: {0}")]
  Read(std::io::Error),
  /// Error writing an env file
  #[error("Failed to write env file: {0}")]
  Write(std::io::Error),
  /// The confirmation prompt failed
  #[error("Confirmation prompt failed: {0}")]
  Prompt(std::io::Error),
  /// The env file path has no parent directory
  #[error("Env file path has no parent directory: {0}")]
  InvalidPath(PathBuf),
}
