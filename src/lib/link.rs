//! Symlink creation between project directories and the central store.

use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

const ENV_FILENAME: &str = ".env";
const ENV_PREFIX: &str = ".env.";

/// Matches `.env` itself, or `.env.` followed by a non-empty suffix
/// (`.env.local`, `.env.production`, ...). `.envrc` and a bare `.env.` do
/// not match.
pub fn is_env_file_name(name: &str) -> bool {
  name == ENV_FILENAME
    || name
      .strip_prefix(ENV_PREFIX)
      .is_some_and(|suffix| !suffix.is_empty())
}

/// Points `project_root/filename` at `env_dir/filename`.
///
/// An existing symlink at the link path is removed and recreated
/// unconditionally, without checking its current target. An existing
/// non-symlink is a hard stop: the run aborts with
/// [`LinkError::PathCollision`] and the file is never touched.
///
/// Returns the target path for reporting.
pub fn link(project_root: &Path, env_dir: &Path, filename: &str) -> Result<PathBuf, LinkError> {
  let target = env_dir.join(filename);
  let link_path = project_root.join(filename);

  match std::fs::symlink_metadata(&link_path) {
    Ok(meta) if meta.file_type().is_symlink() => {
      #[cfg(feature = "tracing")]
      debug!(?link_path, "Removing existing symlink");

      std::fs::remove_file(&link_path).map_err(LinkError::Remove)?;
    }
    Ok(_) => return Err(LinkError::PathCollision(link_path)),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(e) => return Err(LinkError::Inspect(e)),
  }

  symlink_file(&target, &link_path).map_err(LinkError::Create)?;

  #[cfg(feature = "tracing")]
  info!(?link_path, ?target, "Symlink created");

  Ok(target)
}

#[cfg(unix)]
fn symlink_file(target: &Path, link_path: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(target, link_path)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link_path: &Path) -> std::io::Result<()> {
  std::os::windows::fs::symlink_file(target, link_path)
}

/// Errors from symlink management.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
  /// A real file or directory occupies the link path; resolving this is left
  /// to the user
  #[error("{0} already exists and is not a symlink")]
  PathCollision(PathBuf),
  /// Error inspecting the link path
  #[error("Failed to inspect link path: {0}")]
  Inspect(std::io::Error),
  /// Error removing the previous symlink
  #[error("Failed to remove existing symlink: {0}")]
  Remove(std::io::Error),
  /// Error creating the symlink
  #[error("Failed to create symlink: {0}")]
  Create(std::io::Error),
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_is_env_file_name() {
    assert!(is_env_file_name(".env"));
    assert!(is_env_file_name(".env.local"));
    assert!(is_env_file_name(".env.production"));

    assert!(!is_env_file_name(".env."));
    assert!(!is_env_file_name(".envrc"));
    assert!(!is_env_file_name("env"));
    assert!(!is_env_file_name("config.env"));
  }

  #[test]
  fn test_link_creates_symlink() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("project");
    let central = temp_dir.path().join("central");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::create_dir_all(&central).unwrap();
    std::fs::write(central.join(".env"), "A=1\n").unwrap();

    let target = link(&project, &central, ".env").unwrap();

    assert_eq!(target, central.join(".env"));
    let link_path = project.join(".env");
    assert!(link_path.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(std::fs::read_link(&link_path).unwrap(), target);
    assert_eq!(std::fs::read_to_string(&link_path).unwrap(), "A=1\n");
  }

  #[test]
  fn test_link_replaces_existing_symlink() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("project");
    let central = temp_dir.path().join("central");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::create_dir_all(&central).unwrap();

    // Stale link pointing somewhere else entirely
    let stale = temp_dir.path().join("elsewhere");
    std::fs::write(&stale, "old\n").unwrap();
    symlink_file(&stale, &project.join(".env")).unwrap();

    let target = link(&project, &central, ".env").unwrap();

    assert_eq!(std::fs::read_link(project.join(".env")).unwrap(), target);
  }

  #[test]
  fn test_link_refuses_to_clobber_regular_file() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("project");
    let central = temp_dir.path().join("central");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::create_dir_all(&central).unwrap();
    std::fs::write(project.join(".env"), "precious\n").unwrap();

    let result = link(&project, &central, ".env");

    match result {
      Err(LinkError::PathCollision(path)) => assert_eq!(path, project.join(".env")),
      other => panic!("Expected PathCollision, got {:?}", other),
    }
    // The file must be untouched
    assert_eq!(
      std::fs::read_to_string(project.join(".env")).unwrap(),
      "precious\n"
    );
  }
}
