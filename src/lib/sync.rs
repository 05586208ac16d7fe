//! Migration and reconciliation between a project directory and its central
//! counterpart.
//!
//! # Migrate
//!
//! `migrate` moves every env file found in the project directory into the
//! central store and symlinks it back. Files already present centrally are
//! left where they are but still relinked, so re-running after a partial
//! migration repairs missing symlinks without moving anything twice.
//!
//! # Sync
//!
//! `sync` reconciles both directions in two fixed passes:
//! 1. central → project: central files with no entry at the project path get
//!    a symlink.
//! 2. project → central: project files absent centrally get the migrate
//!    treatment.
//!
//! The pass order means a file present on both sides is never moved or
//! overwritten in either direction. A symlink/target pair is the steady state
//! and is left alone; a real file on both sides is a collision the user must
//! resolve by hand.

use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::link::{self, LinkError};

/// One filesystem effect performed by a migrate or sync run, reported back to
/// the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  /// An env file was moved from the project into the central store.
  Moved { name: String, dest: PathBuf },
  /// An env file was already present centrally; the move was skipped.
  AlreadyCentral { name: String },
  /// A symlink was created (or recreated) in the project directory.
  Linked { link: PathBuf, target: PathBuf },
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Action::Moved { name, dest } => {
        write!(f, "Moved {} to {}", name, dest.display())
      }
      Action::AlreadyCentral { name } => {
        write!(f, "Skipping {}: already present in the central store", name)
      }
      Action::Linked { link, target } => {
        write!(f, "Symlink created: {} -> {}", link.display(), target.display())
      }
    }
  }
}

/// Moves every env file in `project_root` into `env_dir` and links it back.
///
/// Idempotent: a second run finds only symlinks whose targets already exist
/// centrally, so it moves nothing and merely recreates the links.
pub fn migrate(project_root: &Path, env_dir: &Path) -> Result<Vec<Action>, SyncError> {
  #[cfg(feature = "tracing")]
  info!(?project_root, ?env_dir, "Starting migration");

  let mut actions = Vec::new();

  for name in env_file_names(project_root)? {
    migrate_one(project_root, env_dir, &name, &mut actions)?;
  }

  Ok(actions)
}

/// Two-pass reconciliation between `project_root` and `env_dir`.
pub fn sync(project_root: &Path, env_dir: &Path) -> Result<Vec<Action>, SyncError> {
  #[cfg(feature = "tracing")]
  info!(?project_root, ?env_dir, "Starting sync");

  let mut actions = Vec::new();

  // Pass 1: central -> project. Only acts where the project path has no
  // entry at all, so an existing file or symlink is never clobbered here.
  for name in env_file_names(env_dir)? {
    let link_path = project_root.join(name.as_str());
    if std::fs::symlink_metadata(&link_path).is_err() {
      let target = link::link(project_root, env_dir, &name).map_err(SyncError::Link)?;
      actions.push(Action::Linked {
        link: link_path,
        target,
      });
    }
  }

  // Pass 2: project -> central.
  for name in env_file_names(project_root)? {
    let source = project_root.join(name.as_str());
    let is_symlink = std::fs::symlink_metadata(&source)
      .map(|meta| meta.file_type().is_symlink())
      .unwrap_or(false);

    if env_dir.join(name.as_str()).exists() {
      // Symlink plus central target is the converged state. A real file on
      // both sides means two diverging copies; never pick a winner.
      if !is_symlink {
        return Err(SyncError::Link(LinkError::PathCollision(source)));
      }

      #[cfg(feature = "tracing")]
      debug!(name = %name, "Already converged");

      continue;
    }

    migrate_one(project_root, env_dir, &name, &mut actions)?;
  }

  Ok(actions)
}

/// Migrates a single env file: moves it centrally unless already there, then
/// (re)creates the symlink.
fn migrate_one(
  project_root: &Path,
  env_dir: &Path,
  name: &str,
  actions: &mut Vec<Action>,
) -> Result<(), SyncError> {
  let source = project_root.join(name);
  let dest = env_dir.join(name);

  if dest.exists() {
    #[cfg(feature = "tracing")]
    debug!(name = %name, "Skipping move, file already present centrally");

    actions.push(Action::AlreadyCentral {
      name: name.to_string(),
    });
  } else {
    move_file(&source, &dest).map_err(|e| SyncError::Move(source.clone(), e))?;

    #[cfg(feature = "tracing")]
    debug!(name = %name, ?dest, "Moved env file into central store");

    actions.push(Action::Moved {
      name: name.to_string(),
      dest: dest.clone(),
    });
  }

  let target = link::link(project_root, env_dir, name).map_err(SyncError::Link)?;
  actions.push(Action::Linked {
    link: source,
    target,
  });

  Ok(())
}

/// Lists entries of `dir` whose name matches the env-file pattern, sorted for
/// stable output.
fn env_file_names(dir: &Path) -> Result<Vec<String>, SyncError> {
  let entries =
    std::fs::read_dir(dir).map_err(|e| SyncError::ListDir(dir.to_path_buf(), e))?;

  let mut names = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|e| SyncError::ListDir(dir.to_path_buf(), e))?;
    if let Some(name) = entry.file_name().to_str()
      && link::is_env_file_name(name)
    {
      names.push(name.to_string());
    }
  }

  names.sort();
  Ok(names)
}

fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
  match std::fs::rename(source, dest) {
    Ok(()) => Ok(()),
    Err(_) => {
      // The central root may live on a different filesystem than the project
      std::fs::copy(source, dest)?;
      std::fs::remove_file(source)
    }
  }
}

/// Errors that can occur during migration or sync.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
  /// Error listing a directory
  #[error("Failed to list directory {0}: {1}")]
  ListDir(PathBuf, std::io::Error),
  /// Error moving an env file into the central store
  #[error("Failed to move {0}: {1}")]
  Move(PathBuf, std::io::Error),
  /// Symlink creation failed or hit a path collision
  #[error("{0}")]
  Link(LinkError),
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("project");
    let central = temp_dir.path().join("central");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::create_dir_all(&central).unwrap();
    (temp_dir, project, central)
  }

  fn assert_linked(project: &Path, central: &Path, name: &str) {
    let link_path = project.join(name);
    let meta = std::fs::symlink_metadata(&link_path).unwrap();
    assert!(meta.file_type().is_symlink(), "{} should be a symlink", name);
    assert_eq!(std::fs::read_link(&link_path).unwrap(), central.join(name));
  }

  #[test]
  fn test_migrate_moves_and_links() {
    let (_guard, project, central) = setup();
    std::fs::write(project.join(".env"), "A=1\n").unwrap();
    std::fs::write(project.join(".env.local"), "B=2\n").unwrap();
    std::fs::write(project.join(".envrc"), "ignored\n").unwrap();

    let actions = migrate(&project, &central).unwrap();

    assert_eq!(std::fs::read_to_string(central.join(".env")).unwrap(), "A=1\n");
    assert_eq!(
      std::fs::read_to_string(central.join(".env.local")).unwrap(),
      "B=2\n"
    );
    assert_linked(&project, &central, ".env");
    assert_linked(&project, &central, ".env.local");

    // Non-matching file is left alone
    assert!(project.join(".envrc").is_file());
    assert!(!central.join(".envrc").exists());

    assert_eq!(
      actions
        .iter()
        .filter(|a| matches!(a, Action::Moved { .. }))
        .count(),
      2
    );
  }

  #[test]
  fn test_migrate_is_idempotent() {
    let (_guard, project, central) = setup();
    std::fs::write(project.join(".env"), "A=1\n").unwrap();

    migrate(&project, &central).unwrap();
    let second = migrate(&project, &central).unwrap();

    // Second run moves nothing, only relinks
    assert!(second.iter().all(|a| !matches!(a, Action::Moved { .. })));
    assert!(
      second
        .iter()
        .any(|a| matches!(a, Action::AlreadyCentral { .. }))
    );
    assert_eq!(std::fs::read_to_string(central.join(".env")).unwrap(), "A=1\n");
    assert_linked(&project, &central, ".env");
  }

  #[test]
  fn test_migrate_relinks_unlinked_central_file() {
    let (_guard, project, central) = setup();
    // Previously migrated but the symlink went missing
    std::fs::write(central.join(".env"), "A=1\n").unwrap();

    // Nothing in the project dir matches, so migrate alone does nothing...
    let actions = migrate(&project, &central).unwrap();
    assert!(actions.is_empty());

    // ...but sync pass 1 restores the link
    let actions = sync(&project, &central).unwrap();
    assert_linked(&project, &central, ".env");
    assert!(actions.iter().any(|a| matches!(a, Action::Linked { .. })));
  }

  #[test]
  fn test_sync_converges_both_directions() {
    let (_guard, project, central) = setup();
    std::fs::write(central.join(".env"), "central\n").unwrap();
    std::fs::write(project.join(".env.local"), "local\n").unwrap();

    sync(&project, &central).unwrap();

    // Every env name now exists centrally with a project symlink
    for name in [".env", ".env.local"] {
      assert!(central.join(name).is_file());
      assert_linked(&project, &central, name);
    }
    assert_eq!(
      std::fs::read_to_string(central.join(".env.local")).unwrap(),
      "local\n"
    );
  }

  #[test]
  fn test_sync_steady_state_is_untouched() {
    let (_guard, project, central) = setup();
    std::fs::write(project.join(".env"), "A=1\n").unwrap();
    migrate(&project, &central).unwrap();

    let actions = sync(&project, &central).unwrap();

    assert!(actions.is_empty());
    assert_linked(&project, &central, ".env");
  }

  #[test]
  fn test_sync_reports_collision_for_file_on_both_sides() {
    let (_guard, project, central) = setup();
    std::fs::write(project.join(".env"), "project copy\n").unwrap();
    std::fs::write(central.join(".env"), "central copy\n").unwrap();

    let result = sync(&project, &central);

    assert!(matches!(
      result,
      Err(SyncError::Link(LinkError::PathCollision(_)))
    ));
    // Neither copy was modified
    assert_eq!(
      std::fs::read_to_string(project.join(".env")).unwrap(),
      "project copy\n"
    );
    assert_eq!(
      std::fs::read_to_string(central.join(".env")).unwrap(),
      "central copy\n"
    );
  }

  #[test]
  fn test_migrate_aborts_on_collision() {
    let (_guard, project, central) = setup();
    std::fs::write(project.join(".env"), "project copy\n").unwrap();
    std::fs::write(central.join(".env"), "central copy\n").unwrap();

    let result = migrate(&project, &central);

    assert!(matches!(
      result,
      Err(SyncError::Link(LinkError::PathCollision(_)))
    ));
    assert_eq!(
      std::fs::read_to_string(project.join(".env")).unwrap(),
      "project copy\n"
    );
  }
}
