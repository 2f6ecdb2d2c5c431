pub mod repository;
pub mod status;

pub use repository::{GitOutput, GitRepository, MergeMode, MergeOutcome, StashPopOutcome};
pub use status::{ConflictedPath, StatusEntry, UnmergedKind};

use crate::errors::{StackSyncError, Result};
use std::path::{Path, PathBuf};

/// Name of the remote every branch is compared against
pub const DEFAULT_REMOTE: &str = "origin";

/// Check if a directory is inside a Git working tree
pub fn is_git_repository(path: &Path) -> bool {
    git2::Repository::discover(path)
        .map(|repo| repo.workdir().is_some())
        .unwrap_or(false)
}

/// Find the root of the Git working tree containing `start_path`
pub fn find_repository_root(start_path: &Path) -> Result<PathBuf> {
    let repo = git2::Repository::discover(start_path)?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| StackSyncError::config("Repository has no working directory (bare repo?)"))?;

    Ok(workdir.to_path_buf())
}
