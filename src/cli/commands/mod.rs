pub mod config;
pub mod list;
pub mod sync;

use crate::config::{load_config, LoadedConfig};
use crate::errors::Result;
use crate::git::{find_repository_root, is_git_repository};
use std::env;
use std::path::{Path, PathBuf};

/// Repository root of the current directory, if there is one
fn current_repository_root() -> Result<Option<PathBuf>> {
    let current_dir = env::current_dir()?;
    repository_root_of(&current_dir)
}

fn repository_root_of(dir: &Path) -> Result<Option<PathBuf>> {
    if !is_git_repository(dir) {
        return Ok(None);
    }
    Ok(Some(find_repository_root(dir)?))
}

/// Configuration visible from the current directory
fn load_visible_config() -> Result<(Option<PathBuf>, LoadedConfig)> {
    let repo_root = current_repository_root()?;
    let loaded = load_config(repo_root.as_deref())?;
    Ok((repo_root, loaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    #[test]
    fn test_repository_root_of() {
        let tmp = TempDir::new().unwrap();
        assert!(repository_root_of(tmp.path()).unwrap().is_none());

        Command::new("git")
            .args(["init", "--quiet"])
            .current_dir(tmp.path())
            .output()
            .unwrap();
        let nested = tmp.path().join("src");
        std::fs::create_dir_all(&nested).unwrap();

        let root = repository_root_of(&nested).unwrap().unwrap();
        assert_eq!(root.canonicalize().unwrap(), tmp.path().canonicalize().unwrap());
    }
}
