pub mod settings;

pub use settings::{Settings, StackDefinition, StackSyncConfig, Toggle};

use crate::errors::Result;
use std::path::{Path, PathBuf};

/// File name of the per-repository configuration
pub const CONFIG_FILE_NAME: &str = "stack-sync.json";

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "STACK_SYNC_CONFIG";

/// A configuration together with the file it came from
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// `None` when no configuration file was found
    pub path: Option<PathBuf>,
    pub config: StackSyncConfig,
}

/// Get the user-level configuration file (~/.config/stack-sync/config.json)
pub fn get_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stack-sync").join("config.json"))
}

/// Get the configuration file for a specific repository
pub fn get_repo_config_path(repo_path: &Path) -> PathBuf {
    repo_path.join(CONFIG_FILE_NAME)
}

/// Candidate configuration files, highest priority first
pub fn config_search_paths(repo_path: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
        if !explicit.is_empty() {
            paths.push(PathBuf::from(explicit));
        }
    }

    if let Some(repo_path) = repo_path {
        paths.push(get_repo_config_path(repo_path));
    }

    if let Some(user_path) = get_user_config_path() {
        paths.push(user_path);
    }

    paths
}

/// Load the first configuration file that exists. Absence of every candidate
/// is not an error; a file that exists but cannot be parsed is.
pub fn load_config(repo_path: Option<&Path>) -> Result<LoadedConfig> {
    for path in config_search_paths(repo_path) {
        if path.is_file() {
            let config = StackSyncConfig::load_from_file(&path)?;
            tracing::debug!("Loaded configuration from {}", path.display());
            return Ok(LoadedConfig {
                path: Some(path),
                config,
            });
        }
    }

    tracing::debug!("No configuration file found, using defaults");
    Ok(LoadedConfig::default())
}

/// Paths (relative to the repository root) the tool itself may create,
/// which never count as local changes.
pub fn tool_artifacts(repo_path: &Path, loaded: &LoadedConfig) -> Vec<String> {
    let mut artifacts = vec![CONFIG_FILE_NAME.to_string()];

    if let Some(path) = &loaded.path {
        if let Ok(relative) = path.strip_prefix(repo_path) {
            let relative = relative.to_string_lossy().replace('\\', "/");
            if !artifacts.contains(&relative) {
                artifacts.push(relative);
            }
        }
    }

    artifacts
}
