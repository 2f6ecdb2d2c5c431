use crate::errors::{StackSyncError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Contents of the stack-sync JSON configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StackSyncConfig {
    /// Named stacks, keyed by stack name
    pub stacks: BTreeMap<String, StackDefinition>,
    /// Stack used when no branches are given on the command line
    pub default_stack: Option<String>,
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StackDefinition {
    pub description: String,
    /// Branches in merge order: each branch is merged into the next one
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub pre_conflict_check: Toggle,
    pub auto_push: Toggle,
    pub strict_mode: Toggle,
}

/// An `{ "enabled": bool }` settings entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

impl Toggle {
    pub const fn on() -> Self {
        Self { enabled: true }
    }

    pub const fn off() -> Self {
        Self { enabled: false }
    }
}

impl Default for Toggle {
    fn default() -> Self {
        Self::off()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pre_conflict_check: Toggle::on(),
            auto_push: Toggle::off(),
            strict_mode: Toggle::off(),
        }
    }
}

impl StackSyncConfig {
    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StackSyncError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        Self::from_json(&content).map_err(|e| {
            StackSyncError::config(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: StackSyncConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a stack by name
    pub fn stack(&self, name: &str) -> Option<&StackDefinition> {
        self.stacks.get(name)
    }

    /// The configured default stack, if any
    pub fn default_stack(&self) -> Option<(&str, &StackDefinition)> {
        let name = self.default_stack.as_deref()?;
        self.stacks.get(name).map(|stack| (name, stack))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, stack) in &self.stacks {
            if name.trim().is_empty() {
                return Err(StackSyncError::config("Stack names must not be empty"));
            }

            if stack.branches.len() < 2 {
                return Err(StackSyncError::config(format!(
                    "Stack '{name}' must list at least two branches (has {})",
                    stack.branches.len()
                )));
            }

            if stack.branches.iter().any(|b| b.trim().is_empty()) {
                return Err(StackSyncError::config(format!(
                    "Stack '{name}' contains an empty branch name"
                )));
            }
        }

        if let Some(default) = &self.default_stack {
            if !self.stacks.contains_key(default) {
                return Err(StackSyncError::config(format!(
                    "defaultStack '{default}' does not name a configured stack"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"{
        "stacks": {
            "auth": {
                "description": "Login rework",
                "branches": ["main", "auth-api", "auth-ui"]
            },
            "billing": {
                "branches": ["develop", "billing"]
            }
        },
        "defaultStack": "auth",
        "settings": {
            "preConflictCheck": { "enabled": false },
            "autoPush": { "enabled": true },
            "strictMode": { "enabled": true }
        }
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = StackSyncConfig::from_json(FULL_CONFIG).unwrap();

        assert_eq!(config.stacks.len(), 2);
        let auth = config.stack("auth").unwrap();
        assert_eq!(auth.description, "Login rework");
        assert_eq!(auth.branches, vec!["main", "auth-api", "auth-ui"]);
        assert_eq!(config.stack("billing").unwrap().description, "");

        let (name, default) = config.default_stack().unwrap();
        assert_eq!(name, "auth");
        assert_eq!(default.branches.len(), 3);

        assert!(!config.settings.pre_conflict_check.enabled);
        assert!(config.settings.auto_push.enabled);
        assert!(config.settings.strict_mode.enabled);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = StackSyncConfig::from_json("{}").unwrap();

        assert!(config.stacks.is_empty());
        assert!(config.default_stack().is_none());
        assert_eq!(config.settings, Settings::default());
        assert!(config.settings.pre_conflict_check.enabled);
        assert!(!config.settings.auto_push.enabled);

        let partial =
            StackSyncConfig::from_json(r#"{"settings": {"autoPush": {"enabled": true}}}"#).unwrap();
        assert!(partial.settings.pre_conflict_check.enabled);
        assert!(partial.settings.auto_push.enabled);
    }

    #[test]
    fn test_validation_rejects_bad_stacks() {
        let single = r#"{"stacks": {"solo": {"branches": ["main"]}}}"#;
        assert!(StackSyncConfig::from_json(single).is_err());

        let empty_name = r#"{"stacks": {"s": {"branches": ["main", " "]}}}"#;
        assert!(StackSyncConfig::from_json(empty_name).is_err());

        let dangling_default = r#"{"defaultStack": "nope"}"#;
        let err = StackSyncConfig::from_json(dangling_default).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stack-sync.json");
        fs::write(&path, FULL_CONFIG).unwrap();

        let config = StackSyncConfig::load_from_file(&path).unwrap();
        assert_eq!(config.default_stack.as_deref(), Some("auth"));

        fs::write(&path, "{ not json").unwrap();
        let err = StackSyncConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
