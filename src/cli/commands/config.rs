use super::load_visible_config;
use crate::cli::output::Output;
use crate::config::{config_search_paths, CONFIG_ENV_VAR};
use crate::errors::Result;

const EXAMPLE_CONFIG: &str = r#"{
  "stacks": {
    "auth": {
      "description": "Login rework",
      "branches": ["main", "auth-api", "auth-ui"]
    }
  },
  "defaultStack": "auth",
  "settings": {
    "preConflictCheck": { "enabled": true },
    "autoPush": { "enabled": false },
    "strictMode": { "enabled": false }
  }
}"#;

/// Show where configuration is looked up and what is in effect
pub fn run() -> Result<u8> {
    let (repo_root, loaded) = load_visible_config()?;

    Output::section("Configuration lookup");
    for (index, path) in config_search_paths(repo_root.as_deref()).iter().enumerate() {
        let state = if loaded.path.as_ref() == Some(path) {
            "in use"
        } else if path.is_file() {
            "shadowed"
        } else {
            "not found"
        };
        Output::numbered_item(index + 1, format!("{} ({state})", path.display()));
    }
    Output::sub_item(format!("{CONFIG_ENV_VAR} overrides every other location"));

    let settings = &loaded.config.settings;
    Output::section("Effective settings");
    Output::bullet(format!("preConflictCheck: {}", on_off(settings.pre_conflict_check.enabled)));
    Output::bullet(format!("autoPush: {}", on_off(settings.auto_push.enabled)));
    Output::bullet(format!("strictMode: {}", on_off(settings.strict_mode.enabled)));
    Output::bullet(format!(
        "defaultStack: {}",
        loaded.config.default_stack.as_deref().unwrap_or("(none)")
    ));
    Output::bullet(format!("stacks defined: {}", loaded.config.stacks.len()));

    if loaded.path.is_none() {
        Output::spacing();
        Output::tip("No configuration file found. Example:");
        println!("{EXAMPLE_CONFIG}");
    }

    Ok(0)
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
