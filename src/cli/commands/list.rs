use super::load_visible_config;
use crate::cli::output::Output;
use crate::config::CONFIG_FILE_NAME;
use crate::errors::Result;
use console::style;

/// Print the configured stacks
pub fn run() -> Result<u8> {
    let (_, loaded) = load_visible_config()?;

    let Some(path) = &loaded.path else {
        Output::info("No configuration file found");
        Output::tip(format!(
            "Define stacks in {CONFIG_FILE_NAME} at the repository root, or pass branches directly:"
        ));
        Output::command_example("stack-sync main feature-a feature-b");
        return Ok(0);
    };

    let config = &loaded.config;
    Output::section(format!("Stacks in {}", path.display()));

    if config.stacks.is_empty() {
        Output::sub_item("No stacks defined");
        return Ok(0);
    }

    let default = config.default_stack.as_deref();
    for (name, definition) in &config.stacks {
        let marker = if Some(name.as_str()) == default {
            format!(" {}", style("(default)").green())
        } else {
            String::new()
        };
        println!("  {}{}", style(name).bold(), marker);

        if !definition.description.is_empty() {
            Output::sub_item(style(&definition.description).dim());
        }
        Output::sub_item(definition.branches.join(" → "));
    }

    Output::spacing();
    Output::tip("Sync a stack by name:");
    Output::command_example(format!(
        "stack-sync {}",
        default.unwrap_or_else(|| config.stacks.keys().next().map(String::as_str).unwrap_or("<stack>"))
    ));
    Ok(0)
}
