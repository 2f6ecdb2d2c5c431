use super::current_repository_root;
use crate::cli::output::Output;
use crate::cli::prompt::TerminalDecision;
use crate::config::{load_config, tool_artifacts};
use crate::errors::Result;
use crate::stack::{RunOptions, Stack, StackSource, SyncOrchestrator};
use tracing::info;

/// Sync the stack named by `targets` (or the default stack)
pub fn run(targets: &[String], skip_conflict_check: bool) -> Result<u8> {
    let Some(repo_root) = current_repository_root()? else {
        Output::error("Not inside a git repository");
        Output::tip("Run stack-sync from a git working tree");
        return Ok(1);
    };

    let loaded = load_config(Some(&repo_root))?;

    let (stack, source) = match Stack::resolve(targets, &loaded.config) {
        Ok(resolved) => resolved,
        Err(e) => {
            Output::error(&e);
            Output::tip("Pass at least two branches, or a stack name from the configuration:");
            Output::command_example("stack-sync main feature-a feature-b");
            Output::command_example("stack-sync --list");
            return Ok(1);
        }
    };

    match &source {
        StackSource::Arguments => Output::section(format!("Syncing {stack}")),
        StackSource::Named(name) | StackSource::Default(name) => {
            Output::section(format!("Syncing stack '{name}': {stack}"))
        }
    }
    info!("Stack resolved from {:?}", source);

    let options = RunOptions::from_settings(&loaded.config.settings, skip_conflict_check)
        .with_excluded_paths(tool_artifacts(&repo_root, &loaded));

    let mut decisions = TerminalDecision::new();
    let report = SyncOrchestrator::new(repo_root, stack, options, &mut decisions).run();

    if let Some(reason) = report.abort_reason() {
        Output::spacing();
        Output::error(format!("Sync aborted: {reason}"));
    }

    Ok(report.exit_code())
}
