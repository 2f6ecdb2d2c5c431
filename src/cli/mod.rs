pub mod commands;
pub mod output;
pub mod prompt;

use crate::errors::Result;
use clap::Parser;

#[derive(Parser)]
#[command(name = "stack-sync")]
#[command(about = "Merge a stack of branches in order, checking the remote and predicting conflicts first")]
#[command(version)]
pub struct Cli {
    /// Branches in merge order (base first), or the name of a configured stack
    pub targets: Vec<String>,

    /// List the stacks defined in the configuration
    #[arg(long, short)]
    pub list: bool,

    /// Show where configuration is read from and the effective settings
    #[arg(long, short)]
    pub config: bool,

    /// Skip the trial merges that predict conflicts before merging
    #[arg(long, short)]
    pub skip_conflict_check: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Run the selected command and return the process exit code
    pub fn run(self) -> Result<u8> {
        self.setup_logging();

        if self.no_color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        if self.list {
            return commands::list::run();
        }

        if self.config {
            return commands::config::run();
        }

        commands::sync::run(&self.targets, self.skip_conflict_check)
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr);

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["stack-sync", "-s", "-v", "main", "f1"]).unwrap();
        assert!(cli.skip_conflict_check);
        assert!(cli.verbose);
        assert_eq!(cli.targets, vec!["main".to_string(), "f1".to_string()]);

        let cli = Cli::try_parse_from(["stack-sync", "-l"]).unwrap();
        assert!(cli.list);
        let cli = Cli::try_parse_from(["stack-sync", "-c", "--no-color"]).unwrap();
        assert!(cli.config);
        assert!(cli.no_color);
    }

    #[test]
    fn test_stack_name_target() {
        let cli = Cli::try_parse_from(["stack-sync", "auth"]).unwrap();
        assert_eq!(cli.targets, vec!["auth".to_string()]);
        assert!(!cli.skip_conflict_check);
    }
}
