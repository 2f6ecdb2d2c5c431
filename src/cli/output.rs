use console::{style, Emoji};
use std::fmt::Display;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "OK ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "ERROR ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "WARNING ");
static INFO: Emoji<'_, '_> = Emoji("ℹ ", "INFO ");
static ARROW: Emoji<'_, '_> = Emoji("→ ", "-> ");
static BULLET: Emoji<'_, '_> = Emoji("• ", "* ");

/// Centralized output formatting for consistent CLI presentation.
///
/// User-facing messages go to stdout; diagnostics go through `tracing`
/// to stderr.
pub struct Output;

impl Output {
    /// Print a success message with checkmark
    pub fn success<T: Display>(message: T) {
        println!("{}{}", style(CHECK).green(), message);
    }

    /// Print an error message with X mark
    pub fn error<T: Display>(message: T) {
        println!("{}{}", style(CROSS).red(), message);
    }

    pub fn warning<T: Display>(message: T) {
        println!("{}{}", style(WARN).yellow(), message);
    }

    pub fn info<T: Display>(message: T) {
        println!("{}{}", style(INFO).cyan(), message);
    }

    /// Print a sub-item with arrow prefix
    pub fn sub_item<T: Display>(message: T) {
        println!("  {}{}", style(ARROW).dim(), message);
    }

    pub fn bullet<T: Display>(message: T) {
        println!("  {}{}", style(BULLET).dim(), message);
    }

    /// Print a section header
    pub fn section<T: Display>(title: T) {
        println!("\n{}", style(title).bold().underlined());
    }

    /// Print a tip/suggestion
    pub fn tip<T: Display>(message: T) {
        println!("{} {}", style("TIP:").cyan(), style(message).dim());
    }

    /// Print a command the user can copy
    pub fn command_example<T: Display>(command: T) {
        println!("    {}", style(command).yellow());
    }

    pub fn numbered_item<T: Display>(number: usize, message: T) {
        println!("  {}. {}", style(number).cyan(), message);
    }

    pub fn spacing() {
        println!();
    }
}
