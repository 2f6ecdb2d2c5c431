use clap::Parser;
use stack_sync::cli::Cli;
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let code = cli.run().map_err(anyhow::Error::new)?;
    Ok(ExitCode::from(code))
}
