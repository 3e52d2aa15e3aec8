use std::process::ExitCode;

use clap::Parser;

mod commands;
mod driver;
mod printer;

use atlas_runtime::logging;
use commands::Command;

#[derive(Debug, Parser)]
#[command(
    name = "atlas",
    version,
    about = "Live analysis-context map of a workspace"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan(args) => commands::scan::run(args),
        Command::Watch(args) => commands::watch::run(args),
    }
}
