use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use log::error;

use atlas_fs::NullWatchService;

use crate::commands::{absolutize, build_manager};
use crate::printer;

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Root folders to discover analysis contexts in.
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,

    /// Path to exclude from analysis. Repeatable.
    #[arg(long, short = 'x')]
    pub exclude: Vec<PathBuf>,

    /// Glob selecting analysable files. Repeatable.
    #[arg(long = "analyze", default_value = "*.dart")]
    pub analyzed_files: Vec<String>,

    /// Print the tree as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ScanArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("[scan] {e}");
            eprintln!("[scan] {e}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: ScanArgs) -> Result<ExitCode> {
    let mut manager = build_manager(&args.analyzed_files, Box::new(NullWatchService));
    manager.set_roots(absolutize(args.roots)?, absolutize(args.exclude)?)?;

    printer::print_tree(&manager.summarize(), args.json)?;
    Ok(ExitCode::SUCCESS)
}
