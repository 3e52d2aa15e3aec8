use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use crossbeam::channel::{self, RecvTimeoutError};
use log::{error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

use atlas_fs::{NotifyWatchService, WatchSignal};

use crate::commands::{absolutize, build_manager};
use crate::printer;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Root folders to discover analysis contexts in.
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,

    /// Path to exclude from analysis. Repeatable.
    #[arg(long, short = 'x')]
    pub exclude: Vec<PathBuf>,

    /// Glob selecting analysable files. Repeatable.
    #[arg(long = "analyze", default_value = "*.dart")]
    pub analyzed_files: Vec<String>,

    /// Print the initial tree as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: WatchArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("[watch] {e}");
            eprintln!("[watch] {e}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: WatchArgs) -> Result<ExitCode> {
    let shutdown = Arc::new(AtomicBool::new(false));

    // Signal handlers only set the atomic flag.
    for sig in [SIGINT, SIGTERM] {
        flag::register(sig, Arc::clone(&shutdown))
            .with_context(|| format!("Failed to register signal handler for {sig}"))?;
    }

    let (tx, rx) = channel::unbounded::<WatchSignal>();
    let service = NotifyWatchService::new(tx).context("Failed to create filesystem watcher")?;

    let mut manager = build_manager(&args.analyzed_files, Box::new(service));
    manager.set_roots(absolutize(args.roots)?, absolutize(args.exclude)?)?;
    printer::print_tree(&manager.summarize(), args.json)?;

    info!("watching {} analysis root(s)", manager.included_roots().len());

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown signal observed; stopping watch loop.");
            break;
        }

        // Short timeout so shutdown is observed promptly.
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(signal) => manager.handle_watch_signal(&signal),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                error!("watch channel closed unexpectedly");
                break;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
