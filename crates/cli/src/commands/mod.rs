pub mod scan;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use atlas_engine::{ContextManager, ManagerConfig};
use atlas_fs::WatchService;

use crate::driver::{LoggingProvider, LoggingSink};

pub use scan::ScanArgs;
pub use watch::WatchArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover the analysis contexts under the given roots and print the
    /// tree.
    ///
    /// Example:
    ///   atlas scan ~/projects/app
    ///   atlas scan --exclude build /ws
    Scan(ScanArgs),

    /// Discover, then keep the context tree live against filesystem
    /// changes until interrupted.
    Watch(WatchArgs),
}

pub(crate) fn build_manager(
    analyzed_files: &[String],
    watch_service: Box<dyn WatchService>,
) -> ContextManager {
    let config = ManagerConfig {
        analyzed_files: analyzed_files.to_vec(),
        // Match the dominant filesystem behaviour of the platform.
        case_insensitive_filters: cfg!(any(windows, target_os = "macos")),
    };

    ContextManager::new(
        config,
        Box::new(LoggingProvider),
        Box::new(LoggingSink),
        watch_service,
    )
}

pub(crate) fn absolutize(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    paths
        .into_iter()
        .map(|p| {
            std::path::absolute(&p).with_context(|| format!("cannot resolve path {:?}", p))
        })
        .collect()
}
