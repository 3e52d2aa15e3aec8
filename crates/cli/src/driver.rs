use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use log::{debug, info};

use atlas_engine::{
    AnalysisDriver, AnalysisError, AnalysisOptions, ChangeSet, ContextRoot, DriverProvider,
    FolderDisposition, NotificationSink, SourceId,
};
use atlas_fs::WatchEvent;

/// Driver that mirrors the engine's bookkeeping into the log. A real
/// analysis pipeline hangs off this seam.
pub struct LoggingDriver {
    root: PathBuf,
    added: HashSet<PathBuf>,
    next_id: u64,
}

impl AnalysisDriver for LoggingDriver {
    fn add_file(&mut self, path: &Path) -> SourceId {
        debug!("[driver {}] add {}", self.root.display(), path.display());
        self.added.insert(path.to_path_buf());
        self.next_id += 1;
        SourceId::new(self.next_id)
    }

    fn change_file(&mut self, path: &Path) {
        debug!("[driver {}] change {}", self.root.display(), path.display());
    }

    fn remove_file(&mut self, path: &Path) {
        debug!("[driver {}] remove {}", self.root.display(), path.display());
        self.added.remove(path);
    }

    fn added_files(&self) -> &HashSet<PathBuf> {
        &self.added
    }

    fn configure(&mut self, _options: &AnalysisOptions, _disposition: &FolderDisposition) {
        debug!("[driver {}] reconfigured", self.root.display());
    }
}

pub struct LoggingProvider;

impl DriverProvider for LoggingProvider {
    fn add_analysis_driver(
        &mut self,
        root: &ContextRoot,
        _options: &AnalysisOptions,
        _disposition: &FolderDisposition,
    ) -> Box<dyn AnalysisDriver> {
        info!("[contexts] + {}", root.root.display());
        Box::new(LoggingDriver {
            root: root.root.clone(),
            added: HashSet::new(),
            next_id: 0,
        })
    }

    fn apply_changes_to_context(&mut self, folder: &Path, changes: &ChangeSet) {
        info!(
            "[contexts] {}: +{} ~{} -{}",
            folder.display(),
            changes.added().len(),
            changes.changed().len(),
            changes.removed().len()
        );
    }

    fn apply_file_removed(&mut self, driver: &mut dyn AnalysisDriver, path: &Path) {
        driver.remove_file(path);
    }

    fn remove_context(&mut self, folder: &Path, flushed: &[PathBuf]) {
        info!(
            "[contexts] - {} ({} file(s) flushed)",
            folder.display(),
            flushed.len()
        );
    }

    fn broadcast_watch_event(&mut self, _event: &WatchEvent) {}

    fn after_watch_event(&mut self, _event: &WatchEvent) {}

    fn analysis_options_updated(&mut self, folder: &Path) {
        info!("[contexts] options updated for {}", folder.display());
    }
}

pub struct LoggingSink;

impl NotificationSink for LoggingSink {
    fn record_analysis_errors(&mut self, path: &Path, errors: Vec<AnalysisError>) {
        if errors.is_empty() {
            debug!("[diagnostics] {}: clear", path.display());
        } else {
            info!("[diagnostics] {}: {} issue(s)", path.display(), errors.len());
        }
    }
}
