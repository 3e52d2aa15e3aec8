use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use serde::Serialize;
use thiserror::Error;

use atlas_fs::WatchEvent;

use crate::{AnalysisOptions, ChangeSet, FolderDisposition};

/// Opaque handle a driver issues for a registered source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(raw: u64) -> Self {
        SourceId(raw)
    }
}

/// Root description handed to the driver factory when a context is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRoot {
    pub root: PathBuf,
    pub excluded: Vec<PathBuf>,
    pub options_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A diagnostic produced by an external validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisError {
    pub message: String,
    pub severity: Severity,
}

impl AnalysisError {
    pub fn error(message: impl Into<String>) -> Self {
        AnalysisError {
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        AnalysisError {
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Per-context analysis driver, owned by its tree node. Only the engine
/// mutates its file set; `added_files` mirrors the owning context's sources.
pub trait AnalysisDriver {
    fn add_file(&mut self, path: &Path) -> SourceId;
    fn change_file(&mut self, path: &Path);
    fn remove_file(&mut self, path: &Path);
    fn added_files(&self) -> &HashSet<PathBuf>;
    fn configure(&mut self, options: &AnalysisOptions, disposition: &FolderDisposition);
}

/// Factory and downstream sink for analysis drivers.
pub trait DriverProvider {
    fn add_analysis_driver(
        &mut self,
        root: &ContextRoot,
        options: &AnalysisOptions,
        disposition: &FolderDisposition,
    ) -> Box<dyn AnalysisDriver>;

    fn apply_changes_to_context(&mut self, folder: &Path, changes: &ChangeSet);

    /// Must drop `path` from the driver's file set.
    fn apply_file_removed(&mut self, driver: &mut dyn AnalysisDriver, path: &Path);

    /// `flushed` lists the files of the removed context that no surviving
    /// context claims.
    fn remove_context(&mut self, folder: &Path, flushed: &[PathBuf]);

    fn broadcast_watch_event(&mut self, event: &WatchEvent);
    fn after_watch_event(&mut self, event: &WatchEvent);

    fn analysis_options_updated(&mut self, folder: &Path);
}

/// Receives diagnostics. Repeated calls for one path replace the prior
/// list; an empty list clears it.
pub trait NotificationSink {
    fn record_analysis_errors(&mut self, path: &Path, errors: Vec<AnalysisError>);
}

#[derive(Debug, Error)]
#[error("validator failed: {0}")]
pub struct ValidatorError(pub String);

/// External per-file analyser, re-run whenever a well-known file it applies
/// to changes. A failing validator resets the file's diagnostics to empty.
pub trait FileValidator {
    fn applies(&self, context_folder: &Path, path: &Path) -> bool;
    fn validate(&self, path: &Path, content: &str) -> Result<Vec<AnalysisError>, ValidatorError>;
}
