use std::path::PathBuf;

use thiserror::Error;

/// Errors the context manager surfaces to callers. Per-file failures
/// (unreadable descriptors, vanished folders, failing validators) are
/// handled in place and never become one of these.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// An included root exists but is not a directory.
    #[error("analysis root {0:?} is not a directory")]
    UnsupportedRoot(PathBuf),
}
