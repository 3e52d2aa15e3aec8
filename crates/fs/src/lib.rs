mod filters;
mod scan;
mod watch;

pub use filters::{ExcludeSet, PathFilter, SourceMatcher};
pub use scan::{DirEntryInfo, EntryKind, is_dir, is_file, list_dir, read_to_string_if_exists};
pub use watch::{
    ChangeKind, NotifyWatchService, NullWatchService, WatchEvent, WatchHandle, WatchService,
    WatchSignal,
};
