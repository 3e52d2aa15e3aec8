use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

#[derive(Debug)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
}

/// List a directory, following symlinks.
///
/// A directory that vanished between enumeration and read is treated as
/// empty. Unreadable entries, dangling symlinks, and special files are
/// skipped. Entries come back name-sorted so discovery order is stable.
pub fn list_dir(dir: &Path) -> Vec<DirEntryInfo> {
    let rd = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("[scan] read_dir({:?}) failed: {e}", dir);
            }
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for entry_res in rd {
        let entry = match entry_res {
            Ok(e) => e,
            Err(e) => {
                warn!("[scan] error reading entry in {:?}: {e}", dir);
                continue;
            }
        };

        let name = match entry.file_name().to_str() {
            Some(s) => s.to_owned(),
            None => continue,
        };

        let path = entry.path();

        // Follow symlinks so a link to a folder scans like one. A broken
        // link has no metadata and drops out here.
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                debug!("[scan] skipping {:?}: {e}", path);
                continue;
            }
        };

        let kind = if meta.is_dir() {
            EntryKind::Dir
        } else if meta.is_file() {
            EntryKind::File
        } else {
            continue;
        };

        entries.push(DirEntryInfo { path, name, kind });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Read a file that may have vanished. `None` covers both absence and read
/// failure; the failure is logged, never propagated.
pub fn read_to_string_if_exists(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("[scan] read {:?} failed: {e}", path);
            }
            None
        }
    }
}

/// Existence check that follows symlinks; a dangling link is not a file.
#[inline]
pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

#[inline]
pub fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
