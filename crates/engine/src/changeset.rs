use std::path::{Path, PathBuf};

/// The atomic delta delivered to a driver: three pairwise-disjoint,
/// duplicate-free path lists. The first record of a path wins; later
/// records of the same path, in any list, are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    added: Vec<PathBuf>,
    changed: Vec<PathBuf>,
    removed: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    pub fn record_added(&mut self, path: PathBuf) {
        if !self.contains(&path) {
            self.added.push(path);
        }
    }

    pub fn record_changed(&mut self, path: PathBuf) {
        if !self.contains(&path) {
            self.changed.push(path);
        }
    }

    pub fn record_removed(&mut self, path: PathBuf) {
        if !self.contains(&path) {
            self.removed.push(path);
        }
    }

    pub fn added(&self) -> &[PathBuf] {
        &self.added
    }

    pub fn changed(&self) -> &[PathBuf] {
        &self.changed
    }

    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    fn contains(&self, path: &Path) -> bool {
        self.added.iter().any(|p| p == path)
            || self.changed.iter().any(|p| p == path)
            || self.removed.iter().any(|p| p == path)
    }
}

#[cfg(test)]
#[path = "changeset_tests.rs"]
mod tests;
