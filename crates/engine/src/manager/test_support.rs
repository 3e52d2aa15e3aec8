use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use hashbrown::HashSet;

use atlas_fs::{NullWatchService, WatchEvent};

use crate::{
    AnalysisDriver, AnalysisError, AnalysisOptions, ChangeSet, ContextRoot, DriverProvider,
    FolderDisposition, NotificationSink, SourceId,
};

use super::{ContextManager, ManagerConfig};

/// Everything the engine told the outside world, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    DriverCreated(PathBuf),
    Changes {
        folder: PathBuf,
        added: Vec<PathBuf>,
        changed: Vec<PathBuf>,
        removed: Vec<PathBuf>,
    },
    FileRemoved(PathBuf),
    FileChanged(PathBuf),
    ContextRemoved {
        folder: PathBuf,
        flushed: Vec<PathBuf>,
    },
    OptionsUpdated(PathBuf),
}

pub type CallLog = Rc<RefCell<Vec<ProviderCall>>>;
pub type ErrorLog = Rc<RefCell<Vec<(PathBuf, Vec<AnalysisError>)>>>;

pub struct RecordingDriver {
    added: HashSet<PathBuf>,
    next_id: u64,
    log: CallLog,
}

impl AnalysisDriver for RecordingDriver {
    fn add_file(&mut self, path: &Path) -> SourceId {
        self.added.insert(path.to_path_buf());
        self.next_id += 1;
        SourceId::new(self.next_id)
    }

    fn change_file(&mut self, path: &Path) {
        self.log
            .borrow_mut()
            .push(ProviderCall::FileChanged(path.to_path_buf()));
    }

    fn remove_file(&mut self, path: &Path) {
        self.added.remove(path);
    }

    fn added_files(&self) -> &HashSet<PathBuf> {
        &self.added
    }

    fn configure(&mut self, _options: &AnalysisOptions, _disposition: &FolderDisposition) {}
}

pub struct RecordingProvider {
    pub log: CallLog,
}

impl DriverProvider for RecordingProvider {
    fn add_analysis_driver(
        &mut self,
        root: &ContextRoot,
        _options: &AnalysisOptions,
        _disposition: &FolderDisposition,
    ) -> Box<dyn AnalysisDriver> {
        self.log
            .borrow_mut()
            .push(ProviderCall::DriverCreated(root.root.clone()));
        Box::new(RecordingDriver {
            added: HashSet::new(),
            next_id: 0,
            log: Rc::clone(&self.log),
        })
    }

    fn apply_changes_to_context(&mut self, folder: &Path, changes: &ChangeSet) {
        let mut added = changes.added().to_vec();
        let mut changed = changes.changed().to_vec();
        let mut removed = changes.removed().to_vec();
        added.sort();
        changed.sort();
        removed.sort();
        self.log.borrow_mut().push(ProviderCall::Changes {
            folder: folder.to_path_buf(),
            added,
            changed,
            removed,
        });
    }

    fn apply_file_removed(&mut self, driver: &mut dyn AnalysisDriver, path: &Path) {
        driver.remove_file(path);
        self.log
            .borrow_mut()
            .push(ProviderCall::FileRemoved(path.to_path_buf()));
    }

    fn remove_context(&mut self, folder: &Path, flushed: &[PathBuf]) {
        self.log.borrow_mut().push(ProviderCall::ContextRemoved {
            folder: folder.to_path_buf(),
            flushed: flushed.to_vec(),
        });
    }

    fn broadcast_watch_event(&mut self, _event: &WatchEvent) {}

    fn after_watch_event(&mut self, _event: &WatchEvent) {}

    fn analysis_options_updated(&mut self, folder: &Path) {
        self.log
            .borrow_mut()
            .push(ProviderCall::OptionsUpdated(folder.to_path_buf()));
    }
}

pub struct RecordingSink {
    pub recorded: ErrorLog,
}

impl NotificationSink for RecordingSink {
    fn record_analysis_errors(&mut self, path: &Path, errors: Vec<AnalysisError>) {
        self.recorded.borrow_mut().push((path.to_path_buf(), errors));
    }
}

pub struct Fixture {
    pub manager: ContextManager,
    pub log: CallLog,
    pub errors: ErrorLog,
}

pub fn fixture() -> Fixture {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let errors: ErrorLog = Rc::new(RefCell::new(Vec::new()));

    let manager = ContextManager::new(
        ManagerConfig::default(),
        Box::new(RecordingProvider { log: Rc::clone(&log) }),
        Box::new(RecordingSink {
            recorded: Rc::clone(&errors),
        }),
        Box::new(NullWatchService),
    );

    Fixture {
        manager,
        log,
        errors,
    }
}

impl Fixture {
    pub fn take_calls(&self) -> Vec<ProviderCall> {
        self.log.borrow_mut().drain(..).collect()
    }

    /// Sorted file set of the driver owning `path`.
    pub fn files_of(&self, path: &Path) -> Vec<PathBuf> {
        let Some(driver) = self.manager.driver_for(path) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = driver.added_files().iter().cloned().collect();
        files.sort();
        files
    }
}

/// Universal properties: tree shape, source partition, and driver linkage
/// must hold after every public operation.
pub fn assert_invariants(manager: &ContextManager) {
    let tree = &manager.tree;

    for id in tree.contexts() {
        let node = tree.node(id);
        let folder = node
            .folder
            .as_deref()
            .expect("non-root contexts have a folder");

        // Tree shape: strictly inside the parent, disjoint from siblings.
        if let Some(parent) = node.parent
            && let Some(parent_folder) = tree.node(parent).folder.as_deref()
        {
            assert!(
                folder.starts_with(parent_folder) && folder != parent_folder,
                "{folder:?} must lie strictly inside {parent_folder:?}",
            );
        }
        for sibling in tree.node(node.parent.expect("non-root")).children.iter() {
            if *sibling == id {
                continue;
            }
            let sibling_folder = tree.node(*sibling).folder.as_deref().expect("folder");
            assert!(
                !folder.starts_with(sibling_folder) && !sibling_folder.starts_with(folder),
                "siblings {folder:?} and {sibling_folder:?} must be disjoint",
            );
        }

        // Source partition.
        for source in node.sources.keys() {
            assert!(
                source.starts_with(folder),
                "{source:?} must lie inside {folder:?}",
            );
            for child in node.children.iter() {
                let child_folder = tree.node(*child).folder.as_deref().expect("folder");
                assert!(
                    !source.starts_with(child_folder),
                    "{source:?} is claimed by deeper context {child_folder:?}",
                );
            }
            assert!(
                !manager.excluded.is_excluded(source),
                "{source:?} is excluded but still owned",
            );
            assert!(
                !node.ignored(source),
                "{source:?} is ignored by its own context",
            );
        }

        // Driver linkage: the driver mirrors the source set.
        let driver = node.driver.as_deref().expect("non-root contexts have a driver");
        let mut driver_files: Vec<&PathBuf> = driver.added_files().iter().collect();
        let mut source_files: Vec<&PathBuf> = node.sources.keys().collect();
        driver_files.sort();
        source_files.sort();
        assert_eq!(
            driver_files, source_files,
            "driver file set must mirror sources of {folder:?}",
        );
    }
}
