use std::mem;
use std::path::{Path, PathBuf};

use hashbrown::{HashMap, HashSet};
use log::{debug, info, warn};
use serde::Serialize;
use smallvec::SmallVec;

use atlas_fs::{
    EntryKind, ExcludeSet, PathFilter, SourceMatcher, WatchHandle, WatchService, list_dir,
};
use atlas_runtime::{PACKAGES_FILE, PUBSPEC_FILE, TOP_LEVEL_DOC_DIR};

use crate::{
    AnalysisDriver, ChangeSet, ContextId, ContextInfo, ContextRoot, ContextTree, DriverProvider,
    FileValidator, FolderDisposition, ManagerError, NotificationSink,
    disposition::parse_packages_file,
    options::read_options,
    wellknown::{self, DescriptorKind},
};

mod watch;

#[cfg(test)]
mod test_support;

/// Engine knobs supplied by the embedder.
pub struct ManagerConfig {
    /// Globs selecting analysable files; the engine treats the set as
    /// opaque.
    pub analyzed_files: Vec<String>,
    /// Filter case sensitivity, decided by the platform's filesystem.
    pub case_insensitive_filters: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            analyzed_files: atlas_runtime::DEFAULT_ANALYZED_FILE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            case_insensitive_filters: false,
        }
    }
}

/// Structural snapshot of one context, for printers and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub folder: PathBuf,
    pub descriptor: Option<PathBuf>,
    pub source_files: Vec<PathBuf>,
    pub children: Vec<ContextSummary>,
}

/// Maintains the live partition of the workspace into analysis contexts.
///
/// All mutation goes through `&mut self`: public operations and watch-event
/// deliveries execute one at a time, in order, per the single-threaded
/// cooperative model.
pub struct ContextManager {
    tree: ContextTree,
    included: Vec<PathBuf>,
    excluded: ExcludeSet,
    /// Contexts created for included folders, keyed by that folder.
    root_contexts: HashMap<PathBuf, ContextId>,
    /// One watch subscription per included folder; dropped on destruction.
    subscriptions: HashMap<PathBuf, Box<dyn WatchHandle>>,
    source_matcher: SourceMatcher,
    case_insensitive_filters: bool,
    watch_service: Box<dyn WatchService>,
    provider: Box<dyn DriverProvider>,
    notifications: Box<dyn NotificationSink>,
    validators: Vec<Box<dyn FileValidator>>,
}

impl ContextManager {
    pub fn new(
        config: ManagerConfig,
        provider: Box<dyn DriverProvider>,
        notifications: Box<dyn NotificationSink>,
        watch_service: Box<dyn WatchService>,
    ) -> Self {
        ContextManager {
            tree: ContextTree::new(),
            included: Vec::new(),
            excluded: ExcludeSet::default(),
            root_contexts: HashMap::new(),
            subscriptions: HashMap::new(),
            source_matcher: SourceMatcher::new(&config.analyzed_files),
            case_insensitive_filters: config.case_insensitive_filters,
            watch_service,
            provider,
            notifications,
            validators: Vec::new(),
        }
    }

    pub fn add_validator(&mut self, validator: Box<dyn FileValidator>) {
        self.validators.push(validator);
    }

    /// Replace the configured roots.
    ///
    /// Missing included paths are dropped; a non-directory one fails before
    /// any mutation. Idempotent: repeating the same inputs destroys
    /// nothing, discovers nothing, and emits nothing.
    pub fn set_roots(
        &mut self,
        included: Vec<PathBuf>,
        excluded: Vec<PathBuf>,
    ) -> Result<(), ManagerError> {
        let mut kept = Vec::new();
        for path in included {
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => kept.push(path),
                Ok(_) => return Err(ManagerError::UnsupportedRoot(path)),
                Err(_) => {
                    // TODO: watch for late-appearing roots instead of
                    // waiting for the next set_roots/refresh.
                    debug!("[roots] dropping missing root {:?}", path);
                }
            }
        }

        // Outer roots first so inner ones attach beneath them.
        kept.sort_by(|a, b| {
            a.as_os_str()
                .len()
                .cmp(&b.as_os_str().len())
                .then_with(|| a.cmp(b))
        });
        kept.dedup();

        let old_excluded = mem::replace(&mut self.excluded, ExcludeSet::new(excluded));
        self.included = kept.clone();

        // Contexts whose included folder is gone.
        let obsolete: Vec<ContextId> = self
            .root_contexts
            .iter()
            .filter(|(folder, _)| !kept.contains(*folder))
            .map(|(_, id)| *id)
            .collect();
        for id in obsolete {
            if self.tree.is_live(id) {
                self.destroy_context(id);
            }
        }

        // Contexts that fell inside a newly excluded path.
        let shadowed: Vec<ContextId> = self
            .tree
            .contexts()
            .filter(|id| {
                self.tree
                    .node(*id)
                    .folder
                    .as_deref()
                    .is_some_and(|f| self.excluded.is_excluded(f))
            })
            .collect();
        for id in shadowed {
            // An ancestor in the same batch may have freed it already.
            if self.tree.is_live(id) {
                self.destroy_context(id);
            }
        }

        // Discover newly included folders.
        for folder in kept {
            if self.root_contexts.contains_key(&folder) {
                continue;
            }
            if self.excluded.is_excluded(&folder) {
                warn!("[roots] included root {:?} is excluded, skipping", folder);
                continue;
            }

            let parent = match self.tree.innermost_containing(&folder) {
                Some(owner) if self.tree.manages(owner, &folder) => {
                    // Already covered; the covering context's recursive
                    // watcher reports events below this folder.
                    continue;
                }
                Some(owner) => owner,
                None => self.tree.root(),
            };

            info!("[roots] adding analysis root {:?}", folder);
            let id = self.create_context(parent, &folder);
            self.root_contexts.insert(folder.clone(), id);

            match self.watch_service.watch(&folder) {
                Ok(handle) => {
                    self.subscriptions.insert(folder.clone(), handle);
                }
                Err(e) => warn!("[roots] could not watch {:?}: {e}", folder),
            }
        }

        // Exclusion deltas for the survivors: removals strictly before
        // rescans, so a path is never double-counted.
        self.apply_new_exclusions();
        self.rescan_unexcluded(&old_excluded);

        Ok(())
    }

    /// Destroy every context intersecting `roots` (all of them when
    /// `None`), then rebuild from the last configured inputs. With an
    /// unchanged filesystem the rebuilt tree is structurally identical.
    pub fn refresh(&mut self, roots: Option<&[PathBuf]>) {
        let top_level: Vec<(PathBuf, ContextId)> = self
            .root_contexts
            .iter()
            .map(|(folder, id)| (folder.clone(), *id))
            .collect();

        for (folder, id) in top_level {
            let hit = match roots {
                None => true,
                Some(roots) => roots
                    .iter()
                    .any(|r| folder.starts_with(r) || r.starts_with(&folder)),
            };
            if hit && self.tree.is_live(id) {
                self.destroy_context(id);
            }
        }

        let included = self.included.clone();
        let excluded = self.excluded.roots().to_vec();
        if let Err(e) = self.set_roots(included, excluded) {
            warn!("[refresh] rebuild failed: {e}");
        }
    }

    /// The driver of the innermost context containing `path`.
    pub fn driver_for(&self, path: &Path) -> Option<&dyn AnalysisDriver> {
        let id = self.tree.innermost_containing(path)?;
        self.tree.node(id).driver.as_deref()
    }

    /// Drivers of every context whose folder equals or lies under `folder`.
    pub fn drivers_in_root(&self, folder: &Path) -> Vec<&dyn AnalysisDriver> {
        self.tree
            .contexts()
            .filter_map(|id| {
                let node = self.tree.node(id);
                node.folder
                    .as_deref()
                    .is_some_and(|f| f.starts_with(folder))
                    .then(|| node.driver.as_deref())
                    .flatten()
            })
            .collect()
    }

    pub fn is_in_analysis_root(&self, path: &Path) -> bool {
        self.included.iter().any(|inc| path.starts_with(inc)) && !self.excluded.is_excluded(path)
    }

    /// Walk root → innermost; ignored when any node along the way ignores
    /// the path.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(mut current) = self.tree.find_child_containing(self.tree.root(), path) else {
            return false;
        };
        loop {
            if self.tree.node(current).ignored(path) {
                return true;
            }
            match self.tree.find_child_containing(current, path) {
                Some(child) => current = child,
                None => return false,
            }
        }
    }

    pub fn included_roots(&self) -> &[PathBuf] {
        &self.included
    }

    /// Snapshot of the tree, top-level contexts first.
    pub fn summarize(&self) -> Vec<ContextSummary> {
        let mut top: Vec<ContextSummary> = self
            .tree
            .node(self.tree.root())
            .children
            .iter()
            .map(|c| self.summarize_node(*c))
            .collect();
        top.sort_by(|a, b| a.folder.cmp(&b.folder));
        top
    }

    fn summarize_node(&self, id: ContextId) -> ContextSummary {
        let node = self.tree.node(id);

        let mut source_files: Vec<PathBuf> = node.sources.keys().cloned().collect();
        source_files.sort();

        let mut children: Vec<ContextSummary> = node
            .children
            .iter()
            .map(|c| self.summarize_node(*c))
            .collect();
        children.sort_by(|a, b| a.folder.cmp(&b.folder));

        ContextSummary {
            folder: node.folder.clone().unwrap_or_default(),
            descriptor: node.descriptor_path.clone(),
            source_files,
            children,
        }
    }

    // ---- discovery ----

    /// Create a context rooted at `folder`: build the node, discover nested
    /// contexts depth-first, then attribute and emit this context's own
    /// sources. Deeper contexts always finish first, which keeps the
    /// partition exact.
    fn create_context(&mut self, parent: ContextId, folder: &Path) -> ContextId {
        let id = self.build_context_node(parent, folder);

        let mut found = Vec::new();
        self.walk_folder(id, folder, folder, &mut found);
        self.add_sources(id, found);
        id
    }

    /// Allocate the node and its driver, without scanning for sources.
    fn build_context_node(&mut self, parent: ContextId, folder: &Path) -> ContextId {
        debug!("[discover] context at {:?}", folder);

        let descriptor = self.find_descriptor(folder);
        let (options_file, options) = read_options(folder);
        let path_filter = PathFilter::new(
            folder,
            &options.exclude_patterns,
            self.case_insensitive_filters,
        );
        let disposition = self.build_disposition(descriptor.as_deref());

        let context_root = ContextRoot {
            root: folder.to_path_buf(),
            excluded: self.excluded.roots().to_vec(),
            options_file,
        };
        let driver = self
            .provider
            .add_analysis_driver(&context_root, &options, &disposition);

        let info = ContextInfo {
            folder: Some(folder.to_path_buf()),
            parent: None, // alloc links it
            children: SmallVec::new(),
            descriptor_path: descriptor,
            disposition,
            options,
            path_filter,
            dependencies: Self::descriptor_dependencies(folder),
            sources: HashMap::new(),
            driver: Some(driver),
        };
        self.tree.alloc(info, parent)
    }

    /// Both descriptor paths count as dependencies: either appearing or
    /// changing re-resolves packages.
    fn descriptor_dependencies(folder: &Path) -> HashSet<PathBuf> {
        let mut deps = HashSet::new();
        deps.insert(folder.join(PACKAGES_FILE));
        deps.insert(folder.join(PUBSPEC_FILE));
        deps
    }

    /// `.packages` wins over `pubspec.yaml`.
    fn find_descriptor(&self, folder: &Path) -> Option<PathBuf> {
        for kind in [DescriptorKind::Packages, DescriptorKind::Pubspec] {
            let candidate = folder.join(kind.file_name());
            if atlas_fs::is_file(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// A pubspec-rooted context has no package resolution of its own; a
    /// `.packages` descriptor that fails to parse degrades the same way and
    /// clears any stale diagnostics for the file.
    fn build_disposition(&mut self, descriptor: Option<&Path>) -> FolderDisposition {
        let Some(descriptor) = descriptor else {
            return FolderDisposition::NoPackage;
        };
        if wellknown::descriptor_kind(descriptor) != Some(DescriptorKind::Packages) {
            return FolderDisposition::NoPackage;
        }
        let Some(content) = atlas_fs::read_to_string_if_exists(descriptor) else {
            return FolderDisposition::NoPackage;
        };

        match parse_packages_file(descriptor, &content) {
            Ok(packages) => FolderDisposition::PackagesFile {
                descriptor: descriptor.to_path_buf(),
                packages,
            },
            Err(e) => {
                warn!("[discover] {:?} did not parse: {e}", descriptor);
                self.notifications
                    .record_analysis_errors(descriptor, Vec::new());
                FolderDisposition::NoPackage
            }
        }
    }

    /// Recurse below `dir` on behalf of context `ctx`: nested descriptors
    /// spawn child contexts, everything else accumulates into `found`.
    fn walk_folder(
        &mut self,
        ctx: ContextId,
        context_folder: &Path,
        dir: &Path,
        found: &mut Vec<PathBuf>,
    ) {
        for entry in list_dir(dir) {
            if self.excluded.is_excluded(&entry.path) {
                continue;
            }

            match entry.kind {
                EntryKind::Dir => {
                    if entry.name.starts_with('.') {
                        continue;
                    }
                    if dir == context_folder && entry.name == TOP_LEVEL_DOC_DIR {
                        continue;
                    }
                    if self.tree.node(ctx).path_filter.ignored(&entry.path, true) {
                        continue;
                    }

                    if self.find_descriptor(&entry.path).is_some() {
                        self.create_context(ctx, &entry.path);
                    } else {
                        self.walk_folder(ctx, context_folder, &entry.path, found);
                    }
                }
                EntryKind::File => {
                    if self.source_matcher.matches(&entry.path)
                        && !self.tree.node(ctx).path_filter.ignored(&entry.path, false)
                    {
                        found.push(entry.path);
                    }
                }
            }
        }
    }

    // ---- source bookkeeping ----

    /// Register `files` on the context's driver and emit one added-change
    /// set. Paths already owned are skipped.
    fn add_sources(&mut self, id: ContextId, files: Vec<PathBuf>) {
        if files.is_empty() {
            return;
        }

        let mut changes = ChangeSet::new();
        let node = self.tree.node_mut(id);
        let folder = node.folder.clone();
        let ContextInfo {
            driver, sources, ..
        } = node;
        let Some(driver) = driver.as_deref_mut() else {
            return;
        };

        for path in files {
            if sources.contains_key(&path) {
                continue;
            }
            let source_id = driver.add_file(&path);
            sources.insert(path.clone(), source_id);
            changes.record_added(path);
        }

        if changes.is_empty() {
            return;
        }
        if let Some(folder) = folder {
            self.provider.apply_changes_to_context(&folder, &changes);
        }
    }

    /// Drop `files` from the context and its driver and emit one
    /// removed-change set. Paths not owned are skipped.
    fn remove_sources(&mut self, id: ContextId, files: Vec<PathBuf>) {
        if files.is_empty() {
            return;
        }

        let mut changes = ChangeSet::new();
        let node = self.tree.node_mut(id);
        let folder = node.folder.clone();
        let ContextInfo {
            driver, sources, ..
        } = node;

        for path in files {
            if sources.remove(&path).is_none() {
                continue;
            }
            if let Some(driver) = driver.as_deref_mut() {
                self.provider.apply_file_removed(driver, &path);
            }
            changes.record_removed(path);
        }

        if changes.is_empty() {
            return;
        }
        if let Some(folder) = folder {
            self.provider.apply_changes_to_context(&folder, &changes);
        }
    }

    // ---- destruction ----

    /// Destroy `id` and its subtree, children first. Each driver is told
    /// which of its files no surviving context claims; the watch
    /// subscription of an analysis root dies with it.
    fn destroy_context(&mut self, id: ContextId) {
        let children: Vec<ContextId> = self.tree.node(id).children.to_vec();
        for child in children {
            self.destroy_context(child);
        }

        let info = self.tree.free(id);
        let Some(folder) = info.folder else {
            return;
        };

        let mut flushed: Vec<PathBuf> = info.sources.into_keys().collect();
        flushed.sort();
        self.provider.remove_context(&folder, &flushed);

        self.subscriptions.remove(&folder);
        self.root_contexts.remove(&folder);

        info!(
            "[roots] context at {:?} destroyed, {} files flushed",
            folder,
            flushed.len()
        );
    }

    // ---- exclusion deltas ----

    /// Pass one: strip sources the new exclude set hides.
    fn apply_new_exclusions(&mut self) {
        let ids: Vec<ContextId> = self.tree.contexts().collect();
        for id in ids {
            let doomed: Vec<PathBuf> = self
                .tree
                .node(id)
                .sources
                .keys()
                .filter(|p| self.excluded.is_excluded(p))
                .cloned()
                .collect();
            self.remove_sources(id, doomed);
        }
    }

    /// Pass two: rescan paths that stopped being excluded.
    fn rescan_unexcluded(&mut self, old_excluded: &ExcludeSet) {
        for root in old_excluded.roots() {
            if self.excluded.is_excluded(root) {
                continue;
            }
            if !self.included.iter().any(|inc| root.starts_with(inc)) {
                continue;
            }

            let mut additions: HashMap<ContextId, Vec<PathBuf>> = HashMap::new();
            self.collect_visible_sources(root, &mut additions);
            for (id, files) in additions {
                self.add_sources(id, files);
            }
        }
    }

    fn collect_visible_sources(
        &self,
        path: &Path,
        additions: &mut HashMap<ContextId, Vec<PathBuf>>,
    ) {
        if atlas_fs::is_dir(path) {
            for entry in list_dir(path) {
                if self.excluded.is_excluded(&entry.path) {
                    continue;
                }
                match entry.kind {
                    EntryKind::Dir => {
                        if entry.name.starts_with('.') {
                            continue;
                        }
                        self.collect_visible_sources(&entry.path, additions);
                    }
                    EntryKind::File => self.consider_visible_file(&entry.path, additions),
                }
            }
        } else {
            self.consider_visible_file(path, additions);
        }
    }

    /// Attribute a newly visible file to its innermost owner, applying the
    /// same checks discovery would.
    fn consider_visible_file(
        &self,
        path: &Path,
        additions: &mut HashMap<ContextId, Vec<PathBuf>>,
    ) {
        if !self.source_matcher.matches(path) {
            return;
        }
        if self.excluded.is_excluded(path) {
            return;
        }

        let Some(owner) = self.tree.innermost_containing(path) else {
            return;
        };
        let node = self.tree.node(owner);
        let Some(folder) = node.folder.as_deref() else {
            return;
        };
        if node.sources.contains_key(path) {
            return;
        }
        if wellknown::in_dot_folder(folder, path) {
            return;
        }
        if wellknown::in_top_level_doc(folder, path) {
            return;
        }
        if self.is_ignored(path) {
            return;
        }

        additions.entry(owner).or_default().push(path.to_path_buf());
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
