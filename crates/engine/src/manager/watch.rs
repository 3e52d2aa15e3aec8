use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use atlas_fs::{ChangeKind, WatchEvent, WatchSignal};

use crate::{
    ContextId, ContextInfo,
    wellknown::{self, DescriptorKind},
};

use super::ContextManager;

impl ContextManager {
    /// Route one signal off the watch channel.
    pub fn handle_watch_signal(&mut self, signal: &WatchSignal) {
        match signal {
            WatchSignal::Event(event) => self.handle_watch_event(event),
            WatchSignal::Error { root, message } => self.handle_watch_error(root, message),
        }
    }

    /// Feed one watch event through the state machine. Events arrive in
    /// per-root FIFO order and are never reordered here.
    pub fn handle_watch_event(&mut self, event: &WatchEvent) {
        self.provider.broadcast_watch_event(event);
        self.handle_watch_event_impl(event);
        self.provider.after_watch_event(event);
    }

    /// A failed or overflowed watch stream: coarse-grained recovery by
    /// rebuilding everything from the configured roots.
    pub fn handle_watch_error(&mut self, root: &Path, message: &str) {
        warn!("[watch] stream for {:?} failed ({message}), rebuilding", root);
        self.refresh(None);
    }

    fn handle_watch_event_impl(&mut self, event: &WatchEvent) {
        let path = &event.path;

        let Some(info) = self.tree.innermost_containing(path) else {
            return;
        };

        // A dependency change re-resolves packages even when the filters
        // below drop the event.
        if self.tree.node(info).dependencies.contains(path) {
            self.recompute_disposition(info);
        }

        if self.excluded.is_excluded(path) {
            return;
        }
        let Some(folder) = self.tree.node(info).folder.clone() else {
            return;
        };
        if wellknown::in_dot_folder(&folder, path) {
            return;
        }
        if wellknown::in_top_level_doc(&folder, path) {
            return;
        }
        if self.tree.excludes(info, path) {
            return;
        }
        if self.tree.node(info).ignored(path) {
            return;
        }

        match event.kind {
            ChangeKind::Add => self.on_path_added(info, &folder, path),
            ChangeKind::Remove => self.on_path_removed(info, &folder, path),
            ChangeKind::Modify => self.on_path_modified(path),
        }

        self.reanalyze_well_known(path);
    }

    fn on_path_added(&mut self, info: ContextId, folder: &Path, path: &Path) {
        if let Some(kind) = wellknown::descriptor_kind(path) {
            let Some(dir) = path.parent() else {
                return;
            };
            if dir == folder {
                // A descriptor at the context root changes resolution, not
                // the tree.
                self.recompute_disposition(info);
            } else if !self.other_descriptor_present(dir, kind) {
                self.extract_context(info, dir);
            }
            return;
        }

        if !self.source_matcher.matches(path) {
            return;
        }
        // Editor artifacts arrive as broken symlinks; only real files count.
        if !atlas_fs::is_file(path) {
            debug!("[watch] ignoring phantom add {:?}", path);
            return;
        }
        self.add_sources(info, vec![path.to_path_buf()]);
    }

    fn on_path_removed(&mut self, info: ContextId, folder: &Path, path: &Path) {
        if wellknown::descriptor_kind(path).is_some() {
            if path.parent() == Some(folder) {
                let top_level = self.tree.node(info).parent == Some(self.tree.root());
                if !top_level && self.find_descriptor(folder).is_none() {
                    self.merge_context(info);
                } else {
                    // Top-level contexts outlive their descriptor; a
                    // surviving sibling descriptor re-resolves.
                    self.recompute_disposition(info);
                }
            }
            return;
        }

        if self.tree.node(info).sources.contains_key(path) {
            self.remove_sources(info, vec![path.to_path_buf()]);
            return;
        }

        // Not a known source: a whole folder may have gone away.
        self.sweep_removed_folder(path);
    }

    /// Content changes fan out to every known driver; the file may be
    /// referenced across context boundaries.
    fn on_path_modified(&mut self, path: &Path) {
        if !self.source_matcher.matches(path) {
            return;
        }

        let ids: Vec<ContextId> = self.tree.contexts().collect();
        for id in ids {
            if let Some(driver) = self.tree.node_mut(id).driver.as_deref_mut() {
                driver.change_file(path);
            }
        }
    }

    /// A folder holding both descriptor kinds stays a single context.
    fn other_descriptor_present(&self, dir: &Path, kind: DescriptorKind) -> bool {
        atlas_fs::is_file(&dir.join(kind.other().file_name()))
    }

    // ---- split ----

    /// Split a new context out of `owner` at `dir`: move the sources below
    /// `dir` and re-parent descendant contexts that now live inside it.
    fn extract_context(&mut self, owner: ContextId, dir: &Path) {
        info!("[watch] extracting context at {:?}", dir);

        let id = self.build_context_node(owner, dir);

        // Descendant contexts caught inside the new folder follow it.
        let captured: Vec<ContextId> = self
            .tree
            .node(owner)
            .children
            .iter()
            .copied()
            .filter(|c| {
                *c != id
                    && self
                        .tree
                        .node(*c)
                        .folder
                        .as_deref()
                        .is_some_and(|f| f.starts_with(dir))
            })
            .collect();
        for child in captured {
            self.tree.reparent(child, id);
        }

        let moved: Vec<PathBuf> = self
            .tree
            .node(owner)
            .sources
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();

        self.remove_sources(owner, moved.clone());

        // A moved file the new context's own filter ignores stays dropped.
        let adopted: Vec<PathBuf> = moved
            .into_iter()
            .filter(|p| self.tree.manages(id, p))
            .collect();
        self.add_sources(id, adopted);
    }

    // ---- merge ----

    /// Fold a context whose descriptor disappeared back into its parent.
    /// Deeper contexts survive under the parent; sources the parent does
    /// not manage are flushed.
    fn merge_context(&mut self, id: ContextId) {
        let Some(parent) = self.tree.node(id).parent else {
            return;
        };
        info!(
            "[watch] merging context at {:?} into its parent",
            self.tree.node(id).folder
        );

        let children: Vec<ContextId> = self.tree.node(id).children.to_vec();
        for child in children {
            self.tree.reparent(child, parent);
        }

        let info = self.tree.free(id);
        let Some(folder) = info.folder else {
            return;
        };

        let mut transferred = Vec::new();
        let mut flushed = Vec::new();
        for path in info.sources.into_keys() {
            if self.tree.manages(parent, &path) {
                transferred.push(path);
            } else {
                flushed.push(path);
            }
        }
        transferred.sort();
        flushed.sort();

        self.provider.remove_context(&folder, &flushed);
        self.subscriptions.remove(&folder);
        self.root_contexts.remove(&folder);

        self.add_sources(parent, transferred);
    }

    // ---- folder removal sweep ----

    /// A directory disappeared: contexts rooted beneath it die, and
    /// surviving contexts shed the sources they held there.
    fn sweep_removed_folder(&mut self, path: &Path) {
        let doomed: Vec<ContextId> = self
            .tree
            .contexts()
            .filter(|id| {
                self.tree
                    .node(*id)
                    .folder
                    .as_deref()
                    .is_some_and(|f| f.starts_with(path))
            })
            .collect();
        for id in doomed {
            if self.tree.is_live(id) {
                self.destroy_context(id);
            }
        }

        let survivors: Vec<ContextId> = self.tree.contexts().collect();
        for id in survivors {
            let lost: Vec<PathBuf> = self
                .tree
                .node(id)
                .sources
                .keys()
                .filter(|p| p.starts_with(path))
                .cloned()
                .collect();
            self.remove_sources(id, lost);
        }
    }

    // ---- re-analysis dispatch ----

    /// Re-run the per-file analysers once the primary transition settled;
    /// each run's diagnostics replace the prior list for the path.
    fn reanalyze_well_known(&mut self, path: &Path) {
        let Some(info) = self.tree.innermost_containing(path) else {
            return;
        };
        let Some(folder) = self.tree.node(info).folder.clone() else {
            return;
        };

        let is_descriptor = wellknown::descriptor_kind(path).is_some();
        let is_options = wellknown::is_options_file(path);
        let tracked = is_descriptor
            || is_options
            || wellknown::is_fix_data_file(&folder, path)
            || wellknown::is_android_manifest(path);
        if !tracked {
            return;
        }

        self.run_validators(&folder, path);

        if is_descriptor || is_options {
            self.update_analysis_options(info);
        }
    }

    fn run_validators(&mut self, context_folder: &Path, path: &Path) {
        if self.validators.is_empty() {
            return;
        }

        let content = atlas_fs::read_to_string_if_exists(path);
        let mut matched = false;
        let mut failed = false;
        let mut errors = Vec::new();

        for validator in &self.validators {
            if !validator.applies(context_folder, path) {
                continue;
            }
            matched = true;

            // A vanished file simply clears its diagnostics.
            let Some(content) = content.as_deref() else {
                continue;
            };
            match validator.validate(path, content) {
                Ok(mut list) => errors.append(&mut list),
                Err(e) => {
                    warn!("[validate] {:?}: {e}", path);
                    failed = true;
                }
            }
        }

        // One failing validator resets the file's diagnostics wholesale,
        // including what another validator reported this run.
        if failed {
            errors.clear();
        }
        if matched {
            self.notifications.record_analysis_errors(path, errors);
        }
    }

    /// Options re-analysis: fresh options and filter patterns, reconfigured
    /// driver, notified embedder.
    fn update_analysis_options(&mut self, id: ContextId) {
        let Some(folder) = self.tree.node(id).folder.clone() else {
            return;
        };
        let (_options_file, options) = crate::options::read_options(&folder);

        let node = self.tree.node_mut(id);
        node.path_filter.set_patterns(&options.exclude_patterns);
        node.options = options;
        let ContextInfo {
            driver,
            options,
            disposition,
            ..
        } = node;
        if let Some(driver) = driver.as_deref_mut() {
            driver.configure(options, disposition);
        }

        // The fresh patterns may hide files the context owns; the partition
        // has to stay exact. Newly visible files wait for a refresh.
        let hidden: Vec<PathBuf> = self
            .tree
            .node(id)
            .sources
            .keys()
            .filter(|p| self.tree.node(id).ignored(p))
            .cloned()
            .collect();
        self.remove_sources(id, hidden);

        self.provider.analysis_options_updated(&folder);
    }

    // ---- disposition ----

    /// A dependency changed: re-resolve packages and rebuild the driver's
    /// source factory. Sources are left alone.
    fn recompute_disposition(&mut self, id: ContextId) {
        let Some(folder) = self.tree.node(id).folder.clone() else {
            return;
        };

        let descriptor = self.find_descriptor(&folder);
        let disposition = self.build_disposition(descriptor.as_deref());

        let node = self.tree.node_mut(id);
        node.descriptor_path = descriptor;
        node.dependencies = Self::descriptor_dependencies(&folder);
        node.disposition = disposition;

        let ContextInfo {
            driver,
            options,
            disposition,
            ..
        } = node;
        if let Some(driver) = driver.as_deref_mut() {
            driver.configure(options, disposition);
        }
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
