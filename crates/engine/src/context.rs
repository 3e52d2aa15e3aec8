use std::path::{Path, PathBuf};

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use atlas_fs::PathFilter;

use crate::{AnalysisDriver, AnalysisOptions, FolderDisposition, SourceId};

/// Index of a context in the manager-owned arena. Stable for the lifetime
/// of the context; slots are recycled after destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u32);

impl ContextId {
    const ROOT: ContextId = ContextId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the context tree.
pub struct ContextInfo {
    /// Absolute folder this context is rooted at. `None` only for the
    /// virtual root, which is never exposed through lookups.
    pub folder: Option<PathBuf>,
    pub parent: Option<ContextId>,
    pub children: SmallVec<[ContextId; 4]>,
    /// The descriptor file that caused this context to exist.
    pub descriptor_path: Option<PathBuf>,
    pub disposition: FolderDisposition,
    pub options: AnalysisOptions,
    pub path_filter: PathFilter,
    /// Paths whose modification forces a disposition recomputation.
    pub dependencies: HashSet<PathBuf>,
    /// Files this context owns, keyed by path.
    pub sources: HashMap<PathBuf, SourceId>,
    /// `None` only for the virtual root.
    pub driver: Option<Box<dyn AnalysisDriver>>,
}

impl ContextInfo {
    fn virtual_root() -> Self {
        ContextInfo {
            folder: None,
            parent: None,
            children: SmallVec::new(),
            descriptor_path: None,
            disposition: FolderDisposition::NoPackage,
            options: AnalysisOptions::default(),
            path_filter: PathFilter::new(Path::new("/"), &[], false),
            dependencies: HashSet::new(),
            sources: HashMap::new(),
            driver: None,
        }
    }

    /// Containment is inclusive of the folder itself. The virtual root
    /// contains nothing.
    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.folder.as_deref().is_some_and(|f| path.starts_with(f))
    }

    #[inline]
    pub fn ignored(&self, path: &Path) -> bool {
        self.path_filter.ignored(path, false)
    }
}

/// Arena of context nodes. The virtual root occupies slot 0 and is neither
/// freed nor yielded by the traversals.
pub struct ContextTree {
    nodes: Vec<Option<ContextInfo>>,
    free: Vec<u32>,
}

impl ContextTree {
    pub fn new() -> Self {
        ContextTree {
            nodes: vec![Some(ContextInfo::virtual_root())],
            free: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> ContextId {
        ContextId::ROOT
    }

    /// Arena slots outlive every id handed out, so a live id always
    /// resolves; resolving a freed id is a logic error.
    pub fn node(&self, id: ContextId) -> &ContextInfo {
        self.nodes[id.index()].as_ref().expect("live context")
    }

    pub fn node_mut(&mut self, id: ContextId) -> &mut ContextInfo {
        self.nodes[id.index()].as_mut().expect("live context")
    }

    pub fn is_live(&self, id: ContextId) -> bool {
        self.nodes.get(id.index()).is_some_and(|slot| slot.is_some())
    }

    /// Insert a node under `parent`.
    pub fn alloc(&mut self, mut info: ContextInfo, parent: ContextId) -> ContextId {
        info.parent = Some(parent);
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = Some(info);
                ContextId(slot)
            }
            None => {
                self.nodes.push(Some(info));
                ContextId((self.nodes.len() - 1) as u32)
            }
        };
        self.node_mut(parent).children.push(id);
        id
    }

    /// Detach `id` from its parent and return the node. Children must have
    /// been freed or re-parented beforehand.
    pub fn free(&mut self, id: ContextId) -> ContextInfo {
        debug_assert!(id != ContextId::ROOT, "the virtual root is never freed");
        debug_assert!(self.node(id).children.is_empty());

        let info = self.nodes[id.index()].take().expect("live context");
        if let Some(parent) = info.parent {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
        self.free.push(id.0);
        info
    }

    /// Move `child` under `new_parent`.
    pub fn reparent(&mut self, child: ContextId, new_parent: ContextId) {
        if let Some(old_parent) = self.node(child).parent {
            self.node_mut(old_parent).children.retain(|c| *c != child);
        }
        self.node_mut(child).parent = Some(new_parent);
        self.node_mut(new_parent).children.push(child);
    }

    /// Lazy pre-order walk of the transitive children of `id`; `id` itself
    /// is not yielded.
    pub fn descendants(&self, id: ContextId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: self.node(id).children.iter().rev().copied().collect(),
        }
    }

    /// Every live context except the virtual root, in pre-order.
    pub fn contexts(&self) -> Descendants<'_> {
        self.descendants(ContextId::ROOT)
    }

    /// The unique direct child whose folder equals or contains `path`.
    /// Sibling folders are disjoint, so at most one matches.
    pub fn find_child_containing(&self, id: ContextId, path: &Path) -> Option<ContextId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|c| self.node(*c).contains(path))
    }

    /// True when a deeper context claims `path`.
    pub fn excludes(&self, id: ContextId, path: &Path) -> bool {
        self.find_child_containing(id, path).is_some()
    }

    /// True when this context owns `path`: its folder contains it, no child
    /// claims it, and the path filter does not ignore it.
    pub fn manages(&self, id: ContextId, path: &Path) -> bool {
        let node = self.node(id);
        node.contains(path) && !self.excludes(id, path) && !node.ignored(path)
    }

    /// The deepest context whose folder contains `path`.
    pub fn innermost_containing(&self, path: &Path) -> Option<ContextId> {
        let mut current = self.find_child_containing(ContextId::ROOT, path)?;
        loop {
            match self.find_child_containing(current, path) {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }
}

impl Default for ContextTree {
    fn default() -> Self {
        ContextTree::new()
    }
}

pub struct Descendants<'a> {
    tree: &'a ContextTree,
    stack: Vec<ContextId>,
}

impl Iterator for Descendants<'_> {
    type Item = ContextId;

    fn next(&mut self) -> Option<ContextId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.node(id).children.iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
