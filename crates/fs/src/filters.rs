use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::warn;

/// Ignore-glob matcher rooted at a context folder.
///
/// Patterns come from the context's analysis options and are matched against
/// the path relative to the root with forward-slash segments. Case
/// sensitivity follows the filesystem and is fixed at construction.
pub struct PathFilter {
    root: PathBuf,
    case_insensitive: bool,
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl PathFilter {
    pub fn new(root: &Path, patterns: &[String], case_insensitive: bool) -> Self {
        let mut filter = PathFilter {
            root: root.to_path_buf(),
            case_insensitive,
            patterns: Vec::new(),
            matcher: Gitignore::empty(),
        };
        filter.set_patterns(patterns);
        filter
    }

    /// Replace the pattern set. Malformed patterns are skipped, not fatal.
    pub fn set_patterns(&mut self, patterns: &[String]) {
        let mut builder = GitignoreBuilder::new(&self.root);
        if let Err(e) = builder.case_insensitive(self.case_insensitive) {
            warn!("[filter] case sensitivity not applied: {e}");
        }

        for pat in patterns {
            if let Err(e) = builder.add_line(None, pat) {
                warn!("[filter] skipping malformed ignore pattern {pat:?}: {e}");
            }
        }

        self.matcher = match builder.build() {
            Ok(matcher) => matcher,
            Err(e) => {
                warn!("[filter] pattern set unusable, ignoring nothing: {e}");
                Gitignore::empty()
            }
        };
        self.patterns = patterns.to_vec();
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True if `path` matches an ignore glob of this filter. Paths outside
    /// the filter's root are never ignored.
    #[inline]
    #[must_use]
    pub fn ignored(&self, path: &Path, is_dir: bool) -> bool {
        if !path.starts_with(&self.root) {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}

/// Whitelist matcher for the analysed-files globs.
///
/// The engine treats the glob set as opaque: a file is analysable exactly
/// when one of the globs matches it.
pub struct SourceMatcher {
    matcher: Gitignore,
    patterns: Vec<String>,
}

impl SourceMatcher {
    pub fn new(patterns: &[String]) -> Self {
        // Rooted at the filesystem root so every absolute path is eligible.
        let mut builder = GitignoreBuilder::new(Path::new("/"));
        for pat in patterns {
            if let Err(e) = builder.add_line(None, pat) {
                warn!("[filter] skipping malformed source pattern {pat:?}: {e}");
            }
        }

        let matcher = match builder.build() {
            Ok(matcher) => matcher,
            Err(e) => {
                warn!("[filter] source pattern set unusable, matching nothing: {e}");
                Gitignore::empty()
            }
        };

        SourceMatcher {
            matcher,
            patterns: patterns.to_vec(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.matcher
            .matched_path_or_any_parents(path, false)
            .is_ignore()
    }
}

impl Default for SourceMatcher {
    fn default() -> Self {
        let patterns: Vec<String> = atlas_runtime::DEFAULT_ANALYZED_FILE_PATTERNS
            .iter()
            .map(|s| s.to_string())
            .collect();
        SourceMatcher::new(&patterns)
    }
}

/// User-supplied excluded paths. A path is excluded when it equals or lies
/// under any recorded root; nested roots collapse into their parent.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    roots: Vec<PathBuf>,
}

impl ExcludeSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        let mut set = ExcludeSet::default();
        for path in paths {
            set.add_root(path);
        }
        set
    }

    pub fn add_root(&mut self, root: PathBuf) {
        // A root covered by an existing root adds nothing.
        for existing in &self.roots {
            if root.starts_with(existing) {
                return;
            }
        }

        // The new root subsumes any existing children.
        self.roots.retain(|existing| !existing.starts_with(&root));

        self.roots.push(root);
    }

    #[inline]
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
#[path = "filters_tests.rs"]
mod tests;
