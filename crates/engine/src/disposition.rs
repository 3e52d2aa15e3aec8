use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use thiserror::Error;

pub type PackageMap = HashMap<String, PathBuf>;

/// How package URIs resolve for a context. Pure value object: the tree
/// engine constructs it from the descriptor and passes it through to the
/// driver without inspecting the variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FolderDisposition {
    /// Resolution driven by a parsed `.packages` descriptor.
    PackagesFile {
        descriptor: PathBuf,
        packages: PackageMap,
    },
    /// Standalone folder without package resolution.
    #[default]
    NoPackage,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackagesParseError {
    #[error("line {line}: missing ':' separator")]
    MissingSeparator { line: usize },
    #[error("line {line}: empty package name")]
    EmptyName { line: usize },
}

/// Parse the `name:uri` lines of a `.packages` file.
///
/// `#` starts a comment. Targets may be `file://` URIs or plain paths;
/// relative paths resolve against the descriptor's directory. On a
/// duplicate name the last entry wins, matching the original resolver.
pub fn parse_packages_file(
    descriptor: &Path,
    content: &str,
) -> Result<PackageMap, PackagesParseError> {
    let base = descriptor.parent().unwrap_or_else(|| Path::new(""));
    let mut packages = PackageMap::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_no = idx + 1;
        let (name, target) = line
            .split_once(':')
            .ok_or(PackagesParseError::MissingSeparator { line: line_no })?;
        if name.is_empty() {
            return Err(PackagesParseError::EmptyName { line: line_no });
        }

        let target = target.strip_prefix("file://").unwrap_or(target);
        let target_path = Path::new(target);
        let resolved = if target_path.is_absolute() {
            target_path.to_path_buf()
        } else {
            base.join(target_path)
        };

        packages.insert(name.to_owned(), resolved);
    }

    Ok(packages)
}

#[cfg(test)]
#[path = "disposition_tests.rs"]
mod tests;
