use std::path::{Component, Path};

use atlas_runtime::{
    ANALYSIS_OPTIONS_FILE, ANALYSIS_OPTIONS_FILE_LEGACY, ANDROID_MANIFEST_FILE, FIX_DATA_FILE,
    LIB_DIR_NAME, PACKAGES_FILE, PUBSPEC_FILE, TOP_LEVEL_DOC_DIR,
};

/// The two descriptor kinds that can root a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Packages,
    Pubspec,
}

impl DescriptorKind {
    pub fn file_name(self) -> &'static str {
        match self {
            DescriptorKind::Packages => PACKAGES_FILE,
            DescriptorKind::Pubspec => PUBSPEC_FILE,
        }
    }

    pub fn other(self) -> DescriptorKind {
        match self {
            DescriptorKind::Packages => DescriptorKind::Pubspec,
            DescriptorKind::Pubspec => DescriptorKind::Packages,
        }
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

pub fn descriptor_kind(path: &Path) -> Option<DescriptorKind> {
    match file_name(path)? {
        PACKAGES_FILE => Some(DescriptorKind::Packages),
        PUBSPEC_FILE => Some(DescriptorKind::Pubspec),
        _ => None,
    }
}

pub fn is_options_file(path: &Path) -> bool {
    matches!(
        file_name(path),
        Some(ANALYSIS_OPTIONS_FILE | ANALYSIS_OPTIONS_FILE_LEGACY)
    )
}

pub fn is_android_manifest(path: &Path) -> bool {
    file_name(path) == Some(ANDROID_MANIFEST_FILE)
}

/// `fix_data.yaml` is only meaningful under `<context>/lib/`.
pub fn is_fix_data_file(context_folder: &Path, path: &Path) -> bool {
    file_name(path) == Some(FIX_DATA_FILE) && path.starts_with(context_folder.join(LIB_DIR_NAME))
}

/// True when some directory component of `path` below `root` is
/// dot-prefixed. The basename itself does not count: dot-files are
/// reported, dot-folders hide their contents.
pub fn in_dot_folder(root: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return false;
    };

    let mut components: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .collect();
    components.pop(); // the basename

    components.iter().any(|c| c.starts_with('.'))
}

/// True when `path` lies inside the top-level `doc` directory of `root`
/// (the directory itself does not count).
pub fn in_top_level_doc(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root.join(TOP_LEVEL_DOC_DIR))
        .map(|rel| rel.components().next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "wellknown_tests.rs"]
mod tests;
