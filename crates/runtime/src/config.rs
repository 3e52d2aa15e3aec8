pub const PROGRAM_LOG_LEVEL: &str = "ATLAS_LOG_LEVEL";

/// Package descriptor produced by the package manager. Maps package names to
/// library folders and, when present, wins over the pubspec as the file a
/// context is rooted on.
pub const PACKAGES_FILE: &str = ".packages";

/// Human-authored package descriptor.
pub const PUBSPEC_FILE: &str = "pubspec.yaml";

/// Per-context analysis options. The legacy dot-name is still recognised.
pub const ANALYSIS_OPTIONS_FILE: &str = "analysis_options.yaml";
pub const ANALYSIS_OPTIONS_FILE_LEGACY: &str = ".analysis_options";

/// Data-driven fix descriptions; only meaningful under `<context>/lib/`.
pub const FIX_DATA_FILE: &str = "fix_data.yaml";

pub const ANDROID_MANIFEST_FILE: &str = "AndroidManifest.xml";

pub const LIB_DIR_NAME: &str = "lib";

/// Directory name skipped at the top level of every context.
pub const TOP_LEVEL_DOC_DIR: &str = "doc";

/// Globs selecting the files handed to analysis drivers. Callers may replace
/// the set; the engine treats it as opaque.
pub const DEFAULT_ANALYZED_FILE_PATTERNS: &[&str] = &["*.dart"];
