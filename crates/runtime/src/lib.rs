mod config;
pub mod logging;

pub use config::{
    ANALYSIS_OPTIONS_FILE, ANALYSIS_OPTIONS_FILE_LEGACY, ANDROID_MANIFEST_FILE,
    DEFAULT_ANALYZED_FILE_PATTERNS, FIX_DATA_FILE, LIB_DIR_NAME, PACKAGES_FILE, PUBSPEC_FILE,
    TOP_LEVEL_DOC_DIR,
};

pub use logging::init;
