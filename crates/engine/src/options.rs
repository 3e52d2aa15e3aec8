use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use atlas_fs::read_to_string_if_exists;
use atlas_runtime::{ANALYSIS_OPTIONS_FILE, ANALYSIS_OPTIONS_FILE_LEGACY};

/// The slice of the analysis-options file the engine itself consumes: the
/// exclude globs that shape the context's path filter. Everything else in
/// the document belongs to the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OptionsDoc {
    #[serde(default)]
    analyzer: Option<AnalyzerSection>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzerSection {
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

/// Locate the options file in `folder`; the modern name wins over the
/// legacy dot-name.
pub fn locate_options_file(folder: &Path) -> Option<PathBuf> {
    for name in [ANALYSIS_OPTIONS_FILE, ANALYSIS_OPTIONS_FILE_LEGACY] {
        let candidate = folder.join(name);
        if atlas_fs::is_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Read and parse the options of `folder`. Absence, emptiness, and parse
/// failure all yield default options; failures are logged, never fatal.
pub fn read_options(folder: &Path) -> (Option<PathBuf>, AnalysisOptions) {
    let Some(path) = locate_options_file(folder) else {
        return (None, AnalysisOptions::default());
    };

    let Some(content) = read_to_string_if_exists(&path) else {
        return (Some(path), AnalysisOptions::default());
    };

    let options = parse_options(&path, &content);
    (Some(path), options)
}

pub fn parse_options(path: &Path, content: &str) -> AnalysisOptions {
    if content.trim().is_empty() {
        return AnalysisOptions::default();
    }

    match serde_yaml::from_str::<OptionsDoc>(content) {
        Ok(doc) => AnalysisOptions {
            exclude_patterns: doc.analyzer.and_then(|a| a.exclude).unwrap_or_default(),
        },
        Err(e) => {
            warn!("[options] {path:?} did not parse, using defaults: {e}");
            AnalysisOptions::default()
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
