use super::*;
use std::fs::write;

#[test]
fn parse_extracts_exclude_globs() {
    let content = "\
analyzer:
  exclude:
    - build/**
    - '**/*.g.dart'
";
    let options = parse_options(Path::new("/ws/analysis_options.yaml"), content);
    assert_eq!(
        options.exclude_patterns,
        vec!["build/**".to_string(), "**/*.g.dart".to_string()],
    );
}

#[test]
fn parse_tolerates_empty_and_unrelated_documents() {
    let path = Path::new("/ws/analysis_options.yaml");

    assert_eq!(parse_options(path, ""), AnalysisOptions::default());
    assert_eq!(parse_options(path, "   \n"), AnalysisOptions::default());
    assert_eq!(
        parse_options(path, "linter:\n  rules:\n    - camel_case_types\n"),
        AnalysisOptions::default(),
    );
    assert_eq!(parse_options(path, "analyzer:\n"), AnalysisOptions::default());
}

#[test]
fn parse_failure_yields_defaults() {
    let options = parse_options(Path::new("/ws/analysis_options.yaml"), ":\n  - ][");
    assert_eq!(options, AnalysisOptions::default());
}

#[test]
fn read_options_prefers_modern_file_name() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path();

    write(
        root.join("analysis_options.yaml"),
        "analyzer:\n  exclude:\n    - modern/**\n",
    )
    .expect("write modern options");
    write(
        root.join(".analysis_options"),
        "analyzer:\n  exclude:\n    - legacy/**\n",
    )
    .expect("write legacy options");

    let (path, options) = read_options(root);
    assert_eq!(path, Some(root.join("analysis_options.yaml")));
    assert_eq!(options.exclude_patterns, vec!["modern/**".to_string()]);
}

#[test]
fn read_options_falls_back_to_legacy_name() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path();

    write(
        root.join(".analysis_options"),
        "analyzer:\n  exclude:\n    - legacy/**\n",
    )
    .expect("write legacy options");

    let (path, options) = read_options(root);
    assert_eq!(path, Some(root.join(".analysis_options")));
    assert_eq!(options.exclude_patterns, vec!["legacy/**".to_string()]);
}

#[test]
fn read_options_without_file_yields_defaults() {
    let tmp = tempfile::tempdir().expect("create temp dir");

    let (path, options) = read_options(tmp.path());
    assert_eq!(path, None);
    assert_eq!(options, AnalysisOptions::default());
}
