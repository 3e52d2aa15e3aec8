use super::*;
use std::fs::{create_dir, write};

#[test]
fn list_dir_returns_sorted_entries_with_kinds() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path();

    write(root.join("b.txt"), b"b").expect("write b.txt");
    create_dir(root.join("a_dir")).expect("create a_dir");
    write(root.join("c.txt"), b"c").expect("write c.txt");

    let entries = list_dir(root);
    let listed: Vec<(&str, EntryKind)> = entries
        .iter()
        .map(|e| (e.name.as_str(), e.kind))
        .collect();

    assert_eq!(
        listed,
        vec![
            ("a_dir", EntryKind::Dir),
            ("b.txt", EntryKind::File),
            ("c.txt", EntryKind::File),
        ],
    );
}

#[test]
fn list_dir_treats_missing_directory_as_empty() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let gone = tmp.path().join("never_created");

    assert!(list_dir(&gone).is_empty());
}

#[cfg(unix)]
#[test]
fn list_dir_skips_dangling_symlinks() {
    use std::os::unix::fs::symlink;

    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path();

    write(root.join("real.txt"), b"x").expect("write real.txt");
    symlink(root.join("missing_target"), root.join(".#broken")).expect("create dangling link");

    let entries = list_dir(root);
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();

    assert_eq!(names, vec!["real.txt"]);
}

#[test]
fn read_to_string_if_exists_handles_presence_and_absence() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path();

    let present = root.join("present.yaml");
    write(&present, "name: demo\n").expect("write present.yaml");

    assert_eq!(
        read_to_string_if_exists(&present).as_deref(),
        Some("name: demo\n"),
    );
    assert_eq!(read_to_string_if_exists(&root.join("absent.yaml")), None);
}

#[cfg(unix)]
#[test]
fn is_file_rejects_dangling_symlink() {
    use std::os::unix::fs::symlink;

    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path();

    let link = root.join(".#editor_artifact");
    symlink(root.join("missing"), &link).expect("create dangling link");

    assert!(!is_file(&link));

    write(root.join("real.dart"), b"void main() {}").expect("write real.dart");
    assert!(is_file(&root.join("real.dart")));
}
