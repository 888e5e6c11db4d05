use galley_util::fs::{find_ancestor_with, list_subdirs};

#[test]
fn finds_marker_in_ancestor() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("provisioning.toml"), "").unwrap();
    let nested = dir.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();

    let found = find_ancestor_with(&nested, "provisioning.toml").unwrap();
    assert_eq!(found, dir.path());
}

#[test]
fn missing_marker_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(find_ancestor_with(dir.path(), "does-not-exist.toml").is_none());
}

#[test]
fn subdirs_are_sorted_and_skip_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("2.0")).unwrap();
    std::fs::create_dir(dir.path().join("1.0")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

    let names = list_subdirs(dir.path()).unwrap();
    assert_eq!(names, vec!["1.0".to_string(), "2.0".to_string()]);
}

#[test]
fn subdirs_of_missing_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(list_subdirs(&dir.path().join("nope")).unwrap().is_empty());
}
