use braid_util::fs::{find_ancestor_with, write_atomic};

#[test]
fn find_ancestor_in_parent() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("Braid.toml"), "").unwrap();
    let nested = tmp.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();

    let found = find_ancestor_with(&nested, "Braid.toml").unwrap();
    assert_eq!(found, tmp.path());
}

#[test]
fn find_ancestor_missing() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(find_ancestor_with(tmp.path(), "does-not-exist.toml").is_none());
}

#[test]
fn write_atomic_replaces_contents() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("Braid.lock");
    write_atomic(&path, "first").unwrap();
    write_atomic(&path, "second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    assert!(!tmp.path().join(".Braid.lock.tmp").exists());
}
