use dupefinder::actions::{delete_duplicates, delete_file, ActionKind, DeleteConfig, DeleteError};
use dupefinder::duplicates::classify;
use dupefinder::scanner::{Scan, ScanConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn scan(root: &Path) -> Scan {
    let mut scan = Scan::new(ScanConfig::default());
    scan.add_root(root);
    scan.run();
    scan
}

#[test]
fn test_delete_removes_only_additional_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"X").unwrap();
    fs::write(dir.path().join("b.txt"), b"X").unwrap();
    fs::write(dir.path().join("c.txt"), b"Y").unwrap();

    let session = scan(dir.path());
    let report = delete_duplicates(&classify(session.index()), &DeleteConfig::permanent());

    assert_eq!(report.kind, ActionKind::Delete);
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.bytes_reclaimed, 1);
    assert!(dir.path().join("a.txt").exists());
    assert!(!dir.path().join("b.txt").exists());
    assert!(dir.path().join("c.txt").exists());
}

#[test]
fn test_delete_failure_does_not_abort_batch() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(name), b"dup").unwrap();
    }

    let session = scan(dir.path());
    let groups = classify(session.index());
    fs::remove_file(dir.path().join("b")).unwrap();

    let report = delete_duplicates(&groups, &DeleteConfig::permanent());

    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.failures[0].0, dir.path().join("b"));
    assert!(!dir.path().join("c").exists());
    assert!(dir.path().join("a").exists());
    assert!(report.summary().contains("1 failed"));
}

#[test]
fn test_delete_detects_modified_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"one").unwrap();
    fs::write(dir.path().join("b"), b"one").unwrap();

    let session = scan(dir.path());
    let b = session.get(&dir.path().join("b")).unwrap().clone();
    fs::write(dir.path().join("b"), b"grown content").unwrap();

    let result = delete_file(&b, &DeleteConfig::permanent());

    assert!(matches!(result, Err(DeleteError::Modified(_))));
    assert!(dir.path().join("b").exists());
}

#[test]
fn test_delete_without_verification() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"one").unwrap();

    let session = scan(dir.path());
    let a = session.get(&dir.path().join("a")).unwrap().clone();
    fs::write(dir.path().join("a"), b"changed").unwrap();

    let config = DeleteConfig::permanent().with_verify_unchanged(false);
    assert_eq!(delete_file(&a, &config).unwrap(), 3);
    assert!(!dir.path().join("a").exists());
}
