use dupefinder::duplicates::{additional_files, classify, ScanSummary, SortKey};
use dupefinder::scanner::{hash_bytes, DigestAlgorithm, Scan, ScanConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

fn scan_dir(root: &Path, config: ScanConfig) -> Scan {
    let mut scan = Scan::new(config);
    scan.add_root(root);
    scan.run();
    scan
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let mut scan = Scan::new(ScanConfig::default().with_workers(4));
    scan.add_root(dir.path());

    let report = scan.run();

    assert_eq!(report.dispatched, 0);
    assert!(scan.is_empty());
    assert!(classify(scan.index()).is_empty());
}

#[test]
fn test_scan_end_to_end_example() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"X");
    write(&dir.path().join("b.txt"), b"X");
    write(&dir.path().join("c.txt"), b"Y");

    let scan = scan_dir(dir.path(), ScanConfig::default());
    let groups = classify(scan.index());
    let summary = ScanSummary::new(scan.files(), &groups);

    assert_eq!(groups.len(), 1);
    let group = groups.values().next().unwrap();
    assert_eq!(group.len(), 2);
    assert_eq!(group.keeper().key, dir.path().join("a.txt"));
    assert_eq!(group.additional()[0].key, dir.path().join("b.txt"));
    assert_eq!(group.digest(), hash_bytes(DigestAlgorithm::Md5, b"X"));
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_size, 1);
}

#[test]
fn test_scan_nested_directories_and_multiple_roots() {
    let dir = tempdir().unwrap();
    let left = dir.path().join("left");
    let right = dir.path().join("right/deep/er");
    fs::create_dir_all(&left).unwrap();
    fs::create_dir_all(&right).unwrap();
    write(&left.join("one.bin"), b"same bytes");
    write(&right.join("two.bin"), b"same bytes");

    let mut scan = Scan::new(ScanConfig::default().with_workers(3));
    scan.add_root(&left);
    scan.add_root(dir.path().join("right"));
    let report = scan.run();

    assert_eq!(report.dispatched, 2);
    assert_eq!(report.hashed, 2);
    let groups = classify(scan.index());
    assert_eq!(groups.len(), 1);
    assert_eq!(additional_files(&groups).len(), 1);
}

#[test]
fn test_empty_files_never_grouped() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("empty1"), b"");
    write(&dir.path().join("empty2"), b"");
    write(&dir.path().join("full"), b"data");

    let scan = scan_dir(dir.path(), ScanConfig::default());

    assert_eq!(scan.len(), 3);
    assert!(classify(scan.index()).is_empty());
}

#[test]
fn test_many_workers_match_single_worker() {
    let dir = tempdir().unwrap();
    for i in 0..40 {
        write(
            &dir.path().join(format!("f{i:02}")),
            format!("content {}", i % 7).as_bytes(),
        );
    }

    let single = scan_dir(dir.path(), ScanConfig::default().with_workers(1));
    let many = scan_dir(dir.path(), ScanConfig::default().with_workers(8));

    assert_eq!(single.len(), 40);
    assert_eq!(classify(single.index()), classify(many.index()));
    assert_eq!(classify(many.index()).len(), 7);
}

#[test]
fn test_vanished_files_are_cleaned() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"dup");
    write(&dir.path().join("b"), b"dup");

    let mut scan = scan_dir(dir.path(), ScanConfig::default());
    assert_eq!(classify(scan.index()).len(), 1);

    fs::remove_file(dir.path().join("b")).unwrap();
    let report = scan.run();

    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.removed[0].key, dir.path().join("b"));
    assert_eq!(scan.len(), 1);
    assert!(classify(scan.index()).is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_dispatched() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("original.txt");
    write(&original, b"linked content");
    std::os::unix::fs::symlink(&original, dir.path().join("link.txt")).unwrap();

    let mut scan = Scan::new(ScanConfig::default());
    scan.add_root(dir.path());
    let report = scan.run();

    assert_eq!(report.dispatched, 1);
    assert!(scan.get(&dir.path().join("link.txt")).is_none());
    assert!(classify(scan.index()).is_empty());
}

#[test]
fn test_hardlinked_pair_plus_copy() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let c = dir.path().join("c");
    write(&a, b"shared");
    if let Err(e) = fs::hard_link(&a, &b) {
        eprintln!("Skipping hardlink test: {e}");
        return;
    }
    write(&c, b"shared");

    let scan = scan_dir(dir.path(), ScanConfig::default());
    let groups = classify(scan.index());

    assert_eq!(scan.len(), 3);
    assert_eq!(groups.len(), 1);
    let group = groups.values().next().unwrap();
    if cfg!(unix) {
        assert_eq!(group.len(), 2);
        assert_eq!(group.additional().len(), 1);
        assert_eq!(group.keeper().key, a);
        assert_eq!(group.additional()[0].key, c);
    }
}

#[test]
fn test_sort_by_size_is_stable_by_path() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("z"), b"same");
    write(&dir.path().join("m"), b"same");

    let by_size = scan_dir(dir.path(), ScanConfig::default().with_sort(SortKey::Size));
    let groups = classify(by_size.index());
    assert_eq!(groups.values().next().unwrap().keeper().key, dir.path().join("m"));

    let reversed = scan_dir(
        dir.path(),
        ScanConfig::default()
            .with_sort(SortKey::Size)
            .with_reverse(true),
    );
    let groups = classify(reversed.index());
    assert_eq!(groups.values().next().unwrap().keeper().key, dir.path().join("z"));
}

#[test]
fn test_spawned_scan_joins_with_results() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"1");
    write(&dir.path().join("b"), b"1");

    let mut scan = Scan::new(ScanConfig::default().with_workers(2));
    scan.add_root(dir.path());
    let handle = scan.spawn().unwrap();
    let (scan, report) = handle.join();

    assert_eq!(report.dispatched, 2);
    assert_eq!(scan.len(), 2);
    assert_eq!(classify(scan.index()).len(), 1);
}

#[test]
fn test_algorithm_selection() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"abc");

    for algorithm in [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Blake3,
    ] {
        let scan = scan_dir(dir.path(), ScanConfig::default().with_algorithm(algorithm));
        let desc = scan.get(&dir.path().join("a")).unwrap();
        assert_eq!(desc.digest, hash_bytes(algorithm, b"abc"));
        assert_eq!(desc.digest.len(), algorithm.hex_len());
    }
}
