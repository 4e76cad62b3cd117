use dupefinder::duplicates::classify;
use dupefinder::mapfile::{export_map, import_map, MapFormat};
use dupefinder::scanner::{hash_bytes, DigestAlgorithm, Scan, ScanConfig};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn touch(path: &Path, content: &[u8], mtime: i64) {
    fs::write(path, content).unwrap();
    set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

#[test]
fn test_second_run_reuses_every_digest() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("a"), b"alpha", 1_600_000_000);
    touch(&dir.path().join("b"), b"alpha", 1_600_000_000);
    touch(&dir.path().join("c"), b"gamma", 1_600_000_000);

    let mut scan = Scan::new(ScanConfig::default().with_workers(2));
    scan.add_root(dir.path());

    let first = scan.run();
    assert_eq!(first.hashed, 3);
    assert_eq!(first.reused, 0);
    let groups_before = classify(scan.index());

    let second = scan.run();
    assert_eq!(second.hashed, 0);
    assert_eq!(second.reused, 3);
    assert_eq!(classify(scan.index()), groups_before);
}

#[test]
fn test_changed_mtime_forces_rehash() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file");
    touch(&path, b"before", 1_600_000_000);

    let mut scan = Scan::new(ScanConfig::default());
    scan.add_root(dir.path());
    scan.run();

    touch(&path, b"after!", 1_600_000_100);
    let report = scan.run();

    assert_eq!(report.hashed, 1);
    assert_eq!(
        scan.get(&path).unwrap().digest,
        hash_bytes(DigestAlgorithm::Md5, b"after!")
    );
}

#[test]
fn test_same_size_and_mtime_keeps_stale_digest() {
    // Size and mtime are the only validity check; content is not re-read.
    let dir = tempdir().unwrap();
    let path = dir.path().join("file");
    touch(&path, b"aaaa", 1_600_000_000);

    let mut scan = Scan::new(ScanConfig::default());
    scan.add_root(dir.path());
    scan.run();

    touch(&path, b"bbbb", 1_600_000_000);
    let report = scan.run();

    assert_eq!(report.reused, 1);
    assert_eq!(
        scan.get(&path).unwrap().digest,
        hash_bytes(DigestAlgorithm::Md5, b"aaaa")
    );
}

#[test]
fn test_imported_map_seeds_cache_hits() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    touch(&data.join("x"), b"one", 1_600_000_000);
    touch(&data.join("y"), b"one", 1_600_000_000);
    let map = dir.path().join("map.json");

    let mut first = Scan::new(ScanConfig::default());
    first.add_root(&data);
    first.run();
    export_map(&map, first.files(), MapFormat::Object, DigestAlgorithm::Md5, false).unwrap();

    let files = import_map(&map, DigestAlgorithm::Md5).unwrap();
    let mut second = Scan::with_files(ScanConfig::default(), files);
    second.add_root(&data);
    let report = second.run();

    assert_eq!(report.hashed, 0);
    assert_eq!(report.reused, 2);
    assert_eq!(classify(second.index()), classify(first.index()));
}

#[test]
fn test_map_from_other_algorithm_is_rehashed() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    touch(&data.join("x"), b"one", 1_600_000_000);
    let map = dir.path().join("map.json");

    let mut first = Scan::new(ScanConfig::default().with_algorithm(DigestAlgorithm::Sha256));
    first.add_root(&data);
    first.run();
    export_map(&map, first.files(), MapFormat::Array, DigestAlgorithm::Sha256, false).unwrap();

    let files = import_map(&map, DigestAlgorithm::Md5).unwrap();
    assert!(files.values().all(|d| !d.is_hashed()));

    let mut second = Scan::with_files(ScanConfig::default(), files);
    second.add_root(&data);
    let report = second.run();
    assert_eq!(report.hashed, 1);
}

#[test]
fn test_imported_record_found_by_absolute_path() {
    // Key written from another working directory; only FullPath still matches.
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    touch(&path, b"alpha", 1_600_000_000);

    let map = format!(
        r#"{{"elsewhere/a.txt": {{"Path": "elsewhere/a.txt", "FullPath": {}, "Name": "a.txt",
            "Size": 5, "ModificationTime": 1600000000, "Digest": "feedface"}}}}"#,
        serde_json::to_string(path.to_str().unwrap()).unwrap()
    );
    let map_path = dir.path().join("map.json");
    fs::write(&map_path, map).unwrap();
    let files = import_map(&map_path, DigestAlgorithm::Md5).unwrap();

    let mut scan = Scan::with_files(ScanConfig::default(), files);
    scan.add_root(dir.path());
    let report = scan.run();

    assert_eq!(report.reused, 1);
    assert_eq!(scan.get(&path).unwrap().digest, "feedface");
    assert!(scan.get(Path::new("elsewhere/a.txt")).is_none());
    assert_eq!(report.hashed, 1); // map.json itself
}

#[test]
fn test_existing_alias_key_is_replaced() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let path = dir.path().join("a.txt");
    touch(&path, b"alpha", 1_600_000_000);

    let alias = dir.path().join("sub").join("..").join("a.txt");
    let mut seed = Scan::new(ScanConfig::default());
    seed.add_root(dir.path());
    seed.run();
    let mut files = seed.into_files();
    let mut desc = files.remove(&path).unwrap().as_ref().clone();
    desc.key = alias.clone();
    desc.digest = "cafe".to_string();
    files.insert(alias.clone(), std::sync::Arc::new(desc));

    let mut scan = Scan::with_files(ScanConfig::default(), files);
    scan.add_root(dir.path());
    let report = scan.run();

    assert_eq!(report.reused, 1);
    assert_eq!(scan.len(), 1);
    assert_eq!(scan.get(&path).unwrap().digest, "cafe");
    assert!(scan.get(&alias).is_none());
}
