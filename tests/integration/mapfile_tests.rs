use dupefinder::mapfile::{
    decode_map, export_hashsums, export_map, import_map, render_hashsums, MapFileError,
    MapFormat,
};
use dupefinder::scanner::{DigestAlgorithm, FileDescriptor, FileMap, Scan, ScanConfig};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

type Tuple = (PathBuf, u64, i64, String);

fn tuples(files: &FileMap) -> BTreeSet<Tuple> {
    files
        .values()
        .map(|d| (d.key.clone(), d.size, d.modified, d.digest.clone()))
        .collect()
}

fn scanned(root: &Path) -> Scan {
    fs::write(root.join("a.txt"), b"X").unwrap();
    fs::write(root.join("b.txt"), b"X").unwrap();
    fs::write(root.join("c.txt"), b"Y").unwrap();
    let mut scan = Scan::new(ScanConfig::default());
    scan.add_root(root);
    scan.run();
    scan
}

#[test]
fn test_round_trip_both_shapes() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    let scan = scanned(&data);

    for (format, name) in [(MapFormat::Object, "object.json"), (MapFormat::Array, "array.json")] {
        let map = dir.path().join(name);
        export_map(&map, scan.files(), format, DigestAlgorithm::Md5, false).unwrap();
        let imported = import_map(&map, DigestAlgorithm::Md5).unwrap();

        assert_eq!(tuples(&imported), tuples(scan.files()), "{name}");
        let a = imported.get(&data.join("a.txt")).unwrap();
        assert_eq!(a.name, "a.txt");
        assert_eq!(a.inode, scan.get(&data.join("a.txt")).unwrap().inode);
    }
}

#[test]
fn test_export_refuses_to_overwrite() {
    let dir = tempdir().unwrap();
    let map = dir.path().join("map.json");
    fs::write(&map, "previous").unwrap();

    let empty = FileMap::new();
    let result = export_map(&map, &empty, MapFormat::Object, DigestAlgorithm::Md5, false);

    assert!(matches!(result, Err(MapFileError::AlreadyExists(_))));
    assert_eq!(fs::read_to_string(&map).unwrap(), "previous");

    export_map(&map, &empty, MapFormat::Object, DigestAlgorithm::Md5, true).unwrap();
    assert_eq!(fs::read_to_string(&map).unwrap().trim(), "{}");
}

#[test]
fn test_import_rejects_malformed_and_incomplete_maps() {
    let src = Path::new("map.json");

    let err = decode_map("# not json", src, DigestAlgorithm::Md5).unwrap_err();
    assert!(matches!(err, MapFileError::UnknownShape { found: Some('#'), .. }));

    let err = decode_map("[{\"Path\": \"a\"", src, DigestAlgorithm::Md5).unwrap_err();
    assert!(matches!(err, MapFileError::Parse { .. }));

    let text = r#"[{"Path": "a", "Name": "a"}, {"Path": "b"}]"#;
    match decode_map(text, src, DigestAlgorithm::Md5).unwrap_err() {
        MapFileError::InvalidRecord { record, reason, .. } => {
            assert_eq!(record, "#1");
            assert!(reason.contains("Name"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_import_missing_optional_fields_default_to_zero() {
    let text = r#"{"docs/x.txt": {"Name": "x.txt"}}"#;
    let files = decode_map(text, Path::new("m.json"), DigestAlgorithm::Md5).unwrap();

    let desc = files.get(Path::new("docs/x.txt")).unwrap();
    assert_eq!(desc.size, 0);
    assert_eq!(desc.modified, 0);
    assert_eq!(desc.inode, 0);
    assert!(!desc.is_hashed());
    assert_eq!(desc.action_path(), Path::new("docs/x.txt"));
}

#[test]
fn test_import_accepts_legacy_digest_field() {
    let text = r#"[{"path": "a", "name": "a", "size": 1, "MD5": "ABCDEF"}]"#;
    let files = decode_map(text, Path::new("m.json"), DigestAlgorithm::Md5).unwrap();
    assert_eq!(files.get(Path::new("a")).unwrap().digest, "abcdef");
}

#[test]
fn test_hashsums_export() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    let scan = scanned(&data);
    let out = dir.path().join("MD5SUMS");

    export_hashsums(&out, scan.files(), false).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        format!("02129bb861061d1a052c592e2dc6b383  {}", data.join("a.txt").display())
    );
    assert!(lines[2].ends_with("c.txt"));
}

#[test]
fn test_hashsums_fail_closed_on_unhashed_descriptor() {
    let mut files = FileMap::new();
    let desc = FileDescriptor::new(PathBuf::from("pending.bin"), 10, 0);
    files.insert(desc.key.clone(), Arc::new(desc));

    let dir = tempdir().unwrap();
    let out = dir.path().join("SUMS");
    let result = export_hashsums(&out, &files, false);

    assert!(matches!(result, Err(MapFileError::Unhashed(_))));
    assert!(!out.exists());
    assert!(render_hashsums(&files, true).is_err());
}

#[cfg(target_os = "linux")]
#[test]
fn test_export_skips_non_utf8_file_name() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("ok.txt"), b"X").unwrap();
    let bad = data.join(OsStr::from_bytes(b"bad\xff.txt"));
    fs::write(&bad, b"X").unwrap();

    let mut scan = Scan::new(ScanConfig::default());
    scan.add_root(&data);
    scan.run();
    assert_eq!(scan.len(), 2);

    let map = dir.path().join("map.json");
    export_map(&map, scan.files(), MapFormat::Object, DigestAlgorithm::Md5, false).unwrap();

    let imported = import_map(&map, DigestAlgorithm::Md5).unwrap();
    assert_eq!(imported.len(), 1);
    assert!(imported.contains_key(&data.join("ok.txt")));
    assert!(!imported.contains_key(&bad));
}
