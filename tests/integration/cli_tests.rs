use clap::Parser;
use dupefinder::cli::Cli;
use dupefinder::error::{ExitCode, SetupError};
use dupefinder::mapfile::import_map;
use dupefinder::scanner::DigestAlgorithm;
use dupefinder::{run_app, validate};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["dupefinder", "-q"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_validate_missing_root() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");
    let err = validate(&parse(&[s(&missing)])).unwrap_err();
    assert!(matches!(err, SetupError::PathNotFound(_)));
}

#[test]
fn test_validate_root_is_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, b"x").unwrap();
    let err = validate(&parse(&[s(&file)])).unwrap_err();
    assert!(matches!(err, SetupError::NotADirectory(_)));
}

#[test]
fn test_validate_map_file_rules() {
    let dir = tempdir().unwrap();
    let root = s(dir.path());
    let map = dir.path().join("map.json");

    let err = validate(&parse(&["--map-file-import", s(&map), root])).unwrap_err();
    assert!(matches!(err, SetupError::MapFileMissing(_)));

    let err = validate(&parse(&["--map-file-replace", root])).unwrap_err();
    assert!(matches!(err, SetupError::NothingToReplace));

    fs::write(&map, "{}").unwrap();
    let err = validate(&parse(&["--map-file-export", s(&map), root])).unwrap_err();
    assert!(matches!(err, SetupError::MapFileConflict(_)));

    let target = validate(&parse(&["--map-file-import", s(&map), "--map-file-replace", root]))
        .unwrap();
    assert_eq!(target.as_deref(), Some(map.as_path()));
}

#[test]
fn test_validate_destructive_action_needs_confirmation() {
    let dir = tempdir().unwrap();
    let err = validate(&parse(&["--link", s(dir.path())])).unwrap_err();
    assert!(matches!(err, SetupError::ConfirmationRequired("link")));

    assert!(validate(&parse(&["--link", "--yes", s(dir.path())])).is_ok());
}

#[test]
fn test_setup_error_exit_code() {
    let dir = tempdir().unwrap();
    let err = run_app(parse(&[s(&dir.path().join("nope"))])).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::SetupError);
}

#[test]
fn test_malformed_import_is_general_error() {
    let dir = tempdir().unwrap();
    let map = dir.path().join("map.json");
    fs::write(&map, "not a map").unwrap();

    let err = run_app(parse(&["--map-file-import", s(&map), s(dir.path())])).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_export_then_no_scan_import() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.txt"), b"X").unwrap();
    fs::write(data.join("b.txt"), b"X").unwrap();
    let map = dir.path().join("map.json");
    let sums = dir.path().join("MD5SUMS");

    let code = run_app(parse(&["--map-file-export", s(&map), "--no-groups", s(&data)])).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(import_map(&map, DigestAlgorithm::Md5).unwrap().len(), 2);

    let code = run_app(parse(&[
        "--no-scan",
        "--map-file-import",
        s(&map),
        "--export-hashsums",
        s(&sums),
        "--output",
        "json",
    ]))
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_to_string(&sums).unwrap().lines().count(), 2);
}

#[cfg(unix)]
#[test]
fn test_link_action_end_to_end() {
    use std::os::unix::fs::MetadataExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"X").unwrap();
    fs::write(dir.path().join("b.txt"), b"X").unwrap();
    fs::write(dir.path().join("c.txt"), b"Y").unwrap();

    let code = run_app(parse(&["--link", "--yes", s(dir.path())])).unwrap();
    assert_eq!(code, ExitCode::Success);

    let a = fs::metadata(dir.path().join("a.txt")).unwrap();
    let b = fs::metadata(dir.path().join("b.txt")).unwrap();
    assert_eq!(a.ino(), b.ino());
    assert_eq!(a.nlink(), 2);
}

#[test]
fn test_delete_action_end_to_end() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep"), b"data").unwrap();
    fs::write(dir.path().join("lose"), b"data").unwrap();

    let code = run_app(parse(&["--delete", "-y", "--output", "json", s(dir.path())])).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join("keep").exists());
    assert!(!dir.path().join("lose").exists());
}

#[test]
fn test_map_export_reflects_deleted_files() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("keep"), b"data").unwrap();
    fs::write(data.join("lose"), b"data").unwrap();
    let map = dir.path().join("map.json");

    let code = run_app(parse(&[
        "--delete",
        "-y",
        "--no-groups",
        "--map-file-export",
        s(&map),
        s(&data),
    ]))
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let files = import_map(&map, DigestAlgorithm::Md5).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.contains_key(&data.join("keep")));
}

#[cfg(unix)]
#[test]
fn test_map_export_reflects_new_links() {
    use std::os::unix::fs::MetadataExt;

    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.txt"), b"X").unwrap();
    fs::write(data.join("b.txt"), b"X").unwrap();
    let map = dir.path().join("map.json");

    run_app(parse(&["--link", "-y", "--map-file-export", s(&map), s(&data)])).unwrap();

    let files = import_map(&map, DigestAlgorithm::Md5).unwrap();
    let a = &files[&data.join("a.txt")];
    let b = &files[&data.join("b.txt")];
    assert_eq!(a.inode, b.inode);
    assert_eq!(a.inode, fs::metadata(data.join("a.txt")).unwrap().ino());
    assert_eq!(a.digest, b.digest);
}
