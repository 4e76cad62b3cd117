//! Import, export and atomic writes.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::record::{decode_record, MapRecord};
use super::{MapFileError, MapFormat};
use crate::scanner::{DigestAlgorithm, FileDescriptor, FileMap};

/// Read a map file in either shape.
///
/// # Errors
///
/// Returns [`MapFileError`] if the file cannot be read, is not JSON, has an
/// unrecognized top-level shape or contains an invalid record. Nothing is
/// returned on failure, so a failed import never seeds a scan.
pub fn import_map(path: &Path, algorithm: DigestAlgorithm) -> Result<FileMap, MapFileError> {
    let text = fs::read_to_string(path).map_err(|source| MapFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let files = decode_map(&text, path, algorithm)?;
    log::info!("Imported {} file(s) from {}", files.len(), path.display());
    Ok(files)
}

/// Decode map file content. `source` is only used in error messages.
///
/// # Errors
///
/// See [`import_map`].
pub fn decode_map(
    text: &str,
    source: &Path,
    algorithm: DigestAlgorithm,
) -> Result<FileMap, MapFileError> {
    let first = text.trim_start().chars().next();
    if !matches!(first, Some('{' | '[')) {
        return Err(MapFileError::UnknownShape {
            path: source.to_path_buf(),
            found: first,
        });
    }

    let value: Value = serde_json::from_str(text).map_err(|e| MapFileError::Parse {
        path: source.to_path_buf(),
        source: e,
    })?;

    let invalid = |record: String, reason: String| MapFileError::InvalidRecord {
        path: source.to_path_buf(),
        record,
        reason,
    };

    let mut files = FileMap::new();
    match value {
        Value::Object(entries) => {
            files.reserve(entries.len());
            for (key, record) in &entries {
                let desc = decode_record(record, Some(key.as_str()), algorithm)
                    .map_err(|reason| invalid(format!("{:?}", key), reason))?;
                files.insert(desc.key.clone(), Arc::new(desc));
            }
        }
        Value::Array(records) => {
            files.reserve(records.len());
            for (index, record) in records.iter().enumerate() {
                let desc = decode_record(record, None, algorithm)
                    .map_err(|reason| invalid(format!("#{}", index), reason))?;
                if files.contains_key(&desc.key) {
                    log::warn!(
                        "Duplicate entry for {} in {}; keeping the later record",
                        desc.key.display(),
                        source.display()
                    );
                }
                files.insert(desc.key.clone(), Arc::new(desc));
            }
        }
        _ => {
            return Err(MapFileError::UnknownShape {
                path: source.to_path_buf(),
                found: first,
            })
        }
    }

    Ok(files)
}

/// Serialize a file set as pretty JSON, records sorted by path.
///
/// Descriptors whose key or absolute path is not valid UTF-8 cannot be
/// represented in JSON. They are left out with a warning naming the file and
/// get hashed again on the next run.
///
/// # Errors
///
/// Returns [`MapFileError::Serialize`] if serialization fails.
pub fn encode_map(
    files: &FileMap,
    format: MapFormat,
    algorithm: DigestAlgorithm,
) -> Result<Vec<u8>, MapFileError> {
    let sorted = encodable(files);
    let result = match format {
        MapFormat::Object => {
            let records: BTreeMap<&Path, MapRecord<'_>> = sorted
                .into_iter()
                .map(|desc| (desc.key.as_path(), MapRecord::new(desc, algorithm)))
                .collect();
            serde_json::to_vec_pretty(&records)
        }
        MapFormat::Array => {
            let records: Vec<MapRecord<'_>> = sorted
                .into_iter()
                .map(|desc| MapRecord::new(desc, algorithm))
                .collect();
            serde_json::to_vec_pretty(&records)
        }
    };
    result.map_err(MapFileError::Serialize)
}

/// Descriptors that can be written to a map file, sorted by key.
fn encodable(files: &FileMap) -> Vec<&FileDescriptor> {
    let mut sorted: Vec<&FileDescriptor> = files
        .values()
        .map(Arc::as_ref)
        .filter(|desc| {
            let utf8 = desc.key.to_str().is_some() && desc.absolute_path.to_str().is_some();
            if !utf8 {
                log::warn!(
                    "Leaving {} out of the map: path is not valid UTF-8",
                    desc.key.display()
                );
            }
            utf8
        })
        .collect();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));
    sorted
}

/// Write the file set to `path`.
///
/// The content is fully serialized first, then written to a temporary file in
/// the destination directory and renamed over the destination, so an error
/// never leaves a truncated map behind.
///
/// # Errors
///
/// Returns [`MapFileError::AlreadyExists`] if `path` exists and `replace` is
/// false, or another [`MapFileError`] if serialization or writing fails.
pub fn export_map(
    path: &Path,
    files: &FileMap,
    format: MapFormat,
    algorithm: DigestAlgorithm,
    replace: bool,
) -> Result<(), MapFileError> {
    let bytes = encode_map(files, format, algorithm)?;
    write_atomic(path, &bytes, replace)?;
    log::info!("Exported {} file(s) to {}", files.len(), path.display());
    Ok(())
}

/// Render md5sums-style lines (`<digest>  <path>`), sorted by path.
///
/// Paths are absolute when `absolute` is set, scan paths otherwise.
///
/// # Errors
///
/// Fails if any descriptor is unhashed or has no path in the requested style.
pub fn render_hashsums(files: &FileMap, absolute: bool) -> Result<String, MapFileError> {
    let mut lines: Vec<(&Path, &str)> = Vec::with_capacity(files.len());
    for desc in files.values() {
        let path = if absolute {
            desc.absolute_path.as_path()
        } else {
            desc.key.as_path()
        };
        if path.as_os_str().is_empty() {
            return Err(MapFileError::MissingPath(desc.name.clone()));
        }
        if !desc.is_hashed() {
            return Err(MapFileError::Unhashed(desc.key.clone()));
        }
        lines.push((path, desc.digest.as_str()));
    }
    lines.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (path, digest) in lines {
        out.push_str(digest);
        out.push_str("  ");
        out.push_str(&path.to_string_lossy());
        out.push('\n');
    }
    Ok(out)
}

/// Write hash-sums lines to `dest`, or to stdout when `dest` is `-`.
///
/// Nothing is written unless every descriptor can be rendered.
///
/// # Errors
///
/// See [`render_hashsums`]; write failures are reported as
/// [`MapFileError::Write`].
pub fn export_hashsums(dest: &Path, files: &FileMap, absolute: bool) -> Result<(), MapFileError> {
    let content = render_hashsums(files, absolute)?;

    if dest == Path::new("-") {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|source| MapFileError::Write {
                path: dest.to_path_buf(),
                source,
            })?;
    } else {
        write_atomic(dest, content.as_bytes(), true)?;
    }
    log::info!("Exported {} hash sum(s) to {}", files.len(), dest.display());
    Ok(())
}

/// Write `bytes` to a temporary sibling of `path` and move it into place.
fn write_atomic(path: &Path, bytes: &[u8], replace: bool) -> Result<(), MapFileError> {
    let write_error = |source: io::Error| MapFileError::Write {
        path: path.to_path_buf(),
        source,
    };

    if !replace && path.exists() {
        return Err(MapFileError::AlreadyExists(path.to_path_buf()));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".dupefinder-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(write_error)?;
    temp.write_all(bytes).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;

    if replace {
        temp.persist(path).map_err(|e| write_error(e.error))?;
    } else {
        temp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                MapFileError::AlreadyExists(path.to_path_buf())
            } else {
                write_error(e.error)
            }
        })?;
    }
    Ok(())
}
