//! One map-file record: encoding and tolerant decoding.
//!
//! Records are written with fixed PascalCase field names. On import a few
//! alternative spellings written by older tools are accepted too, and every
//! field except the path and the name may be missing.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::scanner::{DigestAlgorithm, FileDescriptor};

const KEY_FIELDS: &[&str] = &["Path", "key", "path"];
const ABSOLUTE_FIELDS: &[&str] = &["FullPath", "absolutePath", "AbsolutePath"];
const NAME_FIELDS: &[&str] = &["Name", "name"];
const SIZE_FIELDS: &[&str] = &["Size", "size"];
const MTIME_FIELDS: &[&str] = &["ModificationTime", "modificationTime", "mtime"];
const DIGEST_FIELDS: &[&str] = &["Digest", "digest"];
const ALGORITHM_FIELDS: &[&str] = &["Algorithm", "algorithm"];
const INODE_FIELDS: &[&str] = &["Inum", "inode"];
const DEVICE_FIELDS: &[&str] = &["Device", "device"];

/// Serialized form of one descriptor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MapRecord<'a> {
    path: &'a Path,
    full_path: &'a Path,
    name: &'a str,
    size: u64,
    modification_time: i64,
    digest: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<&'static str>,
    inum: u64,
    device: u64,
}

impl<'a> MapRecord<'a> {
    /// Borrow a descriptor for serialization.
    ///
    /// The algorithm tag is only written for hashed descriptors.
    pub(crate) fn new(desc: &'a FileDescriptor, algorithm: DigestAlgorithm) -> Self {
        Self {
            path: &desc.key,
            full_path: &desc.absolute_path,
            name: &desc.name,
            size: desc.size,
            modification_time: desc.modified,
            digest: &desc.digest,
            algorithm: desc.is_hashed().then(|| algorithm.name()),
            inum: desc.inode,
            device: desc.device,
        }
    }
}

/// Decode one record.
///
/// `object_key` is the key the record was stored under in the object shape;
/// it takes precedence over the record's own path field. On failure the
/// returned string says what is wrong.
pub(crate) fn decode_record(
    value: &Value,
    object_key: Option<&str>,
    algorithm: DigestAlgorithm,
) -> Result<FileDescriptor, String> {
    let fields = value
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", kind_of(value)))?;

    let key = match object_key.filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None => string_field(fields, KEY_FIELDS)?.unwrap_or_default(),
    };
    if key.is_empty() {
        return Err("missing required field `Path`".to_string());
    }

    let name = string_field(fields, NAME_FIELDS)?.unwrap_or_default();
    if name.is_empty() {
        return Err("missing required field `Name`".to_string());
    }

    let absolute_path = string_field(fields, ABSOLUTE_FIELDS)?.unwrap_or_default();
    let size = unsigned_field(fields, SIZE_FIELDS)?;
    let modified = signed_field(fields, MTIME_FIELDS)?;
    let inode = unsigned_field(fields, INODE_FIELDS)?;
    let device = unsigned_field(fields, DEVICE_FIELDS)?;

    let mut digest = match string_field(fields, DIGEST_FIELDS)? {
        Some(digest) => digest,
        None => string_field(fields, &[algorithm.legacy_field()])?.unwrap_or_default(),
    };

    if let Some(tag) = string_field(fields, ALGORITHM_FIELDS)?.filter(|t| !t.is_empty()) {
        if DigestAlgorithm::from_name(&tag) != Some(algorithm) {
            log::debug!(
                "Discarding {} digest for {} (active algorithm is {})",
                tag,
                key,
                algorithm
            );
            digest.clear();
        }
    }

    Ok(FileDescriptor {
        key: PathBuf::from(key),
        absolute_path: PathBuf::from(absolute_path),
        name,
        size,
        modified,
        digest: digest.to_ascii_lowercase(),
        inode,
        device,
    })
}

/// Value of the first present field among `names`.
fn lookup<'v>(fields: &'v Map<String, Value>, names: &[&str]) -> Option<(&'v str, &'v Value)> {
    names.iter().find_map(|name| {
        fields
            .get_key_value(*name)
            .map(|(k, v)| (k.as_str(), v))
    })
}

fn string_field(fields: &Map<String, Value>, names: &[&str]) -> Result<Option<String>, String> {
    match lookup(fields, names) {
        None | Some((_, Value::Null)) => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((name, other)) => Err(format!(
            "field `{}` must be a string, found {}",
            name,
            kind_of(other)
        )),
    }
}

fn unsigned_field(fields: &Map<String, Value>, names: &[&str]) -> Result<u64, String> {
    match lookup(fields, names) {
        None | Some((_, Value::Null)) => Ok(0),
        Some((name, value)) => value.as_u64().ok_or_else(|| {
            format!(
                "field `{}` must be a non-negative integer, found {}",
                name,
                kind_of(value)
            )
        }),
    }
}

fn signed_field(fields: &Map<String, Value>, names: &[&str]) -> Result<i64, String> {
    match lookup(fields, names) {
        None | Some((_, Value::Null)) => Ok(0),
        Some((name, value)) => value.as_i64().ok_or_else(|| {
            format!(
                "field `{}` must be an integer, found {}",
                name,
                kind_of(value)
            )
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a fractional number",
        Value::Number(n) if n.is_i64() && !n.is_u64() => "a negative number",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
