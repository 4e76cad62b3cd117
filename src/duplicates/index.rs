//! The grouping index: digest to sorted descriptors.
//!
//! The index is a pure function of the file set. It is never patched in
//! place; the scan engine rebuilds it wholesale after every mutation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::scanner::{FileDescriptor, FileMap};

/// Key used to order the members of one digest bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Scan path, lexical
    #[default]
    Path,
    /// File name, lexical
    Name,
    /// Size, ascending
    Size,
    /// Modification time, newest first
    #[serde(rename = "mtime")]
    #[value(name = "mtime")]
    ModificationTime,
}

/// Active sort key plus the independent reverse flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortOrder {
    /// Which attribute to compare
    pub key: SortKey,
    /// Invert the comparison result
    pub reverse: bool,
}

impl SortOrder {
    /// Create an ordering.
    #[must_use]
    pub fn new(key: SortKey, reverse: bool) -> Self {
        Self { key, reverse }
    }

    /// Compare two descriptors.
    ///
    /// Ties on the active attribute fall back to the scan path so bucket
    /// order is deterministic; the reverse flag inverts the whole result.
    #[must_use]
    pub fn compare(&self, a: &FileDescriptor, b: &FileDescriptor) -> Ordering {
        let primary = match self.key {
            SortKey::Path => a.key.cmp(&b.key),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::ModificationTime => b.modified.cmp(&a.modified),
        };
        let ordering = primary.then_with(|| a.key.cmp(&b.key));
        if self.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Hashed descriptors bucketed by digest, each bucket sorted.
#[derive(Debug, Clone, Default)]
pub struct GroupingIndex {
    buckets: HashMap<String, Vec<Arc<FileDescriptor>>>,
    order: SortOrder,
}

impl GroupingIndex {
    /// Build the index from a file set. Unhashed descriptors are skipped.
    #[must_use]
    pub fn build(files: &FileMap, order: SortOrder) -> Self {
        let mut buckets: HashMap<String, Vec<Arc<FileDescriptor>>> = HashMap::new();
        for desc in files.values().filter(|d| d.is_hashed()) {
            buckets
                .entry(desc.digest.clone())
                .or_default()
                .push(Arc::clone(desc));
        }

        buckets
            .par_iter_mut()
            .for_each(|(_, members)| members.sort_by(|a, b| order.compare(a, b)));

        log::debug!(
            "Grouping index rebuilt: {} digest(s) from {} file(s)",
            buckets.len(),
            files.len()
        );
        Self { buckets, order }
    }

    /// Sorted members sharing `digest`.
    #[must_use]
    pub fn get(&self, digest: &str) -> Option<&[Arc<FileDescriptor>]> {
        self.buckets.get(digest).map(Vec::as_slice)
    }

    /// Iterate over `(digest, members)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arc<FileDescriptor>])> {
        self.buckets
            .iter()
            .map(|(digest, members)| (digest.as_str(), members.as_slice()))
    }

    /// Number of distinct digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// `true` if nothing is hashed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of indexed (hashed) files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Ordering used inside buckets.
    #[must_use]
    pub fn order(&self) -> SortOrder {
        self.order
    }
}
