//! Duplicate classification and reporting views.
//!
//! # Overview
//!
//! [`classify`] turns a [`GroupingIndex`] into duplicate groups. A digest
//! bucket becomes a group only when it holds at least two *space-distinct*
//! files:
//!
//! - buckets whose first member is empty are skipped (removing or relinking
//!   empty files reclaims nothing);
//! - members sharing a `(device, inode)` with an earlier member of the same
//!   bucket are dropped, since they are already one storage object;
//! - a bucket left with a single member is not a group.
//!
//! The first member of each group, in bucket sort order, is the keeper.
//!
//! # Example
//!
//! ```
//! use dupefinder::duplicates::{classify, GroupingIndex, SortOrder};
//! use dupefinder::scanner::{FileDescriptor, FileMap};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let mut files = FileMap::new();
//! for name in ["a.txt", "b.txt"] {
//!     let desc = FileDescriptor::new(PathBuf::from(name), 1, 0).with_digest("d");
//!     files.insert(desc.key.clone(), Arc::new(desc));
//! }
//! let index = GroupingIndex::build(&files, SortOrder::default());
//! let groups = classify(&index);
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups["d"].keeper().key, PathBuf::from("a.txt"));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use bytesize::ByteSize;

use super::index::GroupingIndex;
use crate::scanner::hardlink::HardlinkTracker;
use crate::scanner::{FileDescriptor, FileMap};

/// Classified duplicates keyed by digest, iterated in digest order.
pub type DuplicateMap = BTreeMap<String, DuplicateGroup>;

/// Two or more space-distinct files with identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    digest: String,
    files: Vec<Arc<FileDescriptor>>,
}

impl DuplicateGroup {
    /// Create a group. Callers guarantee at least two members.
    pub(crate) fn new(digest: String, files: Vec<Arc<FileDescriptor>>) -> Self {
        debug_assert!(files.len() >= 2, "a duplicate group needs two members");
        Self { digest, files }
    }

    /// Content digest shared by every member.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// All members in sort order, keeper first.
    #[must_use]
    pub fn files(&self) -> &[Arc<FileDescriptor>] {
        &self.files
    }

    /// The file retained when the group is acted upon.
    #[must_use]
    pub fn keeper(&self) -> &Arc<FileDescriptor> {
        &self.files[0]
    }

    /// Members other than the keeper.
    #[must_use]
    pub fn additional(&self) -> &[Arc<FileDescriptor>] {
        &self.files[1..]
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always `false`; groups have at least two members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Size of one copy (the keeper's size).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.keeper().size
    }

    /// Space reclaimed by collapsing the group onto its keeper.
    ///
    /// Saturates instead of overflowing; sizes can come from an imported map.
    #[must_use]
    pub fn reclaimable(&self) -> u64 {
        let copies = u64::try_from(self.additional().len()).unwrap_or(u64::MAX);
        self.size().saturating_mul(copies)
    }
}

/// Derive duplicate groups from the grouping index.
///
/// Pure and idempotent: classifying the same index twice yields equal maps.
#[must_use]
pub fn classify(index: &GroupingIndex) -> DuplicateMap {
    let mut groups = DuplicateMap::new();

    for (digest, members) in index.iter() {
        let Some(first) = members.first() else {
            continue;
        };
        if first.size == 0 {
            log::trace!("Skipping empty-file bucket {}", digest);
            continue;
        }

        let mut tracker = HardlinkTracker::with_capacity(members.len());
        let kept: Vec<Arc<FileDescriptor>> = members
            .iter()
            .filter(|desc| {
                let linked = tracker.is_hardlink(desc.device, desc.inode);
                if linked {
                    log::trace!("Already linked: {}", desc.key.display());
                }
                !linked
            })
            .cloned()
            .collect();

        if kept.len() < 2 {
            continue;
        }
        groups.insert(digest.to_string(), DuplicateGroup::new(digest.to_string(), kept));
    }

    log::debug!("Classified {} duplicate group(s)", groups.len());
    groups
}

/// Every non-keeper member, flattened in digest order.
#[must_use]
pub fn additional_files(groups: &DuplicateMap) -> Vec<Arc<FileDescriptor>> {
    groups
        .values()
        .flat_map(|group| group.additional().iter().cloned())
        .collect()
}

/// Sum of the sizes of all descriptors in the file set.
#[must_use]
pub fn total_size(files: &FileMap) -> u64 {
    files
        .values()
        .map(|desc| desc.size)
        .fold(0, u64::saturating_add)
}

/// Sum over groups of `keeper size × additional members`.
#[must_use]
pub fn duplicate_size(groups: &DuplicateMap) -> u64 {
    groups
        .values()
        .map(DuplicateGroup::reclaimable)
        .fold(0, u64::saturating_add)
}

/// Summary statistics for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Total number of known files
    pub total_files: usize,
    /// Total size of all known files in bytes
    pub total_size: u64,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of additional (non-keeper) files
    pub duplicate_files: usize,
    /// Space reclaimable by collapsing every group
    pub duplicate_size: u64,
}

impl ScanSummary {
    /// Compute the summary of a file set and its classified groups.
    #[must_use]
    pub fn new(files: &FileMap, groups: &DuplicateMap) -> Self {
        Self {
            total_files: files.len(),
            total_size: total_size(files),
            duplicate_groups: groups.len(),
            duplicate_files: groups.values().map(|g| g.additional().len()).sum(),
            duplicate_size: duplicate_size(groups),
        }
    }

    /// Percentage of the total size taken by reclaimable duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.duplicate_size as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Total size as a human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    /// Reclaimable size as a human-readable string.
    #[must_use]
    pub fn duplicate_size_display(&self) -> String {
        ByteSize::b(self.duplicate_size).to_string()
    }
}
