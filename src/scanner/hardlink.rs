//! Storage identity for hardlink awareness.
//!
//! # Overview
//!
//! Hardlinks are multiple directory entries pointing to the same inode on disk.
//! They share the same content but are NOT duplicates - removing or relinking
//! one of them reclaims nothing. Descriptors record the `(device, inode)` pair
//! of their storage object, and the duplicate classifier uses a
//! [`HardlinkTracker`] per digest bucket to count each storage object once.
//!
//! # Platform Support
//!
//! - **Unix**: Uses (device_id, inode) pairs from file metadata
//! - **Other**: Identity unknown, reported as `(0, 0)`; every file is treated as unique
//!
//! # Example
//!
//! ```
//! use dupefinder::scanner::hardlink::HardlinkTracker;
//!
//! let mut tracker = HardlinkTracker::with_capacity(4);
//! assert!(!tracker.is_hardlink(1, 42)); // first sighting
//! assert!(tracker.is_hardlink(1, 42));  // same storage object again
//! assert!(!tracker.is_hardlink(2, 42)); // same inode number, other device
//! assert!(!tracker.is_hardlink(0, 0));  // unknown identity is never a hardlink
//! ```

use std::collections::HashSet;
use std::fs::Metadata;

/// Extract the `(device, inode)` pair from file metadata.
///
/// Returns `(0, 0)` on platforms that do not expose inode numbers.
#[must_use]
pub fn storage_id(metadata: &Metadata) -> (u64, u64) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        (metadata.dev(), metadata.ino())
    }

    #[cfg(not(unix))]
    {
        let _ = metadata;
        (0, 0)
    }
}

/// Tracks seen storage objects to detect hardlinks.
///
/// Files with the same `(device, inode)` are hardlinks to the same underlying
/// data. The tracker remembers which objects have been seen and reports
/// subsequent occurrences as hardlinks. An inode of 0 means "unknown" and is
/// never recorded.
///
/// # Thread Safety
///
/// `HardlinkTracker` is NOT thread-safe. Create one per thread or use
/// external synchronization if sharing across threads.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    /// Set of seen storage identities
    seen: HashSet<(u64, u64)>,
}

impl HardlinkTracker {
    /// Create a tracker with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Check if a storage object was already seen, recording it otherwise.
    ///
    /// Returns `false` for the first occurrence and for unknown identities
    /// (`inode == 0`).
    pub fn is_hardlink(&mut self, device: u64, inode: u64) -> bool {
        if inode == 0 {
            return false;
        }
        !self.seen.insert((device, inode))
    }
}
