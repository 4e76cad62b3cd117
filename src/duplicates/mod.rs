//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - The grouping index (digest to sorted descriptors)
//! - Duplicate classification, with empty files and hardlinks excluded
//! - Reporting views (additional files, total and duplicate size)

pub mod groups;
pub mod index;

pub use groups::{
    additional_files, classify, duplicate_size, total_size, DuplicateGroup, DuplicateMap,
    ScanSummary,
};
pub use index::{GroupingIndex, SortKey, SortOrder};
