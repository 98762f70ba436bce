// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]

//! Merge-ordering core for position-ordered variant storage.
//!
//! This library provides the two pieces an ingestion pipeline needs to write
//! variant records in global genomic order.
//!
//! # Features
//!
//! - **Regions**: parse and format intervals in zero-indexed inclusive,
//!   zero-indexed half-open and one-indexed inclusive conventions, and sort
//!   them across contigs by whole-genome coordinate
//! - **Record heap**: a min-heap keyed on `(start, sample)` for k-way merging
//!   of per-sample record streams, with anchor nodes for long records
//! - **Streaming merge**: O(k) memory over k already-sorted sources
//!
//! # Example
//!
//! ```rust
//! use vcfstore_merge::genome::ContigOffsets;
//! use vcfstore_merge::region::{Region, RegionType};
//!
//! let offsets: ContigOffsets = [("chr1", 0), ("chr2", 248_956_422)].into_iter().collect();
//! let mut regions = vec![
//!     Region::parse("chr2:1,000-2,000", RegionType::OneIndexedInclusive).unwrap(),
//!     Region::parse("chr1:500-600", RegionType::OneIndexedInclusive).unwrap(),
//! ];
//! Region::sort(&offsets, &mut regions).unwrap();
//! assert_eq!(regions[0].seq_name, "chr1");
//! assert_eq!(regions[1].to_string_as(RegionType::OneIndexedInclusive), "chr2:1000-2000");
//! ```

pub mod bed;
pub mod config;
pub mod genome;
pub mod logging;
pub mod merge;
pub mod parallel;
pub mod record_heap;
pub mod region;
pub mod vcf;

// Re-export commonly used types
pub use genome::{ContigOffsets, Genome};
pub use merge::{MergeCommand, MergeStats, Positioned, RecordSource};
pub use record_heap::{Node, NodeType, RecordHeap};
pub use region::{Region, RegionType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bed::{IntervalReader, RegionFileReader};
    pub use crate::genome::{ContigOffsets, Genome};
    pub use crate::merge::{MergeCommand, Positioned, RecordSource};
    pub use crate::record_heap::{Node, NodeType, RecordHeap};
    pub use crate::region::{Region, RegionType};
    pub use crate::vcf::VcfSource;
}
