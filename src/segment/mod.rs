pub mod merger;
pub mod reader;
pub mod writer;

use crate::core::types::DocId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub use merger::{MergePolicy, SegmentMerger};
pub use reader::SegmentReader;
pub use writer::SegmentWriter;

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies an on-disk segment, assigned in creation order (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

impl SegmentId {
    pub fn next() -> Self {
        SegmentId(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One term's postings as stored in a segment body: strictly ascending doc ids with a weight
/// per posting (§4.9, §8 property 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentTermEntry {
    pub text: String,
    pub doc_ids: Vec<i32>,
    pub weights: Vec<u8>,
}

/// Handle to a persisted segment: enough to reopen it without re-reading the body.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub path: std::path::PathBuf,
    pub doc_count: u32,
    pub term_count: u32,
    pub min_doc_id: DocId,
    pub max_doc_id: DocId,
}

pub const SEGMENT_MAGIC: &[u8; 4] = b"SEG1";
pub const SEGMENT_VERSION: u32 = 1;
