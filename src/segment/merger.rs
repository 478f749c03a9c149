use crate::core::error::Result;
use crate::core::types::DocId;
use crate::segment::reader::SegmentReader;
use crate::segment::writer::SegmentWriter;
use crate::segment::{Segment, SegmentTermEntry};
use std::collections::BTreeMap;
use std::path::Path;

/// Governs which segments a background merge pass should combine (§4.9, §5).
pub struct MergePolicy {
    pub merge_factor: usize,
    pub max_segment_doc_count: u32,
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy { merge_factor: 4, max_segment_doc_count: 1_000_000 }
    }
}

/// Reads several segments, shifts each one's doc ids by its running base offset, k-way merges
/// sorted posting lists per term, and writes one unified segment (§4.9, scenario S6).
pub struct SegmentMerger {
    pub policy: MergePolicy,
}

impl SegmentMerger {
    pub fn new(policy: MergePolicy) -> Self {
        SegmentMerger { policy }
    }

    /// Groups segments into merge batches of up to `merge_factor`, oldest first.
    pub fn select_merges(&self, segments: &[Segment]) -> Vec<Vec<Segment>> {
        segments.chunks(self.policy.merge_factor.max(1)).filter(|c| c.len() > 1).map(|c| c.to_vec()).collect()
    }

    /// Merges `segments` (in the given order) with `base_offsets[i]` added to every doc id
    /// coming from `segments[i]`, writing the result to `out_path`.
    pub fn merge(&self, segments: &[Segment], base_offsets: &[i32], out_path: impl AsRef<Path>) -> Result<Segment> {
        let readers: Vec<SegmentReader> =
            segments.iter().map(|s| SegmentReader::open(&s.path)).collect::<Result<_>>()?;

        let mut merged: BTreeMap<String, Vec<(i32, u8)>> = BTreeMap::new();
        for (reader, &base) in readers.iter().zip(base_offsets.iter()) {
            for term in reader.terms() {
                let entry = merged.entry(term.text.clone()).or_default();
                for (&doc_id, &weight) in term.doc_ids.iter().zip(term.weights.iter()) {
                    entry.push((doc_id + base, weight));
                }
            }
        }

        let mut terms = Vec::with_capacity(merged.len());
        for (text, mut postings) in merged {
            postings.sort_by_key(|(d, _)| *d);
            let (doc_ids, weights): (Vec<i32>, Vec<u8>) = postings.into_iter().unzip();
            terms.push(SegmentTermEntry { text, doc_ids, weights });
        }

        let total_doc_count: u32 = segments.iter().map(|s| s.doc_count).sum();
        let min_doc_id = segments
            .iter()
            .zip(base_offsets.iter())
            .map(|(s, &base)| DocId(s.min_doc_id.0 + base))
            .min()
            .unwrap_or(DocId(0));
        let max_doc_id = segments
            .iter()
            .zip(base_offsets.iter())
            .map(|(s, &base)| DocId(s.max_doc_id.0 + base))
            .max()
            .unwrap_or(DocId(0));

        SegmentWriter::write(out_path, total_doc_count, min_doc_id, max_doc_id, terms)
    }
}
