use crate::core::error::Result;
use crate::core::types::DocId;
use crate::segment::{Segment, SegmentId, SegmentTermEntry, SEGMENT_MAGIC, SEGMENT_VERSION};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(serde::Serialize, serde::Deserialize)]
pub(crate) struct SegmentBody {
    pub doc_count: u32,
    pub min_doc_id: i32,
    pub max_doc_id: i32,
    pub terms: Vec<SegmentTermEntry>,
}

/// Writes one append-only segment: a fixed header (magic, version, body length, CRC32 over the
/// body) followed by a bincode-serialized body holding the per-term posting blocks in
/// lexicographic term order, which doubles as the terms directory (§4.9).
pub struct SegmentWriter;

impl SegmentWriter {
    /// `terms` must already be sorted lexicographically by text; each posting list must be
    /// strictly ascending by doc id (the caller -- the parallel indexer's merge step -- upholds
    /// both per §4.5/§8 property 1).
    pub fn write(
        path: impl AsRef<Path>,
        doc_count: u32,
        min_doc_id: DocId,
        max_doc_id: DocId,
        terms: Vec<SegmentTermEntry>,
    ) -> Result<Segment> {
        let body = SegmentBody { doc_count, min_doc_id: min_doc_id.0, max_doc_id: max_doc_id.0, terms };
        let body_bytes = bincode::serialize(&body)?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body_bytes);
        let checksum = hasher.finalize();

        let mut file = File::create(path.as_ref())?;
        file.write_all(SEGMENT_MAGIC)?;
        file.write_all(&SEGMENT_VERSION.to_le_bytes())?;
        file.write_all(&(body_bytes.len() as u32).to_le_bytes())?;
        file.write_all(&checksum.to_le_bytes())?;
        file.write_all(&body_bytes)?;
        file.sync_all()?;

        Ok(Segment {
            id: SegmentId::next(),
            path: path.as_ref().to_path_buf(),
            doc_count,
            term_count: body.terms.len() as u32,
            min_doc_id,
            max_doc_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_readable_header_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.bin");
        let terms = vec![SegmentTermEntry { text: "cat".into(), doc_ids: vec![0, 2], weights: vec![1, 3] }];
        let segment = SegmentWriter::write(&path, 3, DocId(0), DocId(2), terms).unwrap();
        assert_eq!(segment.doc_count, 3);
        assert_eq!(segment.term_count, 1);
        assert!(path.exists());
    }
}
