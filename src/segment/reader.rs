use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::fst_index::FstIndex;
use crate::segment::writer::SegmentBody;
use crate::segment::{SegmentTermEntry, SEGMENT_MAGIC, SEGMENT_VERSION};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Read-only, memory-mapped view over one segment file. The body is decoded once at open time;
/// the backing mmap is kept alive so the OS can reclaim pages under memory pressure without this
/// process re-reading from disk (§2 ambient stack).
pub struct SegmentReader {
    _mmap: Mmap,
    body: SegmentBody,
}

impl SegmentReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < 16 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "segment file truncated before header"));
        }
        if &mmap[0..4] != SEGMENT_MAGIC {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "bad segment magic"));
        }
        let version = u32::from_le_bytes(mmap[4..8].try_into().unwrap());
        if version != SEGMENT_VERSION {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, format!("unsupported segment version {version}")));
        }
        let body_len = u32::from_le_bytes(mmap[8..12].try_into().unwrap()) as usize;
        let checksum = u32::from_le_bytes(mmap[12..16].try_into().unwrap());

        let body_bytes = mmap.get(16..16 + body_len).ok_or_else(|| {
            Error::new(ErrorKind::InvalidIndexFormat, "segment body shorter than declared length")
        })?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(body_bytes);
        if hasher.finalize() != checksum {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "segment body checksum mismatch"));
        }

        let body: SegmentBody = bincode::deserialize(body_bytes)?;

        Ok(SegmentReader { _mmap: mmap, body })
    }

    pub fn doc_count(&self) -> u32 {
        self.body.doc_count
    }

    pub fn doc_id_range(&self) -> (DocId, DocId) {
        (DocId(self.body.min_doc_id), DocId(self.body.max_doc_id))
    }

    pub fn terms(&self) -> &[SegmentTermEntry] {
        &self.body.terms
    }

    pub fn get_term(&self, text: &str) -> Option<&SegmentTermEntry> {
        self.body.terms.binary_search_by(|t| t.text.as_str().cmp(text)).ok().map(|idx| &self.body.terms[idx])
    }

    /// Builds an `FstIndex` over this segment's own term list, for standalone segment lookups
    /// (terms are already stored in lexicographic order, so no re-sort is needed).
    pub fn build_fst(&self) -> Result<FstIndex> {
        let sorted_terms: Vec<String> = self.body.terms.iter().map(|t| t.text.clone()).collect();
        let outputs: Vec<u64> = (0..sorted_terms.len() as u64).collect();
        FstIndex::build(&sorted_terms, &outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::SegmentWriter;
    use super::*;

    #[test]
    fn round_trips_a_written_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.bin");
        let terms = vec![
            SegmentTermEntry { text: "cat".into(), doc_ids: vec![0, 2], weights: vec![1, 3] },
            SegmentTermEntry { text: "dog".into(), doc_ids: vec![1], weights: vec![2] },
        ];
        SegmentWriter::write(&path, 3, DocId(0), DocId(2), terms).unwrap();

        let reader = SegmentReader::open(&path).unwrap();
        assert_eq!(reader.doc_count(), 3);
        assert_eq!(reader.terms().len(), 2);
        let cat = reader.get_term("cat").unwrap();
        assert_eq!(cat.doc_ids, vec![0, 2]);
        assert_eq!(cat.weights, vec![1, 3]);
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.bin");
        let terms = vec![SegmentTermEntry { text: "cat".into(), doc_ids: vec![0], weights: vec![1] }];
        SegmentWriter::write(&path, 1, DocId(0), DocId(0), terms).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        assert!(SegmentReader::open(&path).is_err());
    }
}
