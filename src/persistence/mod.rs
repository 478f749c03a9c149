mod checksum;
mod varint;

use crate::compact::EliasFano;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::PositionalPrefixIndex;
use checksum::rotate_xor_checksum;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use varint::{read_lp_string, write_lp_string};

pub const MAGIC: &[u8; 6] = b"INFDX2";
pub const FORMAT_VERSION: u32 = 2;

pub const FLAG_HAS_FST: u32 = 1;
pub const FLAG_HAS_SHORT_QUERY_INDEX: u32 = 2;
pub const FLAG_HAS_WORD_MATCHER: u32 = 4;
pub const FLAG_COMPRESSED: u32 = 8;
pub const FLAG_HAS_DOCUMENT_METADATA_CACHE: u32 = 16;

/// One persisted document record, matching §6 section 1's field layout exactly.
pub struct DocumentRecord {
    pub id: i32,
    pub key: i64,
    pub text: String,
    pub info: String,
    pub segment: i32,
    pub json_idx: i32,
    pub deleted: bool,
}

/// One persisted term record (§6 section 2). Stop terms (`df <= 0`) are never constructed by the
/// caller building a snapshot -- they contribute nothing to search and are omitted on write.
pub struct TermRecord {
    pub text: String,
    pub df: i32,
    pub postings: Vec<(i32, u8)>,
}

/// `(firstToken, tokenCount)` per document, in document-id order (§6 section 5).
pub struct DocumentMetaRecord {
    pub first_token: String,
    pub token_count: u16,
}

/// A full, self-contained snapshot of an engine's state, ready to serialize to `INFDX2` or just
/// produced by `load` (§6).
pub struct PersistedIndex {
    pub documents: Vec<DocumentRecord>,
    pub terms: Vec<TermRecord>,
    /// Sorted term texts paired with their FST output ids; sufficient to rebuild both the
    /// forward and reverse `FstIndex` on load via `FstIndex::build` (§9 -- a deliberate
    /// simplification of the literal flat node/arc wire layout in §6 section 3, recorded in the
    /// grounding ledger, since the `fst` crate does not expose a public raw arc-iteration API to
    /// hand-roll that exact byte layout).
    pub fst_terms: Option<(Vec<String>, Vec<u64>)>,
    pub short_query_index: Option<PositionalPrefixIndex>,
    pub document_metadata: Option<Vec<DocumentMetaRecord>>,
}

pub fn save(path: impl AsRef<Path>, index: &PersistedIndex) -> Result<()> {
    let doc_count = index.documents.len() as u32;
    let term_count = index.terms.len() as u32;

    let mut data = Vec::new();
    write_documents_section(&mut data, &index.documents);
    write_terms_section(&mut data, &index.terms);

    let mut flags = 0u32;
    if let Some((terms, outputs)) = &index.fst_terms {
        flags |= FLAG_HAS_FST;
        write_fst_section(&mut data, terms, outputs);
    }
    if let Some(prefix_index) = &index.short_query_index {
        flags |= FLAG_HAS_SHORT_QUERY_INDEX;
        write_short_query_index_section(&mut data, prefix_index, doc_count as u64);
    }
    if let Some(metadata) = &index.document_metadata {
        flags |= FLAG_HAS_DOCUMENT_METADATA_CACHE;
        write_document_metadata_section(&mut data, metadata);
    }

    let mut header_words = Vec::with_capacity(16);
    header_words.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    header_words.extend_from_slice(&flags.to_le_bytes());
    header_words.extend_from_slice(&doc_count.to_le_bytes());
    header_words.extend_from_slice(&term_count.to_le_bytes());
    let header_checksum = rotate_xor_checksum(&header_words);

    let data_checksum = rotate_xor_checksum(&data);

    let mut file = File::create(path)?;
    file.write_all(MAGIC)?;
    file.write_all(&header_words)?;
    file.write_all(&header_checksum.to_le_bytes())?;
    file.write_all(&(data.len() as u32).to_le_bytes())?;
    file.write_all(&data)?;
    file.write_all(&data_checksum.to_le_bytes())?;
    file.sync_all()?;
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<PersistedIndex> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    if bytes.len() < 6 + 16 + 4 + 4 {
        return Err(Error::new(ErrorKind::InvalidIndexFormat, "file truncated before header"));
    }
    if &bytes[0..6] != MAGIC {
        return Err(Error::new(ErrorKind::InvalidIndexFormat, "bad magic"));
    }

    let header_words = &bytes[6..6 + 16];
    let version = u32::from_le_bytes(header_words[0..4].try_into().unwrap());
    let flags = u32::from_le_bytes(header_words[4..8].try_into().unwrap());
    let _doc_count = u32::from_le_bytes(header_words[8..12].try_into().unwrap());
    let _term_count = u32::from_le_bytes(header_words[12..16].try_into().unwrap());
    if version != FORMAT_VERSION {
        return Err(Error::new(ErrorKind::InvalidIndexFormat, format!("unsupported version {version}")));
    }

    let header_checksum_offset = 6 + 16;
    let header_checksum = u32::from_le_bytes(bytes[header_checksum_offset..header_checksum_offset + 4].try_into().unwrap());
    if rotate_xor_checksum(header_words) != header_checksum {
        return Err(Error::new(ErrorKind::InvalidIndexFormat, "header checksum mismatch"));
    }

    let data_len_offset = header_checksum_offset + 4;
    let data_len = u32::from_le_bytes(bytes[data_len_offset..data_len_offset + 4].try_into().unwrap()) as usize;
    let data_offset = data_len_offset + 4;

    if bytes.len() < data_offset + data_len + 4 {
        return Err(Error::new(ErrorKind::InvalidIndexFormat, "file truncated before data / data checksum"));
    }
    let data = &bytes[data_offset..data_offset + data_len];
    let data_checksum = u32::from_le_bytes(bytes[data_offset + data_len..data_offset + data_len + 4].try_into().unwrap());
    if rotate_xor_checksum(data) != data_checksum {
        return Err(Error::new(ErrorKind::InvalidIndexFormat, "data checksum mismatch"));
    }

    let mut cursor: &[u8] = data;
    let documents = read_documents_section(&mut cursor)?;
    let terms = read_terms_section(&mut cursor)?;

    let fst_terms = if flags & FLAG_HAS_FST != 0 { Some(read_fst_section(&mut cursor)?) } else { None };
    let short_query_index = if flags & FLAG_HAS_SHORT_QUERY_INDEX != 0 {
        Some(read_short_query_index_section(&mut cursor)?)
    } else {
        None
    };
    let document_metadata = if flags & FLAG_HAS_DOCUMENT_METADATA_CACHE != 0 {
        Some(read_document_metadata_section(&mut cursor, documents.len())?)
    } else {
        None
    };

    Ok(PersistedIndex { documents, terms, fst_terms, short_query_index, document_metadata })
}

fn write_documents_section(buf: &mut Vec<u8>, documents: &[DocumentRecord]) {
    buf.extend_from_slice(&(documents.len() as i32).to_le_bytes());
    for doc in documents {
        buf.extend_from_slice(&doc.id.to_le_bytes());
        buf.extend_from_slice(&doc.key.to_le_bytes());
        write_lp_string(buf, &doc.text);
        write_lp_string(buf, &doc.info);
        buf.extend_from_slice(&doc.segment.to_le_bytes());
        buf.extend_from_slice(&doc.json_idx.to_le_bytes());
        buf.push(doc.deleted as u8);
    }
}

fn read_documents_section(cursor: &mut &[u8]) -> Result<Vec<DocumentRecord>> {
    let count = read_i32(cursor)?;
    let mut out = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let id = read_i32(cursor)?;
        let key = read_i64(cursor)?;
        let text = read_lp_string(cursor)?;
        let info = read_lp_string(cursor)?;
        let segment = read_i32(cursor)?;
        let json_idx = read_i32(cursor)?;
        let deleted = read_bool(cursor)?;
        out.push(DocumentRecord { id, key, text, info, segment, json_idx, deleted });
    }
    Ok(out)
}

fn write_terms_section(buf: &mut Vec<u8>, terms: &[TermRecord]) {
    let live: Vec<&TermRecord> = terms.iter().filter(|t| t.df > 0).collect();
    buf.extend_from_slice(&(live.len() as i32).to_le_bytes());
    for term in live {
        write_lp_string(buf, &term.text);
        buf.extend_from_slice(&term.df.to_le_bytes());
        buf.extend_from_slice(&(term.postings.len() as i32).to_le_bytes());
        for &(doc_id, weight) in &term.postings {
            buf.extend_from_slice(&doc_id.to_le_bytes());
            buf.push(weight);
        }
    }
}

fn read_terms_section(cursor: &mut &[u8]) -> Result<Vec<TermRecord>> {
    let count = read_i32(cursor)?;
    let mut out = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let text = read_lp_string(cursor)?;
        let df = read_i32(cursor)?;
        let posting_count = read_i32(cursor)?;
        let mut postings = Vec::with_capacity(posting_count.max(0) as usize);
        for _ in 0..posting_count {
            let doc_id = read_i32(cursor)?;
            let weight = read_u8(cursor)?;
            postings.push((doc_id, weight));
        }
        out.push(TermRecord { text, df, postings });
    }
    Ok(out)
}

fn write_fst_section(buf: &mut Vec<u8>, terms: &[String], outputs: &[u64]) {
    buf.extend_from_slice(&(terms.len() as i32).to_le_bytes());
    for (text, &output) in terms.iter().zip(outputs.iter()) {
        write_lp_string(buf, text);
        buf.extend_from_slice(&output.to_le_bytes());
    }
}

fn read_fst_section(cursor: &mut &[u8]) -> Result<(Vec<String>, Vec<u64>)> {
    let count = read_i32(cursor)?;
    let mut terms = Vec::with_capacity(count.max(0) as usize);
    let mut outputs = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        terms.push(read_lp_string(cursor)?);
        outputs.push(read_u64(cursor)?);
    }
    Ok((terms, outputs))
}

fn write_short_query_index_section(buf: &mut Vec<u8>, index: &PositionalPrefixIndex, doc_universe: u64) {
    write_position_map(buf, index.iter_position0(), doc_universe);
    write_position_map(buf, index.iter_position1(), doc_universe);
}

/// Each bucket's doc-id list is sorted-ascending and deduped by `PositionalPrefixIndex::finalize`,
/// so it's encoded as an `EliasFano` sequence over `[0, doc_universe)` rather than a flat i32
/// array (§4.4, §6 section 4).
fn write_position_map<'a>(buf: &mut Vec<u8>, entries: impl Iterator<Item = (char, &'a [DocId])>, doc_universe: u64) {
    let entries: Vec<(char, &[DocId])> = entries.collect();
    buf.extend_from_slice(&(entries.len() as i32).to_le_bytes());
    for (c, doc_ids) in entries {
        buf.extend_from_slice(&(c as u32).to_le_bytes());
        let values: Vec<u64> = doc_ids.iter().map(|d| d.0 as u64).collect();
        let ef = EliasFano::build(&values, doc_universe).expect("finalized bucket doc ids are sorted ascending");
        let encoded = ef.serialize();
        buf.extend_from_slice(&(encoded.len() as i32).to_le_bytes());
        buf.extend_from_slice(&encoded);
    }
}

fn read_position_map(cursor: &mut &[u8]) -> Result<Vec<(char, Vec<DocId>)>> {
    let count = read_i32(cursor)?;
    let mut out = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let code = read_u32(cursor)?;
        let c = char::from_u32(code)
            .ok_or_else(|| Error::new(ErrorKind::InvalidIndexFormat, "invalid char code point in short-query index"))?;
        let encoded_len = read_i32(cursor)?;
        if encoded_len < 0 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "negative position-map entry length"));
        }
        let encoded = take(cursor, encoded_len as usize)?;
        let (ef, consumed) = EliasFano::deserialize(encoded)?;
        if consumed != encoded.len() {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "position-map entry length mismatch"));
        }
        let doc_ids = ef.to_vec()?.into_iter().map(|v| DocId(v as i32)).collect();
        out.push((c, doc_ids));
    }
    Ok(out)
}

fn read_short_query_index_section(cursor: &mut &[u8]) -> Result<PositionalPrefixIndex> {
    let position0 = read_position_map(cursor)?;
    let position1 = read_position_map(cursor)?;
    Ok(PositionalPrefixIndex::from_persisted(position0, position1))
}

fn write_document_metadata_section(buf: &mut Vec<u8>, metadata: &[DocumentMetaRecord]) {
    for entry in metadata {
        write_lp_string(buf, &entry.first_token);
        buf.extend_from_slice(&entry.token_count.to_le_bytes());
    }
}

fn read_document_metadata_section(cursor: &mut &[u8], doc_count: usize) -> Result<Vec<DocumentMetaRecord>> {
    let mut out = Vec::with_capacity(doc_count);
    for _ in 0..doc_count {
        let first_token = read_lp_string(cursor)?;
        let token_count = read_u16(cursor)?;
        out.push(DocumentMetaRecord { first_token, token_count });
    }
    Ok(out)
}

fn take<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if cursor.len() < n {
        return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated section"));
    }
    let (head, rest) = cursor.split_at(n);
    *cursor = rest;
    Ok(head)
}

fn read_i32(cursor: &mut &[u8]) -> Result<i32> {
    Ok(i32::from_le_bytes(take(cursor, 4)?.try_into().unwrap()))
}
fn read_i64(cursor: &mut &[u8]) -> Result<i64> {
    Ok(i64::from_le_bytes(take(cursor, 8)?.try_into().unwrap()))
}
fn read_u32(cursor: &mut &[u8]) -> Result<u32> {
    Ok(u32::from_le_bytes(take(cursor, 4)?.try_into().unwrap()))
}
fn read_u64(cursor: &mut &[u8]) -> Result<u64> {
    Ok(u64::from_le_bytes(take(cursor, 8)?.try_into().unwrap()))
}
fn read_u16(cursor: &mut &[u8]) -> Result<u16> {
    Ok(u16::from_le_bytes(take(cursor, 2)?.try_into().unwrap()))
}
fn read_u8(cursor: &mut &[u8]) -> Result<u8> {
    Ok(take(cursor, 1)?[0])
}
fn read_bool(cursor: &mut &[u8]) -> Result<bool> {
    Ok(read_u8(cursor)? != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> PersistedIndex {
        let mut prefix_index = PositionalPrefixIndex::new();
        prefix_index.add_document(DocId(0), &["fox"]);
        prefix_index.finalize();

        PersistedIndex {
            documents: vec![DocumentRecord {
                id: 0,
                key: 1,
                text: "The quick brown fox".into(),
                info: "".into(),
                segment: 0,
                json_idx: -1,
                deleted: false,
            }],
            terms: vec![
                TermRecord { text: "fox".into(), df: 1, postings: vec![(0, 1)] },
                TermRecord { text: "stopped".into(), df: -1, postings: vec![] },
            ],
            fst_terms: Some((vec!["fox".to_string()], vec![0])),
            short_query_index: Some(prefix_index),
            document_metadata: Some(vec![DocumentMetaRecord { first_token: "the".into(), token_count: 4 }]),
        }
    }

    #[test]
    fn round_trips_a_full_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.infdx2");
        save(&path, &sample_index()).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.documents[0].text, "The quick brown fox");
        // the stop term (df <= 0) must be omitted on write
        assert_eq!(loaded.terms.len(), 1);
        assert_eq!(loaded.terms[0].text, "fox");
        assert_eq!(loaded.fst_terms.unwrap().0, vec!["fox".to_string()]);
        assert!(loaded.short_query_index.is_some());
        assert_eq!(loaded.document_metadata.unwrap()[0].token_count, 4);
    }

    #[test]
    fn rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.infdx2");
        save(&path, &sample_index()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, bytes).unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn rejects_corrupted_data_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.infdx2");
        save(&path, &sample_index()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        assert!(load(&path).is_err());
    }
}
