use crate::core::types::DocId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An indexed document: immutable payload plus mutable housekeeping (§3).
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub document_key: i64,
    pub segment_number: i32,
    pub indexed_text: String,
    pub client_information: String,
    pub deleted: bool,
}

impl Document {
    /// `id - segment_number` gives the base id of segment 0 for this logical document (§3).
    pub fn base_id(&self) -> i32 {
        self.id.0 - self.segment_number
    }
}

/// Dense vector of `Document` plus a secondary `documentKey -> [internalIds]` mapping
/// supporting alias/segment queries (§3, §4.5).
pub struct DocumentCollection {
    docs: RwLock<Vec<Document>>,
    key_to_ids: RwLock<HashMap<i64, Vec<usize>>>,
}

impl DocumentCollection {
    pub fn new() -> Self {
        DocumentCollection { docs: RwLock::new(Vec::new()), key_to_ids: RwLock::new(HashMap::new()) }
    }

    /// Assigns a dense internal id and appends. Held under the collection's exclusive writer
    /// lock: a concurrent reader never observes a half-added document.
    pub fn add(&self, document_key: i64, segment_number: i32, indexed_text: String, client_information: String) -> Document {
        let mut docs = self.docs.write();
        let mut key_to_ids = self.key_to_ids.write();

        let id = DocId(docs.len() as i32);
        let doc = Document { id, document_key, segment_number, indexed_text, client_information, deleted: false };
        key_to_ids.entry(document_key).or_default().push(id.0 as usize);
        docs.push(doc.clone());
        doc
    }

    pub fn get(&self, id: DocId) -> Option<Document> {
        self.docs.read().get(id.0 as usize).cloned()
    }

    pub fn get_by_key(&self, key: i64) -> Option<Document> {
        let key_to_ids = self.key_to_ids.read();
        let docs = self.docs.read();
        key_to_ids.get(&key)?.iter().filter_map(|&idx| docs.get(idx)).find(|d| !d.deleted).cloned()
    }

    pub fn get_all_for_key(&self, key: i64) -> Vec<Document> {
        let key_to_ids = self.key_to_ids.read();
        let docs = self.docs.read();
        key_to_ids.get(&key).map(|ids| ids.iter().filter_map(|&idx| docs.get(idx)).cloned().collect()).unwrap_or_default()
    }

    pub fn get_segment(&self, key: i64, segment_number: i32) -> Option<Document> {
        self.get_all_for_key(key).into_iter().find(|d| d.segment_number == segment_number)
    }

    /// Marks every segment belonging to `key` as deleted (tombstone; compaction happens
    /// separately and exclusively, per §3's two-step delete process).
    pub fn delete_by_key(&self, key: i64) -> usize {
        let key_to_ids = self.key_to_ids.read();
        let mut docs = self.docs.write();
        let Some(ids) = key_to_ids.get(&key) else { return 0 };
        let mut count = 0;
        for &idx in ids {
            if let Some(doc) = docs.get_mut(idx) {
                if !doc.deleted {
                    doc.deleted = true;
                    count += 1;
                }
            }
        }
        count
    }

    /// Reassigns ids densely, preserving relative order, and rebuilds the key->id map. An
    /// exclusive, offline operation (§1 non-goals: no live delete-then-compact).
    pub fn compact(&self) {
        let mut docs = self.docs.write();
        let mut key_to_ids = self.key_to_ids.write();

        let mut retained: Vec<Document> = docs.drain(..).filter(|d| !d.deleted).collect();
        for (new_idx, doc) in retained.iter_mut().enumerate() {
            doc.id = DocId(new_idx as i32);
        }

        let mut new_map: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, doc) in retained.iter().enumerate() {
            new_map.entry(doc.document_key).or_default().push(idx);
        }

        *docs = retained;
        *key_to_ids = new_map;
    }

    pub fn count(&self) -> usize {
        self.docs.read().len()
    }

    pub fn live_count(&self) -> usize {
        self.docs.read().iter().filter(|d| !d.deleted).count()
    }

    pub fn iter_snapshot(&self) -> Vec<Document> {
        self.docs.read().clone()
    }
}

impl Default for DocumentCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_dense_ids() {
        let docs = DocumentCollection::new();
        let d0 = docs.add(1, 0, "a".into(), "".into());
        let d1 = docs.add(2, 0, "b".into(), "".into());
        assert_eq!(d0.id, DocId(0));
        assert_eq!(d1.id, DocId(1));
    }

    #[test]
    fn compact_reassigns_ids_and_drops_deleted() {
        let docs = DocumentCollection::new();
        docs.add(1, 0, "a".into(), "".into());
        docs.add(2, 0, "b".into(), "".into());
        docs.add(3, 0, "c".into(), "".into());

        docs.delete_by_key(2);
        docs.compact();

        assert_eq!(docs.count(), 2);
        let ids: Vec<i32> = docs.iter_snapshot().iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(docs.get_by_key(2).is_none());
        assert!(docs.get_by_key(3).is_some());
    }

    #[test]
    fn get_by_key_returns_non_deleted_segment() {
        let docs = DocumentCollection::new();
        docs.add(1, 0, "seg0".into(), "".into());
        docs.add(1, 1, "seg1".into(), "".into());
        assert_eq!(docs.get_all_for_key(1).len(), 2);
        assert_eq!(docs.get_segment(1, 1).unwrap().indexed_text, "seg1");
    }
}
