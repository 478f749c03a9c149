use crate::core::error::Result;
use crate::core::types::DocId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Sentinel `documentFrequency` marking a stop term: postings are discarded and the term no
/// longer contributes to scoring (§3).
pub const STOP_TERM_DF: i64 = -1;

/// A vocabulary entry: text, document frequency (or the stop-term sentinel), and postings kept
/// strictly ascending by doc id.
pub struct Term {
    pub text: String,
    pub document_frequency: i64,
    postings: Vec<(DocId, u8)>,
}

impl Term {
    pub fn new(text: String) -> Self {
        Term { text, document_frequency: 0, postings: Vec::new() }
    }

    pub fn is_stop(&self) -> bool {
        self.document_frequency == STOP_TERM_DF
    }

    /// Appends `(doc_id, weight)`, keeping the posting list strictly ascending by doc id.
    /// Returns `true` if this call just crossed `stop_term_limit` and demoted the term (the
    /// non-fatal `StopTermOverflow` condition from §7).
    pub fn add_posting(&mut self, doc_id: DocId, weight: u8, stop_term_limit: u32) -> Result<bool> {
        if self.is_stop() {
            return Ok(false);
        }

        let insert_at = match self.postings.binary_search_by_key(&doc_id, |&(d, _)| d) {
            Ok(existing) => {
                // Same document re-indexed (e.g. multi-field concatenation already accounted
                // for in the caller's weight): saturate rather than double count.
                let (_, w) = &mut self.postings[existing];
                *w = w.saturating_add(weight);
                None
            }
            Err(pos) => Some(pos),
        };
        if let Some(pos) = insert_at {
            self.postings.insert(pos, (doc_id, weight));
        }

        self.document_frequency += 1;
        if self.document_frequency as u32 > stop_term_limit {
            self.document_frequency = STOP_TERM_DF;
            self.postings = Vec::new();
            return Ok(true);
        }
        Ok(false)
    }

    pub fn posting_list(&self) -> Option<&[(DocId, u8)]> {
        if self.is_stop() {
            None
        } else {
            Some(&self.postings)
        }
    }
}

/// Term-text -> `Term` mapping, plus insertion order equal to the future FST output id (§4.5).
pub struct TermCollection {
    index: RwLock<HashMap<String, usize>>,
    terms: RwLock<Vec<Arc<Mutex<Term>>>>,
}

impl TermCollection {
    pub fn new() -> Self {
        TermCollection { index: RwLock::new(HashMap::new()), terms: RwLock::new(Vec::new()) }
    }

    /// Returns the term handle and whether it was newly created. New terms are appended to an
    /// insertion-ordered list, so the insertion index equals the term's future FST output.
    pub fn get_or_create(&self, text: &str) -> (Arc<Mutex<Term>>, bool) {
        {
            let map = self.index.read();
            if let Some(&idx) = map.get(text) {
                let terms = self.terms.read();
                return (terms[idx].clone(), false);
            }
        }

        let mut map = self.index.write();
        if let Some(&idx) = map.get(text) {
            let terms = self.terms.read();
            return (terms[idx].clone(), false);
        }

        let mut terms = self.terms.write();
        let idx = terms.len();
        let handle = Arc::new(Mutex::new(Term::new(text.to_string())));
        terms.push(handle.clone());
        map.insert(text.to_string(), idx);
        (handle, true)
    }

    pub fn get(&self, text: &str) -> Option<Arc<Mutex<Term>>> {
        let idx = *self.index.read().get(text)?;
        Some(self.terms.read()[idx].clone())
    }

    pub fn get_by_index(&self, idx: usize) -> Option<Arc<Mutex<Term>>> {
        self.terms.read().get(idx).cloned()
    }

    pub fn len(&self) -> usize {
        self.terms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered `(text, output)` pairs ready for `FstIndex::build`: insertion order already
    /// equals the output id, but FST construction requires lexicographic key order, so this
    /// returns terms sorted by text with their original insertion index as output.
    pub fn sorted_for_fst(&self) -> (Vec<String>, Vec<u64>) {
        let terms = self.terms.read();
        let mut pairs: Vec<(String, u64)> = terms
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.lock().text.clone(), idx as u64))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.into_iter().unzip()
    }

    pub fn iter_snapshot(&self) -> Vec<Arc<Mutex<Term>>> {
        self.terms.read().clone()
    }
}

impl Default for TermCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postings_stay_ascending() {
        let mut term = Term::new("cat".to_string());
        term.add_posting(DocId(5), 3, 1000).unwrap();
        term.add_posting(DocId(1), 2, 1000).unwrap();
        term.add_posting(DocId(3), 1, 1000).unwrap();
        let postings = term.posting_list().unwrap();
        let ids: Vec<i32> = postings.iter().map(|(d, _)| d.0).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn crossing_stop_term_limit_clears_postings() {
        let mut term = Term::new("the".to_string());
        for i in 0..5 {
            let became_stop = term.add_posting(DocId(i), 1, 3).unwrap();
            if i < 3 {
                assert!(!became_stop);
            } else if i == 3 {
                assert!(became_stop);
            }
        }
        assert!(term.is_stop());
        assert!(term.posting_list().is_none());
        // further postings are no-ops once stopped
        assert!(!term.add_posting(DocId(99), 1, 3).unwrap());
    }

    #[test]
    fn get_or_create_reuses_existing_term() {
        let collection = TermCollection::new();
        let (_, is_new1) = collection.get_or_create("cat");
        let (_, is_new2) = collection.get_or_create("cat");
        assert!(is_new1);
        assert!(!is_new2);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn insertion_order_becomes_fst_output() {
        let collection = TermCollection::new();
        collection.get_or_create("zebra");
        collection.get_or_create("apple");
        let (sorted_terms, outputs) = collection.sorted_for_fst();
        assert_eq!(sorted_terms, vec!["apple".to_string(), "zebra".to_string()]);
        // "apple" was inserted second (index 1), "zebra" first (index 0)
        assert_eq!(outputs, vec![1, 0]);
    }
}
