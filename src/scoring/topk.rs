use crate::core::types::ScoreEntry;
use std::collections::{BTreeSet, HashMap};

/// Bounded top-K set over `ScoreEntry`'s `(score, tiebreaker, -docId)` order, one entry per
/// document id. `upsert` replaces a document's prior entry rather than accumulating stale
/// duplicates, so a document revisited by a later term in a MaxScore sweep can't leave its
/// earlier, lower partial score occupying a slot (§4.6, §4.10). Two runs over identical data
/// produce identical orderings.
pub struct TopKHeap {
    limit: usize,
    entries: BTreeSet<ScoreEntry>,
    by_doc: HashMap<i32, ScoreEntry>,
}

impl TopKHeap {
    pub fn new(limit: usize) -> Self {
        TopKHeap { limit, entries: BTreeSet::new(), by_doc: HashMap::new() }
    }

    /// Inserts or replaces the entry for `entry.doc_id`, evicting the current minimum if this
    /// pushes the set past `limit`.
    pub fn upsert(&mut self, entry: ScoreEntry) {
        if self.limit == 0 {
            return;
        }
        if let Some(prev) = self.by_doc.remove(&entry.doc_id.0) {
            self.entries.remove(&prev);
        }
        self.entries.insert(entry);
        self.by_doc.insert(entry.doc_id.0, entry);

        if self.entries.len() > self.limit {
            if let Some(&min) = self.entries.iter().next() {
                self.entries.remove(&min);
                self.by_doc.remove(&min.doc_id.0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    /// The current threshold: the smallest score held, or 0.0 while below capacity (§4.6).
    pub fn threshold(&self) -> f32 {
        if self.entries.len() < self.limit {
            0.0
        } else {
            self.entries.iter().next().map(|e| e.score).unwrap_or(0.0)
        }
    }

    /// Drains into a descending-order array.
    pub fn into_sorted_vec(self) -> Vec<ScoreEntry> {
        self.entries.into_iter().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;

    #[test]
    fn keeps_only_the_top_k() {
        let mut heap = TopKHeap::new(2);
        heap.upsert(ScoreEntry::new(1.0, DocId(1), 0, None));
        heap.upsert(ScoreEntry::new(3.0, DocId(2), 0, None));
        heap.upsert(ScoreEntry::new(2.0, DocId(3), 0, None));

        let sorted = heap.into_sorted_vec();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].doc_id, DocId(2));
        assert_eq!(sorted[1].doc_id, DocId(3));
    }

    #[test]
    fn deterministic_tie_break_by_tiebreaker_then_neg_doc_id() {
        let mut heap = TopKHeap::new(3);
        heap.upsert(ScoreEntry::new(1.0, DocId(10), 0, None));
        heap.upsert(ScoreEntry::new(1.0, DocId(5), 0, None));
        heap.upsert(ScoreEntry::new(1.0, DocId(7), 1, None));

        let sorted = heap.into_sorted_vec();
        // tiebreaker 1 beats tiebreaker 0; among tiebreaker 0, lower doc_id wins
        assert_eq!(sorted[0].doc_id, DocId(7));
        assert_eq!(sorted[1].doc_id, DocId(5));
        assert_eq!(sorted[2].doc_id, DocId(10));
    }

    #[test]
    fn upsert_replaces_a_docs_prior_entry_instead_of_duplicating_it() {
        let mut heap = TopKHeap::new(2);
        heap.upsert(ScoreEntry::new(2.0, DocId(1), 0, None));
        heap.upsert(ScoreEntry::new(3.0, DocId(2), 1, None));
        // doc 2 improves from 3.0 to 8.0: must replace, not add a second entry for doc 2.
        heap.upsert(ScoreEntry::new(8.0, DocId(2), 2, None));

        assert_eq!(heap.len(), 2);
        let sorted = heap.into_sorted_vec();
        assert_eq!(sorted[0].doc_id, DocId(2));
        assert_eq!(sorted[0].score, 8.0);
        assert_eq!(sorted[1].doc_id, DocId(1));
    }
}
