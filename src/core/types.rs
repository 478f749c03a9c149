use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Internal dense document id, assigned by `DocumentCollection` in `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub i32);

impl DocId {
    pub fn new(id: i32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for DocId {
    fn from(id: i32) -> Self {
        DocId(id)
    }
}

/// A single ranked result. Ordered `(score, tiebreaker, -docId)` per §3, so that
/// a max-heap over `ScoreEntry` yields the highest-scoring, most-deterministic entry first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: f32,
    pub doc_id: DocId,
    pub tiebreaker: u8,
    pub segment_number: Option<i32>,
}

impl ScoreEntry {
    pub fn new(score: f32, doc_id: DocId, tiebreaker: u8, segment_number: Option<i32>) -> Self {
        ScoreEntry { score, doc_id, tiebreaker, segment_number }
    }

    fn sort_key(&self) -> (ordered_f32::OrderedF32, u8, i32) {
        (ordered_f32::OrderedF32(self.score), self.tiebreaker, -self.doc_id.0)
    }
}

impl Eq for ScoreEntry {}

impl PartialOrd for ScoreEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A thin total-order wrapper over `f32` (NaN never appears in scores produced by this crate).
mod ordered_f32 {
    use std::cmp::Ordering;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct OrderedF32(pub f32);

    impl Eq for OrderedF32 {}

    impl PartialOrd for OrderedF32 {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for OrderedF32 {
        fn cmp(&self, other: &Self) -> Ordering {
            self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_entry_orders_by_score_then_tiebreaker_then_neg_doc_id() {
        let a = ScoreEntry::new(1.0, DocId(5), 0, None);
        let b = ScoreEntry::new(1.0, DocId(3), 0, None);
        // same score/tiebreaker: lower doc_id sorts higher (i.e. greater under -docId)
        assert!(b > a);

        let c = ScoreEntry::new(2.0, DocId(100), 0, None);
        assert!(c > a);
    }
}
