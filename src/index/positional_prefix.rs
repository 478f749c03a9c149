use crate::core::types::DocId;
use std::collections::BTreeMap;

/// Maps `(lowercase letter, position in {0,1})` to the set of document ids whose text contains
/// a token whose p-th character equals that letter. Specialized for very short (1-2 character)
/// queries, where character n-gram overlap can't help (§4.8).
pub struct PositionalPrefixIndex {
    position0: BTreeMap<char, Vec<DocId>>,
    position1: BTreeMap<char, Vec<DocId>>,
    frozen: bool,
}

impl PositionalPrefixIndex {
    pub fn new() -> Self {
        PositionalPrefixIndex { position0: BTreeMap::new(), position1: BTreeMap::new(), frozen: false }
    }

    /// Records every whole-word token of a document's text against its first two characters.
    pub fn add_document(&mut self, doc_id: DocId, tokens: &[&str]) {
        debug_assert!(!self.frozen, "cannot mutate a finalized PositionalPrefixIndex");
        for token in tokens {
            let mut chars = token.chars();
            if let Some(c0) = chars.next() {
                self.position0.entry(c0).or_default().push(doc_id);
            }
            if let Some(c1) = chars.next() {
                self.position1.entry(c1).or_default().push(doc_id);
            }
        }
    }

    /// Sorts and deduplicates every posting set. Must be called once, after indexing, before
    /// any query reaches this structure -- it is then safe for unsynchronized concurrent reads.
    pub fn finalize(&mut self) {
        for set in self.position0.values_mut().chain(self.position1.values_mut()) {
            set.sort_unstable();
            set.dedup();
        }
        self.frozen = true;
    }

    pub fn lookup_position0(&self, c: char) -> &[DocId] {
        self.position0.get(&c).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn lookup_position1(&self, c: char) -> &[DocId] {
        self.position1.get(&c).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All populated `(char, docIds)` entries, in ascending char order, for persistence.
    pub fn iter_position0(&self) -> impl Iterator<Item = (char, &[DocId])> {
        self.position0.iter().map(|(&c, v)| (c, v.as_slice()))
    }

    pub fn iter_position1(&self) -> impl Iterator<Item = (char, &[DocId])> {
        self.position1.iter().map(|(&c, v)| (c, v.as_slice()))
    }

    /// Rebuilds from persisted `(char, docIds)` entries, already sorted and deduplicated.
    pub fn from_persisted(position0: Vec<(char, Vec<DocId>)>, position1: Vec<(char, Vec<DocId>)>) -> Self {
        PositionalPrefixIndex {
            position0: position0.into_iter().collect(),
            position1: position1.into_iter().collect(),
            frozen: true,
        }
    }

    /// Candidate docs for a short query: those with some token starting with `query`'s first
    /// character, intersected with the second-character constraint when the query has one.
    pub fn candidates_for_short_query(&self, query: &str) -> Vec<DocId> {
        let mut chars = query.chars();
        let Some(c0) = chars.next() else { return Vec::new() };
        let first = self.lookup_position0(c0);

        match chars.next() {
            None => first.to_vec(),
            Some(c1) => {
                let second = self.lookup_position1(c1);
                intersect_sorted(first, second)
            }
        }
    }
}

fn intersect_sorted(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

impl Default for PositionalPrefixIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_query_matches_any_token_not_just_first() {
        let mut idx = PositionalPrefixIndex::new();
        idx.add_document(DocId(0), &["cat"]);
        idx.add_document(DocId(1), &["dog"]);
        idx.add_document(DocId(2), &["ape"]);
        idx.finalize();

        let mut single = idx.candidates_for_short_query("a");
        single.sort();
        // 'a' is position0 of "ape" and position1 of "cat"
        assert_eq!(single, vec![DocId(0), DocId(2)]);
    }

    #[test]
    fn two_char_query_intersects_positions() {
        let mut idx = PositionalPrefixIndex::new();
        idx.add_document(DocId(0), &["cat"]);
        idx.add_document(DocId(1), &["car"]);
        idx.finalize();

        let candidates = idx.candidates_for_short_query("ca");
        assert_eq!(candidates, vec![DocId(0), DocId(1)]);
    }
}
