use crate::bitmap::RoaringBitmap;
use crate::core::types::DocId;
use crate::fst_index::FstIndex;
use crate::index::term::TermCollection;
use crate::index::PositionalPrefixIndex;
use std::collections::{HashMap, HashSet};

/// Additive gap between adjacent tiers, large enough that no lower tier's best realistic
/// BM25+/fusion score can outrank a higher tier's worst (§4.7, §4.11).
pub const TIER_FLOOR_STEP: f32 = 1_000.0;

pub fn tier_floor(tier: u8) -> f32 {
    (3u8.saturating_sub(tier)) as f32 * TIER_FLOOR_STEP
}

/// A candidate document with the highest (best) tier it qualified for.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub doc_id: DocId,
    pub tier: u8,
}

/// Produces a small candidate set per query via a priority cascade: document-start prefix
/// (tier 0) > word-boundary prefix (tier 1) > AND over rare terms (tier 2) > OR fallback
/// (tier 3). A higher tier's candidates fully precede any lower tier's (§4.7).
pub struct TieredCandidateSelector<'a> {
    pub positional_prefix: &'a PositionalPrefixIndex,
    pub fst_index: &'a FstIndex,
    pub term_collection: &'a TermCollection,
    pub word_idf_cache: &'a HashMap<String, f32>,
    /// First whole-word token of each document, indexed by `DocId` (document metadata cache).
    pub first_tokens: &'a [String],
    pub rare_term_count: usize,
}

impl<'a> TieredCandidateSelector<'a> {
    pub fn select(&self, query_tokens: &[String], query_text: &str) -> Vec<Candidate> {
        let mut seen: HashSet<i32> = HashSet::new();
        let mut candidates: Vec<Candidate> = Vec::new();

        let mut push_all = |ids: Vec<DocId>, tier: u8, seen: &mut HashSet<i32>, out: &mut Vec<Candidate>| {
            for id in ids {
                if seen.insert(id.0) {
                    out.push(Candidate { doc_id: id, tier });
                }
            }
        };

        // Tier 0: document's first token starts with the query (or the query's first token).
        let first_query_token = query_tokens.first().map(|s| s.as_str()).unwrap_or(query_text);
        let tier0: Vec<DocId> = self
            .first_tokens
            .iter()
            .enumerate()
            .filter(|(_, first)| first.starts_with(query_text) || first.starts_with(first_query_token))
            .map(|(idx, _)| DocId(idx as i32))
            .collect();
        push_all(tier0, 0, &mut seen, &mut candidates);

        // Tier 1: any token in the document starts with the query (FST prefix enumeration),
        // plus a typo-tolerant fallback so a misspelled query token still resolves to its
        // intended vocabulary term (§1, §4.2).
        let mut tier1_outputs = Vec::new();
        for token in query_tokens {
            self.fst_index.get_by_prefix(token, &mut tier1_outputs);
            self.fst_index.within_edit_distance_1(token, &mut tier1_outputs);
        }
        if query_tokens.is_empty() {
            self.fst_index.get_by_prefix(query_text, &mut tier1_outputs);
            self.fst_index.within_edit_distance_1(query_text, &mut tier1_outputs);
        }
        let tier1 = self.doc_ids_for_term_outputs(&tier1_outputs);
        push_all(tier1, 1, &mut seen, &mut candidates);

        // Tier 2: AND over the two rarest query terms (by word-IDF cache).
        let mut by_idf: Vec<&String> = query_tokens.iter().collect();
        by_idf.sort_by(|a, b| {
            let idf_a = self.word_idf_cache.get(*a).copied().unwrap_or(0.0);
            let idf_b = self.word_idf_cache.get(*b).copied().unwrap_or(0.0);
            idf_b.partial_cmp(&idf_a).unwrap()
        });
        let rare_terms: Vec<&String> = by_idf.into_iter().take(self.rare_term_count).collect();
        if rare_terms.len() >= 1 {
            let mut intersection: Option<Vec<DocId>> = None;
            for term in &rare_terms {
                let postings = self.term_collection.get(term).and_then(|t| {
                    let guard = t.lock();
                    guard.posting_list().map(|p| p.iter().map(|(d, _)| *d).collect::<Vec<_>>())
                });
                let Some(postings) = postings else {
                    intersection = Some(Vec::new());
                    break;
                };
                intersection = Some(match intersection {
                    None => postings,
                    Some(acc) => intersect_sorted(&acc, &postings),
                });
            }
            if let Some(ids) = intersection {
                push_all(ids, 2, &mut seen, &mut candidates);
            }
        }

        // Tier 3: OR fallback -- union over every query term's postings, accumulated as a
        // roaring bitmap since this is exactly the wide, possibly sparse multi-set union the
        // format is built for (§4.3).
        let mut union = RoaringBitmap::new();
        for token in query_tokens {
            if let Some(term) = self.term_collection.get(token) {
                let guard = term.lock();
                if let Some(postings) = guard.posting_list() {
                    for (doc_id, _) in postings {
                        union.insert(doc_id.0 as u32);
                    }
                }
            }
        }
        let union_ids: Vec<DocId> = union.iter().map(|id| DocId(id as i32)).collect();
        push_all(union_ids, 3, &mut seen, &mut candidates);

        candidates
    }

    fn doc_ids_for_term_outputs(&self, outputs: &[u64]) -> Vec<DocId> {
        let mut ids = Vec::new();
        for &output in outputs {
            if let Some(term) = self.term_collection.get_by_index(output as usize) {
                let guard = term.lock();
                if let Some(postings) = guard.posting_list() {
                    ids.extend(postings.iter().map(|(d, _)| *d));
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::term::TermCollection;

    #[test]
    fn tier_floors_strictly_order_tiers() {
        assert!(tier_floor(0) > tier_floor(1));
        assert!(tier_floor(1) > tier_floor(2));
        assert!(tier_floor(2) > tier_floor(3));
        assert_eq!(tier_floor(3), 0.0);
    }

    #[test]
    fn tier1_includes_edit_distance_1_matches_for_a_misspelled_token() {
        let term_collection = TermCollection::new();
        let (cat_term, _) = term_collection.get_or_create("cat");
        cat_term.lock().add_posting(DocId(0), 1, 200_000).unwrap();

        let (terms, outputs) = term_collection.sorted_for_fst();
        let fst_index = FstIndex::build(&terms, &outputs).unwrap();
        let positional_prefix = PositionalPrefixIndex::new();
        let word_idf_cache = HashMap::new();
        let first_tokens = vec!["cat".to_string()];

        let selector = TieredCandidateSelector {
            positional_prefix: &positional_prefix,
            fst_index: &fst_index,
            term_collection: &term_collection,
            word_idf_cache: &word_idf_cache,
            first_tokens: &first_tokens,
            rare_term_count: 2,
        };

        // "caat" is one insertion away from "cat"; no exact or prefix match exists for it.
        let query_tokens = vec!["caat".to_string()];
        let candidates = selector.select(&query_tokens, "caat");

        assert!(
            candidates.iter().any(|c| c.doc_id == DocId(0) && c.tier == 1),
            "misspelled query token must still resolve to its vocabulary term via edit-distance-1 fallback"
        );
    }
}
