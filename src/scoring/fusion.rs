use crate::core::types::DocId;
use crate::fst_index::FuzzyVerifier;
use std::collections::HashSet;

/// Tunables controlling how much positional information can move a BM25+ score, on top of the
/// tier floor that already separates tiers (§4.11, §9 Open Question b).
pub struct FusionConfig {
    pub document_start_bonus: f32,
    pub adjacency_bonus: f32,
    pub coverage_alpha: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig { document_start_bonus: 2.0, adjacency_bonus: 1.0, coverage_alpha: 1.5 }
    }
}

/// Per-document positional signals the fusion pass consumes, gathered by the caller while
/// resolving the candidate's token hits against the query tokens.
pub struct PositionalSignals {
    pub doc_id: DocId,
    pub starts_document: bool,
    pub has_adjacent_bigram_match: bool,
    pub matched_token_count: usize,
    pub query_token_count: usize,
}

/// Combines a raw BM25+ score with positional signals and a tier floor into one fused score
/// (§4.11): `(bm25 * coverage_multiplier) + adjacency_bonus? + document_start_bonus? + tier_floor`.
pub fn fuse(bm25_score: f32, signals: &PositionalSignals, tier_floor: f32, config: &FusionConfig) -> f32 {
    let coverage = if signals.query_token_count == 0 {
        1.0
    } else {
        (signals.matched_token_count as f32 / signals.query_token_count as f32).powf(config.coverage_alpha)
    };

    let mut score = bm25_score * coverage;
    if signals.has_adjacent_bigram_match {
        score += config.adjacency_bonus;
    }
    if signals.starts_document {
        score += config.document_start_bonus;
    }
    score + tier_floor
}

/// Whether `doc_tokens` contains two consecutive tokens matching two consecutive query tokens,
/// in order (a simple bigram-adjacency check feeding `has_adjacent_bigram_match`).
pub fn has_adjacent_bigram_match(doc_tokens: &[String], query_tokens: &[String]) -> bool {
    if query_tokens.len() < 2 {
        return false;
    }
    for w in query_tokens.windows(2) {
        for dw in doc_tokens.windows(2) {
            if dw[0] == w[0] && dw[1] == w[1] {
                return true;
            }
        }
    }
    false
}

pub fn matched_token_count(doc_tokens: &[String], query_tokens: &[String]) -> usize {
    let doc_set: HashSet<&String> = doc_tokens.iter().collect();
    query_tokens.iter().filter(|t| doc_set.contains(t)).count()
}

/// Like `matched_token_count`, but a query token also counts as matched when some document
/// token is within `max_distance` of it under `verifier` -- so a misspelled query token still
/// earns coverage credit against a candidate document it was already resolved onto (§1, §4.2).
/// This is `FuzzyVerifier`'s own documented use case: the caller already has a narrowed
/// candidate's tokens and just needs a distance bound check, not a fresh FST enumeration.
pub fn fuzzy_matched_token_count(
    doc_tokens: &[String],
    query_tokens: &[String],
    verifier: &FuzzyVerifier,
    max_distance: u8,
) -> usize {
    let doc_set: HashSet<&String> = doc_tokens.iter().collect();
    query_tokens
        .iter()
        .filter(|t| doc_set.contains(t) || doc_tokens.iter().any(|d| verifier.within_distance(t, d, max_distance)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_start_and_adjacency_add_bonuses() {
        let config = FusionConfig::default();
        let signals = PositionalSignals {
            doc_id: DocId(0),
            starts_document: true,
            has_adjacent_bigram_match: true,
            matched_token_count: 2,
            query_token_count: 2,
        };
        let fused = fuse(5.0, &signals, 0.0, &config);
        assert_eq!(fused, 5.0 + config.adjacency_bonus + config.document_start_bonus);
    }

    #[test]
    fn partial_coverage_shrinks_score_below_full_coverage() {
        let config = FusionConfig::default();
        let full = PositionalSignals {
            doc_id: DocId(0),
            starts_document: false,
            has_adjacent_bigram_match: false,
            matched_token_count: 2,
            query_token_count: 2,
        };
        let partial = PositionalSignals {
            doc_id: DocId(1),
            starts_document: false,
            has_adjacent_bigram_match: false,
            matched_token_count: 1,
            query_token_count: 2,
        };
        assert!(fuse(10.0, &partial, 0.0, &config) < fuse(10.0, &full, 0.0, &config));
    }

    #[test]
    fn tier_floor_dominates_everything_else() {
        let config = FusionConfig::default();
        let weak_signals = PositionalSignals {
            doc_id: DocId(0),
            starts_document: false,
            has_adjacent_bigram_match: false,
            matched_token_count: 1,
            query_token_count: 5,
        };
        let low_tier_score = fuse(100.0, &weak_signals, super::super::candidate_selector::tier_floor(3), &config);
        let high_tier_score = fuse(0.01, &weak_signals, super::super::candidate_selector::tier_floor(0), &config);
        assert!(high_tier_score > low_tier_score);
    }

    #[test]
    fn fuzzy_matched_token_count_credits_a_misspelled_token() {
        let doc = vec!["quick".to_string(), "brown".to_string(), "fox".to_string()];
        let exact_query = vec!["quick".to_string(), "fox".to_string()];
        let typo_query = vec!["quikc".to_string(), "fox".to_string()];
        let verifier = FuzzyVerifier::new(1, false);

        assert_eq!(matched_token_count(&doc, &typo_query), 1, "exact match ignores the typo");
        assert_eq!(fuzzy_matched_token_count(&doc, &exact_query, &verifier, 1), 2);
        assert_eq!(fuzzy_matched_token_count(&doc, &typo_query, &verifier, 1), 1, "transposition exceeds distance 1");
    }

    #[test]
    fn adjacent_bigram_detects_in_order_consecutive_match() {
        let doc = vec!["the".to_string(), "quick".to_string(), "fox".to_string()];
        let query = vec!["quick".to_string(), "fox".to_string()];
        assert!(has_adjacent_bigram_match(&doc, &query));

        let query_reversed = vec!["fox".to_string(), "quick".to_string()];
        assert!(!has_adjacent_bigram_match(&doc, &query_reversed));
    }
}
