use crate::core::config::EngineConfig;
use crate::core::types::DocId;
use std::collections::{HashMap, HashSet};

/// One query term's statistics, already resolved to a posting slice by the caller (§4.6).
pub struct QueryTermStats<'a> {
    pub text: String,
    pub df: u32,
    pub postings: &'a [(DocId, u8)],
}

/// BM25+ with MaxScore early termination, driven by an optional tiered candidate set (§4.6).
pub struct Bm25Scorer {
    k1: f32,
    b: f32,
    delta: f32,
    max_tf: u8,
}

impl Bm25Scorer {
    pub fn new(k1: f32, b: f32, delta: f32, max_tf: u8) -> Self {
        Bm25Scorer { k1, b, delta, max_tf }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Bm25Scorer::new(config.k1, config.b, config.delta, config.max_term_freq)
    }

    fn idf(&self, total_docs: usize, df: u32) -> f32 {
        let n = total_docs as f32;
        let df = df as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn max_term_score(&self, idf: f32, avg_doc_length: f32) -> f32 {
        let tf = self.max_tf as f32;
        idf * ((tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b / avg_doc_length.max(1.0))) + self.delta)
    }

    fn term_score(&self, idf: f32, tf: f32, doc_len: f32, avg_doc_length: f32) -> f32 {
        idf * ((tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_doc_length.max(1.0))) + self.delta)
    }

    /// Scores `terms` over the (optional) candidate set, returning the `top_k` winners as
    /// `(DocId, partial BM25+ score)`. When `best_segments_map` is provided, every accepted
    /// update records the segment number for `baseId = docId - segmentNumber` so the caller can
    /// later consolidate to one entry per logical document (§4.6).
    #[allow(clippy::too_many_arguments)]
    pub fn score(
        &self,
        terms: &[QueryTermStats],
        top_k: usize,
        total_docs: usize,
        doc_lengths: &[u32],
        avg_doc_length: f32,
        doc_segment_numbers: &[i32],
        candidates: Option<&[DocId]>,
        mut best_segments_map: Option<&mut HashMap<i32, i32>>,
    ) -> Vec<(DocId, f32)> {
        let active: Vec<&QueryTermStats> = terms.iter().filter(|t| t.df > 0).collect();
        if active.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let idfs: Vec<f32> = active.iter().map(|t| self.idf(total_docs, t.df)).collect();
        let max_scores: Vec<f32> = idfs.iter().map(|&idf| self.max_term_score(idf, avg_doc_length)).collect();

        let mut order: Vec<usize> = (0..active.len()).collect();
        order.sort_by(|&a, &b| max_scores[b].partial_cmp(&max_scores[a]).unwrap());

        // Suffix array: S[i] = sum of max_scores strictly after position i, in sorted order.
        let mut suffix = vec![0.0f32; order.len() + 1];
        for i in (0..order.len()).rev() {
            suffix[i] = suffix[i + 1] + max_scores[order[i]];
        }

        let candidate_set: Option<HashSet<i32>> = candidates.map(|c| c.iter().map(|d| d.0).collect());

        let mut partial_scores: HashMap<i32, f32> = HashMap::new();
        let mut heap = super::topk::TopKHeap::new(top_k);
        let mut tiebreak: u8 = 0;

        for (rank, &term_idx) in order.iter().enumerate() {
            let term = active[term_idx];
            let idf = idfs[term_idx];
            let max_score = max_scores[term_idx];
            let remaining_after = suffix[rank + 1];
            let theta = heap.threshold();
            let heap_full = heap.is_full();

            let iterate_postings_filtered_by_candidates = |postings: &[(DocId, u8)], set: &HashSet<i32>| -> Vec<(DocId, u8)> {
                if postings.len() < set.len() {
                    postings.iter().filter(|(d, _)| set.contains(&d.0)).copied().collect()
                } else {
                    let mut sorted_candidates: Vec<i32> = set.iter().copied().collect();
                    sorted_candidates.sort_unstable();
                    sorted_candidates
                        .into_iter()
                        .filter_map(|d| {
                            postings.binary_search_by_key(&d, |(pd, _)| pd.0).ok().map(|idx| postings[idx])
                        })
                        .collect()
                }
            };

            let iter_postings: Vec<(DocId, u8)> = match &candidate_set {
                Some(set) => iterate_postings_filtered_by_candidates(term.postings, set),
                None => term.postings.to_vec(),
            };

            for (doc_id, tf) in iter_postings {
                let cur = *partial_scores.get(&doc_id.0).unwrap_or(&0.0);
                if heap_full && cur + max_score + remaining_after <= theta {
                    continue;
                }

                let doc_len = doc_lengths.get(doc_id.0 as usize).copied().unwrap_or(1) as f32;
                let t_score = self.term_score(idf, tf as f32, doc_len, avg_doc_length);
                let new_score = cur + t_score;
                partial_scores.insert(doc_id.0, new_score);

                tiebreak = tiebreak.wrapping_add(1);
                heap.upsert(crate::core::types::ScoreEntry::new(new_score, doc_id, tiebreak, None));

                if let Some(map) = best_segments_map.as_deref_mut() {
                    let segment_number = doc_segment_numbers.get(doc_id.0 as usize).copied().unwrap_or(0);
                    let base_id = doc_id.0 - segment_number;
                    map.insert(base_id, segment_number);
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|e| (e.doc_id, e.score)).collect()
    }

    /// Naive full-posting-list scan, used to validate MaxScore soundness in tests.
    pub fn score_naive(
        &self,
        terms: &[QueryTermStats],
        top_k: usize,
        total_docs: usize,
        doc_lengths: &[u32],
        avg_doc_length: f32,
    ) -> Vec<(DocId, f32)> {
        let mut partial_scores: HashMap<i32, f32> = HashMap::new();
        for term in terms.iter().filter(|t| t.df > 0) {
            let idf = self.idf(total_docs, term.df);
            for &(doc_id, tf) in term.postings {
                let doc_len = doc_lengths.get(doc_id.0 as usize).copied().unwrap_or(1) as f32;
                let t_score = self.term_score(idf, tf as f32, doc_len, avg_doc_length);
                *partial_scores.entry(doc_id.0).or_insert(0.0) += t_score;
            }
        }
        let mut entries: Vec<(DocId, f32)> = partial_scores.into_iter().map(|(d, s)| (DocId(d), s)).collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.0.cmp(&b.0.0)));
        entries.truncate(top_k);
        entries
    }
}
