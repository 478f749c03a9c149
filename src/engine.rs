use crate::core::config::EngineConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::EngineStats;
use crate::core::types::{DocId, ScoreEntry};
use crate::fst_index::{FstIndex, FuzzyVerifier};
use crate::index::{Document, DocumentCollection, PositionalPrefixIndex, STOP_TERM_DF, TermCollection};
use crate::parallel::{ParallelIndexer, RawDocument};
use crate::persistence::{self, DocumentMetaRecord, DocumentRecord, PersistedIndex, TermRecord};
use crate::query_cache::{QueryCache, QueryKey};
use crate::scoring::{
    fuse, fuzzy_matched_token_count, has_adjacent_bigram_match, tier_floor, Bm25Scorer, FusionConfig,
    PositionalSignals, QueryTermStats, TieredCandidateSelector,
};
use crate::tokenizer::Tokenizer;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

/// Document metadata the candidate selector and fusion pass need without re-tokenizing on every
/// query: the first whole-word token and the total whole-word token count (§6 section 5).
struct DocMeta {
    first_token: String,
    tokens: Vec<String>,
}

/// Immutable, query-ready state built once by `freeze` and replaced wholesale on the next
/// `index`/`delete_by_key`/`compact` call. Safe for unsynchronized concurrent reads (§3, §5).
struct FrozenState {
    fst_index: FstIndex,
    positional_prefix: PositionalPrefixIndex,
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
    doc_segment_numbers: Vec<i32>,
    word_idf_cache: HashMap<String, f32>,
    doc_meta: Vec<DocMeta>,
}

/// `search`'s result: ranked records plus how many documents were considered as candidates
/// before ranking (§6).
pub struct SearchResult {
    pub records: Vec<ScoreEntry>,
    pub total_candidates: u64,
}

/// The top-level, in-memory, persistable full-text search engine (§6).
pub struct SearchEngine {
    config: EngineConfig,
    tokenizer: Tokenizer,
    documents: DocumentCollection,
    terms: TermCollection,
    frozen: RwLock<Option<FrozenState>>,
    query_cache: QueryCache,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let tokenizer = Tokenizer::from_config(&config)?;
        let cache_size = config.cache_size;
        Ok(SearchEngine {
            config,
            tokenizer,
            documents: DocumentCollection::new(),
            terms: TermCollection::new(),
            frozen: RwLock::new(None),
            query_cache: QueryCache::new(cache_size),
        })
    }

    /// Bulk-indexes `documents` via the parallel pipeline, then rebuilds the frozen query-time
    /// structures (FST, positional prefix index, doc-length stats, word-IDF cache) (§5, §6).
    pub fn index(&self, raw_documents: Vec<RawDocument>) -> Result<usize> {
        let (_tx, rx) = crossbeam::channel::bounded::<()>(0);
        self.index_cancellable(raw_documents, &rx)
    }

    pub fn index_cancellable(&self, raw_documents: Vec<RawDocument>, cancel: &crossbeam::channel::Receiver<()>) -> Result<usize> {
        let normalized_documents: Vec<RawDocument> = raw_documents
            .into_iter()
            .map(|d| RawDocument { indexed_text: Self::normalize(&d.indexed_text), ..d })
            .collect();
        let indexer = ParallelIndexer::new(&self.config, &self.tokenizer);
        let count = indexer.index_documents(normalized_documents, &self.documents, &self.terms, cancel)?;
        self.freeze()?;
        self.query_cache.invalidate();
        Ok(count)
    }

    pub fn delete_by_key(&self, key: i64) -> Result<usize> {
        let count = self.documents.delete_by_key(key);
        self.freeze()?;
        self.query_cache.invalidate();
        Ok(count)
    }

    /// Reassigns document ids densely (dropping tombstones) and re-freezes. Offline: the caller
    /// must not run concurrent queries during compaction (§1 Non-goals).
    pub fn compact(&self) -> Result<()> {
        self.documents.compact();
        self.freeze()?;
        self.query_cache.invalidate();
        Ok(())
    }

    pub fn get_document(&self, id: DocId) -> Option<Document> {
        self.documents.get(id)
    }

    fn normalize(text: &str) -> String {
        text.to_lowercase()
    }

    fn freeze(&self) -> Result<()> {
        let snapshot = self.documents.iter_snapshot();
        let (sorted_terms, outputs) = self.terms.sorted_for_fst();
        let fst_index = FstIndex::build(&sorted_terms, &outputs)?;

        let mut positional_prefix = PositionalPrefixIndex::new();
        let mut doc_lengths = vec![0u32; snapshot.len()];
        let mut doc_segment_numbers = vec![0i32; snapshot.len()];
        let mut doc_meta: Vec<DocMeta> = Vec::with_capacity(snapshot.len());
        let mut doc_frequency: HashMap<String, u32> = HashMap::new();

        for doc in &snapshot {
            let idx = doc.id.0 as usize;
            doc_segment_numbers[idx] = doc.segment_number;

            let words = self.tokenizer.whole_words(&Self::normalize(&doc.indexed_text));
            let shingles = self.tokenizer.tokenize(&Self::normalize(&doc.indexed_text), doc.segment_number > 0);
            doc_lengths[idx] = shingles.len() as u32;

            let word_refs: Vec<&str> = words.iter().map(String::as_str).collect();
            positional_prefix.add_document(doc.id, &word_refs);

            let mut seen_this_doc: std::collections::HashSet<&str> = std::collections::HashSet::new();
            for w in &words {
                if seen_this_doc.insert(w.as_str()) {
                    *doc_frequency.entry(w.clone()).or_insert(0) += 1;
                }
            }

            doc_meta.push(DocMeta { first_token: words.first().cloned().unwrap_or_default(), tokens: words });
        }
        positional_prefix.finalize();

        let total_docs = snapshot.len().max(1) as f32;
        let word_idf_cache: HashMap<String, f32> = doc_frequency
            .into_iter()
            .map(|(word, df)| {
                let idf = ((total_docs - df as f32 + 0.5) / (df as f32 + 0.5) + 1.0).ln();
                (word, idf)
            })
            .collect();

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().map(|&l| l as f32).sum::<f32>() / doc_lengths.len() as f32
        };

        *self.frozen.write() = Some(FrozenState {
            fst_index,
            positional_prefix,
            doc_lengths,
            avg_doc_length,
            doc_segment_numbers,
            word_idf_cache,
            doc_meta,
        });
        Ok(())
    }

    pub fn search(&self, query_text: &str, max_results: usize) -> Result<SearchResult> {
        if max_results == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "max_results must be > 0"));
        }

        let cache_key = QueryKey::new(query_text, max_results);
        if let Some(cached) = self.query_cache.get(&cache_key) {
            return Ok(SearchResult { total_candidates: cached.len() as u64, records: cached });
        }

        let frozen_guard = self.frozen.read();
        let Some(frozen) = frozen_guard.as_ref() else {
            return Ok(SearchResult { records: Vec::new(), total_candidates: 0 });
        };

        let normalized = Self::normalize(query_text);
        let query_tokens = self.tokenizer.whole_words(&normalized);
        if query_tokens.is_empty() {
            return Ok(SearchResult { records: Vec::new(), total_candidates: 0 });
        }

        let oversampled_k = max_results.saturating_mul(4).max(max_results);

        let first_tokens: Vec<String> = frozen.doc_meta.iter().map(|m| m.first_token.clone()).collect();
        let selector = TieredCandidateSelector {
            positional_prefix: &frozen.positional_prefix,
            fst_index: &frozen.fst_index,
            term_collection: &self.terms,
            word_idf_cache: &frozen.word_idf_cache,
            first_tokens: &first_tokens,
            rare_term_count: self.config.rare_term_count,
        };
        let candidates = selector.select(&query_tokens, &normalized);
        let total_candidates = candidates.len() as u64;

        if candidates.is_empty() {
            let fallback = self.full_scan_fallback(frozen.doc_meta.len());
            let records = self.rank_tiered(&fallback, &frozen, &query_tokens, &normalized, oversampled_k, max_results);
            self.query_cache.put(cache_key, records.clone());
            return Ok(SearchResult { records, total_candidates: fallback.len() as u64 });
        }

        let records = self.rank_tiered(&candidates, &frozen, &query_tokens, &normalized, oversampled_k, max_results);
        self.query_cache.put(cache_key, records.clone());
        Ok(SearchResult { records, total_candidates })
    }

    /// Scenario S7: a short query can match so few candidates that the tiered selector returns
    /// nothing even though a full scan of the (small) corpus would still find matches. When
    /// tiering comes back empty, fall back to scanning every live document as tier 3 candidates.
    fn full_scan_fallback(&self, doc_count: usize) -> Vec<crate::scoring::Candidate> {
        (0..doc_count)
            .map(|idx| crate::scoring::Candidate { doc_id: DocId(idx as i32), tier: 3 })
            .collect()
    }

    fn rank_tiered(
        &self,
        candidates: &[crate::scoring::Candidate],
        frozen: &FrozenState,
        query_tokens: &[String],
        normalized_query: &str,
        oversampled_k: usize,
        max_results: usize,
    ) -> Vec<ScoreEntry> {
        let candidate_ids: Vec<DocId> = candidates.iter().map(|c| c.doc_id).collect();
        let tier_by_doc: HashMap<i32, u8> = candidates.iter().map(|c| (c.doc_id.0, c.tier)).collect();

        let owned_postings: Vec<Vec<(DocId, u8)>> = query_tokens
            .iter()
            .map(|token| {
                self.terms
                    .get(token)
                    .and_then(|t| {
                        let guard = t.lock();
                        if guard.document_frequency == STOP_TERM_DF {
                            None
                        } else {
                            guard.posting_list().map(|p| p.to_vec())
                        }
                    })
                    .unwrap_or_default()
            })
            .collect();

        let term_stats: Vec<QueryTermStats> = query_tokens
            .iter()
            .zip(owned_postings.iter())
            .map(|(text, postings)| QueryTermStats { text: text.clone(), df: postings.len() as u32, postings })
            .collect();

        let scorer = Bm25Scorer::from_config(&self.config);
        let scored = scorer.score(
            &term_stats,
            oversampled_k,
            frozen.doc_lengths.len(),
            &frozen.doc_lengths,
            frozen.avg_doc_length,
            &frozen.doc_segment_numbers,
            Some(&candidate_ids),
            None,
        );

        let fusion_config = FusionConfig {
            document_start_bonus: self.config.start_bonus,
            adjacency_bonus: self.config.adjacency_bonus,
            coverage_alpha: self.config.coverage_alpha,
        };
        let fuzzy_verifier = FuzzyVerifier::new(self.config.fuzzy_match_distance, false);

        let mut fused: Vec<ScoreEntry> = Vec::with_capacity(scored.len());
        for (doc_id, raw_score) in scored {
            let idx = doc_id.0 as usize;
            let Some(meta) = frozen.doc_meta.get(idx) else { continue };
            let tier = tier_by_doc.get(&doc_id.0).copied().unwrap_or(3);

            let signals = PositionalSignals {
                doc_id,
                starts_document: meta.first_token.starts_with(normalized_query)
                    || query_tokens.first().is_some_and(|q| meta.first_token.starts_with(q.as_str())),
                has_adjacent_bigram_match: has_adjacent_bigram_match(&meta.tokens, query_tokens),
                matched_token_count: fuzzy_matched_token_count(
                    &meta.tokens,
                    query_tokens,
                    &fuzzy_verifier,
                    self.config.fuzzy_match_distance,
                ),
                query_token_count: query_tokens.len(),
            };

            let fused_score = fuse(raw_score, &signals, tier_floor(tier), &fusion_config);
            fused.push(ScoreEntry::new(fused_score, doc_id, 0, frozen.doc_segment_numbers.get(idx).copied()));
        }

        // Consolidate to one record per logical document: keep the best-scoring segment (§3).
        let mut best_per_base: HashMap<i32, ScoreEntry> = HashMap::new();
        for entry in fused {
            let segment_number = entry.segment_number.unwrap_or(0);
            let base_id = entry.doc_id.0 - segment_number;
            best_per_base
                .entry(base_id)
                .and_modify(|existing| {
                    if entry.score > existing.score {
                        *existing = entry;
                    }
                })
                .or_insert(entry);
        }

        let mut tiebreak: u8 = 0;
        let mut results: Vec<ScoreEntry> = best_per_base
            .into_values()
            .map(|mut e| {
                tiebreak = tiebreak.wrapping_add(1);
                e.tiebreaker = tiebreak;
                e
            })
            .collect();
        results.sort_by(|a, b| b.cmp(a));
        results.truncate(max_results);
        results
    }

    pub fn get_statistics(&self) -> EngineStats {
        EngineStats {
            document_count: self.documents.live_count(),
            vocabulary_size: self.terms.len(),
            deleted_documents: self.documents.count() - self.documents.live_count(),
            segment_count: 0,
            cache_stats: self.query_cache.stats(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let frozen_guard = self.frozen.read();
        let snapshot = self.documents.iter_snapshot();

        let documents: Vec<DocumentRecord> = snapshot
            .iter()
            .map(|d| DocumentRecord {
                id: d.id.0,
                key: d.document_key,
                text: d.indexed_text.clone(),
                info: d.client_information.clone(),
                segment: d.segment_number,
                json_idx: -1,
                deleted: d.deleted,
            })
            .collect();

        let terms: Vec<TermRecord> = self
            .terms
            .iter_snapshot()
            .iter()
            .map(|t| {
                let guard = t.lock();
                TermRecord {
                    text: guard.text.clone(),
                    df: guard.document_frequency as i32,
                    postings: guard.posting_list().map(|p| p.iter().map(|(d, w)| (d.0, *w)).collect()).unwrap_or_default(),
                }
            })
            .collect();

        let (sorted_terms, outputs) = self.terms.sorted_for_fst();

        let (short_query_index, document_metadata) = match frozen_guard.as_ref() {
            Some(frozen) => {
                let meta = frozen
                    .doc_meta
                    .iter()
                    .map(|m| DocumentMetaRecord { first_token: m.first_token.clone(), token_count: m.tokens.len() as u16 })
                    .collect();
                (Some(clone_positional_index(&frozen.positional_prefix)), Some(meta))
            }
            None => (None, None),
        };

        let index = PersistedIndex {
            documents,
            terms,
            fst_terms: Some((sorted_terms, outputs)),
            short_query_index,
            document_metadata,
        };
        persistence::save(path, &index)
    }

    pub fn load(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let persisted = persistence::load(path)?;
        let engine = SearchEngine::new(config)?;

        for doc in &persisted.documents {
            let added = engine.documents.add(doc.key, doc.segment, doc.text.clone(), doc.info.clone());
            if doc.deleted {
                engine.documents.delete_by_key(doc.key);
            }
            debug_assert_eq!(added.id.0, doc.id);
        }

        for term in &persisted.terms {
            let (handle, _) = engine.terms.get_or_create(&term.text);
            let mut guard = handle.lock();
            for &(doc_id, weight) in &term.postings {
                guard.add_posting(DocId(doc_id), weight, engine.config.stop_term_limit)?;
            }
        }

        engine.freeze()?;
        Ok(engine)
    }
}

fn clone_positional_index(index: &PositionalPrefixIndex) -> PositionalPrefixIndex {
    let position0: Vec<(char, Vec<DocId>)> = index.iter_position0().map(|(c, ids)| (c, ids.to_vec())).collect();
    let position1: Vec<(char, Vec<DocId>)> = index.iter_position1().map(|(c, ids)| (c, ids.to_vec())).collect();
    PositionalPrefixIndex::from_persisted(position0, position1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(key: i64, text: &str) -> RawDocument {
        RawDocument { document_key: key, segment_number: 0, indexed_text: text.to_string(), client_information: String::new() }
    }

    #[test]
    fn indexes_and_finds_a_simple_term() {
        let engine = SearchEngine::new(EngineConfig::default()).unwrap();
        engine.index(vec![raw(1, "The quick brown fox"), raw(2, "jumps over the lazy dog")]).unwrap();

        let result = engine.search("fox", 10).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].doc_id, DocId(0));
    }

    #[test]
    fn save_and_load_round_trips_search_results() {
        let engine = SearchEngine::new(EngineConfig::default()).unwrap();
        engine.index(vec![raw(1, "The quick brown fox"), raw(2, "jumps over the lazy dog")]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.infdx2");
        engine.save(&path).unwrap();

        let loaded = SearchEngine::load(&path, EngineConfig::default()).unwrap();
        let before = engine.search("fox", 10).unwrap();
        let after = loaded.search("fox", 10).unwrap();

        assert_eq!(before.records.len(), after.records.len());
        for (a, b) in before.records.iter().zip(after.records.iter()) {
            assert_eq!(a.doc_id, b.doc_id);
            assert!((a.score - b.score).abs() < 1e-3);
        }
    }

    #[test]
    fn statistics_reflect_document_and_vocabulary_counts() {
        let engine = SearchEngine::new(EngineConfig::default()).unwrap();
        engine.index(vec![raw(1, "cat"), raw(2, "dog")]).unwrap();
        let stats = engine.get_statistics();
        assert_eq!(stats.document_count, 2);
        assert!(stats.vocabulary_size > 0);
    }
}
