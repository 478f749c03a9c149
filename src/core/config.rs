use std::path::PathBuf;

/// Engine-wide tunables: tokenizer shape, BM25+ constants, and fusion weights.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub storage_path: PathBuf,
    pub cache_size: usize,

    // Tokenizer (§4.1)
    pub index_sizes: Vec<usize>,
    pub start_pad_size: usize,
    pub stop_pad_size: usize,
    pub delimiters: Vec<char>,

    // TermCollection (§4.5)
    pub stop_term_limit: u32,

    // Bm25Scorer (§4.6)
    pub k1: f32,
    pub b: f32,
    pub delta: f32,
    pub max_term_freq: u8,

    // Coverage / positional fusion (§4.11) -- open question (b), left as tunables.
    pub start_bonus: f32,
    pub adjacency_bonus: f32,
    pub coverage_alpha: f32,

    // Tiered candidate selector (§4.7)
    pub rare_term_count: usize,

    // Fuzzy coverage signal (§4.2, §4.11): max edit distance for a query token to still count
    // as "matched" against a candidate document's tokens when computing coverage.
    pub fuzzy_match_distance: u8,

    // Indexing pipeline (§5)
    pub indexer_partition_size: usize,
    pub max_readers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            storage_path: PathBuf::from("./data"),
            cache_size: 1000, // entries, not bytes: LRU of (query, k) -> result

            index_sizes: vec![2, 3],
            start_pad_size: 1,
            stop_pad_size: 1,
            delimiters: vec![' ', '\t', '\n', '-', '_', '/', ',', '.', ';', ':'],

            stop_term_limit: 200_000,

            k1: 1.2,
            b: 0.75,
            delta: 1.0,
            max_term_freq: 255,

            start_bonus: 0.5,
            adjacency_bonus: 0.25,
            coverage_alpha: 1.0,

            rare_term_count: 2,
            fuzzy_match_distance: 1,

            indexer_partition_size: 4096,
            max_readers: 10,
        }
    }
}

impl EngineConfig {
    pub fn max_ngram_size(&self) -> usize {
        self.index_sizes.iter().copied().max().unwrap_or(0)
    }
}
