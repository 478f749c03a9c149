pub mod bm25;
pub mod candidate_selector;
pub mod fusion;
pub mod topk;

pub use bm25::{Bm25Scorer, QueryTermStats};
pub use candidate_selector::{tier_floor, Candidate, TieredCandidateSelector, TIER_FLOOR_STEP};
pub use fusion::{fuse, fuzzy_matched_token_count, has_adjacent_bigram_match, matched_token_count, FusionConfig, PositionalSignals};
pub use topk::TopKHeap;
