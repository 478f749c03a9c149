use serde::{Deserialize, Serialize};

/// Engine-level statistics, per `get_statistics` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub document_count: usize,
    pub vocabulary_size: usize,
    pub deleted_documents: usize,
    pub segment_count: usize,
    pub cache_stats: crate::query_cache::CacheStats,
}
