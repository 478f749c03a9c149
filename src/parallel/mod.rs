pub mod indexer;

pub use indexer::{ParallelIndexer, RawDocument};
