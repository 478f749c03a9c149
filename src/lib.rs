//! In-memory, persistable type-ahead full-text search engine.
//!
//! A document is tokenized into whole words and padded character n-grams (`tokenizer`), whose
//! postings accumulate in a shared vocabulary (`index`) addressable by an FST (`fst_index`).
//! Queries resolve through a tiered candidate cascade and BM25+ scoring fused with positional
//! signals (`scoring`), backed by compact integer encodings (`compact`) and roaring bitmaps
//! (`bitmap`) where the posting shape calls for them. The whole thing freezes into an
//! `INFDX2`-formatted snapshot (`persistence`) or an append-only segment (`segment`), and builds
//! via a `rayon`-parallel pipeline (`parallel`). `engine` ties it together behind `SearchEngine`.

pub mod bitmap;
pub mod compact;
pub mod core;
pub mod engine;
pub mod fst_index;
pub mod index;
pub mod parallel;
pub mod persistence;
pub mod query_cache;
pub mod scoring;
pub mod segment;
pub mod tokenizer;

pub use engine::{SearchEngine, SearchResult};
pub use parallel::RawDocument;
