use crate::core::config::EngineConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::{DocumentCollection, TermCollection};
use crate::tokenizer::Tokenizer;
use crossbeam::channel::Receiver;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One document as handed to the engine's `index()` call, before tokenization.
pub struct RawDocument {
    pub document_key: i64,
    pub segment_number: i32,
    pub indexed_text: String,
    pub client_information: String,
}

/// Cooperative cancellation signal, checked between documents and between merge batches (§5). A
/// message received (or the sender dropped) means cancellation was requested; the caller
/// discards whatever partial index state has been built.
fn is_cancelled(cancel: &Receiver<()>) -> bool {
    use crossbeam::channel::TryRecvError;
    match cancel.try_recv() {
        Ok(()) => true,
        Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

/// Parallel document indexer: partitions the input across worker threads via `rayon`, has each
/// worker tokenize its own slice into a local `(term -> weight)` map per document, then merges
/// partitions sequentially into the global `DocumentCollection` (assigning dense ids under its
/// writer lock) and appends postings into the global `TermCollection` (append ordering per term
/// is serialized by the `Mutex` already embedded in each `Term` handle, i.e. the per-term lock
/// striping the spec calls for) (§5).
pub struct ParallelIndexer<'a> {
    config: &'a EngineConfig,
    tokenizer: &'a Tokenizer,
    progress: AtomicUsize,
}

impl<'a> ParallelIndexer<'a> {
    pub fn new(config: &'a EngineConfig, tokenizer: &'a Tokenizer) -> Self {
        ParallelIndexer { config, tokenizer, progress: AtomicUsize::new(0) }
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    /// Indexes `raw_documents`, returning the number of documents actually added. Returns
    /// `Cancelled` if `cancel` fires before completion; in that case no partial documents or
    /// postings from this call are visible (tokenization happens before any shared state is
    /// touched, so the only mutation point is the sequential merge loop below, which checks
    /// `cancel` before each partition).
    pub fn index_documents(
        &self,
        raw_documents: Vec<RawDocument>,
        documents: &DocumentCollection,
        terms: &TermCollection,
        cancel: &Receiver<()>,
    ) -> Result<usize> {
        self.progress.store(0, Ordering::Relaxed);
        let partition_size = self.config.indexer_partition_size.max(1);
        let stop_term_limit = self.config.stop_term_limit;

        let partitions: Vec<Vec<RawDocument>> = chunk_documents(raw_documents, partition_size);

        let tokenized_partitions: Vec<Vec<(RawDocument, HashMap<String, u8>)>> = partitions
            .into_par_iter()
            .map(|partition| {
                partition
                    .into_iter()
                    .map(|doc| {
                        let term_weights = self.tokenize_to_weights(&doc.indexed_text, doc.segment_number > 0);
                        (doc, term_weights)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut indexed_count = 0usize;
        for partition in tokenized_partitions {
            if is_cancelled(cancel) {
                return Err(Error::new(ErrorKind::Cancelled, "indexing cancelled between merge batches"));
            }

            for (raw_doc, term_weights) in partition {
                if is_cancelled(cancel) {
                    return Err(Error::new(ErrorKind::Cancelled, "indexing cancelled between documents"));
                }

                let doc = documents.add(
                    raw_doc.document_key,
                    raw_doc.segment_number,
                    raw_doc.indexed_text,
                    raw_doc.client_information,
                );

                for (text, weight) in term_weights {
                    let (term, _is_new) = terms.get_or_create(&text);
                    term.lock().add_posting(doc.id, weight, stop_term_limit)?;
                }

                indexed_count += 1;
                self.progress.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(indexed_count)
    }

    /// Tokenizes `text` and collapses repeated shingles into a clamped per-term weight (tf,
    /// saturating at 255 to fit the posting weight's `u8`).
    fn tokenize_to_weights(&self, text: &str, is_segment_continuation: bool) -> HashMap<String, u8> {
        let mut weights: HashMap<String, u8> = HashMap::new();
        for shingle in self.tokenizer.tokenize(text, is_segment_continuation) {
            let entry = weights.entry(shingle.text).or_insert(0);
            *entry = entry.saturating_add(1);
        }
        weights
    }
}

fn chunk_documents(documents: Vec<RawDocument>, partition_size: usize) -> Vec<Vec<RawDocument>> {
    let mut partitions = Vec::new();
    let mut current = Vec::with_capacity(partition_size);
    for doc in documents {
        current.push(doc);
        if current.len() == partition_size {
            partitions.push(std::mem::replace(&mut current, Vec::with_capacity(partition_size)));
        }
    }
    if !current.is_empty() {
        partitions.push(current);
    }
    partitions
}
