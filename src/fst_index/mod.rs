use crate::core::error::{Error, ErrorKind, Result};
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder};
use std::collections::BTreeSet;

/// Minimal acyclic finite-state transducer over the term vocabulary. Supports exact, prefix,
/// suffix (via a reverse FST), and edit-distance-1 lookups (§4.2). Output ids equal the term's
/// insertion index in `TermCollection`, stable across runs.
pub struct FstIndex {
    forward: Map<Vec<u8>>,
    reverse: Map<Vec<u8>>,
    /// Distinct characters seen across the vocabulary, used to bound insertion/substitution
    /// enumeration in `within_edit_distance_1` without needing raw FST arc access.
    alphabet: BTreeSet<char>,
}

impl FstIndex {
    /// Builds the forward and reverse FSTs from `sorted_terms` (lexicographically ascending,
    /// caller-guaranteed) paired with `outputs` (equal length). Rejects unsorted input.
    pub fn build(sorted_terms: &[String], outputs: &[u64]) -> Result<Self> {
        if sorted_terms.len() != outputs.len() {
            return Err(Error::new(ErrorKind::InvalidArgument, "terms/outputs length mismatch"));
        }
        for w in sorted_terms.windows(2) {
            if w[0] >= w[1] {
                return Err(Error::new(ErrorKind::InvalidArgument, "FST build requires strictly sorted, deduplicated input"));
            }
        }

        let mut forward_builder = MapBuilder::memory();
        let mut alphabet = BTreeSet::new();
        for (term, &output) in sorted_terms.iter().zip(outputs.iter()) {
            forward_builder.insert(term.as_bytes(), output)?;
            alphabet.extend(term.chars());
        }
        let forward = forward_builder.into_map();

        let mut reversed: Vec<(Vec<u8>, u64)> = sorted_terms
            .iter()
            .zip(outputs.iter())
            .map(|(t, &o)| (t.chars().rev().collect::<String>().into_bytes(), o))
            .collect();
        reversed.sort_by(|a, b| a.0.cmp(&b.0));
        // Distinct terms can share a reversal (anagram-style byte sequences); the FST map
        // requires strictly increasing keys, so only the first output per reversed key survives
        // suffix lookups (callers wanting every output should fall back to exact/prefix lookup).
        reversed.dedup_by(|a, b| a.0 == b.0);
        let mut reverse_builder = MapBuilder::memory();
        for (key, output) in &reversed {
            reverse_builder.insert(key, *output)?;
        }
        let reverse = reverse_builder.into_map();

        Ok(FstIndex { forward, reverse, alphabet })
    }

    pub fn get_exact(&self, term: &str) -> Option<u64> {
        self.forward.get(term.as_bytes())
    }

    pub fn get_by_prefix(&self, prefix: &str, out: &mut Vec<u64>) {
        if prefix.is_empty() {
            return;
        }
        let mut stream = self.forward.range().ge(prefix.as_bytes()).into_stream();
        while let Some((key, output)) = stream.next() {
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            out.push(output);
        }
    }

    pub fn get_by_suffix(&self, suffix: &str, out: &mut Vec<u64>) {
        if suffix.is_empty() {
            return;
        }
        let reversed: String = suffix.chars().rev().collect();
        let mut stream = self.reverse.range().ge(reversed.as_bytes()).into_stream();
        while let Some((key, output)) = stream.next() {
            if !key.starts_with(reversed.as_bytes()) {
                break;
            }
            out.push(output);
        }
    }

    /// All outputs whose key is within Levenshtein distance 1 of `query`: the exact match,
    /// every single-character deletion of `query`, every single-character insertion, and every
    /// single-character substitution -- each verified by an exact FST lookup so no false
    /// positive survives.
    pub fn within_edit_distance_1(&self, query: &str, out: &mut Vec<u64>) {
        let chars: Vec<char> = query.chars().collect();

        if let Some(o) = self.get_exact(query) {
            out.push(o);
        }

        // Deletions: remove one character.
        for i in 0..chars.len() {
            let candidate: String = chars.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, c)| *c).collect();
            if let Some(o) = self.get_exact(&candidate) {
                out.push(o);
            }
        }

        // Insertions: add one character at every position, restricted to the vocabulary alphabet.
        for i in 0..=chars.len() {
            for &c in &self.alphabet {
                let mut candidate_chars = chars.clone();
                candidate_chars.insert(i, c);
                let candidate: String = candidate_chars.into_iter().collect();
                if let Some(o) = self.get_exact(&candidate) {
                    out.push(o);
                }
            }
        }

        // Substitutions: replace one character, restricted to the vocabulary alphabet.
        for i in 0..chars.len() {
            for &c in &self.alphabet {
                if c == chars[i] {
                    continue;
                }
                let mut candidate_chars = chars.clone();
                candidate_chars[i] = c;
                let candidate: String = candidate_chars.into_iter().collect();
                if let Some(o) = self.get_exact(&candidate) {
                    out.push(o);
                }
            }
        }

        out.sort_unstable();
        out.dedup();
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// General-purpose edit-distance verifier for broader fuzzy matching beyond the FST's
/// distance-1 lookups (e.g. a two-token query where the caller already narrowed the
/// candidate set and just needs a distance bound check).
pub struct FuzzyVerifier {
    builder: LevenshteinAutomatonBuilder,
}

impl FuzzyVerifier {
    pub fn new(max_distance: u8, transpositions: bool) -> Self {
        FuzzyVerifier { builder: LevenshteinAutomatonBuilder::new(max_distance, transpositions) }
    }

    pub fn within_distance(&self, query: &str, candidate: &str, max_distance: u8) -> bool {
        let dfa = self.builder.build_dfa(query);
        let mut state = dfa.initial_state();
        for &byte in candidate.as_bytes() {
            state = dfa.transition(state, byte);
        }
        matches!(dfa.distance(state), Distance::Exact(d) if d <= max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_index() -> FstIndex {
        let terms = vec!["cat".to_string(), "cats".to_string(), "dog".to_string(), "dot".to_string()];
        let outputs: Vec<u64> = (0..terms.len() as u64).collect();
        FstIndex::build(&terms, &outputs).unwrap()
    }

    #[test]
    fn exact_lookup() {
        let idx = build_index();
        assert_eq!(idx.get_exact("cat"), Some(0));
        assert_eq!(idx.get_exact("missing"), None);
    }

    #[test]
    fn prefix_lookup() {
        let idx = build_index();
        let mut out = Vec::new();
        idx.get_by_prefix("ca", &mut out);
        assert_eq!(out, vec![0, 1]);
    }

    #[test]
    fn suffix_lookup() {
        let idx = build_index();
        let mut out = Vec::new();
        idx.get_by_suffix("t", &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![0, 3]); // "cat", "dot"
    }

    #[test]
    fn edit_distance_1_covers_insert_delete_substitute() {
        let idx = build_index();

        let mut out = Vec::new();
        idx.within_edit_distance_1("ca", &mut out); // delete 't' from "cat"
        assert!(out.contains(&0));

        let mut out2 = Vec::new();
        idx.within_edit_distance_1("cats", &mut out2); // exact
        assert!(out2.contains(&1));

        let mut out3 = Vec::new();
        idx.within_edit_distance_1("dog", &mut out3); // exact + substitute into "dot"
        assert!(out3.contains(&2));
        assert!(out3.contains(&3));
    }

    #[test]
    fn rejects_unsorted_build_input() {
        let terms = vec!["b".to_string(), "a".to_string()];
        assert!(FstIndex::build(&terms, &[0, 1]).is_err());
    }
}
