use crate::core::config::EngineConfig;
use crate::core::error::{Error, ErrorKind, Result};
use unicode_segmentation::UnicodeSegmentation;

/// Reserved code points marking the start/stop of a padded token. Neither is a letter,
/// so neither can collide with a real n-gram produced from user text.
pub const START_PAD: char = '\u{0001}';
pub const STOP_PAD: char = '\u{0002}';

/// A single tokenized unit: either a whole word or a fixed-width, padded character n-gram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shingle {
    pub text: String,
    pub occurrences: u32,
    pub position: u32,
}

/// Deterministically turns normalized text into the multiset of shingles used for indexing
/// and for query resolution (§4.1).
#[derive(Debug, Clone)]
pub struct Tokenizer {
    index_sizes: Vec<usize>,
    start_pad_size: usize,
    stop_pad_size: usize,
    delimiters: Vec<char>,
}

impl Tokenizer {
    pub fn new(
        index_sizes: Vec<usize>,
        start_pad_size: usize,
        stop_pad_size: usize,
        delimiters: Vec<char>,
    ) -> Result<Self> {
        if index_sizes.is_empty() {
            return Err(Error::new(ErrorKind::InvalidArgument, "index_sizes must not be empty"));
        }
        let max_size = index_sizes.iter().copied().max().unwrap();
        if start_pad_size >= max_size || stop_pad_size >= max_size {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "pad size must be smaller than the largest configured n-gram size",
            ));
        }
        Ok(Tokenizer { index_sizes, start_pad_size, stop_pad_size, delimiters })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(
            config.index_sizes.clone(),
            config.start_pad_size,
            config.stop_pad_size,
            config.delimiters.clone(),
        )
    }

    /// Splits `text` on the configured delimiters into whole-word tokens.
    fn split_words<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split(|c: char| self.delimiters.contains(&c))
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// The whole-word tokens of `text`, owned, in order -- used wherever a caller needs tokens
    /// without the padded n-grams (positional prefix indexing, document-start/coverage checks).
    pub fn whole_words(&self, text: &str) -> Vec<String> {
        self.split_words(text).into_iter().map(str::to_string).collect()
    }

    pub fn tokenize(&self, text: &str, is_segment_continuation: bool) -> Vec<Shingle> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut shingles = Vec::new();
        let mut position: u32 = 0;

        for (word_idx, word) in self.split_words(text).into_iter().enumerate() {
            shingles.push(Shingle { text: word.to_string(), occurrences: 1, position });

            let suppress_start_pad = is_segment_continuation && word_idx == 0;
            let padded = self.pad_token(word, suppress_start_pad);
            let chars: Vec<&str> = padded.graphemes(true).collect();

            for &width in &self.index_sizes {
                if chars.len() < width {
                    continue;
                }
                for window in chars.windows(width) {
                    shingles.push(Shingle { text: window.concat(), occurrences: 1, position });
                }
            }

            position += 1;
        }

        shingles
    }

    fn pad_token(&self, word: &str, suppress_start_pad: bool) -> String {
        let start_pads = if suppress_start_pad { 0 } else { self.start_pad_size };
        let mut padded = String::with_capacity(word.len() + start_pads + self.stop_pad_size);
        for _ in 0..start_pads {
            padded.push(START_PAD);
        }
        padded.push_str(word);
        for _ in 0..self.stop_pad_size {
            padded.push(STOP_PAD);
        }
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok() -> Tokenizer {
        Tokenizer::new(vec![2, 3], 1, 1, vec![' ']).unwrap()
    }

    #[test]
    fn empty_text_yields_no_shingles() {
        assert!(tok().tokenize("", false).is_empty());
    }

    #[test]
    fn emits_whole_word_and_ngrams() {
        let shingles = tok().tokenize("cat", false);
        assert!(shingles.iter().any(|s| s.text == "cat"));
        // padded: \u1 c a t \u2 -> 2-grams: \u1c, ca, at, t\u2
        assert!(shingles.iter().any(|s| s.text == "ca"));
        assert!(shingles.iter().any(|s| s.text == "at"));
    }

    #[test]
    fn continuation_suppresses_leading_pad_on_first_word() {
        let with_pad = tok().tokenize("cat", false);
        let continuation = tok().tokenize("cat", true);
        assert!(with_pad.iter().any(|s| s.text.starts_with(START_PAD)));
        assert!(!continuation.iter().any(|s| s.text.starts_with(START_PAD)));
    }

    #[test]
    fn rejects_empty_index_sizes() {
        assert!(Tokenizer::new(vec![], 0, 0, vec![' ']).is_err());
    }

    #[test]
    fn rejects_pad_size_at_or_above_max_width() {
        assert!(Tokenizer::new(vec![2], 2, 0, vec![' ']).is_err());
    }
}
