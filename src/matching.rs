//! Term matching shared by the analyzers and the scorer.
//!
//! Text is case-folded, split on anything that is not alphanumeric and
//! stemmed with the English Porter stemmer. A keyword matches when its stems
//! appear contiguously in the text, or, for single words long enough to be
//! worth it, when some token is within the fuzzy similarity threshold.

use std::collections::HashSet;
use std::fmt;

use rust_stemmers::{Algorithm, Stemmer};

/// Default similarity threshold for fuzzy keyword hits.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Words shorter than this only ever match exactly.
pub const DEFAULT_MIN_FUZZY_LEN: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "about", "across", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "been", "but", "by", "can", "could", "do", "does", "each", "for", "from", "get", "had", "has",
    "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "me", "more",
    "most", "my", "need", "needs", "no", "not", "of", "on", "one", "or", "our", "out", "over",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "to", "up", "us", "was", "we", "were", "what",
    "when", "where", "which", "who", "will", "with", "would", "you", "your",
];

/// A pluggable string similarity in [0, 1].
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Normalized Levenshtein ratio: `1 - distance / max_len`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinRatio;

impl Similarity for LevenshteinRatio {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Disables fuzzy matching; only identical strings are similar.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactOnly;

impl Similarity for ExactOnly {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            1.0
        } else {
            0.0
        }
    }
}

/// Lower-cased alphanumeric tokens of `text`, in order.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Content words of `text`: tokens minus stop words, single characters and
/// pure numbers, de-duplicated in first-seen order.
pub fn content_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Tokenised and stemmed form of a piece of text, built once and queried
/// for many keywords.
#[derive(Debug, Clone, Default)]
pub struct NormalizedText {
    tokens: Vec<String>,
    stems: Vec<String>,
    stem_set: HashSet<String>,
    unique_tokens: Vec<String>,
}

impl NormalizedText {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Stemming keyword matcher with a swappable fuzzy similarity.
pub struct TermMatcher {
    stemmer: Stemmer,
    similarity: Box<dyn Similarity>,
    threshold: f64,
    min_fuzzy_len: usize,
}

impl fmt::Debug for TermMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermMatcher")
            .field("threshold", &self.threshold)
            .field("min_fuzzy_len", &self.min_fuzzy_len)
            .finish_non_exhaustive()
    }
}

impl Default for TermMatcher {
    fn default() -> Self {
        Self::new(LevenshteinRatio, DEFAULT_FUZZY_THRESHOLD)
    }
}

impl TermMatcher {
    pub fn new(similarity: impl Similarity + 'static, threshold: f64) -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
            similarity: Box::new(similarity),
            threshold,
            min_fuzzy_len: DEFAULT_MIN_FUZZY_LEN,
        }
    }

    pub fn with_min_fuzzy_len(mut self, min_fuzzy_len: usize) -> Self {
        self.min_fuzzy_len = min_fuzzy_len;
        self
    }

    pub fn stem(&self, token: &str) -> String {
        self.stemmer.stem(token).into_owned()
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        let tokens = tokenize(text);
        let stems: Vec<String> = tokens.iter().map(|t| self.stem(t)).collect();
        let stem_set = stems.iter().cloned().collect();
        let mut unique_tokens = tokens.clone();
        unique_tokens.sort();
        unique_tokens.dedup();
        NormalizedText {
            tokens,
            stems,
            stem_set,
            unique_tokens,
        }
    }

    /// Whether `keyword` (one or more words) occurs in `text`.
    pub fn contains(&self, text: &NormalizedText, keyword: &str) -> bool {
        let words = tokenize(keyword);
        match words.as_slice() {
            [] => false,
            [word] => self.contains_word(text, word),
            phrase => {
                let stems: Vec<String> = phrase.iter().map(|w| self.stem(w)).collect();
                text.stems.windows(stems.len()).any(|w| w == stems.as_slice())
            }
        }
    }

    /// Number of distinct keywords from `keywords` found in `text`.
    pub fn count_hits<'a, I>(&self, text: &NormalizedText, keywords: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        keywords
            .into_iter()
            .filter(|kw| self.contains(text, kw))
            .count()
    }

    fn contains_word(&self, text: &NormalizedText, word: &str) -> bool {
        if text.stem_set.contains(&self.stem(word)) {
            return true;
        }
        let len = word.chars().count();
        if len < self.min_fuzzy_len {
            return false;
        }
        text.unique_tokens.iter().any(|token| {
            token.chars().count() >= self.min_fuzzy_len
                && self.similarity.similarity(token, word) >= self.threshold
        })
    }
}
