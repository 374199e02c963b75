use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use stop_words::{get, LANGUAGE};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TokenizerConfig;

/// Text tokenizer with optional stemming and stopword removal
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig) -> Self {
        let stemmer = config.stem.then(|| Stemmer::create(Algorithm::English));

        let mut stopwords = HashSet::new();
        if config.remove_stopwords {
            stopwords.extend(get(LANGUAGE::English).iter().map(|w| w.to_lowercase()));
        }

        Self {
            config: config.clone(),
            stemmer,
            stopwords,
        }
    }

    /// Tokenizer for a named analyzer. Unknown names fall back to `standard`.
    pub fn for_analyzer(name: &str) -> Self {
        match name {
            "english" => Self::new(&TokenizerConfig::english()),
            _ => Self::new(&TokenizerConfig::default()),
        }
    }

    /// Analyze text into terms: split on word boundaries, lowercase, drop
    /// stopwords and out-of-range lengths, then stem
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| self.fold_case(word))
            .filter(|token| self.keeps(token))
            .map(|token| match &self.stemmer {
                Some(stemmer) => stemmer.stem(&token).into_owned(),
                None => token,
            })
            .collect()
    }

    fn fold_case(&self, word: &str) -> String {
        if self.config.lowercase {
            word.to_lowercase()
        } else {
            word.to_string()
        }
    }

    fn keeps(&self, token: &str) -> bool {
        (self.config.min_token_length..=self.config.max_token_length).contains(&token.len())
            && !self.stopwords.contains(token)
    }

    /// Get unique terms from text
    pub fn unique_terms(&self, text: &str) -> HashSet<String> {
        self.tokenize(text).into_iter().collect()
    }
}

/// The analyzers a mapping can name, built once
pub struct Analyzers {
    standard: Tokenizer,
    english: Tokenizer,
}

impl Default for Analyzers {
    fn default() -> Self {
        Self {
            standard: Tokenizer::for_analyzer("standard"),
            english: Tokenizer::for_analyzer("english"),
        }
    }
}

impl Analyzers {
    /// Analyzer by name; unknown names get `standard`
    pub fn get(&self, name: &str) -> &Tokenizer {
        match name {
            "english" => &self.english,
            _ => &self.standard,
        }
    }
}
