use std::{fmt, ops::Deref};

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use unicode_segmentation::UnicodeSegmentation;

use super::{params::FeaturizerParams, stop_words::StopWords};

/// A normalised word produced by the [`Tokenizer`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for Token {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits text on Unicode word boundaries and normalises each word.
///
/// Both [`Tokenizer::tokenize`] and [`Tokenizer::terms`] are lazy: nothing
/// is allocated until the iterator is driven, and calling them again restarts
/// from the beginning of the text.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    case_sensitive: bool,
    strip_diacritics: bool,
    keep_numbers: bool,
    stop_words: Option<StopWords>,
}

impl Tokenizer {
    #[must_use]
    pub fn new(case_sensitive: bool, strip_diacritics: bool, keep_numbers: bool) -> Self {
        Self {
            case_sensitive,
            strip_diacritics,
            keep_numbers,
            stop_words: None,
        }
    }

    pub(crate) fn from_params(params: &FeaturizerParams) -> Self {
        let tokenizer = Self::new(
            params.case_sensitive(),
            params.strip_diacritics(),
            params.keep_numbers(),
        );
        if !params.remove_stop_words() {
            return tokenizer;
        }
        let stop_words = params
            .custom_stop_words()
            .map_or_else(StopWords::english, StopWords::new);
        tokenizer.with_stop_words(&stop_words)
    }

    /// Drop the given words from [`Tokenizer::tokenize`] output. The words go
    /// through the same normalisation as the text, so casing and accents of
    /// the list do not matter unless the tokenizer preserves them.
    #[must_use]
    pub fn with_stop_words(mut self, stop_words: &StopWords) -> Self {
        let normalized = stop_words.normalized_with(|word| self.normalize(word));
        self.stop_words = Some(normalized);
        self
    }

    /// Normalised words with stop words removed. Used for word n-grams.
    pub fn tokenize<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Token> + 'a {
        self.terms(text).filter(move |token| {
            self.stop_words
                .as_ref()
                .is_none_or(|stop_words| !stop_words.contains(token))
        })
    }

    /// Normalised words, stop words included. Used for char-grams.
    pub fn terms<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Token> + 'a {
        text.unicode_words()
            .filter_map(move |word| self.normalize(word))
            .filter(move |word| self.keep_numbers || !is_number(word))
            .map(Token)
    }

    fn normalize(&self, word: &str) -> Option<String> {
        let stripped = if self.strip_diacritics {
            word.nfd().filter(|c| !is_combining_mark(*c)).collect()
        } else {
            word.to_string()
        };
        let folded = if self.case_sensitive {
            stripped
        } else {
            stripped.to_lowercase()
        };
        (!folded.is_empty()).then_some(folded)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(false, true, true)
    }
}

fn is_number(word: &str) -> bool {
    word.chars().any(char::is_numeric)
        && word
            .chars()
            .all(|c| c.is_numeric() || matches!(c, '.' | ',' | '\''))
}
