use ahash::{HashSet, HashSetExt};

/// Common English function words.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    // articles & determiners
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "some", "any", "all",
    "both", "few", "more", "most", "other", "such", "no", "none", "own", "same",
    // pronouns
    "i", "me", "my", "myself", "we", "us", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves",
    // interrogatives
    "what", "which", "who", "whom", "whose", "why", "when", "where", "how",
    // prepositions
    "about", "above", "after", "against", "along", "among", "around", "at", "before", "below",
    "between", "by", "down", "during", "for", "from", "in", "into", "of", "off", "on", "onto",
    "out", "over", "through", "to", "toward", "under", "until", "up", "upon", "with", "within",
    "without",
    // conjunctions
    "and", "as", "because", "but", "if", "or", "nor", "so", "than", "though", "unless", "while",
    // auxiliaries
    "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having", "do",
    "does", "did", "doing", "would", "should", "could", "can", "may", "might", "must", "will",
    "shall",
    // adverbs
    "again", "also", "just", "not", "now", "only", "then", "there", "here", "too", "very",
];

/// Set of words dropped from word-gram extraction.
///
/// Matching is done on the already normalised token, so the set is stored
/// in the same case and diacritic form the tokenizer produces.
#[derive(Clone, Debug, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|word| word.as_ref().to_string())
            .collect();
        Self { words }
    }

    #[must_use]
    pub fn english() -> Self {
        Self::new(ENGLISH_STOP_WORDS)
    }

    /// Rebuild the set with every word passed through `normalize`, dropping
    /// words the normaliser rejects.
    pub(crate) fn normalized_with(&self, normalize: impl Fn(&str) -> Option<String>) -> Self {
        let mut words = HashSet::with_capacity(self.words.len());
        words.extend(self.words.iter().filter_map(|word| normalize(word)));
        Self { words }
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_list_has_no_duplicates() {
        let set = StopWords::english();
        assert_eq!(set.len(), ENGLISH_STOP_WORDS.len());
        assert!(set.contains("the"));
        assert!(!set.contains("cat"));
    }

    #[test]
    fn test_normalized_with_applies_folding() {
        let set = StopWords::new(["The", "Über"]).normalized_with(|w| Some(w.to_lowercase()));
        assert!(set.contains("the"));
        assert!(set.contains("über"));
        assert!(!set.contains("The"));
    }
}
