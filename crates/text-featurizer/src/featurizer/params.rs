use ahash::{HashSet, HashSetExt};

use crate::error::{FeaturizerError, Result};

/// Seed used for hashing-mode slots unless another one is configured.
pub const DEFAULT_HASH_SEED: u64 = 314_489_979;
pub const DEFAULT_MAX_VOCABULARY_SIZE: usize = 100_000;
pub const DEFAULT_HASH_TABLE_SIZE: usize = 1 << 16;
pub const DEFAULT_NGRAM_RANGE: (usize, usize) = (1, 1);
pub const DEFAULT_CHARGRAM_RANGE: (usize, usize) = (3, 3);
pub const DEFAULT_COLUMN: &str = "text";

/// How grams are mapped to vector slots.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeatureMode {
    /// Learn an explicit gram -> slot vocabulary during `fit`.
    #[default]
    Dictionary,
    /// Hash grams into a fixed-size table; no vocabulary.
    Hashing,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashSeed {
    /// Same slots on every run.
    Fixed(u64),
    /// A seed drawn once per featurizer instance. Slots differ between instances.
    Random,
}

impl Default for HashSeed {
    fn default() -> Self {
        Self::Fixed(DEFAULT_HASH_SEED)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Weighting {
    /// Raw gram counts.
    #[default]
    Count,
    /// 1.0 if the gram occurs at all.
    Binary,
    /// Count divided by the number of grams extracted for the block.
    Tf,
    /// Count scaled by smoothed inverse document frequency: `ln((n + 1) / (df + 1)) + 1`.
    TfIdf,
}

impl Weighting {
    #[must_use]
    pub fn needs_document_frequencies(self) -> bool {
        matches!(self, Self::TfIdf)
    }
}

/// Normalisation applied to the whole vector after weighting.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VectorNorm {
    #[default]
    None,
    L1,
    L2,
    LInf,
}

/// How several input columns share the feature space.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MultiColumnStrategy {
    /// Grams from every column land in one feature space and one vector.
    #[default]
    Shared,
    /// Each column gets its own feature space; blocks are concatenated in column order.
    Independent,
}

/// Frequency used to rank grams when the vocabulary is capped.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrequencyMeasure {
    /// Total occurrences across the corpus.
    #[default]
    Corpus,
    /// Number of documents containing the gram.
    Document,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeaturizerParams {
    /// Names of the input text columns, in the order documents carry them.
    columns: Vec<String>,
    /// Word n-gram range, `None` disables word grams.
    ngram_range: Option<(usize, usize)>,
    /// Char-gram range, `None` disables char-grams.
    chargram_range: Option<(usize, usize)>,
    mode: FeatureMode,
    max_vocabulary_size: usize,
    /// Minimum number of documents a gram must occur in to enter the vocabulary.
    min_document_frequency: usize,
    frequency_measure: FrequencyMeasure,
    hash_table_size: usize,
    hash_seed: HashSeed,
    weighting: Weighting,
    normalization: VectorNorm,
    case_sensitive: bool,
    strip_diacritics: bool,
    keep_numbers: bool,
    remove_stop_words: bool,
    /// Replaces the built-in English list when stop-word removal is on.
    custom_stop_words: Option<Vec<String>>,
    multi_column: MultiColumnStrategy,
    /// Permit `fit` on an already fitted featurizer.
    allow_refit: bool,
}

impl FeaturizerParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.ngram_range = Some((min_n, max_n));
        self
    }

    #[must_use]
    pub fn without_word_ngrams(mut self) -> Self {
        self.ngram_range = None;
        self
    }

    #[must_use]
    pub fn with_chargram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.chargram_range = Some((min_n, max_n));
        self
    }

    #[must_use]
    pub fn without_chargrams(mut self) -> Self {
        self.chargram_range = None;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: FeatureMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_vocabulary_size(mut self, size: usize) -> Self {
        self.max_vocabulary_size = size;
        self
    }

    #[must_use]
    pub fn with_min_document_frequency(mut self, min_df: usize) -> Self {
        self.min_document_frequency = min_df;
        self
    }

    #[must_use]
    pub fn with_frequency_measure(mut self, measure: FrequencyMeasure) -> Self {
        self.frequency_measure = measure;
        self
    }

    #[must_use]
    pub fn with_hash_table_size(mut self, size: usize) -> Self {
        self.hash_table_size = size;
        self
    }

    #[must_use]
    pub fn with_hash_seed(mut self, seed: HashSeed) -> Self {
        self.hash_seed = seed;
        self
    }

    #[must_use]
    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    #[must_use]
    pub fn with_normalization(mut self, norm: VectorNorm) -> Self {
        self.normalization = norm;
        self
    }

    #[must_use]
    pub fn with_case_sensitive(mut self, enable: bool) -> Self {
        self.case_sensitive = enable;
        self
    }

    /// Strip diacritics ("café" -> "cafe").
    #[must_use]
    pub fn with_strip_diacritics(mut self, enable: bool) -> Self {
        self.strip_diacritics = enable;
        self
    }

    /// Keep tokens made only of digits.
    #[must_use]
    pub fn with_keep_numbers(mut self, enable: bool) -> Self {
        self.keep_numbers = enable;
        self
    }

    #[must_use]
    pub fn with_remove_stop_words(mut self, enable: bool) -> Self {
        self.remove_stop_words = enable;
        self
    }

    /// Remove the given words instead of the built-in English list.
    /// Turns stop-word removal on.
    #[must_use]
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_stop_words = Some(words.into_iter().map(Into::into).collect());
        self.remove_stop_words = true;
        self
    }

    #[must_use]
    pub fn with_multi_column(mut self, strategy: MultiColumnStrategy) -> Self {
        self.multi_column = strategy;
        self
    }

    #[must_use]
    pub fn with_allow_refit(mut self, enable: bool) -> Self {
        self.allow_refit = enable;
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn ngram_range(&self) -> Option<(usize, usize)> {
        self.ngram_range
    }

    #[must_use]
    pub fn chargram_range(&self) -> Option<(usize, usize)> {
        self.chargram_range
    }

    #[must_use]
    pub fn mode(&self) -> FeatureMode {
        self.mode
    }

    #[must_use]
    pub fn max_vocabulary_size(&self) -> usize {
        self.max_vocabulary_size
    }

    #[must_use]
    pub fn min_document_frequency(&self) -> usize {
        self.min_document_frequency
    }

    #[must_use]
    pub fn frequency_measure(&self) -> FrequencyMeasure {
        self.frequency_measure
    }

    #[must_use]
    pub fn hash_table_size(&self) -> usize {
        self.hash_table_size
    }

    #[must_use]
    pub fn hash_seed(&self) -> HashSeed {
        self.hash_seed
    }

    #[must_use]
    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    #[must_use]
    pub fn normalization(&self) -> VectorNorm {
        self.normalization
    }

    #[must_use]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    #[must_use]
    pub fn strip_diacritics(&self) -> bool {
        self.strip_diacritics
    }

    #[must_use]
    pub fn keep_numbers(&self) -> bool {
        self.keep_numbers
    }

    #[must_use]
    pub fn remove_stop_words(&self) -> bool {
        self.remove_stop_words
    }

    #[must_use]
    pub fn custom_stop_words(&self) -> Option<&[String]> {
        self.custom_stop_words.as_deref()
    }

    #[must_use]
    pub fn multi_column(&self) -> MultiColumnStrategy {
        self.multi_column
    }

    #[must_use]
    pub fn allow_refit(&self) -> bool {
        self.allow_refit
    }

    /// Check every parameter. Called by `Featurizer::new`, so bad
    /// configurations never reach per-record calls.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(FeaturizerError::configuration(
                "at least one input column is required",
            ));
        }
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(FeaturizerError::configuration(format!(
                    "duplicate input column `{column}`"
                )));
            }
        }

        if self.ngram_range.is_none() && self.chargram_range.is_none() {
            return Err(FeaturizerError::configuration(
                "word n-grams and char-grams are both disabled",
            ));
        }
        if let Some(range) = self.ngram_range {
            validate_range("ngram_range", range)?;
        }
        if let Some(range) = self.chargram_range {
            validate_range("chargram_range", range)?;
        }

        if self.max_vocabulary_size == 0 {
            return Err(FeaturizerError::configuration(
                "max_vocabulary_size must be positive",
            ));
        }
        if self.min_document_frequency == 0 {
            return Err(FeaturizerError::configuration(
                "min_document_frequency must be at least 1",
            ));
        }
        if self.hash_table_size == 0 {
            return Err(FeaturizerError::configuration(
                "hash_table_size must be positive",
            ));
        }
        Ok(())
    }
}

fn validate_range(name: &str, (min_n, max_n): (usize, usize)) -> Result<()> {
    if min_n < 1 {
        return Err(FeaturizerError::configuration(format!(
            "{name} minimum must be at least 1, got {min_n}"
        )));
    }
    if min_n > max_n {
        return Err(FeaturizerError::configuration(format!(
            "{name} minimum {min_n} exceeds maximum {max_n}"
        )));
    }
    Ok(())
}

impl Default for FeaturizerParams {
    fn default() -> Self {
        Self {
            columns: vec![DEFAULT_COLUMN.to_string()],
            ngram_range: Some(DEFAULT_NGRAM_RANGE),
            chargram_range: Some(DEFAULT_CHARGRAM_RANGE),
            mode: FeatureMode::Dictionary,
            max_vocabulary_size: DEFAULT_MAX_VOCABULARY_SIZE,
            min_document_frequency: 1,
            frequency_measure: FrequencyMeasure::Corpus,
            hash_table_size: DEFAULT_HASH_TABLE_SIZE,
            hash_seed: HashSeed::default(),
            weighting: Weighting::Count,
            normalization: VectorNorm::None,
            case_sensitive: false,
            strip_diacritics: true,
            keep_numbers: true,
            remove_stop_words: false,
            custom_stop_words: None,
            multi_column: MultiColumnStrategy::Shared,
            allow_refit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        FeaturizerParams::default()
            .validate()
            .expect("default params should validate");
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = FeaturizerParams::new()
            .with_ngram_range(3, 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeaturizerError::Configuration(_)));

        let err = FeaturizerParams::new()
            .with_chargram_range(4, 2)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeaturizerError::Configuration(_)));
    }

    #[test]
    fn test_zero_minimum_rejected() {
        let err = FeaturizerParams::new()
            .with_ngram_range(0, 2)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeaturizerError::Configuration(_)));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(
            FeaturizerParams::new()
                .with_max_vocabulary_size(0)
                .validate()
                .is_err()
        );
        assert!(
            FeaturizerParams::new()
                .with_hash_table_size(0)
                .validate()
                .is_err()
        );
        assert!(
            FeaturizerParams::new()
                .with_min_document_frequency(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_no_gram_kind_rejected() {
        let err = FeaturizerParams::new()
            .without_word_ngrams()
            .without_chargrams()
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeaturizerError::Configuration(_)));
    }

    #[test]
    fn test_columns_checked() {
        let empty: [&str; 0] = [];
        assert!(FeaturizerParams::new().with_columns(empty).validate().is_err());
        assert!(
            FeaturizerParams::new()
                .with_columns(["title", "title"])
                .validate()
                .is_err()
        );
        FeaturizerParams::new()
            .with_columns(["title", "body"])
            .validate()
            .expect("distinct columns should validate");
    }

    #[test]
    fn test_custom_stop_words_enable_removal() {
        let params = FeaturizerParams::new().with_stop_words(["foo"]);
        assert!(params.remove_stop_words());
        assert_eq!(params.custom_stop_words(), Some(&["foo".to_string()][..]));
    }
}
