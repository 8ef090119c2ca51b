mod assembler;
mod document;
mod hashing;
mod ngrams;
mod params;
mod space;
mod stop_words;
mod tokenizer;
mod vocabulary;

use std::sync::Arc;

use ahash::HashMap;
use rayon::prelude::*;
use sprs::CsMat;
use tracing::debug;

pub use assembler::FeatureVector;
pub use document::Document;
pub use hashing::HashedSpace;
pub use ngrams::{Gram, GramExtractor, char_grams, word_grams};
pub use params::{
    DEFAULT_CHARGRAM_RANGE, DEFAULT_COLUMN, DEFAULT_HASH_SEED, DEFAULT_HASH_TABLE_SIZE,
    DEFAULT_MAX_VOCABULARY_SIZE, DEFAULT_NGRAM_RANGE, FeatureMode, FeaturizerParams,
    FrequencyMeasure, HashSeed, MultiColumnStrategy, VectorNorm, Weighting,
};
pub use space::{FeatureBlock, FeatureSpace, FittedSpace};
pub use stop_words::{ENGLISH_STOP_WORDS, StopWords};
pub use tokenizer::{Token, Tokenizer};
pub use vocabulary::Vocabulary;

use self::assembler::{VectorAssembler, to_csr};
use crate::{
    cancel::CancellationToken,
    error::{FeaturizerError, Result},
};

/// Lifecycle state of a [`Featurizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeaturizerState {
    /// No feature space yet; `fit` must run before `transform`.
    Unfit,
    /// Feature space frozen; ready to assemble vectors.
    Fit,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
enum FitState {
    Unfit,
    Fit(Arc<FittedSpace>),
}

/// Turns text records into fixed-length gram-count vectors.
///
/// Dictionary mode learns its vocabulary in [`Featurizer::fit`]. Hashing
/// mode is ready at construction, unless TF-IDF weighting asks for document
/// frequencies first.
///
/// ```
/// use text_featurizer::{Document, Featurizer, FeaturizerParams};
///
/// let params = FeaturizerParams::new()
///     .with_ngram_range(1, 2)
///     .without_chargrams()
///     .with_max_vocabulary_size(10);
/// let mut featurizer = Featurizer::new(params)?;
/// featurizer.fit(&[Document::single("the cat sat"), Document::single("the dog sat")])?;
///
/// let vector = featurizer.transform(&Document::single("the cat sat"))?;
/// assert_eq!(vector.len(), 8);
/// # Ok::<(), text_featurizer::FeaturizerError>(())
/// ```
///
/// A serialised featurizer stores its parameters and fitted space only.
/// Loading validates the parameters, rebuilds the tokenizer and extractor
/// from them, and rejects a fitted space that does not match.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "FeaturizerData", into = "FeaturizerData")
)]
#[derive(Clone, Debug)]
pub struct Featurizer {
    params: FeaturizerParams,
    tokenizer: Tokenizer,
    extractor: GramExtractor,
    state: FitState,
}

impl Featurizer {
    /// Validate `params` and build the featurizer.
    pub fn new(params: FeaturizerParams) -> Result<Self> {
        params.validate()?;
        let tokenizer = Tokenizer::from_params(&params);
        let extractor = GramExtractor::from_params(&params);
        let state = if Self::needs_fit(&params) {
            FitState::Unfit
        } else {
            FitState::Fit(Arc::new(FittedSpace::hashing(&params)))
        };
        debug!(
            mode = ?params.mode(),
            weighting = ?params.weighting(),
            columns = params.columns().len(),
            "Featurizer created"
        );
        Ok(Self {
            params,
            tokenizer,
            extractor,
            state,
        })
    }

    fn needs_fit(params: &FeaturizerParams) -> bool {
        params.mode() == FeatureMode::Dictionary || params.weighting().needs_document_frequencies()
    }

    #[must_use]
    pub fn params(&self) -> &FeaturizerParams {
        &self.params
    }

    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    #[must_use]
    pub fn state(&self) -> FeaturizerState {
        match self.state {
            FitState::Unfit => FeaturizerState::Unfit,
            FitState::Fit(_) => FeaturizerState::Fit,
        }
    }

    #[must_use]
    pub fn is_fit(&self) -> bool {
        matches!(self.state, FitState::Fit(_))
    }

    /// The frozen feature space, once fit.
    #[must_use]
    pub fn feature_space(&self) -> Option<&FittedSpace> {
        match &self.state {
            FitState::Fit(space) => Some(space),
            FitState::Unfit => None,
        }
    }

    /// Length of the vectors this featurizer produces, once fit.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.feature_space().map(FittedSpace::dimension)
    }

    /// Build the feature space from `corpus`. See [`Featurizer::fit_with_cancel`].
    pub fn fit(&mut self, corpus: &[Document<'_>]) -> Result<()> {
        self.fit_with_cancel(corpus, &CancellationToken::new())
    }

    /// Build the feature space from `corpus`, checking `cancel` between
    /// documents.
    ///
    /// Fails with `InvalidState` when already fit (unless refitting is
    /// allowed) or when the hashing space needs no fitting, and with
    /// `Cancelled` if `cancel` fires. On error the previous state is kept.
    pub fn fit_with_cancel(
        &mut self,
        corpus: &[Document<'_>],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !Self::needs_fit(&self.params) {
            return Err(FeaturizerError::invalid_state(
                "hashing feature space is fixed at construction and needs no fitting",
            ));
        }
        if self.is_fit() && !self.params.allow_refit() {
            return Err(FeaturizerError::invalid_state(
                "featurizer is already fit; enable allow_refit to rebuild",
            ));
        }
        for document in corpus {
            self.check_columns(document)?;
        }

        debug!(num_documents = corpus.len(), "Fitting featurizer");
        let fitted = match self.params.mode() {
            FeatureMode::Dictionary => FittedSpace::fit_dictionary(
                corpus,
                &self.tokenizer,
                &self.extractor,
                &self.params,
                cancel,
            )?,
            FeatureMode::Hashing => FittedSpace::fit_hashing_idf(
                corpus,
                &self.tokenizer,
                &self.extractor,
                &self.params,
                cancel,
            )?,
        };
        debug!(dimension = fitted.dimension(), "Featurizer fitting complete");
        self.state = FitState::Fit(Arc::new(fitted));
        Ok(())
    }

    /// Fit on `corpus`, then featurize every document of it.
    pub fn fit_transform(&mut self, corpus: &[Document<'_>]) -> Result<Vec<FeatureVector>> {
        self.fit(corpus)?;
        self.transform_batch(corpus)
    }

    /// Featurize one document. Empty or absent fields contribute zeros.
    pub fn transform(&self, document: &Document<'_>) -> Result<FeatureVector> {
        let assembler = self.assembler()?;
        self.check_columns(document)?;
        Ok(assembler.assemble(document))
    }

    /// Featurize a single-column text.
    pub fn transform_text(&self, text: &str) -> Result<FeatureVector> {
        self.transform(&Document::single(text))
    }

    /// Featurize documents in parallel. Fails as a whole if any document
    /// has the wrong number of fields.
    pub fn transform_batch(&self, documents: &[Document<'_>]) -> Result<Vec<FeatureVector>> {
        let assembler = self.assembler()?;
        for document in documents {
            self.check_columns(document)?;
        }
        debug!(num_documents = documents.len(), "Transforming documents");
        Ok(documents
            .par_iter()
            .map(|document| assembler.assemble(document))
            .collect())
    }

    /// Featurize documents into a CSR matrix, one row per document.
    pub fn transform_sparse(&self, documents: &[Document<'_>]) -> Result<CsMat<f64>> {
        let vectors = self.transform_batch(documents)?;
        let dimension = self.assembler()?.space.dimension();
        Ok(to_csr(&vectors, dimension))
    }

    /// Normalised tokens of each field, as used for word n-grams.
    pub fn tokens(&self, document: &Document<'_>) -> Result<Vec<Vec<Token>>> {
        self.check_columns(document)?;
        Ok(document
            .fields()
            .iter()
            .map(|field| {
                field
                    .map(|text| self.tokenizer.tokenize(text).collect())
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Name of the gram behind `slot`. `None` for hashing slots, unknown
    /// slots, or before fitting.
    #[must_use]
    pub fn slot_name(&self, slot: usize) -> Option<String> {
        self.feature_space()?.slot_name(slot)
    }

    /// Gram name -> slot for every dictionary slot. Empty before fitting
    /// and in hashing mode.
    #[must_use]
    pub fn vocabulary(&self) -> HashMap<String, usize> {
        let Some(space) = self.feature_space() else {
            return HashMap::default();
        };
        (0..space.dimension())
            .filter_map(|slot| space.slot_name(slot).map(|name| (name, slot)))
            .collect()
    }

    fn assembler(&self) -> Result<VectorAssembler<'_>> {
        match &self.state {
            FitState::Fit(space) => Ok(VectorAssembler {
                tokenizer: &self.tokenizer,
                extractor: &self.extractor,
                space,
                weighting: self.params.weighting(),
                normalization: self.params.normalization(),
            }),
            FitState::Unfit => Err(FeaturizerError::invalid_state(
                "featurizer must be fit before transforming",
            )),
        }
    }

    fn check_columns(&self, document: &Document<'_>) -> Result<()> {
        let expected = self.params.columns().len();
        if document.len() == expected {
            Ok(())
        } else {
            Err(FeaturizerError::ColumnMismatch {
                expected,
                actual: document.len(),
            })
        }
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct FeaturizerData {
    params: FeaturizerParams,
    state: FitState,
}

#[cfg(feature = "serde")]
impl From<Featurizer> for FeaturizerData {
    fn from(featurizer: Featurizer) -> Self {
        Self {
            params: featurizer.params,
            state: featurizer.state,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<FeaturizerData> for Featurizer {
    type Error = FeaturizerError;

    fn try_from(data: FeaturizerData) -> Result<Self> {
        let mut featurizer = Self::new(data.params)?;
        match data.state {
            FitState::Fit(space) => {
                space.check_params(&featurizer.params)?;
                featurizer.state = FitState::Fit(space);
            }
            FitState::Unfit if Self::needs_fit(&featurizer.params) => {}
            FitState::Unfit => {
                return Err(FeaturizerError::configuration(
                    "saved hashing featurizer is missing its feature space",
                ));
            }
        }
        debug!(fit = featurizer.is_fit(), "Featurizer loaded");
        Ok(featurizer)
    }
}
