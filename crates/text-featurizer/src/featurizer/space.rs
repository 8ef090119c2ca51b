use std::ops::Range;

use ahash::{HashSet, HashSetExt};
use rayon::prelude::*;
use tracing::debug;

use super::{
    document::Document,
    hashing::HashedSpace,
    ngrams::{Gram, GramExtractor, escape_name},
    params::{FeatureMode, FeaturizerParams, HashSeed, MultiColumnStrategy},
    tokenizer::Tokenizer,
    vocabulary::{DocumentTally, Vocabulary, VocabularyCounter},
};
use crate::{
    cancel::CancellationToken,
    error::{FeaturizerError, Result},
};

/// Mapping from grams to slots within one feature block.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeatureSpace {
    Dictionary(Vocabulary),
    Hashing(HashedSpace),
}

impl FeatureSpace {
    /// Slot of `gram`, or `None` when it is out of vocabulary. Hashing
    /// spaces always return a slot.
    #[must_use]
    pub fn slot_for(&self, gram: &Gram) -> Option<usize> {
        match self {
            Self::Dictionary(vocab) => vocab.slot(gram),
            Self::Hashing(hashed) => Some(hashed.slot_for(gram)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Dictionary(vocab) => vocab.len(),
            Self::Hashing(hashed) => hashed.table_size(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gram owning `slot`. Only dictionary spaces can answer.
    #[must_use]
    pub fn gram(&self, slot: usize) -> Option<&Gram> {
        match self {
            Self::Dictionary(vocab) => vocab.gram(slot),
            Self::Hashing(_) => None,
        }
    }
}

/// A feature space placed at `offset` in the output vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureBlock {
    /// Source column for independent blocks, `None` for the shared block.
    column: Option<String>,
    offset: usize,
    space: FeatureSpace,
}

impl FeatureBlock {
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn space(&self) -> &FeatureSpace {
        &self.space
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.space.len()
    }
}

/// The frozen output layout of a fitted featurizer: one block per column
/// (independent) or a single block for every column (shared), plus the idf
/// table when TF-IDF weighting is on.
///
/// Read-only after fitting; transform calls share it through an `Arc`.
///
/// Offsets and the dimension are not stored when serialised; loading lays
/// the blocks out again and rejects an idf table of the wrong length.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "FittedSpaceData", into = "FittedSpaceData")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct FittedSpace {
    strategy: MultiColumnStrategy,
    blocks: Vec<FeatureBlock>,
    idf: Option<Vec<f64>>,
    dimension: usize,
}

impl FittedSpace {
    #[must_use]
    pub fn blocks(&self) -> &[FeatureBlock] {
        &self.blocks
    }

    /// Length of every vector produced against this space.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn idf(&self) -> Option<&[f64]> {
        self.idf.as_deref()
    }

    #[must_use]
    pub fn strategy(&self) -> MultiColumnStrategy {
        self.strategy
    }

    pub(crate) fn block_index(&self, column: usize) -> usize {
        block_index(self.strategy, column)
    }

    #[must_use]
    pub fn block_for_column(&self, column: usize) -> Option<&FeatureBlock> {
        self.blocks.get(self.block_index(column))
    }

    /// Human-readable name of a slot, e.g. `the_cat` or `title:<ca>`.
    /// Distinct slots always get distinct names.
    /// `None` for hashing slots and out-of-range indices.
    #[must_use]
    pub fn slot_name(&self, slot: usize) -> Option<String> {
        let block = self.blocks.iter().find(|b| b.range().contains(&slot))?;
        let gram = block.space.gram(slot - block.offset)?;
        Some(match &block.column {
            Some(column) => format!("{}:{gram}", escape_name(column)),
            None => gram.to_string(),
        })
    }

    /// Check that this layout is the one `params` would produce: same
    /// strategy and block columns, same space kind, same hashing table and
    /// fixed seed, and an idf table exactly when the weighting needs one.
    pub(crate) fn check_params(&self, params: &FeaturizerParams) -> Result<()> {
        if self.strategy != params.multi_column() {
            return Err(FeaturizerError::configuration(format!(
                "feature space uses the {:?} column strategy but parameters ask for {:?}",
                self.strategy,
                params.multi_column()
            )));
        }
        let columns = block_columns(params);
        if !self.blocks.iter().map(|b| &b.column).eq(columns.iter()) {
            return Err(FeaturizerError::configuration(
                "feature space blocks do not match the configured columns",
            ));
        }
        for block in &self.blocks {
            match (&block.space, params.mode()) {
                (FeatureSpace::Dictionary(_), FeatureMode::Dictionary) => {}
                (FeatureSpace::Hashing(hashed), FeatureMode::Hashing) => {
                    if hashed.table_size() != params.hash_table_size() {
                        return Err(FeaturizerError::configuration(format!(
                            "hashed feature space has {} slots but parameters ask for {}",
                            hashed.table_size(),
                            params.hash_table_size()
                        )));
                    }
                    if matches!(params.hash_seed(), HashSeed::Fixed(seed) if seed != hashed.seed()) {
                        return Err(FeaturizerError::configuration(
                            "hashed feature space seed does not match the configured seed",
                        ));
                    }
                }
                (_, mode) => {
                    return Err(FeaturizerError::configuration(format!(
                        "feature space kind does not match {mode:?} mode"
                    )));
                }
            }
        }
        if self.idf.is_some() != params.weighting().needs_document_frequencies() {
            return Err(FeaturizerError::configuration(
                "idf table presence does not match the configured weighting",
            ));
        }
        Ok(())
    }

    /// Hashing layout; no corpus pass.
    pub(crate) fn hashing(params: &FeaturizerParams) -> Self {
        let spaces = block_columns(params)
            .into_iter()
            .map(|column| {
                let space = HashedSpace::new(params.hash_table_size(), params.hash_seed());
                (column, FeatureSpace::Hashing(space))
            })
            .collect();
        Self::from_spaces(params.multi_column(), spaces, None)
    }

    /// Count grams over the corpus and build one vocabulary per block.
    pub(crate) fn fit_dictionary(
        corpus: &[Document<'_>],
        tokenizer: &Tokenizer,
        extractor: &GramExtractor,
        params: &FeaturizerParams,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let strategy = params.multi_column();
        let columns = block_columns(params);
        let counters = columns
            .iter()
            .map(|_| VocabularyCounter::new())
            .collect::<Vec<_>>();

        debug!(
            num_documents = corpus.len(),
            num_blocks = counters.len(),
            "Counting grams for vocabulary"
        );
        corpus
            .par_iter()
            .enumerate()
            .try_for_each(|(doc_index, doc)| {
                if cancel.is_cancelled() {
                    return Err(FeaturizerError::Cancelled);
                }
                let mut tallies = counters
                    .iter()
                    .map(|counter| counter.document(doc_index))
                    .collect::<Vec<_>>();
                for (column, field) in doc.fields().iter().enumerate() {
                    let Some(text) = field else { continue };
                    let tally = &mut tallies[block_index(strategy, column)];
                    extractor.extract(tokenizer, text, |gram| tally.observe(gram));
                }
                tallies.into_iter().for_each(DocumentTally::finish);
                Ok(())
            })?;

        let mut spaces = Vec::with_capacity(columns.len());
        let mut document_frequencies = Vec::new();
        for (column, counter) in columns.into_iter().zip(counters) {
            let (vocab, dfs) = counter.into_vocabulary(
                params.max_vocabulary_size(),
                params.min_document_frequency(),
                params.frequency_measure(),
            );
            document_frequencies.extend(dfs);
            spaces.push((column, FeatureSpace::Dictionary(vocab)));
        }

        let idf = params
            .weighting()
            .needs_document_frequencies()
            .then(|| smoothed_idf(corpus.len(), &document_frequencies));
        Ok(Self::from_spaces(strategy, spaces, idf))
    }

    /// Hashing layout plus per-slot document frequencies for TF-IDF.
    pub(crate) fn fit_hashing_idf(
        corpus: &[Document<'_>],
        tokenizer: &Tokenizer,
        extractor: &GramExtractor,
        params: &FeaturizerParams,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let mut fitted = Self::hashing(params);
        let dimension = fitted.dimension;
        debug!(
            num_documents = corpus.len(),
            dimension, "Counting hashed document frequencies"
        );

        let document_frequencies = corpus
            .par_iter()
            .try_fold(
                || vec![0u64; dimension],
                |mut acc, doc| {
                    if cancel.is_cancelled() {
                        return Err(FeaturizerError::Cancelled);
                    }
                    let mut present = HashSet::new();
                    for (column, field) in doc.fields().iter().enumerate() {
                        let Some(text) = field else { continue };
                        let block = &fitted.blocks[fitted.block_index(column)];
                        extractor.extract(tokenizer, text, |gram| {
                            if let Some(slot) = block.space.slot_for(&gram) {
                                present.insert(block.offset + slot);
                            }
                        });
                    }
                    for slot in present {
                        acc[slot] += 1;
                    }
                    Ok(acc)
                },
            )
            .try_reduce(
                || vec![0u64; dimension],
                |mut left, right| {
                    for (l, r) in left.iter_mut().zip(right) {
                        *l += r;
                    }
                    Ok(left)
                },
            )?;

        fitted.idf = Some(smoothed_idf(corpus.len(), &document_frequencies));
        Ok(fitted)
    }

    fn from_spaces(
        strategy: MultiColumnStrategy,
        spaces: Vec<(Option<String>, FeatureSpace)>,
        idf: Option<Vec<f64>>,
    ) -> Self {
        let mut offset = 0;
        let blocks = spaces
            .into_iter()
            .map(|(column, space)| {
                let block = FeatureBlock {
                    column,
                    offset,
                    space,
                };
                offset += block.space.len();
                block
            })
            .collect::<Vec<_>>();
        debug!(num_blocks = blocks.len(), dimension = offset, "Feature space laid out");
        Self {
            strategy,
            blocks,
            idf,
            dimension: offset,
        }
    }
}

/// Serialised form of [`FittedSpace`]: blocks without offsets.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct FittedSpaceData {
    strategy: MultiColumnStrategy,
    blocks: Vec<BlockData>,
    idf: Option<Vec<f64>>,
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct BlockData {
    column: Option<String>,
    space: FeatureSpace,
}

#[cfg(feature = "serde")]
impl From<FittedSpace> for FittedSpaceData {
    fn from(fitted: FittedSpace) -> Self {
        Self {
            strategy: fitted.strategy,
            blocks: fitted
                .blocks
                .into_iter()
                .map(|block| BlockData {
                    column: block.column,
                    space: block.space,
                })
                .collect(),
            idf: fitted.idf,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<FittedSpaceData> for FittedSpace {
    type Error = FeaturizerError;

    fn try_from(data: FittedSpaceData) -> Result<Self> {
        let shape_ok = match data.strategy {
            MultiColumnStrategy::Shared => {
                data.blocks.len() == 1 && data.blocks[0].column.is_none()
            }
            MultiColumnStrategy::Independent => {
                !data.blocks.is_empty() && data.blocks.iter().all(|b| b.column.is_some())
            }
        };
        if !shape_ok {
            return Err(FeaturizerError::configuration(format!(
                "feature space blocks do not fit the {:?} column strategy",
                data.strategy
            )));
        }
        let spaces = data
            .blocks
            .into_iter()
            .map(|block| (block.column, block.space))
            .collect();
        let fitted = Self::from_spaces(data.strategy, spaces, data.idf);
        if let Some(idf) = &fitted.idf {
            if idf.len() != fitted.dimension {
                return Err(FeaturizerError::configuration(format!(
                    "idf table has {} entries for a {}-slot feature space",
                    idf.len(),
                    fitted.dimension
                )));
            }
            if idf.iter().any(|w| !w.is_finite()) {
                return Err(FeaturizerError::configuration(
                    "idf table contains a non-finite weight",
                ));
            }
        }
        Ok(fitted)
    }
}

fn block_index(strategy: MultiColumnStrategy, column: usize) -> usize {
    match strategy {
        MultiColumnStrategy::Shared => 0,
        MultiColumnStrategy::Independent => column,
    }
}

/// Column label of each block: one unnamed shared block, or one per column.
fn block_columns(params: &FeaturizerParams) -> Vec<Option<String>> {
    match params.multi_column() {
        MultiColumnStrategy::Shared => vec![None],
        MultiColumnStrategy::Independent => params.columns().iter().cloned().map(Some).collect(),
    }
}

/// `ln((n + 1) / (df + 1)) + 1`, so unseen slots still get a finite weight.
fn smoothed_idf(num_documents: usize, document_frequencies: &[u64]) -> Vec<f64> {
    let n = num_documents as f64;
    document_frequencies
        .iter()
        .map(|&df| ((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0)
        .collect()
}
