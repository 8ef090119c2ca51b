//! # text-featurizer
//!
//! Turns one or more raw text columns into fixed-length numeric vectors of
//! word n-gram and char-gram counts.
//!
//! Grams map to vector slots either through a vocabulary learned from a
//! corpus (dictionary mode) or through a seeded hash (hashing mode). Counts
//! can be weighted (binary, term frequency, TF-IDF) and normalised.
//!
//! ```
//! use text_featurizer::{Document, FeatureMode, Featurizer, FeaturizerParams};
//!
//! let params = FeaturizerParams::new()
//!     .with_mode(FeatureMode::Hashing)
//!     .with_hash_table_size(1 << 10)
//!     .with_ngram_range(1, 2)
//!     .with_chargram_range(3, 3);
//! let featurizer = Featurizer::new(params)?;
//!
//! let vector = featurizer.transform(&Document::single("hashing needs no fit"))?;
//! assert_eq!(vector.len(), 1 << 10);
//! # Ok::<(), text_featurizer::FeaturizerError>(())
//! ```

mod cancel;
mod error;
pub mod featurizer;

pub use cancel::CancellationToken;
pub use error::{FeaturizerError, Result};
pub use featurizer::{
    Document, FeatureMode, FeatureSpace, FeatureVector, Featurizer, FeaturizerParams,
    FeaturizerState, FittedSpace, FrequencyMeasure, Gram, HashSeed, MultiColumnStrategy, VectorNorm,
    Weighting,
};
