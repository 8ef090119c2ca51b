use sprs::CsMat;
use tracing::debug;

use super::{
    document::Document,
    ngrams::GramExtractor,
    params::{VectorNorm, Weighting},
    space::FittedSpace,
    tokenizer::Tokenizer,
};

/// Fixed-length feature values for one document. Its length always equals
/// the dimension of the space it was assembled against.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    #[must_use]
    pub fn zeros(dimension: usize) -> Self {
        Self {
            values: vec![0.0; dimension],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> Option<f64> {
        self.values.get(slot).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }

    /// `(slot, value)` pairs for non-zero slots, in slot order.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, value)| *value != 0.0)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|value| *value == 0.0)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(vector: FeatureVector) -> Self {
        vector.values
    }
}

/// Everything needed to turn a document into a vector. Borrowed from a
/// fitted `Featurizer`; holds no mutable state, so one assembler can serve
/// many threads.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VectorAssembler<'a> {
    pub(crate) tokenizer: &'a Tokenizer,
    pub(crate) extractor: &'a GramExtractor,
    pub(crate) space: &'a FittedSpace,
    pub(crate) weighting: Weighting,
    pub(crate) normalization: VectorNorm,
}

impl VectorAssembler<'_> {
    /// Count grams into their slots, then weight and normalise. The caller
    /// has already checked the document's column count.
    pub(crate) fn assemble(&self, document: &Document<'_>) -> FeatureVector {
        let space = self.space;
        let mut values = vec![0.0; space.dimension()];
        let mut grams_per_block = vec![0usize; space.blocks().len()];

        for (column, field) in document.fields().iter().enumerate() {
            let Some(text) = field else { continue };
            let block_index = space.block_index(column);
            let block = &space.blocks()[block_index];
            grams_per_block[block_index] += self.extractor.extract(self.tokenizer, text, |gram| {
                if let Some(slot) = block.space().slot_for(&gram) {
                    values[block.offset() + slot] += 1.0;
                }
            });
        }

        self.apply_weighting(&mut values, &grams_per_block);
        normalize(&mut values, self.normalization);
        FeatureVector { values }
    }

    fn apply_weighting(&self, values: &mut [f64], grams_per_block: &[usize]) {
        match self.weighting {
            Weighting::Count => {}
            Weighting::Binary => {
                for value in values.iter_mut().filter(|v| **v > 0.0) {
                    *value = 1.0;
                }
            }
            Weighting::Tf => {
                for (block, &total) in self.space.blocks().iter().zip(grams_per_block) {
                    if total == 0 {
                        continue;
                    }
                    for value in &mut values[block.range()] {
                        *value /= total as f64;
                    }
                }
            }
            Weighting::TfIdf => {
                if let Some(idf) = self.space.idf() {
                    for (value, weight) in values.iter_mut().zip(idf) {
                        *value *= weight;
                    }
                }
            }
        }
    }
}

/// Scale `values` in place. All-zero input is left untouched.
pub(crate) fn normalize(values: &mut [f64], norm: VectorNorm) {
    let scale = match norm {
        VectorNorm::None => return,
        VectorNorm::L1 => values.iter().map(|v| v.abs()).sum::<f64>(),
        VectorNorm::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
        VectorNorm::LInf => values.iter().fold(0.0f64, |max, v| max.max(v.abs())),
    };
    if scale > 0.0 {
        for value in values {
            *value /= scale;
        }
    }
}

/// Stack vectors into a CSR matrix with one row per vector.
pub(crate) fn to_csr(vectors: &[FeatureVector], dimension: usize) -> CsMat<f64> {
    let mut indptr = Vec::with_capacity(vectors.len() + 1);
    let mut indices = Vec::new();
    let mut data = Vec::new();

    indptr.push(0);
    for vector in vectors {
        for (slot, value) in vector.nonzero() {
            indices.push(slot);
            data.push(value);
        }
        indptr.push(indices.len());
    }

    debug!(
        num_rows = vectors.len(),
        non_zero_entries = data.len(),
        "Sparse matrix assembled"
    );
    CsMat::new((vectors.len(), dimension), indptr, indices, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_l1_l2_linf() {
        let mut l1 = vec![1.0, -3.0, 0.0];
        normalize(&mut l1, VectorNorm::L1);
        assert_eq!(l1, vec![0.25, -0.75, 0.0]);

        let mut l2 = vec![3.0, 4.0];
        normalize(&mut l2, VectorNorm::L2);
        assert_eq!(l2, vec![0.6, 0.8]);

        let mut linf = vec![2.0, -4.0];
        normalize(&mut linf, VectorNorm::LInf);
        assert_eq!(linf, vec![0.5, -1.0]);
    }

    #[test]
    fn test_normalize_zero_vector_stays_zero() {
        let mut zeros = vec![0.0; 4];
        normalize(&mut zeros, VectorNorm::L2);
        assert_eq!(zeros, vec![0.0; 4]);
    }

    #[test]
    fn test_nonzero_and_csr() {
        let vectors = vec![
            FeatureVector {
                values: vec![0.0, 2.0, 0.0],
            },
            FeatureVector::zeros(3),
            FeatureVector {
                values: vec![1.0, 0.0, 5.0],
            },
        ];
        assert_eq!(vectors[0].nonzero().collect::<Vec<_>>(), vec![(1, 2.0)]);
        assert!(vectors[1].is_zero());

        let csr = to_csr(&vectors, 3);
        assert_eq!(csr.rows(), 3);
        assert_eq!(csr.cols(), 3);
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.get(2, 2), Some(&5.0));
        assert_eq!(csr.get(1, 0), None);
    }
}
