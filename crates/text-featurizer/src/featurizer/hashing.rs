use xxhash_rust::xxh64::Xxh64;

use super::{ngrams::Gram, params::HashSeed};
#[cfg(feature = "serde")]
use crate::error::{FeaturizerError, Result};

const WORD_TAG: u8 = 1;
const CHAR_TAG: u8 = 2;

/// Hashing-trick feature space: `slot = xxh64(gram, seed) mod table_size`.
///
/// Grams are hashed through a fixed byte encoding (kind tag, then every part
/// as a little-endian `u64` length followed by its UTF-8 bytes), so slots do
/// not depend on the platform, the build, or the crate versions in use.
///
/// The seed is resolved once at construction, so a `HashSeed::Random`
/// space still maps a gram to the same slot for its whole lifetime.
/// Colliding grams share a slot and add up there.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawHashedSpace"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashedSpace {
    table_size: usize,
    seed: u64,
}

impl HashedSpace {
    /// `table_size` must be positive; `FeaturizerParams::validate` checks it
    /// before any space is built.
    #[must_use]
    pub fn new(table_size: usize, seed: HashSeed) -> Self {
        let seed = match seed {
            HashSeed::Fixed(seed) => seed,
            HashSeed::Random => ahash::RandomState::new().hash_one(table_size),
        };
        Self { table_size, seed }
    }

    #[must_use]
    pub fn slot_for(&self, gram: &Gram) -> usize {
        (hash_gram(gram, self.seed) % self.table_size as u64) as usize
    }

    #[must_use]
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn hash_gram(gram: &Gram, seed: u64) -> u64 {
    let mut hasher = Xxh64::new(seed);
    match gram {
        Gram::Word(tokens) => {
            hasher.update(&[WORD_TAG]);
            for token in tokens {
                hash_part(&mut hasher, token);
            }
        }
        Gram::Char(chars) => {
            hasher.update(&[CHAR_TAG]);
            hash_part(&mut hasher, chars);
        }
    }
    hasher.digest()
}

fn hash_part(hasher: &mut Xxh64, text: &str) {
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawHashedSpace {
    table_size: usize,
    seed: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawHashedSpace> for HashedSpace {
    type Error = FeaturizerError;

    fn try_from(raw: RawHashedSpace) -> Result<Self> {
        if raw.table_size == 0 {
            return Err(FeaturizerError::configuration(
                "hashed feature space has a table size of zero",
            ));
        }
        Ok(Self {
            table_size: raw.table_size,
            seed: raw.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_in_range() {
        let space = HashedSpace::new(16, HashSeed::Fixed(7));
        for word in ["the", "cat", "sat", "on", "a", "mat", "with", "hat"] {
            assert!(space.slot_for(&Gram::word([word])) < 16);
            assert!(space.slot_for(&Gram::char(word)) < 16);
        }
    }

    #[test]
    fn test_slots_are_pinned() {
        let default_space = HashedSpace::new(1 << 16, HashSeed::default());
        assert_eq!(default_space.slot_for(&Gram::word(["the"])), 52336);
        assert_eq!(default_space.slot_for(&Gram::word(["the", "cat"])), 41976);
        assert_eq!(default_space.slot_for(&Gram::char("cat")), 65128);

        let small = HashedSpace::new(1000, HashSeed::Fixed(7));
        assert_eq!(small.slot_for(&Gram::word(["the"])), 727);
        assert_eq!(small.slot_for(&Gram::word(["the", "cat"])), 61);
        assert_eq!(small.slot_for(&Gram::char("cat")), 878);
        assert_eq!(small.slot_for(&Gram::word(["a_b"])), 177);
        assert_eq!(small.slot_for(&Gram::word(["a", "b"])), 908);
    }

    #[test]
    fn test_same_seed_same_slots() {
        let a = HashedSpace::new(1024, HashSeed::Fixed(42));
        let b = HashedSpace::new(1024, HashSeed::Fixed(42));
        for word in ["alpha", "beta", "gamma", "delta"] {
            let gram = Gram::word([word, "x"]);
            assert_eq!(a.slot_for(&gram), b.slot_for(&gram));
        }
    }

    #[test]
    fn test_random_seed_is_stable_per_instance() {
        let space = HashedSpace::new(1 << 20, HashSeed::Random);
        let gram = Gram::word(["stable"]);
        assert_eq!(space.slot_for(&gram), space.slot_for(&gram));
        let copy = space.clone();
        assert_eq!(copy.slot_for(&gram), space.slot_for(&gram));
    }

    #[test]
    fn test_collisions_happen_in_small_tables() {
        let space = HashedSpace::new(16, HashSeed::default());
        let mut seen = std::collections::HashMap::new();
        let collision = (0..100)
            .map(|i| Gram::word([format!("w{i}")]))
            .find_map(|gram| {
                let slot = space.slot_for(&gram);
                seen.insert(slot, gram.clone()).map(|other| (other, gram))
            });
        assert!(collision.is_some(), "17+ grams in 16 slots must collide");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_zero_table_rejected_on_load() {
        let result = serde_json::from_str::<HashedSpace>(r#"{"table_size":0,"seed":1}"#);
        assert!(result.is_err());
        let space: HashedSpace = serde_json::from_str(r#"{"table_size":8,"seed":1}"#)
            .expect("deserialize should succeed");
        assert_eq!(space.table_size(), 8);
    }
}
