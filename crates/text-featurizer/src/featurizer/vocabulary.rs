use std::cmp::Ordering;

use ahash::{HashMap, HashMapExt};
use dashmap::DashMap;
use tracing::debug;

use super::{ngrams::Gram, params::FrequencyMeasure};

/// Corpus statistics for one gram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GramStats {
    occurrences: u64,
    documents: u64,
    /// `(document index, emission ordinal)` of the earliest occurrence.
    first_seen: (usize, usize),
}

impl GramStats {
    /// Commutative and associative, so the order in which worker threads
    /// merge their documents does not change the result.
    fn merge(&mut self, other: Self) {
        self.occurrences += other.occurrences;
        self.documents += other.documents;
        self.first_seen = self.first_seen.min(other.first_seen);
    }

    fn frequency(&self, measure: FrequencyMeasure) -> u64 {
        match measure {
            FrequencyMeasure::Corpus => self.occurrences,
            FrequencyMeasure::Document => self.documents,
        }
    }
}

/// Concurrent gram counter for one feature block.
///
/// Each document is tallied locally first, then folded into the shared map.
#[derive(Debug, Default)]
pub(crate) struct VocabularyCounter {
    stats: DashMap<Gram, GramStats, ahash::RandomState>,
}

impl VocabularyCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start tallying one document.
    pub(crate) fn document(&self, doc_index: usize) -> DocumentTally<'_> {
        DocumentTally {
            counter: self,
            doc_index,
            ordinal: 0,
            grams: HashMap::new(),
        }
    }

    fn absorb(&self, doc_index: usize, grams: HashMap<Gram, (u64, usize)>) {
        for (gram, (count, ordinal)) in grams {
            let stats = GramStats {
                occurrences: count,
                documents: 1,
                first_seen: (doc_index, ordinal),
            };
            self.stats
                .entry(gram)
                .and_modify(|existing| existing.merge(stats))
                .or_insert(stats);
        }
    }

    /// Rank, filter and cap the counted grams into a vocabulary.
    ///
    /// Grams seen in fewer than `min_df` documents are dropped; the rest are
    /// ordered by descending frequency, ties broken by first occurrence, and
    /// the first `max_size` get slots. Also returns the document frequency of
    /// every kept slot.
    pub(crate) fn into_vocabulary(
        self,
        max_size: usize,
        min_df: usize,
        measure: FrequencyMeasure,
    ) -> (Vocabulary, Vec<u64>) {
        let counted = self.stats.len();
        let mut ranked = self
            .stats
            .into_iter()
            .filter(|(_, stats)| stats.documents >= min_df as u64)
            .collect::<Vec<_>>();
        debug!(
            counted,
            after_min_df = ranked.len(),
            min_df,
            "Vocabulary candidates filtered by document frequency"
        );

        ranked.sort_unstable_by(|(_, a), (_, b)| rank(a, b, measure));
        ranked.truncate(max_size);

        let mut slots = HashMap::with_capacity(ranked.len());
        let mut grams = Vec::with_capacity(ranked.len());
        let mut document_frequencies = Vec::with_capacity(ranked.len());
        for (slot, (gram, stats)) in ranked.into_iter().enumerate() {
            slots.insert(gram.clone(), slot);
            grams.push(gram);
            document_frequencies.push(stats.documents);
        }
        debug!(vocab_size = grams.len(), max_size, "Vocabulary built");

        (Vocabulary { slots, grams }, document_frequencies)
    }
}

fn rank(a: &GramStats, b: &GramStats, measure: FrequencyMeasure) -> Ordering {
    b.frequency(measure)
        .cmp(&a.frequency(measure))
        .then_with(|| a.first_seen.cmp(&b.first_seen))
}

/// Per-document gram counts, flushed into the shared counter by
/// [`DocumentTally::finish`].
pub(crate) struct DocumentTally<'a> {
    counter: &'a VocabularyCounter,
    doc_index: usize,
    ordinal: usize,
    grams: HashMap<Gram, (u64, usize)>,
}

impl DocumentTally<'_> {
    pub(crate) fn observe(&mut self, gram: Gram) {
        let ordinal = self.ordinal;
        self.ordinal += 1;
        self.grams
            .entry(gram)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, ordinal));
    }

    pub(crate) fn finish(self) {
        self.counter.absorb(self.doc_index, self.grams);
    }
}

/// Finalised gram -> slot mapping for dictionary mode. Immutable once built.
///
/// Serialises as the slot-ordered gram list; the lookup table is rebuilt on load.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Gram>", into = "Vec<Gram>"))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vocabulary {
    slots: HashMap<Gram, usize>,
    grams: Vec<Gram>,
}

impl Vocabulary {
    #[must_use]
    pub fn slot(&self, gram: &Gram) -> Option<usize> {
        self.slots.get(gram).copied()
    }

    #[must_use]
    pub fn gram(&self, slot: usize) -> Option<&Gram> {
        self.grams.get(slot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grams.is_empty()
    }

    /// Grams in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Gram)> {
        self.grams.iter().enumerate()
    }
}

/// Slots follow list order; repeated grams keep their first slot.
impl From<Vec<Gram>> for Vocabulary {
    fn from(list: Vec<Gram>) -> Self {
        let mut slots = HashMap::with_capacity(list.len());
        let mut grams = Vec::with_capacity(list.len());
        for gram in list {
            if !slots.contains_key(&gram) {
                slots.insert(gram.clone(), grams.len());
                grams.push(gram);
            }
        }
        Self { slots, grams }
    }
}

impl From<Vocabulary> for Vec<Gram> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.grams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(docs: &[&[&str]]) -> VocabularyCounter {
        let counter = VocabularyCounter::new();
        for (idx, doc) in docs.iter().enumerate() {
            let mut tally = counter.document(idx);
            for word in *doc {
                tally.observe(Gram::word([*word]));
            }
            tally.finish();
        }
        counter
    }

    fn words(vocab: &Vocabulary) -> Vec<String> {
        vocab.iter().map(|(_, g)| g.to_string()).collect()
    }

    #[test]
    fn test_frequency_then_first_seen() {
        let counter = count(&[&["b", "a", "c"], &["c", "a", "d"]]);
        let (vocab, dfs) = counter.into_vocabulary(10, 1, FrequencyMeasure::Corpus);
        assert_eq!(words(&vocab), vec!["a", "c", "b", "d"]);
        assert_eq!(dfs, vec![2, 2, 1, 1]);
        assert_eq!(vocab.slot(&Gram::word(["b"])), Some(2));
        assert_eq!(vocab.slot(&Gram::word(["zzz"])), None);
    }

    #[test]
    fn test_cap_drops_least_frequent() {
        let counter = count(&[&["x", "y", "y", "z", "z", "z"]]);
        let (vocab, _) = counter.into_vocabulary(2, 1, FrequencyMeasure::Corpus);
        assert_eq!(vocab.len(), 2);
        assert_eq!(words(&vocab), vec!["z", "y"]);
    }

    #[test]
    fn test_document_measure() {
        // "a" occurs often in one document; "b" once in each of two.
        let counter = count(&[&["a", "a", "a", "b"], &["b"]]);
        let (vocab, _) = counter.into_vocabulary(1, 1, FrequencyMeasure::Document);
        assert_eq!(words(&vocab), vec!["b"]);
    }

    #[test]
    fn test_min_df_filter() {
        let counter = count(&[&["a", "b"], &["a"]]);
        let (vocab, _) = counter.into_vocabulary(10, 2, FrequencyMeasure::Corpus);
        assert_eq!(words(&vocab), vec!["a"]);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let forward = count(&[&["p", "q"], &["q", "p"], &["r"]]);
        let counter = VocabularyCounter::new();
        for (idx, doc) in [(2usize, &["r"][..]), (1, &["q", "p"][..]), (0, &["p", "q"][..])] {
            let mut tally = counter.document(idx);
            for word in doc {
                tally.observe(Gram::word([*word]));
            }
            tally.finish();
        }
        let (a, _) = forward.into_vocabulary(10, 1, FrequencyMeasure::Corpus);
        let (b, _) = counter.into_vocabulary(10, 1, FrequencyMeasure::Corpus);
        assert_eq!(a, b);
        assert_eq!(words(&a), vec!["p", "q", "r"]);
    }

    #[test]
    fn test_from_gram_list() {
        let vocab = Vocabulary::from(vec![
            Gram::word(["a"]),
            Gram::char("ab"),
            Gram::word(["a"]),
        ]);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.slot(&Gram::char("ab")), Some(1));
        assert_eq!(Vec::<Gram>::from(vocab.clone()).len(), 2);
    }
}
