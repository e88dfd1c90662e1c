//! Sequencer: turn per-level scores into a total order, and manage the
//! symbol obfuscation used for blind human trials.

use crate::level::{Level, PairKey};
use crate::metric::{Analyzer, Polarity};
use crate::pixel::PixelImage;
use crate::result::{CotejarError, CotejarResult};
use crate::rng::Xorshift64;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Mutex;

/// Lowercase alphabet used for symbol sequences
const ALPHABET: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Sort levels into a total order by score.
///
/// `ascending = true` puts the smallest score first (distance metrics);
/// `false` puts the largest first (similarity metrics). Ties are broken by
/// level number ascending, so the ordering is deterministic.
#[must_use]
pub fn order_by_score(scores: &BTreeMap<Level, f64>, ascending: bool) -> Vec<Level> {
    // BTreeMap iteration is level-ascending; the stable sort preserves that
    // order among equal scores, which is exactly the tie-break rule.
    let mut levels: Vec<(Level, f64)> = scores.iter().map(|(&l, &s)| (l, s)).collect();
    levels.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    levels.into_iter().map(|(l, _)| l).collect()
}

/// Most-to-least-similar ordering for an analyzer's polarity
#[must_use]
pub fn order_for_polarity(scores: &BTreeMap<Level, f64>, polarity: Polarity) -> Vec<Level> {
    order_by_score(scores, polarity == Polarity::LowerIsSimilar)
}

/// Rate every level image against the baseline.
///
/// # Errors
///
/// Propagates analyzer failures, and surfaces a non-finite score as
/// [`CotejarError::InvalidScore`] naming the metric — a plugin returning
/// NaN or infinity is a contract violation, never passed through silently.
pub fn score_levels(
    analyzer: &dyn Analyzer,
    metric_name: &str,
    baseline: &PixelImage,
    level_images: &BTreeMap<Level, PixelImage>,
) -> CotejarResult<BTreeMap<Level, f64>> {
    let mut scores = BTreeMap::new();
    for (&level, image) in level_images {
        let score = analyzer.rate(baseline, image)?;
        if !score.is_finite() {
            return Err(CotejarError::InvalidScore {
                metric: metric_name.to_string(),
                value: score.to_string(),
                level: level.value(),
            });
        }
        scores.insert(level, score);
    }
    Ok(scores)
}

/// One key's symbol assignment: `symbols[i]` denotes `levels[i]`, both
/// ordered most-to-least similar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    /// Opaque symbols shown to human raters
    pub symbols: Vec<char>,
    /// The true level behind each symbol position
    pub levels: Vec<Level>,
}

/// The symbol map: per-pair obfuscation sequences for blind human trials.
///
/// Encoding is idempotent per key, and the interior mutex makes concurrent
/// encodes of the same key read-modify-write atomic. Load at start,
/// persist at end; tests inject isolated instances.
#[derive(Debug, Default)]
pub struct SymbolStore {
    entries: Mutex<HashMap<String, SymbolEntry>>,
}

impl SymbolStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a canonical order for a pair, generating the symbol sequence
    /// on first use and returning the stored one unchanged afterwards.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::SymbolCapacity`] when the order is longer
    /// than the alphabet.
    pub fn encode(&self, key: &PairKey, canonical_order: &[Level]) -> CotejarResult<Vec<char>> {
        if canonical_order.len() > ALPHABET.len() {
            return Err(CotejarError::SymbolCapacity {
                needed: canonical_order.len(),
                available: ALPHABET.len(),
            });
        }
        let name = key.to_string();
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(entry) = entries.get(&name) {
            return Ok(entry.symbols.clone());
        }
        let symbols = draw_symbols(&name, canonical_order.len());
        entries.insert(
            name,
            SymbolEntry {
                symbols: symbols.clone(),
                levels: canonical_order.to_vec(),
            },
        );
        Ok(symbols)
    }

    /// Decode a human-sorted symbol sequence back into levels.
    ///
    /// # Errors
    ///
    /// [`CotejarError::UnknownKey`] when the pair was never encoded,
    /// [`CotejarError::UnknownSymbol`] for a symbol outside its sequence.
    pub fn decode(&self, key: &PairKey, symbol_sequence: &[char]) -> CotejarResult<Vec<Level>> {
        let name = key.to_string();
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = entries.get(&name).ok_or_else(|| CotejarError::UnknownKey {
            key: name.clone(),
        })?;
        symbol_sequence
            .iter()
            .map(|&symbol| {
                entry
                    .symbols
                    .iter()
                    .position(|&s| s == symbol)
                    .map(|i| entry.levels[i])
                    .ok_or(CotejarError::UnknownSymbol {
                        key: name.clone(),
                        symbol,
                    })
            })
            .collect()
    }

    /// Whether a key has an entry
    #[must_use]
    pub fn contains(&self, key: &PairKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(&key.to_string())
    }

    /// Serialize the store to pretty JSON
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json(&self) -> CotejarResult<String> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let ordered: BTreeMap<&String, &SymbolEntry> = entries.iter().collect();
        Ok(serde_json::to_string_pretty(&ordered)?)
    }

    /// Deserialize a store from JSON
    ///
    /// # Errors
    ///
    /// Propagates parse failures.
    pub fn from_json(json: &str) -> CotejarResult<Self> {
        let entries: HashMap<String, SymbolEntry> = serde_json::from_str(json)?;
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Load a store from a JSON file, or an empty store when the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Propagates I/O and parse failures other than a missing file.
    pub fn load(path: &Path) -> CotejarResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Persist the store to a JSON file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Propagates I/O and serialization failures.
    pub fn save(&self, path: &Path) -> CotejarResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Draw `n` distinct symbols by a per-key seeded shuffle of the alphabet.
fn draw_symbols(key_name: &str, n: usize) -> Vec<char> {
    let mut hasher = DefaultHasher::new();
    key_name.hash(&mut hasher);
    let mut rng = Xorshift64::new(hasher.finish());
    let mut letters = ALPHABET;
    rng.shuffle(&mut letters);
    letters[..n].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::standard_order;
    use crate::metric::MseMetric;
    use crate::pixel::Rgb;

    fn scores(pairs: &[(u32, f64)]) -> BTreeMap<Level, f64> {
        pairs
            .iter()
            .map(|&(l, s)| (Level::new(l).unwrap(), s))
            .collect()
    }

    #[test]
    fn test_order_ascending() {
        let s = scores(&[(0, 0.0), (1, 5.0), (2, 2.5)]);
        let order = order_by_score(&s, true);
        let values: Vec<u8> = order.iter().map(|l| l.value()).collect();
        assert_eq!(values, vec![0, 2, 1]);
    }

    #[test]
    fn test_order_descending() {
        let s = scores(&[(0, 1.0), (1, 0.9), (2, 0.3)]);
        let order = order_by_score(&s, false);
        let values: Vec<u8> = order.iter().map(|l| l.value()).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn test_monotone_scores_reproduce_identity_order() {
        let s: BTreeMap<Level, f64> = Level::full_range()
            .map(|l| (l, f64::from(l.value()) * 3.0))
            .collect();
        let order = order_by_score(&s, true);
        assert_eq!(order, standard_order(11));
    }

    #[test]
    fn test_ties_break_by_level_ascending() {
        let s = scores(&[(0, 1.0), (1, 1.0), (2, 0.5), (3, 1.0)]);
        let order = order_by_score(&s, true);
        let values: Vec<u8> = order.iter().map(|l| l.value()).collect();
        assert_eq!(values, vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_ordering_is_idempotent() {
        let s = scores(&[(0, 2.0), (1, 2.0), (2, 2.0), (3, 1.0)]);
        assert_eq!(order_by_score(&s, true), order_by_score(&s, true));
    }

    #[test]
    fn test_order_for_polarity() {
        let s = scores(&[(0, 0.0), (1, 9.0)]);
        let distance = order_for_polarity(&s, Polarity::LowerIsSimilar);
        assert_eq!(distance[0].value(), 0);
        let similarity = order_for_polarity(&s, Polarity::HigherIsSimilar);
        assert_eq!(similarity[0].value(), 1);
    }

    #[test]
    fn test_score_levels_with_builtin_metric() {
        let baseline = PixelImage::filled(4, 4, Rgb::new(100, 100, 100));
        let mut level_images = BTreeMap::new();
        level_images.insert(Level::new(0).unwrap(), baseline.clone());
        level_images.insert(
            Level::new(1).unwrap(),
            PixelImage::filled(4, 4, Rgb::new(110, 110, 110)),
        );
        let scores = score_levels(&MseMetric, "mse", &baseline, &level_images).unwrap();
        assert!(scores[&Level::new(0).unwrap()].abs() < f64::EPSILON);
        assert!((scores[&Level::new(1).unwrap()] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_levels_rejects_non_finite() {
        struct NanMetric;
        impl Analyzer for NanMetric {
            fn rate(&self, _: &PixelImage, _: &PixelImage) -> CotejarResult<f64> {
                Ok(f64::NAN)
            }
            fn polarity(&self) -> Polarity {
                Polarity::LowerIsSimilar
            }
        }
        let baseline = PixelImage::filled(2, 2, Rgb::default());
        let mut level_images = BTreeMap::new();
        level_images.insert(Level::new(3).unwrap(), baseline.clone());
        let err = score_levels(&NanMetric, "nan", &baseline, &level_images).unwrap_err();
        match err {
            CotejarError::InvalidScore { metric, level, .. } => {
                assert_eq!(metric, "nan");
                assert_eq!(level, 3);
            }
            other => panic!("expected InvalidScore, got {other}"),
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let store = SymbolStore::new();
        let key = PairKey::new("cat", "noise");
        let order = standard_order(11);
        let symbols = store.encode(&key, &order).unwrap();
        assert_eq!(symbols.len(), 11);
        let decoded = store.decode(&key, &symbols).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn test_encode_is_idempotent() {
        let store = SymbolStore::new();
        let key = PairKey::new("cat", "zoom");
        let order = standard_order(10);
        let first = store.encode(&key, &order).unwrap();
        let second = store.encode(&key, &order).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_encode_symbols_distinct() {
        let store = SymbolStore::new();
        let key = PairKey::new("cat", "hue");
        let symbols = store.encode(&key, &standard_order(11)).unwrap();
        let mut unique = symbols.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), symbols.len());
    }

    #[test]
    fn test_different_keys_get_independent_sequences() {
        let store = SymbolStore::new();
        let a = store
            .encode(&PairKey::new("cat_a", "noise"), &standard_order(11))
            .unwrap();
        let b = store
            .encode(&PairKey::new("cat_b", "noise"), &standard_order(11))
            .unwrap();
        // Sequences are drawn from independent per-key seeds; equality of
        // two 11-of-26 shuffles would be a 1-in-billions accident.
        assert_ne!(a, b);
    }

    #[test]
    fn test_decode_unknown_key() {
        let store = SymbolStore::new();
        let err = store
            .decode(&PairKey::new("ghost", "noise"), &['a'])
            .unwrap_err();
        assert!(matches!(err, CotejarError::UnknownKey { .. }));
    }

    #[test]
    fn test_decode_unknown_symbol() {
        let store = SymbolStore::new();
        let key = PairKey::new("cat", "noise");
        let mut symbols = store.encode(&key, &standard_order(11)).unwrap();
        // pick a letter that is not in the 11-symbol sequence
        let outsider = ALPHABET
            .iter()
            .copied()
            .find(|c| !symbols.contains(c))
            .unwrap();
        symbols[0] = outsider;
        let err = store.decode(&key, &symbols).unwrap_err();
        assert!(matches!(err, CotejarError::UnknownSymbol { .. }));
    }

    #[test]
    fn test_symbol_capacity() {
        let store = SymbolStore::new();
        let too_long: Vec<Level> = std::iter::repeat(Level::baseline()).take(27).collect();
        let err = store
            .encode(&PairKey::new("cat", "noise"), &too_long)
            .unwrap_err();
        assert!(matches!(err, CotejarError::SymbolCapacity { .. }));
    }

    #[test]
    fn test_json_roundtrip_preserves_decode() {
        let store = SymbolStore::new();
        let key = PairKey::new("cat", "noise");
        let order = standard_order(11);
        let symbols = store.encode(&key, &order).unwrap();

        let restored = SymbolStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(restored.decode(&key, &symbols).unwrap(), order);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SymbolStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(!store.contains(&PairKey::new("cat", "noise")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("sequence_map.json");
        let store = SymbolStore::new();
        let key = PairKey::new("cat", "noise");
        let symbols = store.encode(&key, &standard_order(11)).unwrap();
        store.save(&path).unwrap();

        let loaded = SymbolStore::load(&path).unwrap();
        assert_eq!(loaded.encode(&key, &standard_order(11)).unwrap(), symbols);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// decode(encode(order)) reconstructs the order for any permutation
        /// of any prefix length.
        #[test]
        fn prop_encode_decode_roundtrip(perm in proptest::sample::subsequence(
            (0u32..=10).collect::<Vec<u32>>(), 2..=11)
        ) {
            let order: Vec<Level> = perm.iter().map(|&v| Level::new(v).unwrap()).collect();
            let store = SymbolStore::new();
            let key = PairKey::new("cat", "noise");
            let symbols = store.encode(&key, &order).unwrap();
            prop_assert_eq!(store.decode(&key, &symbols).unwrap(), order);
        }

        /// Ordering by score twice yields identical output.
        #[test]
        fn prop_order_deterministic(raw in proptest::collection::vec(0.0f64..100.0, 11)) {
            let scores: BTreeMap<Level, f64> = Level::full_range().zip(raw).collect();
            prop_assert_eq!(order_by_score(&scores, true), order_by_score(&scores, true));
        }

        /// The ordering is always a permutation of the scored levels.
        #[test]
        fn prop_order_is_permutation(raw in proptest::collection::vec(0.0f64..100.0, 11)) {
            let scores: BTreeMap<Level, f64> = Level::full_range().zip(raw).collect();
            let mut order = order_by_score(&scores, false);
            order.sort();
            let levels: Vec<Level> = Level::full_range().collect();
            prop_assert_eq!(order, levels);
        }
    }
}
