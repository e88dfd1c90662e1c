//! Metric (analyzer) plugin interface, registry, and built-in metrics.
//!
//! An analyzer rates how similar a comparison image is to an original. The
//! core assumes nothing about scale beyond a consistent direction per
//! metric, expressed by [`Polarity`].

use crate::pixel::PixelImage;
use crate::result::{CotejarError, CotejarResult};
use std::collections::BTreeMap;

/// Which end of an analyzer's scale means "more similar"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Larger scores mean more similar (PSNR, SSIM)
    HigherIsSimilar,
    /// Smaller scores mean more similar (MSE and other distances)
    LowerIsSimilar,
}

/// One-method capability: rate the similarity of an image pair.
pub trait Analyzer: Send + Sync {
    /// Score `comparison` against `original`.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::IncompatibleInput`] when dimensions differ.
    fn rate(&self, original: &PixelImage, comparison: &PixelImage) -> CotejarResult<f64>;

    /// Direction of this analyzer's scale
    fn polarity(&self) -> Polarity;
}

/// Registry of named analyzers
pub struct MetricRegistry {
    entries: BTreeMap<String, Box<dyn Analyzer>>,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl MetricRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry populated with the built-in metrics
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("mse", Box::new(MseMetric));
        registry.register("psnr", Box::new(PsnrMetric::default()));
        registry.register("ssim", Box::new(SsimMetric::default()));
        registry
    }

    /// Register (or replace) an analyzer under a name
    pub fn register(&mut self, name: impl Into<String>, analyzer: Box<dyn Analyzer>) {
        self.entries.insert(name.into(), analyzer);
    }

    /// Look up an analyzer by name.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::NotFound`] for an unregistered name.
    pub fn lookup(&self, name: &str) -> CotejarResult<&dyn Analyzer> {
        self.entries
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| CotejarError::not_found("metric", name))
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Mean squared error over all channels. 0 means identical.
#[derive(Debug, Clone, Copy)]
pub struct MseMetric;

/// MSE shared by the PSNR analyzer
fn mean_squared_error(original: &PixelImage, comparison: &PixelImage) -> f64 {
    let sum: f64 = original
        .pixels()
        .iter()
        .zip(comparison.pixels())
        .map(|(a, b)| {
            let dr = f64::from(a.r) - f64::from(b.r);
            let dg = f64::from(a.g) - f64::from(b.g);
            let db = f64::from(a.b) - f64::from(b.b);
            dr * dr + dg * dg + db * db
        })
        .sum();
    sum / (original.pixels().len() as f64 * 3.0)
}

impl Analyzer for MseMetric {
    fn rate(&self, original: &PixelImage, comparison: &PixelImage) -> CotejarResult<f64> {
        original.check_same_dimensions(comparison)?;
        Ok(mean_squared_error(original, comparison))
    }

    fn polarity(&self) -> Polarity {
        Polarity::LowerIsSimilar
    }
}

/// Peak signal-to-noise ratio in dB against a 255 dynamic range.
///
/// Identical images formally rate infinite; the analyzer caps the score at
/// `ceiling_db` so registered metrics always return finite values.
#[derive(Debug, Clone, Copy)]
pub struct PsnrMetric {
    /// Maximum pixel value (255 for 8-bit images)
    pub max_value: f64,
    /// Finite score reported for an identical pair
    pub ceiling_db: f64,
}

impl Default for PsnrMetric {
    fn default() -> Self {
        Self {
            max_value: 255.0,
            ceiling_db: 1000.0,
        }
    }
}

impl Analyzer for PsnrMetric {
    fn rate(&self, original: &PixelImage, comparison: &PixelImage) -> CotejarResult<f64> {
        original.check_same_dimensions(comparison)?;
        let mse = mean_squared_error(original, comparison);
        if mse <= f64::EPSILON {
            return Ok(self.ceiling_db);
        }
        let psnr = 10.0 * (self.max_value * self.max_value / mse).log10();
        Ok(psnr.min(self.ceiling_db))
    }

    fn polarity(&self) -> Polarity {
        Polarity::HigherIsSimilar
    }
}

/// Structural similarity (global statistics, per-channel averaged).
///
/// Constants k1 = 0.01, k2 = 0.03 over a 255 dynamic range, as in Wang et
/// al. (2004). Score range is [-1, 1], 1 for identical images.
#[derive(Debug, Clone, Copy)]
pub struct SsimMetric {
    /// Luminance stabilizer weight
    pub k1: f64,
    /// Contrast stabilizer weight
    pub k2: f64,
    /// Dynamic range of the pixel values
    pub dynamic_range: f64,
}

impl Default for SsimMetric {
    fn default() -> Self {
        Self {
            k1: 0.01,
            k2: 0.03,
            dynamic_range: 255.0,
        }
    }
}

impl SsimMetric {
    fn channel_ssim(&self, reference: &[f64], generated: &[f64]) -> f64 {
        let c1 = (self.k1 * self.dynamic_range).powi(2);
        let c2 = (self.k2 * self.dynamic_range).powi(2);
        let n = reference.len() as f64;

        let mean_ref: f64 = reference.iter().sum::<f64>() / n;
        let mean_gen: f64 = generated.iter().sum::<f64>() / n;

        let var_ref: f64 = reference.iter().map(|&x| (x - mean_ref).powi(2)).sum::<f64>() / n;
        let var_gen: f64 = generated.iter().map(|&x| (x - mean_gen).powi(2)).sum::<f64>() / n;
        let covar: f64 = reference
            .iter()
            .zip(generated)
            .map(|(&r, &g)| (r - mean_ref) * (g - mean_gen))
            .sum::<f64>()
            / n;

        let numerator = (2.0 * mean_ref * mean_gen + c1) * (2.0 * covar + c2);
        let denominator =
            (mean_ref.powi(2) + mean_gen.powi(2) + c1) * (var_ref + var_gen + c2);

        if denominator > 0.0 {
            numerator / denominator
        } else {
            1.0
        }
    }
}

impl Analyzer for SsimMetric {
    fn rate(&self, original: &PixelImage, comparison: &PixelImage) -> CotejarResult<f64> {
        original.check_same_dimensions(comparison)?;

        let extract = |f: fn(&crate::pixel::Rgb) -> u8, img: &PixelImage| -> Vec<f64> {
            img.pixels().iter().map(|p| f64::from(f(p))).collect()
        };
        let r = self.channel_ssim(
            &extract(|p| p.r, original),
            &extract(|p| p.r, comparison),
        );
        let g = self.channel_ssim(
            &extract(|p| p.g, original),
            &extract(|p| p.g, comparison),
        );
        let b = self.channel_ssim(
            &extract(|p| p.b, original),
            &extract(|p| p.b, comparison),
        );
        Ok((r + g + b) / 3.0)
    }

    fn polarity(&self) -> Polarity {
        Polarity::HigherIsSimilar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Rgb;

    fn gray(value: u8) -> PixelImage {
        PixelImage::filled(8, 8, Rgb::new(value, value, value))
    }

    #[test]
    fn test_registry_lookup_hit_and_miss() {
        let registry = MetricRegistry::with_builtins();
        assert!(registry.lookup("mse").is_ok());
        assert!(registry.lookup("psnr").is_ok());
        assert!(registry.lookup("ssim").is_ok());
        assert!(matches!(
            registry.lookup("cw_ssim"),
            Err(CotejarError::NotFound { .. })
        ));
    }

    #[test]
    fn test_mse_self_similarity_is_zero() {
        let img = gray(128);
        let score = MseMetric.rate(&img, &img).unwrap();
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_mse_known_value() {
        let a = gray(100);
        let b = gray(110);
        // every channel differs by 10 -> mse = 100
        let score = MseMetric.rate(&a, &b).unwrap();
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_mse_dimension_mismatch() {
        let a = gray(100);
        let b = PixelImage::filled(4, 4, Rgb::default());
        assert!(matches!(
            MseMetric.rate(&a, &b).unwrap_err(),
            CotejarError::IncompatibleInput { .. }
        ));
    }

    #[test]
    fn test_psnr_identical_hits_ceiling() {
        let img = gray(128);
        let psnr = PsnrMetric::default();
        let score = psnr.rate(&img, &img).unwrap();
        assert!((score - psnr.ceiling_db).abs() < f64::EPSILON);
        assert!(score.is_finite());
    }

    #[test]
    fn test_psnr_known_value() {
        let a = gray(100);
        let b = gray(110);
        // mse = 100 -> psnr = 10 * log10(255^2 / 100) ~= 28.13 dB
        let score = PsnrMetric::default().rate(&a, &b).unwrap();
        assert!((score - 28.130_803_609).abs() < 1e-6);
    }

    #[test]
    fn test_psnr_more_distortion_scores_lower() {
        let original = gray(100);
        let near = gray(102);
        let far = gray(160);
        let psnr = PsnrMetric::default();
        assert!(psnr.rate(&original, &near).unwrap() > psnr.rate(&original, &far).unwrap());
    }

    #[test]
    fn test_ssim_identical_is_one() {
        let mut img = gray(128);
        img.put(0, 0, Rgb::new(30, 60, 90));
        img.put(3, 5, Rgb::new(210, 10, 80));
        let score = SsimMetric::default().rate(&img, &img).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ssim_opposite_images_score_low() {
        let white = gray(255);
        let black = gray(0);
        let score = SsimMetric::default().rate(&white, &black).unwrap();
        assert!(score < 0.5);
    }

    #[test]
    fn test_polarities() {
        assert_eq!(MseMetric.polarity(), Polarity::LowerIsSimilar);
        assert_eq!(PsnrMetric::default().polarity(), Polarity::HigherIsSimilar);
        assert_eq!(SsimMetric::default().polarity(), Polarity::HigherIsSimilar);
    }
}
