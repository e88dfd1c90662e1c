//! Transformation plugin interface, registry, and built-in distortions.
//!
//! A transformation is a pure function family over levels 0..=10 with the
//! contract that level 0 returns the input unchanged and distortion grows
//! with the level. The registry maps names to implementations so callers
//! dispatch by string without dynamic module lookup.

use crate::level::Level;
use crate::pixel::{PixelImage, Rgb};
use crate::result::{CotejarError, CotejarResult};
use crate::rng::Xorshift64;
use std::collections::BTreeMap;

/// One-method capability: apply a distortion at a level.
pub trait Transformer: Send + Sync {
    /// Apply the transformation at `level`. Level 0 must return the image
    /// unchanged, pixel for pixel.
    fn apply(&self, image: &PixelImage, level: Level) -> CotejarResult<PixelImage>;
}

/// Registry of named transformations
pub struct TransformRegistry {
    entries: BTreeMap<String, Box<dyn Transformer>>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry populated with the built-in transformations
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("noise", Box::new(NoiseTransform::default()));
        registry.register("zoom", Box::new(ZoomTransform));
        registry.register("hue", Box::new(HueTransform));
        registry
    }

    /// Register (or replace) a transformation under a name
    pub fn register(&mut self, name: impl Into<String>, transformer: Box<dyn Transformer>) {
        self.entries.insert(name.into(), transformer);
    }

    /// Look up a transformation by name.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::NotFound`] for an unregistered name.
    pub fn lookup(&self, name: &str) -> CotejarResult<&dyn Transformer> {
        self.entries
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| CotejarError::not_found("transformation", name))
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Additive zero-mean Gaussian noise, sigma = level * 8.
///
/// Deterministic: the pixel noise stream is drawn from a xorshift64
/// generator seeded from the configured seed and the level.
#[derive(Debug, Clone)]
pub struct NoiseTransform {
    /// Base seed for the noise stream
    pub seed: u64,
}

impl Default for NoiseTransform {
    fn default() -> Self {
        Self { seed: 0x5eed }
    }
}

impl Transformer for NoiseTransform {
    fn apply(&self, image: &PixelImage, level: Level) -> CotejarResult<PixelImage> {
        if level == Level::baseline() {
            return Ok(image.clone());
        }
        let sigma = f64::from(level.value()) * 8.0;
        let mut rng = Xorshift64::new(self.seed ^ (u64::from(level.value()) << 32));
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            *pixel = Rgb::new(
                perturb(pixel.r, sigma, &mut rng),
                perturb(pixel.g, sigma, &mut rng),
                perturb(pixel.b, sigma, &mut rng),
            );
        }
        Ok(out)
    }
}

fn perturb(channel: u8, sigma: f64, rng: &mut Xorshift64) -> u8 {
    (f64::from(channel) + rng.next_gaussian() * sigma).clamp(0.0, 255.0) as u8
}

/// Center crop by level/25 of each dimension per side, scaled back up with
/// nearest-neighbour resampling.
#[derive(Debug, Clone, Copy)]
pub struct ZoomTransform;

impl Transformer for ZoomTransform {
    fn apply(&self, image: &PixelImage, level: Level) -> CotejarResult<PixelImage> {
        if level == Level::baseline() {
            return Ok(image.clone());
        }
        let (width, height) = image.dimensions();
        let margin_x = u32::from(level.value()) * width / 25;
        let margin_y = u32::from(level.value()) * height / 25;
        let crop_w = (width - 2 * margin_x).max(1);
        let crop_h = (height - 2 * margin_y).max(1);

        let mut out = PixelImage::filled(width, height, Rgb::default());
        for y in 0..height {
            for x in 0..width {
                let src_x = margin_x + x * crop_w / width;
                let src_y = margin_y + y * crop_h / height;
                out.put(x, y, image.get(src_x, src_y));
            }
        }
        Ok(out)
    }
}

/// Hue rotation: the HSV hue channel shifted by level * 18 on the 0..=255
/// wheel (wrapping), saturation and value untouched.
#[derive(Debug, Clone, Copy)]
pub struct HueTransform;

impl Transformer for HueTransform {
    fn apply(&self, image: &PixelImage, level: Level) -> CotejarResult<PixelImage> {
        if level == Level::baseline() {
            return Ok(image.clone());
        }
        let shift = level.value().wrapping_mul(18);
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let (h, s, v) = rgb_to_hsv(*pixel);
            *pixel = hsv_to_rgb(h.wrapping_add(shift), s, v);
        }
        Ok(out)
    }
}

/// RGB to HSV with all channels on the 0..=255 scale (PIL 'HSV' convention)
fn rgb_to_hsv(pixel: Rgb) -> (u8, u8, u8) {
    let r = f64::from(pixel.r) / 255.0;
    let g = f64::from(pixel.g) / 255.0;
    let b = f64::from(pixel.b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta.abs() < f64::EPSILON {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        (60.0 * ((g - b) / delta)).rem_euclid(360.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta) + 120.0
    } else {
        60.0 * ((r - g) / delta) + 240.0
    };
    let saturation = if max.abs() < f64::EPSILON {
        0.0
    } else {
        delta / max
    };

    (
        (hue / 360.0 * 255.0).round() as u8,
        (saturation * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    )
}

/// HSV (0..=255 scale) back to RGB
fn hsv_to_rgb(h: u8, s: u8, v: u8) -> Rgb {
    let hue = f64::from(h) / 255.0 * 360.0;
    let saturation = f64::from(s) / 255.0;
    let value = f64::from(v) / 255.0;

    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb::new(
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> PixelImage {
        let mut img = PixelImage::filled(width, height, Rgb::new(40, 90, 200));
        for y in 0..height {
            for x in 0..width {
                if (x + y) % 2 == 0 {
                    img.put(x, y, Rgb::new(220, 130, 15));
                }
            }
        }
        img
    }

    #[test]
    fn test_registry_lookup_hit_and_miss() {
        let registry = TransformRegistry::with_builtins();
        assert!(registry.lookup("noise").is_ok());
        assert!(registry.lookup("zoom").is_ok());
        assert!(registry.lookup("hue").is_ok());
        assert!(matches!(
            registry.lookup("rotate"),
            Err(CotejarError::NotFound { .. })
        ));
    }

    #[test]
    fn test_registry_names_sorted() {
        let registry = TransformRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["hue", "noise", "zoom"]);
    }

    #[test]
    fn test_all_builtins_identity_at_level_zero() {
        let img = checker(8, 8);
        let registry = TransformRegistry::with_builtins();
        for name in registry.names() {
            let out = registry
                .lookup(&name)
                .unwrap()
                .apply(&img, Level::baseline())
                .unwrap();
            assert_eq!(out, img, "{name} must be identity at level 0");
        }
    }

    #[test]
    fn test_noise_changes_image_above_zero() {
        let img = checker(8, 8);
        let noise = NoiseTransform::default();
        let out = noise.apply(&img, Level::new(5).unwrap()).unwrap();
        assert_ne!(out, img);
        assert_eq!(out.dimensions(), img.dimensions());
    }

    #[test]
    fn test_noise_is_deterministic() {
        let img = checker(8, 8);
        let noise = NoiseTransform::default();
        let level = Level::new(3).unwrap();
        let a = noise.apply(&img, level).unwrap();
        let b = noise.apply(&img, level).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_levels_differ() {
        let img = checker(8, 8);
        let noise = NoiseTransform::default();
        let low = noise.apply(&img, Level::new(1).unwrap()).unwrap();
        let high = noise.apply(&img, Level::new(9).unwrap()).unwrap();
        assert_ne!(low, high);
    }

    #[test]
    fn test_zoom_preserves_dimensions() {
        let img = checker(10, 6);
        let out = ZoomTransform.apply(&img, Level::new(7).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (10, 6));
    }

    #[test]
    fn test_zoom_tiny_image_does_not_panic() {
        let img = checker(2, 2);
        let out = ZoomTransform.apply(&img, Level::new(10).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
    }

    #[test]
    fn test_hue_shifts_colored_pixels() {
        let img = PixelImage::filled(4, 4, Rgb::new(255, 0, 0));
        let out = HueTransform.apply(&img, Level::new(5).unwrap()).unwrap();
        assert_ne!(out, img);
    }

    #[test]
    fn test_hsv_roundtrip_primary_colors() {
        for color in [
            Rgb::new(255, 0, 0),
            Rgb::new(0, 255, 0),
            Rgb::new(0, 0, 255),
            Rgb::new(128, 128, 128),
        ] {
            let (h, s, v) = rgb_to_hsv(color);
            let back = hsv_to_rgb(h, s, v);
            let dr = i32::from(back.r) - i32::from(color.r);
            let dg = i32::from(back.g) - i32::from(color.g);
            let db = i32::from(back.b) - i32::from(color.b);
            assert!(
                dr.abs() <= 2 && dg.abs() <= 2 && db.abs() <= 2,
                "{color:?} -> {back:?} drifted too far"
            );
        }
    }
}
