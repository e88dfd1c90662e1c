//! Raw RGB image buffer used by the analysis core.
//!
//! The core never decodes files itself: the `image` crate is used only at
//! this boundary to turn a decoded [`image::DynamicImage`] into an owned
//! pixel buffer (and back, for writers in the CLI layer).

use crate::result::{CotejarError, CotejarResult};
use image::{DynamicImage, RgbImage};

/// A single RGB pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Create a new pixel
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Rec. 601 luminance of this pixel
    #[must_use]
    pub fn luminance(&self) -> f64 {
        0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b)
    }
}

/// Owned raw RGB image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl PixelImage {
    /// Create an image from raw parts.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::Parse`] when the pixel count does not
    /// match `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> CotejarResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(CotejarError::Parse {
                message: format!(
                    "pixel buffer holds {} pixels, {width}x{height} needs {expected}",
                    pixels.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Uniformly filled image, mostly useful in tests
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Image width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height as a pair
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel buffer in row-major order
    #[must_use]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Mutable pixel buffer
    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    /// Pixel at (x, y); row-major, no bounds forgiveness
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Rgb {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Overwrite the pixel at (x, y)
    pub fn put(&mut self, x: u32, y: u32, color: Rgb) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Check that `other` has identical dimensions.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::IncompatibleInput`] on mismatch.
    pub fn check_same_dimensions(&self, other: &Self) -> CotejarResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(CotejarError::IncompatibleInput {
                original_width: self.width,
                original_height: self.height,
                comparison_width: other.width,
                comparison_height: other.height,
            });
        }
        Ok(())
    }

    /// Convert a decoded image into a raw buffer
    #[must_use]
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = rgb
            .pixels()
            .map(|p| Rgb::new(p.0[0], p.0[1], p.0[2]))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert back into a `DynamicImage` for encoding
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicImage {
        let mut out = RgbImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let p = self.get(x, y);
                out.put_pixel(x, y, image::Rgb([p.r, p.g, p.b]));
            }
        }
        DynamicImage::ImageRgb8(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_dimensions() {
        let img = PixelImage::filled(3, 2, Rgb::new(10, 20, 30));
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.pixels().len(), 6);
        assert_eq!(img.get(2, 1), Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_from_pixels_rejects_wrong_length() {
        let result = PixelImage::from_pixels(2, 2, vec![Rgb::default(); 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_put_get_roundtrip() {
        let mut img = PixelImage::filled(2, 2, Rgb::default());
        img.put(1, 0, Rgb::new(255, 0, 0));
        assert_eq!(img.get(1, 0), Rgb::new(255, 0, 0));
        assert_eq!(img.get(0, 1), Rgb::default());
    }

    #[test]
    fn test_check_same_dimensions() {
        let a = PixelImage::filled(2, 2, Rgb::default());
        let b = PixelImage::filled(3, 3, Rgb::default());
        assert!(a.check_same_dimensions(&a.clone()).is_ok());
        let err = a.check_same_dimensions(&b).unwrap_err();
        assert!(matches!(
            err,
            crate::result::CotejarError::IncompatibleInput { .. }
        ));
    }

    #[test]
    fn test_dynamic_roundtrip() {
        let mut img = PixelImage::filled(4, 3, Rgb::new(1, 2, 3));
        img.put(0, 0, Rgb::new(200, 100, 50));
        let back = PixelImage::from_dynamic(&img.to_dynamic());
        assert_eq!(img, back);
    }

    #[test]
    fn test_luminance_white() {
        let white = Rgb::new(255, 255, 255);
        assert!((white.luminance() - 255.0).abs() < 1e-9);
    }
}
