/// Icon compositing
///
/// Turns a fetched base icon into the image shown in the grid:
/// 1. Paint the base icon onto an opaque black `size × size` canvas
///    (covers icons smaller than the cell and transparent regions)
/// 2. Alpha-composite the rarity gradient on top, if the tier has one
///
/// This is the only expensive per-item image work. It runs when an icon is
/// first loaded and when the rarity changes, never for text-only edits.

use std::sync::Arc;
use std::time::Instant;

use image::{imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use super::gradient::GradientCache;
use crate::color::Rarity;
use crate::view::surface::DisplayImage;

/// Canvas color behind every icon
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Composite a base icon and an optional overlay into a `size × size` image
pub fn process(base: &RgbaImage, overlay: Option<&RgbaImage>, size: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(size, size, BACKGROUND);
    imageops::overlay(&mut canvas, base, 0, 0);
    if let Some(overlay) = overlay {
        imageops::overlay(&mut canvas, overlay, 0, 0);
    }
    canvas
}

/// Resize a downloaded icon to exactly `size × size`
pub fn downscale(image: &DynamicImage, size: u32) -> RgbaImage {
    image.resize_exact(size, size, FilterType::Lanczos3).to_rgba8()
}

/// The compositing step bound to a gradient cache and a cell size
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    gradients: Arc<GradientCache>,
    size: u32,
}

impl ImagePipeline {
    pub fn new(gradients: Arc<GradientCache>, size: u32) -> Self {
        Self { gradients, size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn gradients(&self) -> &Arc<GradientCache> {
        &self.gradients
    }

    /// Composite `base` for an item of the given rarity
    pub fn run(&self, base: &RgbaImage, rarity: Rarity, label: &str) -> DisplayImage {
        let start = Instant::now();
        let overlay = self.gradients.get(rarity, self.size);
        let image = process(base, overlay.as_deref(), self.size);
        debug!("Processed {} icon in {:?}", label, start.elapsed());
        Arc::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size_matches_request() {
        for (w, h) in [(10, 10), (125, 125), (300, 80), (1, 400)] {
            let base = RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]));
            let out = process(&base, None, 125);
            assert_eq!(out.dimensions(), (125, 125));
        }
    }

    #[test]
    fn test_small_base_is_padded_with_black() {
        let base = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let out = process(&base, None, 20);

        assert_eq!(out.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(15, 15).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_transparent_base_shows_black() {
        let base = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 0]));
        let out = process(&base, None, 8);
        assert_eq!(out.get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_overlay_tints_bottom_only() {
        let base = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 255]));
        let overlay = RgbaImage::from_fn(50, 50, |_, y| {
            if y < 25 {
                Rgba([255, 0, 0, 0])
            } else {
                Rgba([255, 0, 0, 80])
            }
        });

        let out = process(&base, Some(&overlay), 50);

        assert_eq!(out.get_pixel(10, 10).0, [0, 0, 0, 255]);
        let tinted = out.get_pixel(10, 40).0;
        assert!(tinted[0] > 0);
        assert_eq!(tinted[3], 255);
    }

    #[test]
    fn test_pipeline_skips_overlay_for_plain_tiers() {
        let gradients = Arc::new(GradientCache::new());
        let pipeline = ImagePipeline::new(gradients.clone(), 32);
        let base = RgbaImage::from_pixel(32, 32, Rgba([40, 40, 40, 255]));

        let plain = pipeline.run(&base, Rarity::Common, "plain");
        assert_eq!(*plain, base);
        assert_eq!(gradients.computations(), 0);

        let tinted = pipeline.run(&base, Rarity::Import, "tinted");
        assert_ne!(*tinted, base);
        assert_eq!(gradients.computations(), 1);
    }

    #[test]
    fn test_downscale_is_exact() {
        let image = DynamicImage::new_rgba8(300, 120);
        assert_eq!(downscale(&image, 125).dimensions(), (125, 125));
    }
}
