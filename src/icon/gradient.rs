/// Rarity gradient overlays
///
/// Every non-plain rarity is drawn with a translucent vertical gradient in the
/// tier's base color: fully transparent at the top, 80/255 opacity at the
/// bottom. Overlays only depend on (rarity, size), so they are computed once
/// per key and shared by every record and every in-flight job.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::color::{Rarity, Rgb};
use crate::view::surface::DisplayImage;

/// Opacity reached at the bottom row
pub const GRADIENT_MAX_ALPHA: u32 = 80;

type Slot = Arc<OnceLock<DisplayImage>>;

/// Memo table of gradient overlays keyed by (rarity, size)
///
/// Lookups for the same key from several threads block on a per-key cell,
/// so each overlay is generated exactly once. Entries are never evicted; the
/// key space is bounded by the number of rarities times the sizes in use.
#[derive(Debug, Default)]
pub struct GradientCache {
    entries: Mutex<HashMap<(Rarity, u32), Slot>>,
    computations: AtomicUsize,
}

impl GradientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay for a rarity at `size × size`, or `None` for the plain tiers
    pub fn get(&self, rarity: Rarity, size: u32) -> Option<DisplayImage> {
        if rarity.is_plain() {
            return None;
        }

        let slot = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry((rarity, size)).or_default().clone()
        };

        let overlay = slot.get_or_init(|| {
            self.computations.fetch_add(1, Ordering::Relaxed);
            debug!("Generating {} gradient at {}px", rarity, size);
            Arc::new(generate_gradient(rarity.rgb(), size))
        });
        Some(overlay.clone())
    }

    /// Number of overlays actually generated so far
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached overlay
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.computations.store(0, Ordering::Relaxed);
    }
}

/// Vertical gradient from transparent to `GRADIENT_MAX_ALPHA` in a single color
pub fn generate_gradient(rgb: Rgb, size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |_x, y| {
        let mask = 255 * y / size;
        let alpha = (GRADIENT_MAX_ALPHA * mask + 127) / 255;
        Rgba([rgb[0], rgb[1], rgb[2], alpha as u8])
    })
}
