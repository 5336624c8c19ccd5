//! Library keys: coarse visual signatures of chunks.
//!
//! This module defines the [`IndexStrategy`] trait for pluggable key
//! derivation and the [`IndexKind`] enum for selecting a strategy from
//! configuration.
//!
//! # Strategy pattern
//!
//! A strategy turns a canonical-size chunk into a small hashable key and
//! can synthesize a placeholder chunk for any key it produces. Two chunks
//! with the same key share one library slot. A
//! [`Library`](crate::library::Library) owns exactly one strategy, so
//! insertion and lookup can never disagree about how keys are derived.

use std::fmt;
use std::hash::Hash;

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::types::{Chunk, RgbImage};

/// Selects which key derivation the library uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    /// Scalar mean brightness, floored to a multiple of the coarseness.
    #[default]
    Brightness,
    /// Per-channel mean color, each rounded to a multiple of the coarseness.
    Color,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brightness => f.write_str("Brightness"),
            Self::Color => f.write_str("Color"),
        }
    }
}

/// Trait for key derivation strategies.
pub trait IndexStrategy {
    /// The key type. Must be cheap to copy and hash.
    type Key: Copy + Eq + Hash + fmt::Debug;

    /// The configuration name of this strategy.
    const KIND: IndexKind;

    /// Build the strategy for a quantization step.
    fn with_coarseness(coarseness: u8) -> Self
    where
        Self: Sized;

    /// Derive the key of a chunk.
    fn index(&self, chunk: &Chunk) -> Self::Key;

    /// A flat `size`×`size` chunk visually consistent with `key`.
    fn missing_image(&self, key: Self::Key, size: u32) -> Chunk;
}

/// Keys chunks by their mean sample value.
///
/// The mean over every sample of every channel is floored to a multiple
/// of `coarseness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessIndex {
    coarseness: u8,
}

impl BrightnessIndex {
    /// Create a brightness strategy. A coarseness of 0 is treated as 1.
    #[must_use]
    pub const fn new(coarseness: u8) -> Self {
        Self {
            coarseness: if coarseness == 0 { 1 } else { coarseness },
        }
    }

    /// The quantization step.
    #[must_use]
    pub const fn coarseness(&self) -> u8 {
        self.coarseness
    }
}

impl IndexStrategy for BrightnessIndex {
    type Key = u8;

    const KIND: IndexKind = IndexKind::Brightness;

    fn with_coarseness(coarseness: u8) -> Self {
        Self::new(coarseness)
    }

    fn index(&self, chunk: &Chunk) -> u8 {
        let samples = chunk.as_raw();
        if samples.is_empty() {
            return 0;
        }
        let sum: u64 = samples.iter().map(|&s| u64::from(s)).sum();
        // floor(floor(mean) / c) == floor(mean / c) for integer c.
        let mean = sum / samples.len() as u64;
        let step = u64::from(self.coarseness);
        u8::try_from((mean / step) * step).unwrap_or(u8::MAX)
    }

    fn missing_image(&self, key: u8, size: u32) -> Chunk {
        RgbImage::from_pixel(size, size, Rgb([key, key, key]))
    }
}

/// A quantized mean color.
///
/// Channels are stored unclamped so that buckets rounding above 255
/// stay distinct from the 255 bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColorKey {
    /// Quantized mean of the red channel.
    pub red: u16,
    /// Quantized mean of the green channel.
    pub green: u16,
    /// Quantized mean of the blue channel.
    pub blue: u16,
}

impl ColorKey {
    /// The key as a displayable pixel, each channel clamped to 255.
    #[must_use]
    pub fn to_pixel(self) -> Rgb<u8> {
        let clamp = |v: u16| u8::try_from(v).unwrap_or(u8::MAX);
        Rgb([clamp(self.red), clamp(self.green), clamp(self.blue)])
    }
}

/// Keys chunks by their mean color.
///
/// The mean is taken in two stages: first down each column (over the
/// rows), then across the resulting column means. Each channel is then
/// rounded to the nearest multiple of `coarseness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorIndex {
    coarseness: u8,
}

impl ColorIndex {
    /// Create a color strategy. A coarseness of 0 is treated as 1.
    #[must_use]
    pub const fn new(coarseness: u8) -> Self {
        Self {
            coarseness: if coarseness == 0 { 1 } else { coarseness },
        }
    }

    /// The quantization step.
    #[must_use]
    pub const fn coarseness(&self) -> u8 {
        self.coarseness
    }

    /// Two-stage mean color: per-column means first, then their mean.
    #[must_use]
    pub fn mean_color(chunk: &Chunk) -> [f64; 3] {
        let (width, height) = chunk.dimensions();
        if width == 0 || height == 0 {
            return [0.0; 3];
        }

        let rows = f64::from(height);
        let mut total = [0.0_f64; 3];
        for x in 0..width {
            let mut column = [0_u64; 3];
            for y in 0..height {
                let Rgb(p) = *chunk.get_pixel(x, y);
                for (sum, &sample) in column.iter_mut().zip(&p) {
                    *sum += u64::from(sample);
                }
            }
            for (acc, sum) in total.iter_mut().zip(column) {
                #[allow(clippy::cast_precision_loss)]
                let column_mean = sum as f64 / rows;
                *acc += column_mean;
            }
        }

        let columns = f64::from(width);
        total.map(|acc| acc / columns)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn quantize(&self, value: f64) -> u16 {
        let step = f64::from(self.coarseness);
        ((value / step).round() * step) as u16
    }
}

impl IndexStrategy for ColorIndex {
    type Key = ColorKey;

    const KIND: IndexKind = IndexKind::Color;

    fn with_coarseness(coarseness: u8) -> Self {
        Self::new(coarseness)
    }

    fn index(&self, chunk: &Chunk) -> ColorKey {
        let [red, green, blue] = Self::mean_color(chunk);
        ColorKey {
            red: self.quantize(red),
            green: self.quantize(green),
            blue: self.quantize(blue),
        }
    }

    fn missing_image(&self, key: ColorKey, size: u32) -> Chunk {
        RgbImage::from_pixel(size, size, key.to_pixel())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn flat(size: u32, rgb: [u8; 3]) -> Chunk {
        RgbImage::from_pixel(size, size, Rgb(rgb))
    }

    #[test]
    fn default_kind_is_brightness() {
        assert_eq!(IndexKind::default(), IndexKind::Brightness);
    }

    // --- Brightness ---

    #[test]
    fn brightness_floors_to_coarseness() {
        let index = BrightnessIndex::new(5);
        assert_eq!(index.index(&flat(4, [14, 14, 14])), 10);
        assert_eq!(index.index(&flat(4, [15, 15, 15])), 15);
        assert_eq!(index.index(&flat(4, [0, 0, 0])), 0);
        assert_eq!(index.index(&flat(4, [255, 255, 255])), 255);
    }

    #[test]
    fn brightness_averages_all_channels() {
        // Mean of (30, 60, 90) is 60.
        let index = BrightnessIndex::new(1);
        assert_eq!(index.index(&flat(3, [30, 60, 90])), 60);
    }

    #[test]
    fn brightness_is_deterministic() {
        let index = BrightnessIndex::new(7);
        let chunk = RgbImage::from_fn(8, 8, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 31 + y * 7) as u8;
            Rgb([v, v / 2, 255 - v])
        });
        assert_eq!(index.index(&chunk), index.index(&chunk.clone()));
    }

    #[test]
    fn brightness_missing_image_is_flat_gray() {
        let index = BrightnessIndex::new(5);
        let chunk = index.missing_image(85, 40);
        assert_eq!(chunk.dimensions(), (40, 40));
        assert!(chunk.as_raw().iter().all(|&s| s == 85));
    }

    #[test]
    fn strategies_report_their_kind() {
        assert_eq!(BrightnessIndex::KIND, IndexKind::Brightness);
        assert_eq!(ColorIndex::KIND, IndexKind::Color);
        assert_eq!(BrightnessIndex::with_coarseness(9).coarseness(), 9);
    }

    #[test]
    fn zero_coarseness_behaves_like_one() {
        assert_eq!(BrightnessIndex::new(0).coarseness(), 1);
        assert_eq!(ColorIndex::new(0).coarseness(), 1);
    }

    // --- Color ---

    #[test]
    fn color_rounds_to_nearest_multiple() {
        let index = ColorIndex::new(10);
        let key = index.index(&flat(4, [254, 14, 16]));
        assert_eq!(
            key,
            ColorKey {
                red: 250,
                green: 10,
                blue: 20
            }
        );
    }

    #[test]
    fn color_key_may_round_above_255() {
        let index = ColorIndex::new(10);
        let key = index.index(&flat(2, [255, 0, 0]));
        assert_eq!(key.red, 260);
        assert_eq!(key.to_pixel(), Rgb([255, 0, 0]));
    }

    #[test]
    fn similar_reds_share_a_bucket() {
        let index = ColorIndex::new(5);
        assert_eq!(
            index.index(&flat(40, [255, 0, 0])),
            index.index(&flat(40, [254, 1, 0]))
        );
    }

    #[test]
    fn two_stage_mean_on_non_square_chunk() {
        // 2 columns x 1 row: column means are the pixels themselves.
        let chunk = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([100, 0, 0])
            } else {
                Rgb([0, 0, 200])
            }
        });
        let mean = ColorIndex::mean_color(&chunk);
        assert!((mean[0] - 50.0).abs() < 1e-12);
        assert!(mean[1].abs() < 1e-12);
        assert!((mean[2] - 100.0).abs() < 1e-12);
    }

    #[test]
    fn color_missing_image_uses_key_color() {
        let index = ColorIndex::new(5);
        let key = ColorKey {
            red: 255,
            green: 10,
            blue: 0,
        };
        let chunk = index.missing_image(key, 8);
        assert_eq!(chunk.dimensions(), (8, 8));
        assert!(chunk.pixels().all(|p| *p == Rgb([255, 10, 0])));
    }

    #[test]
    fn empty_chunk_keys_to_zero() {
        let empty = RgbImage::new(0, 0);
        assert_eq!(BrightnessIndex::new(5).index(&empty), 0);
        assert_eq!(
            ColorIndex::new(5).index(&empty),
            ColorKey {
                red: 0,
                green: 0,
                blue: 0
            }
        );
    }
}
