//! Frame normalization and exact-size resampling.
//!
//! Every captured frame is brought to the fixed square working
//! resolution before tiling: optionally center-cropped, resized with
//! the configured filter, and optionally flipped horizontally so the
//! output behaves like a mirror.
//!
//! [`resize_to`] is also used for chunks: shrinking arbitrary chunks to
//! the canonical library size, and fitting library chunks to edge tiles.
//! Inputs already at the requested size are copied verbatim, never
//! filtered.

use std::fmt;

use image::{GenericImageView, Rgb, imageops};
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, Frame, RgbImage};

/// Resampling filter used when a frame or chunk has to change size.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> imageops::FilterType {
        match self {
            Self::Nearest => imageops::FilterType::Nearest,
            Self::Triangle => imageops::FilterType::Triangle,
            Self::CatmullRom => imageops::FilterType::CatmullRom,
            Self::Gaussian => imageops::FilterType::Gaussian,
            Self::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// How a non-square frame is brought to the square working frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameFit {
    /// Resize the whole frame, ignoring aspect ratio.
    #[default]
    Stretch,
    /// Crop the largest centered square, then resize it.
    CenterCrop,
}

/// Settings for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Side length of the output square.
    pub dimension: u32,
    /// Aspect handling for non-square input.
    pub fit: FrameFit,
    /// Resampling filter.
    pub filter: ResizeFilter,
    /// Flip horizontally after resizing.
    pub mirror: bool,
}

/// Bring a captured frame to the square working resolution.
#[must_use]
pub fn normalize(frame: &Frame, config: &NormalizeConfig) -> Frame {
    let target = Dimensions::square(config.dimension);
    let mut out = match config.fit {
        FrameFit::Stretch => resize_to(frame, target, config.filter),
        FrameFit::CenterCrop => {
            let (width, height) = frame.dimensions();
            let side = width.min(height);
            let x = (width - side) / 2;
            let y = (height - side) / 2;
            let square = imageops::crop_imm(frame, x, y, side, side);
            resize_to(&*square, target, config.filter)
        }
    };

    if config.mirror {
        imageops::flip_horizontal_in_place(&mut out);
    }
    out
}

/// Resample `image` to exactly `target`, ignoring aspect ratio.
///
/// Returns a verbatim copy when `image` already has the target size.
#[must_use]
pub fn resize_to<I>(image: &I, target: Dimensions, filter: ResizeFilter) -> RgbImage
where
    I: GenericImageView<Pixel = Rgb<u8>>,
{
    if Dimensions::of(image) == target {
        return RgbImage::from_fn(target.width, target.height, |x, y| image.get_pixel(x, y));
    }
    imageops::resize(image, target.width, target.height, filter.to_image_filter())
}
