//! Shared types for the mosaic mirror engine.

use serde::{Deserialize, Serialize};

use crate::index::IndexKind;
use crate::normalize::{FrameFit, NormalizeConfig, ResizeFilter};

/// Re-export `RgbImage` so downstream crates can build and inspect
/// frames without depending on `image` directly.
pub use image::RgbImage;

/// One video image: `height` rows of `width` pixels with 3 `u8` channels.
pub type Frame = RgbImage;

/// An owned, detached chunk of pixels as stored in the tile library.
pub type Chunk = RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new set of dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square of `side` × `side` pixels.
    #[must_use]
    pub const fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    /// Dimensions of any `image` buffer or view.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A half-open pixel rectangle `[y1, y2) × [x1, x2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// First row (inclusive).
    pub y1: u32,
    /// Last row (exclusive).
    pub y2: u32,
    /// First column (inclusive).
    pub x1: u32,
    /// Last column (exclusive).
    pub x2: u32,
}

impl Rect {
    /// Create a rectangle from its four boundary coordinates.
    ///
    /// `y1 <= y2` and `x1 <= x2` are expected; inverted bounds are
    /// swapped so the rectangle is never negative.
    #[must_use]
    pub const fn new(y1: u32, y2: u32, x1: u32, x2: u32) -> Self {
        let (y1, y2) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        Self { y1, y2, x1, x2 }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Width and height as [`Dimensions`].
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.dimensions().pixel_count()
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Returns `true` if pixel `(x, y)` lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    /// Returns `true` if the rectangle lies entirely inside `dimensions`.
    #[must_use]
    pub const fn fits_within(&self, dimensions: Dimensions) -> bool {
        self.x2 <= dimensions.width && self.y2 <= dimensions.height
    }
}

/// Configuration for the mosaic engine.
///
/// Supplied once at construction and never changed mid-run. Use
/// [`validate`](Self::validate) (called by the engine constructor) to
/// reject values the engine cannot work with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Side length of the square normalized frame in pixels.
    pub frame_dimension: u32,

    /// Side length of a tile and of every stored library chunk.
    ///
    /// Ideally divides `frame_dimension`; otherwise the last row and
    /// column of tiles are clipped to the frame edge.
    pub tile_size: u32,

    /// Quantization step used to derive library keys. Larger values
    /// put more chunks into the same bucket.
    pub coarseness: u8,

    /// Time constant of the refresh decay, in seconds. Larger values
    /// keep tiles stable for longer.
    pub tau: f64,

    /// Multiplier applied to the novelty score in the refresh decision.
    pub novelty_weight: f64,

    /// Which key derivation the library uses.
    pub index: IndexKind,

    /// How incoming frames are fitted to the square working frame.
    pub fit: FrameFit,

    /// Resampling filter for frame normalization and chunk resizing.
    pub filter: ResizeFilter,

    /// Whether to flip frames horizontally so the output reads like a mirror.
    pub mirror: bool,
}

impl MirrorConfig {
    /// Default side length of the normalized frame.
    pub const DEFAULT_FRAME_DIMENSION: u32 = 729;
    /// Default tile side length.
    pub const DEFAULT_TILE_SIZE: u32 = 40;
    /// Default key quantization step.
    pub const DEFAULT_COARSENESS: u8 = 5;
    /// Default decay time constant in seconds.
    pub const DEFAULT_TAU: f64 = 2.0;
    /// Default novelty weight.
    pub const DEFAULT_NOVELTY_WEIGHT: f64 = 1.5;
    /// Default index strategy.
    pub const DEFAULT_INDEX: IndexKind = IndexKind::Brightness;
    /// Default frame fit.
    pub const DEFAULT_FIT: FrameFit = FrameFit::Stretch;
    /// Default resize filter.
    pub const DEFAULT_FILTER: ResizeFilter = ResizeFilter::Triangle;

    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidConfig`] naming the first offending
    /// parameter.
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.frame_dimension == 0 {
            return Err(MirrorError::InvalidConfig(
                "frame_dimension must be positive".to_string(),
            ));
        }
        if self.tile_size == 0 {
            return Err(MirrorError::InvalidConfig(
                "tile_size must be positive".to_string(),
            ));
        }
        if self.tile_size > self.frame_dimension {
            return Err(MirrorError::InvalidConfig(format!(
                "tile_size {} exceeds frame_dimension {}",
                self.tile_size, self.frame_dimension,
            )));
        }
        if self.coarseness == 0 {
            return Err(MirrorError::InvalidConfig(
                "coarseness must be positive".to_string(),
            ));
        }
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(MirrorError::InvalidConfig(format!(
                "tau must be finite and positive, got {}",
                self.tau,
            )));
        }
        if !self.novelty_weight.is_finite() || self.novelty_weight < 0.0 {
            return Err(MirrorError::InvalidConfig(format!(
                "novelty_weight must be finite and non-negative, got {}",
                self.novelty_weight,
            )));
        }
        Ok(())
    }

    /// The normalization settings carried by this config.
    #[must_use]
    pub const fn normalize_config(&self) -> NormalizeConfig {
        NormalizeConfig {
            dimension: self.frame_dimension,
            fit: self.fit,
            filter: self.filter,
            mirror: self.mirror,
        }
    }

    /// Dimensions of the normalized square frame.
    #[must_use]
    pub const fn frame_dimensions(&self) -> Dimensions {
        Dimensions::square(self.frame_dimension)
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            frame_dimension: Self::DEFAULT_FRAME_DIMENSION,
            tile_size: Self::DEFAULT_TILE_SIZE,
            coarseness: Self::DEFAULT_COARSENESS,
            tau: Self::DEFAULT_TAU,
            novelty_weight: Self::DEFAULT_NOVELTY_WEIGHT,
            index: Self::DEFAULT_INDEX,
            fit: Self::DEFAULT_FIT,
            filter: Self::DEFAULT_FILTER,
            mirror: true,
        }
    }
}

/// Errors raised by the mosaic engine.
///
/// Library misses are not errors: they resolve to a synthesized
/// placeholder and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The frame source could not be opened; no tick ever runs.
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),

    /// The frame source failed to deliver a frame. Ends the run loop.
    #[error("failed to read frame for tick {tick}")]
    FrameReadFailure {
        /// Index of the tick whose acquisition failed.
        tick: u64,
    },

    /// Two chunks that must share a shape do not.
    #[error("chunk shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The shape the operation required.
        expected: Dimensions,
        /// The shape it was given.
        actual: Dimensions,
    },

    /// Engine configuration is invalid.
    #[error("invalid mirror configuration: {0}")]
    InvalidConfig(String),
}
