//! Tiles: fixed frame rectangles with their own refresh timing.
//!
//! A tile knows its rectangle and when it last accepted new content.
//! Every tick it is offered a candidate chunk together with a novelty
//! score and decides, stochastically, whether to take it.
//!
//! # Refresh decision
//!
//! ```text
//! decay   = exp(-age / tau)
//! refresh = u + score * weight > decay      with u ~ U[0, 1)
//! ```
//!
//! A freshly refreshed tile has `decay ≈ 1` and only switches for a very
//! novel candidate; as it ages `decay` falls toward 0 and almost any
//! candidate is accepted. This keeps tiles from flickering between
//! near-identical library chunks on every frame.

use std::time::Duration;

use image::{GenericImage, GenericImageView, Rgb, SubImage, imageops};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::types::{Dimensions, Frame, MirrorError, Rect};

/// Parameters of the refresh decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayPolicy {
    /// Decay time constant in seconds.
    pub tau: f64,
    /// Multiplier on the novelty score.
    pub novelty_weight: f64,
}

impl DecayPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(tau: f64, novelty_weight: f64) -> Self {
        Self {
            tau,
            novelty_weight,
        }
    }

    /// `exp(-age / tau)`: 1 for a fresh tile, falling toward 0 with age.
    #[must_use]
    pub fn decay(&self, age: Duration) -> f64 {
        (-age.as_secs_f64() / self.tau).exp()
    }

    /// Decide with an explicit uniform sample `u` in `[0, 1)`.
    #[must_use]
    pub fn decide(&self, age: Duration, score: f64, u: f64) -> bool {
        score.mul_add(self.novelty_weight, u) > self.decay(age)
    }

    /// Probability that [`decide`](Self::decide) returns `true` for a
    /// uniformly drawn `u`.
    #[must_use]
    pub fn refresh_probability(&self, age: Duration, score: f64) -> f64 {
        let threshold = score.mul_add(-self.novelty_weight, self.decay(age));
        1.0 - threshold.clamp(0.0, 1.0)
    }
}

/// Per-tick outcome of a tile's refresh decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileState {
    /// The tile kept its previous content.
    Stable,
    /// The tile accepted a new candidate and its age was reset.
    Refreshed,
}

/// A fixed rectangle of the frame and the time it last refreshed.
///
/// `T` is the instant type of the [`Clock`] driving the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile<T> {
    rect: Rect,
    last_refresh: T,
}

impl<T: Copy> Tile<T> {
    /// Create a tile whose last refresh is `now`.
    #[must_use]
    pub const fn new(rect: Rect, now: T) -> Self {
        Self {
            rect,
            last_refresh: now,
        }
    }

    /// The tile's rectangle.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Pixel dimensions of the rectangle.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.rect.dimensions()
    }

    /// Borrow the tile's rectangle of `frame`.
    ///
    /// The rectangle is clamped to the frame bounds.
    #[must_use]
    pub fn extract<'a>(&self, frame: &'a Frame) -> SubImage<&'a Frame> {
        imageops::crop_imm(
            frame,
            self.rect.x1,
            self.rect.y1,
            self.rect.width(),
            self.rect.height(),
        )
    }

    /// Overwrite the tile's rectangle of `frame` with `chunk`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::ShapeMismatch`] if `chunk` does not have the
    /// rectangle's dimensions or the rectangle does not fit in `frame`.
    pub fn replace<I>(&self, frame: &mut Frame, chunk: &I) -> Result<(), MirrorError>
    where
        I: GenericImageView<Pixel = Rgb<u8>>,
    {
        let expected = self.dimensions();
        let actual = Dimensions::of(chunk);
        if expected != actual {
            return Err(MirrorError::ShapeMismatch { expected, actual });
        }
        let frame_dims = Dimensions::of(frame);
        if !self.rect.fits_within(frame_dims) {
            return Err(MirrorError::ShapeMismatch {
                expected,
                actual: frame_dims,
            });
        }
        frame
            .copy_from(chunk, self.rect.x1, self.rect.y1)
            .map_err(|_| MirrorError::ShapeMismatch {
                expected,
                actual: frame_dims,
            })
    }

    /// Time since the last refresh.
    pub fn age<C: Clock<Instant = T>>(&self, clock: &C) -> Duration {
        clock.elapsed(&self.last_refresh)
    }

    /// Mark the tile as refreshed now.
    pub fn reset_age<C: Clock<Instant = T>>(&mut self, clock: &C) {
        self.last_refresh = clock.now();
    }

    /// Draw one uniform sample and decide whether to accept a candidate
    /// with novelty `score`.
    pub fn should_update<C, R>(
        &self,
        score: f64,
        policy: &DecayPolicy,
        clock: &C,
        rng: &mut R,
    ) -> bool
    where
        C: Clock<Instant = T>,
        R: Rng,
    {
        let u: f64 = rng.random();
        policy.decide(self.age(clock), score, u)
    }
}
