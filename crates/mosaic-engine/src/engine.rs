//! The per-frame mosaic loop.
//!
//! One tick of [`MosaicEngine`]:
//!
//! 1. Acquire a frame from the [`FrameSource`] and normalize it.
//! 2. For every tile in grid order: look up the nearest library chunk
//!    for the live region, score it against the live region, and either
//!    write it (refresh) or copy the tile's rectangle from the previous
//!    output (hold).
//! 3. Insert every live region of the captured frame into the library.
//! 4. Hand the composed frame to the [`DisplaySink`].
//!
//! All lookups of a tick happen before any of its insertions, so a tile
//! never sees a chunk captured in the same tick. The captured frame is
//! never written to; the composition goes into a separate buffer.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::{Clock, SystemClock};
use crate::diagnostics::{RunSummary, StopReason, TickDiagnostics};
use crate::difference::chunk_difference;
use crate::grid::{has_clipped_edges, tile_grid};
use crate::index::IndexStrategy;
use crate::library::Library;
use crate::normalize::{normalize, resize_to};
use crate::tile::{DecayPolicy, Tile, TileState};
use crate::types::{Dimensions, Frame, MirrorConfig, MirrorError};

/// Producer of raw frames.
///
/// `None` means the source could not deliver a frame; the engine turns
/// it into [`MirrorError::FrameReadFailure`].
pub trait FrameSource {
    /// Read the next frame, in any size.
    fn read(&mut self) -> Option<Frame>;
}

/// Consumer of composed frames. Fire-and-forget.
pub trait DisplaySink {
    /// Present one composed frame.
    fn show(&mut self, frame: &Frame);
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn read(&mut self) -> Option<Frame> {
        (**self).read()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read(&mut self) -> Option<Frame> {
        (**self).read()
    }
}

impl<T: DisplaySink + ?Sized> DisplaySink for &mut T {
    fn show(&mut self, frame: &Frame) {
        (**self).show(frame);
    }
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn show(&mut self, frame: &Frame) {
        (**self).show(frame);
    }
}

/// Owns the library, the tile grid, and the previous output.
///
/// Generic over the key strategy `S`, the [`Clock`] `C` driving tile
/// ages, and the random source `R` behind refresh decisions.
#[derive(Debug)]
pub struct MosaicEngine<S: IndexStrategy, C: Clock = SystemClock, R: Rng = StdRng> {
    config: MirrorConfig,
    policy: DecayPolicy,
    library: Library<S>,
    tiles: Vec<Tile<C::Instant>>,
    states: Vec<TileState>,
    last_output: Option<Frame>,
    clock: C,
    rng: R,
    tick: u64,
}

impl<S: IndexStrategy> MosaicEngine<S> {
    /// Engine on the system clock with a seeded [`StdRng`].
    ///
    /// # Errors
    ///
    /// Same as [`MosaicEngine::new`].
    pub fn seeded(config: MirrorConfig, seed: u64) -> Result<Self, MirrorError> {
        Self::new(config, SystemClock, StdRng::seed_from_u64(seed))
    }

    /// Engine on the system clock with an OS-seeded [`StdRng`].
    ///
    /// # Errors
    ///
    /// Same as [`MosaicEngine::new`].
    pub fn from_entropy(config: MirrorConfig) -> Result<Self, MirrorError> {
        Self::new(config, SystemClock, StdRng::from_os_rng())
    }
}

impl<S: IndexStrategy, C: Clock, R: Rng> MosaicEngine<S, C, R> {
    /// Build an engine with an empty library and a grid of fresh tiles.
    ///
    /// The strategy is built from `config.coarseness`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidConfig`] if the config fails
    /// [`MirrorConfig::validate`] or names a different index strategy
    /// than `S`.
    pub fn new(config: MirrorConfig, clock: C, rng: R) -> Result<Self, MirrorError> {
        config.validate()?;
        if config.index != S::KIND {
            return Err(MirrorError::InvalidConfig(format!(
                "config selects the {} index but the engine was built for {}",
                config.index,
                S::KIND,
            )));
        }

        let frame = config.frame_dimensions();
        if has_clipped_edges(frame, config.tile_size) {
            log::warn!(
                "frame {frame} is not a multiple of tile size {}; edge tiles are clipped",
                config.tile_size,
            );
        }

        let tiles = tile_grid(frame, config.tile_size, clock.now());
        log::info!(
            "mosaic engine: {frame} frame, {} tiles of {}px, {} index (coarseness {})",
            tiles.len(),
            config.tile_size,
            S::KIND,
            config.coarseness,
        );

        Ok(Self {
            policy: DecayPolicy::new(config.tau, config.novelty_weight),
            library: Library::new(
                S::with_coarseness(config.coarseness),
                config.tile_size,
                config.filter,
            ),
            states: vec![TileState::Stable; tiles.len()],
            tiles,
            last_output: None,
            clock,
            rng,
            tick: 0,
            config,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// The refresh decision parameters.
    #[must_use]
    pub const fn policy(&self) -> &DecayPolicy {
        &self.policy
    }

    /// The tile library.
    #[must_use]
    pub const fn library(&self) -> &Library<S> {
        &self.library
    }

    /// Tiles in grid order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile<C::Instant>] {
        &self.tiles
    }

    /// Outcome of each tile's decision in the last tick, in grid order.
    #[must_use]
    pub fn tile_states(&self) -> &[TileState] {
        &self.states
    }

    /// The most recently composed frame.
    #[must_use]
    pub const fn last_output(&self) -> Option<&Frame> {
        self.last_output.as_ref()
    }

    /// The clock driving tile ages.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Number of ticks composed so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    /// Normalize a raw frame to the working square.
    #[must_use]
    pub fn normalize(&self, raw: &Frame) -> Frame {
        normalize(raw, &self.config.normalize_config())
    }

    /// Normalize `raw` and compose one output frame from it.
    ///
    /// # Errors
    ///
    /// Propagates [`MirrorError::ShapeMismatch`] from
    /// [`compose`](Self::compose).
    pub fn process_frame(&mut self, raw: &Frame) -> Result<TickDiagnostics, MirrorError> {
        let captured = self.normalize(raw);
        self.compose(&captured)
    }

    /// Compose one output frame from an already normalized frame.
    ///
    /// Every tile either refreshes with its library candidate or holds
    /// the previous output's content. On the very first tick there is no
    /// previous output and every tile takes its candidate. Afterwards
    /// every live region is added to the library.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::ShapeMismatch`] if `captured` is not the
    /// configured frame size.
    pub fn compose(&mut self, captured: &Frame) -> Result<TickDiagnostics, MirrorError> {
        let started = self.clock.now();
        let expected = self.config.frame_dimensions();
        let actual = Dimensions::of(captured);
        if expected != actual {
            return Err(MirrorError::ShapeMismatch { expected, actual });
        }

        let mut composed = Frame::new(expected.width, expected.height);
        let mut refreshed = 0;
        let mut cache_hits = 0;
        let mut total_score = 0.0;

        for (tile, state) in self.tiles.iter_mut().zip(self.states.iter_mut()) {
            let live = tile.extract(captured);
            let candidate = self.library.find_nearest(&*live);
            if matches!(candidate, Cow::Borrowed(_)) {
                cache_hits += 1;
            }

            // Stored chunks are canonical size; clipped edge tiles need a resample.
            let fitted = if Dimensions::of(&*candidate) == tile.dimensions() {
                candidate
            } else {
                Cow::Owned(resize_to(&*candidate, tile.dimensions(), self.config.filter))
            };

            let score = chunk_difference(&*live, &*fitted)?;
            total_score += score;

            match &self.last_output {
                Some(previous)
                    if !tile.should_update(score, &self.policy, &self.clock, &mut self.rng) =>
                {
                    tile.replace(&mut composed, &*tile.extract(previous))?;
                    *state = TileState::Stable;
                }
                _ => {
                    tile.replace(&mut composed, &*fitted)?;
                    tile.reset_age(&self.clock);
                    *state = TileState::Refreshed;
                    refreshed += 1;
                }
            }
        }

        for tile in &self.tiles {
            self.library.add(&*tile.extract(captured));
        }

        let tiles = self.tiles.len();
        #[allow(clippy::cast_precision_loss)]
        let mean_score = if tiles == 0 {
            0.0
        } else {
            total_score / tiles as f64
        };
        let diagnostics = TickDiagnostics {
            tick: self.tick,
            duration: self.clock.elapsed(&started),
            tiles,
            refreshed,
            held: tiles - refreshed,
            cache_hits,
            cache_misses: tiles - cache_hits,
            library_size: self.library.len(),
            mean_score,
        };
        log::debug!("{}", diagnostics.report());

        self.last_output = Some(composed);
        self.tick += 1;
        Ok(diagnostics)
    }

    /// Run one tick: read, compose, show.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::FrameReadFailure`] if the source yields no
    /// frame; the sink is not called in that case.
    pub fn step<Src, Snk>(
        &mut self,
        source: &mut Src,
        sink: &mut Snk,
    ) -> Result<TickDiagnostics, MirrorError>
    where
        Src: FrameSource + ?Sized,
        Snk: DisplaySink + ?Sized,
    {
        let Some(raw) = source.read() else {
            log::warn!("frame source returned nothing at tick {}", self.tick);
            return Err(MirrorError::FrameReadFailure { tick: self.tick });
        };
        let diagnostics = self.process_frame(&raw)?;
        if let Some(output) = &self.last_output {
            sink.show(output);
        }
        Ok(diagnostics)
    }

    /// Tick until `stop` is raised or `max_ticks` ticks have run.
    ///
    /// # Errors
    ///
    /// Stops at the first failing tick and returns its error.
    pub fn run<Src, Snk>(
        &mut self,
        source: &mut Src,
        sink: &mut Snk,
        stop: &AtomicBool,
        max_ticks: Option<u64>,
    ) -> Result<RunSummary, MirrorError>
    where
        Src: FrameSource + ?Sized,
        Snk: DisplaySink + ?Sized,
    {
        self.run_with(source, sink, stop, max_ticks, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_tick` after every tick.
    ///
    /// # Errors
    ///
    /// Stops at the first failing tick and returns its error.
    pub fn run_with<Src, Snk, F>(
        &mut self,
        source: &mut Src,
        sink: &mut Snk,
        stop: &AtomicBool,
        max_ticks: Option<u64>,
        mut on_tick: F,
    ) -> Result<RunSummary, MirrorError>
    where
        Src: FrameSource + ?Sized,
        Snk: DisplaySink + ?Sized,
        F: FnMut(&TickDiagnostics),
    {
        let mut summary = RunSummary::new(StopReason::Requested);
        loop {
            if stop.load(Ordering::Relaxed) {
                summary.stop_reason = StopReason::Requested;
                break;
            }
            if max_ticks.is_some_and(|limit| summary.ticks >= limit) {
                summary.stop_reason = StopReason::TickLimit;
                break;
            }
            let diagnostics = self.step(source, sink)?;
            on_tick(&diagnostics);
            summary.record(&diagnostics);
        }
        summary.library_size = self.library.len();
        log::info!(
            "run ended after {} ticks ({:?})",
            summary.ticks,
            summary.stop_reason
        );
        Ok(summary)
    }
}
