//! mosaic-engine: Tile cache and refresh engine for the mosaic mirror (sans-IO).
//!
//! Rebuilds every incoming video frame as a grid of tiles, each filled
//! with a chunk recalled from a library of previously seen chunks:
//! normalize -> look up per tile -> score -> refresh or hold -> learn.
//!
//! The library is keyed by a coarse visual fingerprint, chosen through
//! the pluggable [`IndexStrategy`] (mean brightness or mean color). Each
//! tile decides stochastically whether to accept its candidate, weighing
//! the candidate's novelty against how recently the tile last changed.
//!
//! This crate has **no I/O dependencies**. Frames arrive through the
//! [`FrameSource`] trait and leave through [`DisplaySink`]; cameras,
//! files, and windows live in `mosaic-io` and the `mosaic-mirror` binary.

pub mod clock;
pub mod diagnostics;
pub mod difference;
pub mod engine;
pub mod grid;
pub mod index;
pub mod library;
pub mod normalize;
pub mod tile;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diagnostics::{RunSummary, StopReason, TickDiagnostics};
pub use difference::chunk_difference;
pub use engine::{DisplaySink, FrameSource, MosaicEngine};
pub use index::{BrightnessIndex, ColorIndex, ColorKey, IndexKind, IndexStrategy};
pub use library::Library;
pub use normalize::{FrameFit, NormalizeConfig, ResizeFilter};
pub use tile::{DecayPolicy, Tile, TileState};
pub use types::{Chunk, Dimensions, Frame, MirrorConfig, MirrorError, Rect, RgbImage};
