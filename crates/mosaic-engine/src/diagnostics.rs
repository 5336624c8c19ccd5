//! Per-tick diagnostics: timing and counts for each composed frame.
//!
//! Every tick produces a [`TickDiagnostics`]; a run aggregates them into
//! a [`RunSummary`]. Both serialize to JSON for the CLI's `--json` mode.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Counts and timing for one composed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickDiagnostics {
    /// Zero-based tick index.
    pub tick: u64,
    /// Wall-clock time spent composing the frame.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Number of tiles in the grid.
    pub tiles: usize,
    /// Tiles that accepted their candidate.
    pub refreshed: usize,
    /// Tiles that kept the previous frame's content.
    pub held: usize,
    /// Lookups answered by a stored chunk.
    pub cache_hits: usize,
    /// Lookups answered by a synthesized placeholder.
    pub cache_misses: usize,
    /// Occupied library keys after this tick's insertions.
    pub library_size: usize,
    /// Mean novelty score over all tiles.
    pub mean_score: f64,
}

impl TickDiagnostics {
    /// Fraction of tiles that refreshed, in `[0, 1]`.
    #[must_use]
    pub fn refresh_ratio(&self) -> f64 {
        ratio(self.refreshed, self.tiles)
    }

    /// Fraction of lookups that hit a stored chunk, in `[0, 1]`.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        ratio(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn report(&self) -> String {
        format!(
            "tick {:>5}  {:>8.3}ms  refreshed {:>4}/{:<4} ({:>5.1}%)  hits {:>5.1}%  library {:>4}  score {:.3}",
            self.tick,
            duration_ms(self.duration),
            self.refreshed,
            self.tiles,
            self.refresh_ratio() * 100.0,
            self.hit_ratio() * 100.0,
            self.library_size,
            self.mean_score,
        )
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The stop flag was raised.
    Requested,
    /// The configured tick limit was reached.
    TickLimit,
    /// The source ran dry after delivering at least one frame. Set by
    /// drivers that treat the end of a recording as a normal stop.
    SourceExhausted,
}

/// Aggregate over a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of ticks composed.
    pub ticks: u64,
    /// Why the run ended.
    pub stop_reason: StopReason,
    /// Sum of tick durations.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Total tile refreshes across all ticks.
    pub refreshed: u64,
    /// Total temporal holds across all ticks.
    pub held: u64,
    /// Library size at the end of the run.
    pub library_size: usize,
}

impl RunSummary {
    /// An empty summary for a run that has not composed anything yet.
    #[must_use]
    pub const fn new(stop_reason: StopReason) -> Self {
        Self {
            ticks: 0,
            stop_reason,
            total_duration: Duration::ZERO,
            refreshed: 0,
            held: 0,
            library_size: 0,
        }
    }

    /// Fold one tick into the summary.
    pub fn record(&mut self, tick: &TickDiagnostics) {
        self.ticks += 1;
        self.total_duration += tick.duration;
        self.refreshed += tick.refreshed as u64;
        self.held += tick.held as u64;
        self.library_size = tick.library_size;
    }

    /// Mean tick duration, or zero for an empty run.
    #[must_use]
    pub fn mean_tick_duration(&self) -> Duration {
        if self.ticks == 0 {
            return Duration::ZERO;
        }
        let ticks = u32::try_from(self.ticks).unwrap_or(u32::MAX);
        self.total_duration / ticks
    }

    /// Multi-line human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Run Summary\n{}", "=".repeat(60)));
        lines.push(format!("Ticks: {} ({:?})", self.ticks, self.stop_reason));
        lines.push(format!(
            "Total duration: {:.3}ms  mean/tick: {:.3}ms",
            duration_ms(self.total_duration),
            duration_ms(self.mean_tick_duration()),
        ));
        lines.push(format!(
            "Refreshes: {}  Holds: {}  Library size: {}",
            self.refreshed, self.held, self.library_size,
        ));
        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
