//! Display sinks that write composed frames to disk, or nowhere.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use mosaic_engine::{DisplaySink, Frame};

use crate::error::IoError;

/// Writes each shown frame as a numbered PNG file.
///
/// Files are named `{prefix}{index:06}.png`, where `index` counts every
/// frame shown, including ones that failed to encode. Failures are
/// logged and counted but never interrupt the run.
#[derive(Debug, Clone)]
pub struct PngSequenceSink {
    dir: PathBuf,
    prefix: String,
    shown: u64,
    failures: u64,
}

impl PngSequenceSink {
    /// Default file-name prefix.
    pub const DEFAULT_PREFIX: &'static str = "frame-";

    /// Write into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::CreateDir`] if the directory cannot be created.
    pub fn create(dir: &Path) -> Result<Self, IoError> {
        std::fs::create_dir_all(dir).map_err(|source| IoError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: Self::DEFAULT_PREFIX.to_string(),
            shown: 0,
            failures: 0,
        })
    }

    /// Use `prefix` for file names instead of [`Self::DEFAULT_PREFIX`].
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Path of the file for the `index`-th shown frame.
    #[must_use]
    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}{index:06}.png", self.prefix))
    }

    /// Frames successfully written.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.shown - self.failures
    }

    /// Frames that failed to encode or write.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }
}

impl DisplaySink for PngSequenceSink {
    fn show(&mut self, frame: &Frame) {
        let path = self.path_for(self.shown);
        self.shown += 1;
        if let Err(err) = frame.save_with_format(&path, ImageFormat::Png) {
            self.failures += 1;
            log::warn!("failed to write {}: {err}", path.display());
        }
    }
}

/// Discards every frame. Counts them, for benchmarking the engine alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink {
    shown: u64,
}

impl NullSink {
    /// Frames shown so far.
    #[must_use]
    pub const fn shown(&self) -> u64 {
        self.shown
    }
}

impl DisplaySink for NullSink {
    fn show(&mut self, _frame: &Frame) {
        self.shown += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::load_frame;
    use crate::testing::scratch_dir;
    use image::Rgb;
    use mosaic_engine::RgbImage;

    #[test]
    fn writes_numbered_pngs() {
        let dir = scratch_dir("png-sink").join("out");
        let mut sink = PngSequenceSink::create(&dir).unwrap();
        let frame = RgbImage::from_pixel(5, 5, Rgb([1, 2, 3]));
        sink.show(&frame);
        sink.show(&frame);

        assert_eq!(sink.written(), 2);
        assert_eq!(sink.failures(), 0);
        assert!(dir.join("frame-000000.png").is_file());
        assert_eq!(load_frame(&dir.join("frame-000001.png")).unwrap(), frame);
    }

    #[test]
    fn prefix_is_configurable() {
        let dir = scratch_dir("png-prefix");
        let sink = PngSequenceSink::create(&dir).unwrap().with_prefix("mirror_");
        assert_eq!(sink.path_for(42), dir.join("mirror_000042.png"));
    }

    #[test]
    fn write_failures_are_counted_not_raised() {
        let dir = scratch_dir("png-fail");
        let mut sink = PngSequenceSink::create(&dir).unwrap();
        // Occupy the target path with a directory so the write fails.
        std::fs::create_dir_all(sink.path_for(0)).unwrap();
        sink.show(&RgbImage::new(2, 2));
        sink.show(&RgbImage::new(2, 2));
        assert_eq!(sink.failures(), 1);
        assert_eq!(sink.written(), 1);
    }

    #[test]
    fn create_fails_under_a_file() {
        let dir = scratch_dir("png-create");
        let file = dir.join("plain");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            PngSequenceSink::create(&file.join("sub")),
            Err(IoError::CreateDir { .. })
        ));
    }

    #[test]
    fn null_sink_counts() {
        let mut sink = NullSink::default();
        sink.show(&RgbImage::new(1, 1));
        sink.show(&RgbImage::new(1, 1));
        assert_eq!(sink.shown(), 2);
    }
}
