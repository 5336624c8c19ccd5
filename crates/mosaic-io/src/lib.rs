//! mosaic-io: Filesystem frame sources and display sinks.
//!
//! Implements the [`FrameSource`](mosaic_engine::FrameSource) and
//! [`DisplaySink`](mosaic_engine::DisplaySink) seams of `mosaic-engine`
//! with image files, so the mirror can run on recorded footage or a
//! still photo and leave its output as a PNG sequence.

pub mod error;
pub mod sink;
pub mod source;

pub use error::IoError;
pub use sink::{NullSink, PngSequenceSink};
pub use source::{ImageSequenceSource, StillSource, is_image_path, load_frame};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::path::PathBuf;

    /// A fresh, empty directory unique to this test process and `name`.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mosaic-io-{}-{name}", std::process::id()));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
