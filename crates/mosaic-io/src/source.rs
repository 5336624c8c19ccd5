//! Frame sources backed by image files.
//!
//! A sequence decodes each file as it is read; a still image is decoded
//! once. Exhaustion or an unreadable file is reported as `None`, which
//! the engine turns into a frame read failure.

use std::path::{Path, PathBuf};

use mosaic_engine::{Frame, FrameSource};

use crate::error::IoError;

/// File extensions recognized as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Returns `true` if `path` has one of the [`IMAGE_EXTENSIONS`].
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Read and decode one image file into an RGB frame.
///
/// # Errors
///
/// Returns [`IoError::Read`] if the file cannot be read and
/// [`IoError::Decode`] if its contents are not a supported image.
pub fn load_frame(path: &Path) -> Result<Frame, IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes).map_err(|source| IoError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

/// Plays the images of a directory in lexical file-name order.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl ImageSequenceSource {
    /// List the image files in `dir`.
    ///
    /// With `looping`, the sequence restarts after the last file instead
    /// of running dry.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Read`] if the directory cannot be listed and
    /// [`IoError::EmptySequence`] if it holds no image files.
    pub fn open(dir: &Path, looping: bool) -> Result<Self, IoError> {
        let read_err = |source| IoError::Read {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.is_file() && is_image_path(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        log::info!("found {} images in {}", paths.len(), dir.display());
        Self::from_paths(dir, paths, looping)
    }

    /// Play an explicit list of files in the given order.
    ///
    /// `origin` names the sequence in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::EmptySequence`] if `paths` is empty.
    pub fn from_paths(origin: &Path, paths: Vec<PathBuf>, looping: bool) -> Result<Self, IoError> {
        if paths.is_empty() {
            return Err(IoError::EmptySequence(origin.to_path_buf()));
        }
        Ok(Self {
            paths,
            next: 0,
            looping,
        })
    }

    /// The files in playback order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of files in one pass.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always `false`; an empty sequence cannot be opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Option<Frame> {
        if self.next >= self.paths.len() {
            if !self.looping {
                return None;
            }
            self.next = 0;
        }
        let path = self.paths.get(self.next)?;
        self.next += 1;
        match load_frame(path) {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }
}

/// Replays one decoded image.
#[derive(Debug, Clone)]
pub struct StillSource {
    frame: Frame,
    remaining: Option<u64>,
}

impl StillSource {
    /// Serve `frame` `repeat` times, or forever if `repeat` is `None`.
    #[must_use]
    pub const fn new(frame: Frame, repeat: Option<u64>) -> Self {
        Self {
            frame,
            remaining: repeat,
        }
    }

    /// Decode the image at `path` and serve it `repeat` times.
    ///
    /// # Errors
    ///
    /// Same as [`load_frame`].
    pub fn open(path: &Path, repeat: Option<u64>) -> Result<Self, IoError> {
        Ok(Self::new(load_frame(path)?, repeat))
    }

    /// Frames left to serve, or `None` if unbounded.
    #[must_use]
    pub const fn remaining(&self) -> Option<u64> {
        self.remaining
    }
}

impl FrameSource for StillSource {
    fn read(&mut self) -> Option<Frame> {
        match &mut self.remaining {
            Some(0) => return None,
            Some(n) => *n -= 1,
            None => {}
        }
        Some(self.frame.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::scratch_dir;
    use image::Rgb;
    use mosaic_engine::RgbImage;

    fn write_flat(dir: &Path, name: &str, level: u8) {
        RgbImage::from_pixel(4, 3, Rgb([level, level, level]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn recognizes_image_extensions() {
        assert!(is_image_path(Path::new("a/b/frame.PNG")));
        assert!(is_image_path(Path::new("shot.jpeg")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("no_extension")));
    }

    #[test]
    fn sequence_plays_in_lexical_order() {
        let dir = scratch_dir("sequence-order");
        write_flat(&dir, "b.png", 20);
        write_flat(&dir, "a.png", 10);
        write_flat(&dir, "c.png", 30);
        std::fs::write(dir.join("readme.txt"), "skip me").unwrap();

        let mut source = ImageSequenceSource::open(&dir, false).unwrap();
        assert_eq!(source.len(), 3);
        let levels: Vec<u8> = std::iter::from_fn(|| source.read())
            .map(|f| f.get_pixel(0, 0)[0])
            .collect();
        assert_eq!(levels, vec![10, 20, 30]);
        assert!(source.read().is_none());
    }

    #[test]
    fn looping_sequence_restarts() {
        let dir = scratch_dir("sequence-loop");
        write_flat(&dir, "0.png", 1);
        write_flat(&dir, "1.png", 2);

        let mut source = ImageSequenceSource::open(&dir, true).unwrap();
        let levels: Vec<u8> = (0..5)
            .map(|_| source.read().unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(levels, vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = scratch_dir("sequence-empty");
        assert!(matches!(
            ImageSequenceSource::open(&dir, false),
            Err(IoError::EmptySequence(_))
        ));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = scratch_dir("sequence-missing").join("absent");
        assert!(matches!(
            ImageSequenceSource::open(&dir, false),
            Err(IoError::Read { .. })
        ));
    }

    #[test]
    fn corrupt_file_reads_as_none() {
        let dir = scratch_dir("sequence-corrupt");
        std::fs::write(dir.join("broken.png"), b"not a png").unwrap();
        let mut source = ImageSequenceSource::open(&dir, true).unwrap();
        assert!(source.read().is_none());
    }

    #[test]
    fn still_source_counts_down() {
        let mut source = StillSource::new(RgbImage::new(2, 2), Some(2));
        assert!(source.read().is_some());
        assert!(source.read().is_some());
        assert!(source.read().is_none());
        assert_eq!(source.remaining(), Some(0));
    }

    #[test]
    fn unbounded_still_source_never_runs_dry() {
        let mut source = StillSource::new(RgbImage::new(2, 2), None);
        assert!((0..100).all(|_| source.read().is_some()));
    }

    #[test]
    fn still_source_decodes_file() {
        let dir = scratch_dir("still-open");
        write_flat(&dir, "still.png", 99);
        let mut source = StillSource::open(&dir.join("still.png"), Some(1)).unwrap();
        let frame = source.read().unwrap();
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.get_pixel(3, 2), &Rgb([99, 99, 99]));
    }

    #[test]
    fn decode_failure_is_reported() {
        let dir = scratch_dir("still-corrupt");
        let path = dir.join("bad.png");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(matches!(
            StillSource::open(&path, None),
            Err(IoError::Decode { .. })
        ));
    }
}
