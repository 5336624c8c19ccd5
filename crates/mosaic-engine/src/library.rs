//! The tile library: a coarse content-addressable cache of chunks.
//!
//! Every chunk is first shrunk to the canonical `tile_size`×`tile_size`
//! storage size, then keyed by the library's [`IndexStrategy`]. Each key
//! holds at most one chunk and later insertions overwrite earlier ones.
//! The library only grows; nothing is ever evicted.
//!
//! Lookups never fail. A key with no stored chunk resolves to a flat
//! placeholder synthesized by the strategy, so callers always get a
//! chunk that looks like the bucket they asked for.

use std::borrow::Cow;
use std::collections::HashMap;

use image::{GenericImageView, Rgb};

use crate::index::IndexStrategy;
use crate::normalize::{ResizeFilter, resize_to};
use crate::types::{Chunk, Dimensions};

/// A growing map from visual key to representative chunk.
#[derive(Debug, Clone)]
pub struct Library<S: IndexStrategy> {
    strategy: S,
    tile_size: u32,
    filter: ResizeFilter,
    entries: HashMap<S::Key, Chunk>,
}

impl<S: IndexStrategy> Library<S> {
    /// Create an empty library storing `tile_size`×`tile_size` chunks.
    #[must_use]
    pub fn new(strategy: S, tile_size: u32, filter: ResizeFilter) -> Self {
        Self {
            strategy,
            tile_size,
            filter,
            entries: HashMap::new(),
        }
    }

    /// Side length of stored chunks.
    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// The key derivation strategy.
    #[must_use]
    pub const fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Number of occupied keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resample `chunk` to the canonical storage size.
    ///
    /// Chunks already at the canonical size are copied unchanged.
    #[must_use]
    pub fn shrink<I>(&self, chunk: &I) -> Chunk
    where
        I: GenericImageView<Pixel = Rgb<u8>>,
    {
        resize_to(chunk, Dimensions::square(self.tile_size), self.filter)
    }

    /// The key `chunk` would be stored under.
    #[must_use]
    pub fn key_of<I>(&self, chunk: &I) -> S::Key
    where
        I: GenericImageView<Pixel = Rgb<u8>>,
    {
        self.strategy.index(&self.shrink(chunk))
    }

    /// Store `chunk` (shrunk) under its key, replacing any previous entry.
    ///
    /// Returns the key used.
    pub fn add<I>(&mut self, chunk: &I) -> S::Key
    where
        I: GenericImageView<Pixel = Rgb<u8>>,
    {
        let shrunk = self.shrink(chunk);
        let key = self.strategy.index(&shrunk);
        self.entries.insert(key, shrunk);
        key
    }

    /// The stored chunk for `chunk`'s key, or a placeholder for that key.
    ///
    /// Returns [`Cow::Borrowed`] on a hit and [`Cow::Owned`] placeholder
    /// on a miss.
    #[must_use]
    pub fn find_nearest<I>(&self, chunk: &I) -> Cow<'_, Chunk>
    where
        I: GenericImageView<Pixel = Rgb<u8>>,
    {
        let key = self.key_of(chunk);
        self.entries.get(&key).map_or_else(
            || Cow::Owned(self.missing_image(key)),
            Cow::Borrowed,
        )
    }

    /// A canonical-size placeholder for `key`.
    #[must_use]
    pub fn missing_image(&self, key: S::Key) -> Chunk {
        self.strategy.missing_image(key, self.tile_size)
    }

    /// The chunk stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &S::Key) -> Option<&Chunk> {
        self.entries.get(key)
    }

    /// Returns `true` if a chunk is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &S::Key) -> bool {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::index::{BrightnessIndex, ColorIndex, ColorKey};
    use crate::types::RgbImage;

    fn brightness_library() -> Library<BrightnessIndex> {
        Library::new(BrightnessIndex::new(5), 8, ResizeFilter::Triangle)
    }

    fn textured(width: u32, height: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 17 + y * 5 + seed * 41) % 200) as u8;
            Rgb([v, v.wrapping_add(20), v / 2])
        })
    }

    #[test]
    fn new_library_is_empty() {
        let library = brightness_library();
        assert!(library.is_empty());
        assert_eq!(library.len(), 0);
        assert_eq!(library.tile_size(), 8);
    }

    #[test]
    fn shrink_produces_canonical_size() {
        let library = brightness_library();
        let shrunk = library.shrink(&textured(40, 24, 0));
        assert_eq!(shrunk.dimensions(), (8, 8));
    }

    #[test]
    fn shrink_is_identity_on_canonical_chunks() {
        let library = brightness_library();
        let chunk = textured(8, 8, 3);
        assert_eq!(library.shrink(&chunk), chunk);
    }

    #[test]
    fn key_is_deterministic() {
        let library = brightness_library();
        let chunk = textured(33, 17, 9);
        assert_eq!(library.key_of(&chunk), library.key_of(&chunk));
    }

    #[test]
    fn add_then_find_returns_shrunk_chunk() {
        let mut library = brightness_library();
        let chunk = textured(16, 16, 1);
        library.add(&chunk);

        let found = library.find_nearest(&chunk);
        assert!(matches!(found, Cow::Borrowed(_)));
        assert_eq!(*found, library.shrink(&chunk));
    }

    #[test]
    fn miss_returns_flat_placeholder_for_bucket() {
        let library = brightness_library();
        let chunk = RgbImage::from_pixel(16, 16, Rgb([63, 63, 63]));
        let found = library.find_nearest(&chunk);
        assert!(matches!(found, Cow::Owned(_)));
        assert_eq!(found.dimensions(), (8, 8));
        // 63 floors to 60 with coarseness 5.
        assert!(found.as_raw().iter().all(|&s| s == 60));
    }

    #[test]
    fn colliding_insertions_overwrite() {
        let mut library = brightness_library();
        // Both chunks average 100 and land in the same bucket.
        let first = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let second = RgbImage::from_pixel(8, 8, Rgb([90, 110, 100]));
        let k1 = library.add(&first);
        let k2 = library.add(&second);
        assert_eq!(k1, k2);
        assert_eq!(library.len(), 1);
        assert_eq!(*library.find_nearest(&first), second);
    }

    #[test]
    fn distinct_buckets_grow_the_library() {
        let mut library = brightness_library();
        for v in [0_u8, 50, 100, 150, 200] {
            library.add(&RgbImage::from_pixel(8, 8, Rgb([v, v, v])));
        }
        assert_eq!(library.len(), 5);
        assert!(library.contains(&150));
        assert!(library.get(&151).is_none());
    }

    #[test]
    fn repeated_lookups_are_byte_identical() {
        let mut library = brightness_library();
        library.add(&textured(24, 24, 2));
        let query = textured(24, 24, 2);
        let a = library.find_nearest(&query).into_owned();
        let b = library.find_nearest(&query).into_owned();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn color_library_placeholder_matches_bucket() {
        let library = Library::new(ColorIndex::new(5), 4, ResizeFilter::Triangle);
        let query = RgbImage::from_pixel(4, 4, Rgb([12, 200, 99]));
        let key = library.key_of(&query);
        assert_eq!(
            key,
            ColorKey {
                red: 10,
                green: 200,
                blue: 100
            }
        );
        let found = library.find_nearest(&query);
        assert!(found.pixels().all(|p| *p == Rgb([10, 200, 100])));
    }
}
