//! The canonical tile grid.
//!
//! Walks the frame row by row (outer loop over `y`, inner over `x`) in
//! steps of `tile_size`. If a frame side is not a multiple of the tile
//! size, the last row and column are clipped to the frame edge, so the
//! tiles always partition the frame exactly.

use crate::tile::Tile;
use crate::types::{Dimensions, Rect};

/// Rectangles of the canonical grid, in traversal order.
///
/// Returns an empty grid if either the frame or the tile size is zero.
#[must_use]
pub fn grid_rects(frame: Dimensions, tile_size: u32) -> Vec<Rect> {
    if tile_size == 0 || frame.width == 0 || frame.height == 0 {
        return Vec::new();
    }

    let columns = frame.width.div_ceil(tile_size);
    let rows = frame.height.div_ceil(tile_size);
    let mut rects = Vec::with_capacity((columns * rows) as usize);

    for y1 in (0..frame.height).step_by(tile_size as usize) {
        let y2 = (y1 + tile_size).min(frame.height);
        for x1 in (0..frame.width).step_by(tile_size as usize) {
            let x2 = (x1 + tile_size).min(frame.width);
            rects.push(Rect::new(y1, y2, x1, x2));
        }
    }
    rects
}

/// Build the canonical grid of tiles, all last refreshed at `now`.
#[must_use]
pub fn tile_grid<T: Copy>(frame: Dimensions, tile_size: u32, now: T) -> Vec<Tile<T>> {
    grid_rects(frame, tile_size)
        .into_iter()
        .map(|rect| Tile::new(rect, now))
        .collect()
}

/// Returns `true` if `frame` is not a whole number of tiles wide and high.
#[must_use]
pub const fn has_clipped_edges(frame: Dimensions, tile_size: u32) -> bool {
    tile_size != 0 && (frame.width % tile_size != 0 || frame.height % tile_size != 0)
}
