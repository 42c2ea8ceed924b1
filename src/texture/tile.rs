//! Tile grid math shared by delta extraction and application

/// Pixel rectangle covered by one tile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Square tiling of a `width x height` raster.
///
/// The grid is `ceil(width / tile_size)` columns by `ceil(height / tile_size)`
/// rows. Tiles on the right and bottom edge are clipped to the raster instead
/// of being padded. Tile indices run row-major: `row * columns + column`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        debug_assert!(tile_size > 0, "tile size must be non-zero");
        Self {
            width,
            height,
            tile_size: tile_size.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.tile_size)
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.tile_size)
    }

    pub fn tile_count(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Index of the tile at `(column, row)`
    pub fn tile_index(&self, column: u32, row: u32) -> u32 {
        row * self.columns() + column
    }

    /// Index of the tile containing pixel `(x, y)`
    pub fn tile_at(&self, x: u32, y: u32) -> u32 {
        self.tile_index(x / self.tile_size, y / self.tile_size)
    }

    /// Pixel rectangle of a tile, clipped to the raster bounds.
    ///
    /// Returns `None` for indices outside the grid.
    pub fn tile_rect(&self, index: u32) -> Option<TileRect> {
        let columns = self.columns();
        if columns == 0 || index as usize >= self.tile_count() {
            return None;
        }

        let x = (index % columns) * self.tile_size;
        let y = (index / columns) * self.tile_size;
        Some(TileRect {
            x,
            y,
            width: self.tile_size.min(self.width - x),
            height: self.tile_size.min(self.height - y),
        })
    }
}
