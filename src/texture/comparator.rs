//! Tile comparison collaborator

use super::raster::RasterBuffer;
use super::tile::TileGrid;

/// Finds the tiles in which two equally sized rasters differ.
///
/// Implementations may run on a device queue, but `compare` must not return
/// before every flag has been written.
pub trait TileComparator {
    /// Set `dirty[index]` for every tile of `grid` containing at least one
    /// differing pixel. `dirty` holds one entry per tile, row-major, and
    /// arrives cleared.
    fn compare(
        &self,
        baseline: &RasterBuffer,
        current: &RasterBuffer,
        grid: TileGrid,
        dirty: &mut [bool],
    );
}

/// Row-by-row byte comparison on the CPU
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuTileComparator;

impl TileComparator for CpuTileComparator {
    fn compare(
        &self,
        baseline: &RasterBuffer,
        current: &RasterBuffer,
        grid: TileGrid,
        dirty: &mut [bool],
    ) {
        debug_assert_eq!(baseline.dimensions(), current.dimensions());
        debug_assert_eq!(dirty.len(), grid.tile_count());

        let stride = grid.width() as usize * 4;
        if stride == 0 {
            return;
        }
        let tile_bytes = grid.tile_size() as usize * 4;
        let columns = grid.columns() as usize;
        let old = baseline.as_raw();
        let new = current.as_raw();

        for (y, (old_row, new_row)) in old
            .chunks_exact(stride)
            .zip(new.chunks_exact(stride))
            .enumerate()
        {
            if old_row == new_row {
                continue;
            }
            let row_base = (y / grid.tile_size() as usize) * columns;
            for (column, (old_span, new_span)) in old_row
                .chunks(tile_bytes)
                .zip(new_row.chunks(tile_bytes))
                .enumerate()
            {
                if old_span != new_span {
                    dirty[row_base + column] = true;
                }
            }
        }
    }
}
