//! Texture storage and tile-granularity deltas for raster undo

mod comparator;
mod history;
mod raster;
mod tile;

pub use comparator::{CpuTileComparator, TileComparator};
pub use history::{DeltaTile, SnapshotHandle, TextureDelta, TextureHistory};
pub use raster::{
    copy_full_resource, copy_subregion, extract_region, try_allocate_raster, RasterBuffer,
    StoredTexture, TextureId, TextureStore,
};
pub use tile::{TileGrid, TileRect};
