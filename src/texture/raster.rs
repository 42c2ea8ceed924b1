//! Raster buffers and the texture store
//!
//! Every copy here is an exact byte copy of RGBA8 rows. Nothing is resampled
//! or filtered.

use super::tile::TileRect;
use image::{ImageBuffer, RgbaImage};
use std::collections::HashMap;
use std::fmt;

/// Mutable raster resource tracked by the editor (paint masks, bake targets)
pub type RasterBuffer = RgbaImage;

const BYTES_PER_PIXEL: usize = 4;

/// Identity of a texture in a [`TextureStore`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

impl TextureId {
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Name under which the tile diff engine keeps this texture's baseline
    pub fn baseline_key(self) -> String {
        format!("texture{}", self)
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A raster plus the bookkeeping a renderer needs to keep its copy current
pub struct StoredTexture {
    pub name: String,
    pub raster: RasterBuffer,

    /// Bumped whenever an edit to this texture is committed or reverted
    pub revision: u64,
}

/// Named raster resources owned by a document
#[derive(Default)]
pub struct TextureStore {
    textures: HashMap<TextureId, StoredTexture>,
    next_id: u32,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster and return its id
    pub fn insert(&mut self, name: impl Into<String>, raster: RasterBuffer) -> TextureId {
        self.next_id += 1;
        let id = TextureId(self.next_id);
        self.textures.insert(
            id,
            StoredTexture {
                name: name.into(),
                raster,
                revision: 0,
            },
        );
        id
    }

    pub fn get(&self, id: TextureId) -> Option<&StoredTexture> {
        self.textures.get(&id)
    }

    pub fn raster(&self, id: TextureId) -> Option<&RasterBuffer> {
        self.textures.get(&id).map(|texture| &texture.raster)
    }

    pub fn raster_mut(&mut self, id: TextureId) -> Option<&mut RasterBuffer> {
        self.textures.get_mut(&id).map(|texture| &mut texture.raster)
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    /// Record that the texture's contents changed and need re-uploading
    pub fn mark_modified(&mut self, id: TextureId) {
        if let Some(texture) = self.textures.get_mut(&id) {
            texture.revision += 1;
        }
    }

    pub fn revision(&self, id: TextureId) -> Option<u64> {
        self.textures.get(&id).map(|texture| texture.revision)
    }
}

/// Allocate a zeroed raster without aborting on allocation failure
pub fn try_allocate_raster(width: u32, height: u32) -> Option<RasterBuffer> {
    let len = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)?;

    let mut data = Vec::new();
    if let Err(e) = data.try_reserve_exact(len) {
        log::warn!(
            "Failed to allocate {}x{} raster ({} bytes): {}",
            width,
            height,
            len,
            e
        );
        return None;
    }
    data.resize(len, 0);
    ImageBuffer::from_raw(width, height, data)
}

/// Copy the whole of `src` into `dst`. Both must have the same dimensions.
pub fn copy_full_resource(dst: &mut RasterBuffer, src: &RasterBuffer) {
    debug_assert_eq!(dst.dimensions(), src.dimensions());
    let dst_bytes: &mut [u8] = dst;
    dst_bytes.copy_from_slice(src.as_raw());
}

/// Copy the `src_box` region of `src` into `dst` with its top-left corner at
/// `dst_offset`.
pub fn copy_subregion(
    dst: &mut RasterBuffer,
    dst_offset: (u32, u32),
    src: &RasterBuffer,
    src_box: TileRect,
) {
    debug_assert!(src_box.x + src_box.width <= src.width());
    debug_assert!(src_box.y + src_box.height <= src.height());
    debug_assert!(dst_offset.0 + src_box.width <= dst.width());
    debug_assert!(dst_offset.1 + src_box.height <= dst.height());

    let src_stride = src.width() as usize * BYTES_PER_PIXEL;
    let dst_stride = dst.width() as usize * BYTES_PER_PIXEL;
    let row_bytes = src_box.width as usize * BYTES_PER_PIXEL;

    let src_bytes = src.as_raw();
    let dst_bytes: &mut [u8] = dst;

    for row in 0..src_box.height as usize {
        let src_start =
            (src_box.y as usize + row) * src_stride + src_box.x as usize * BYTES_PER_PIXEL;
        let dst_start =
            (dst_offset.1 as usize + row) * dst_stride + dst_offset.0 as usize * BYTES_PER_PIXEL;
        dst_bytes[dst_start..dst_start + row_bytes]
            .copy_from_slice(&src_bytes[src_start..src_start + row_bytes]);
    }
}

/// Copy a region of `src` out into a raster of its own
pub fn extract_region(src: &RasterBuffer, rect: TileRect) -> RasterBuffer {
    let mut region = RgbaImage::new(rect.width, rect.height);
    copy_subregion(&mut region, (0, 0), src, rect);
    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RasterBuffer {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_try_allocate_raster() {
        let raster = try_allocate_raster(8, 4).unwrap();
        assert_eq!(raster.dimensions(), (8, 4));
        assert!(raster.as_raw().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_try_allocate_raster_overflow() {
        assert!(try_allocate_raster(u32::MAX, u32::MAX).is_none());
    }

    #[test]
    fn test_copy_full_resource() {
        let src = gradient(5, 3);
        let mut dst = RgbaImage::new(5, 3);
        copy_full_resource(&mut dst, &src);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_extract_and_copy_back_region() {
        let src = gradient(10, 10);
        let rect = TileRect {
            x: 2,
            y: 3,
            width: 4,
            height: 2,
        };

        let region = extract_region(&src, rect);
        assert_eq!(region.dimensions(), (4, 2));
        assert_eq!(region.get_pixel(0, 0), &Rgba([2, 3, 0, 255]));
        assert_eq!(region.get_pixel(3, 1), &Rgba([5, 4, 0, 255]));

        let mut dst = RgbaImage::new(10, 10);
        copy_subregion(
            &mut dst,
            (2, 3),
            &region,
            TileRect {
                x: 0,
                y: 0,
                width: 4,
                height: 2,
            },
        );
        assert_eq!(dst.get_pixel(5, 4), src.get_pixel(5, 4));
        assert_eq!(dst.get_pixel(6, 4), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_store_revision() {
        let mut store = TextureStore::new();
        let id = store.insert("mask", RgbaImage::new(4, 4));
        assert_eq!(store.revision(id), Some(0));

        store.mark_modified(id);
        assert_eq!(store.revision(id), Some(1));
        assert_eq!(store.get(id).unwrap().name, "mask");
    }
}
