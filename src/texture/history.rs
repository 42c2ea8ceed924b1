//! Tile diff engine
//!
//! ## Lifecycle
//!
//! Each named resource moves through:
//!
//! ```text
//! [no snapshot] --start_snapshot--> [baseline held] --create_delta--> [delta ready]
//!       ^                                                                  |
//!       +-------------------------- end_snapshot --------------------------+
//! ```
//!
//! `start_snapshot` copies the resource into a baseline. After the resource
//! has been edited, `create_delta` asks the comparator which tiles differ and
//! copies those tiles out of the baseline. The delta therefore holds what has
//! to be written back to undo the edit, and costs memory proportional to the
//! number of touched tiles rather than to the size of the resource.

use super::comparator::{CpuTileComparator, TileComparator};
use super::raster::{copy_full_resource, copy_subregion, extract_region, try_allocate_raster, RasterBuffer};
use super::tile::{TileGrid, TileRect};
use std::collections::{BTreeMap, HashMap};

/// Describes a baseline that is ready for diffing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotHandle {
    grid: TileGrid,
}

impl SnapshotHandle {
    pub fn grid(&self) -> TileGrid {
        self.grid
    }
}

/// Baseline copy of a resource plus one dirty flag per tile
struct TextureSnapshot {
    baseline: RasterBuffer,
    dirty: Vec<bool>,
    grid: TileGrid,
}

/// Stored payload of one tile
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaTile {
    pub index: u32,
    pub pixels: RasterBuffer,
}

/// Sparse set of tiles that patches a resource back to an earlier state.
///
/// Tiles are kept in ascending index order. A delta without tiles is a valid
/// "nothing changed" value.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureDelta {
    width: u32,
    height: u32,
    tile_size: u32,
    tiles: Vec<DeltaTile>,
}

impl TextureDelta {
    /// Delta that changes nothing on a `width x height` resource
    pub fn empty(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            tile_size,
            tiles: Vec::new(),
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

    pub fn grid(&self) -> TileGrid {
        TileGrid::new(self.width, self.height, self.tile_size)
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[DeltaTile] {
        &self.tiles
    }

    pub fn tile_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.tiles.iter().map(|tile| tile.index)
    }

    /// Bytes of pixel payload held by this delta
    pub fn byte_size(&self) -> usize {
        self.tiles.iter().map(|tile| tile.pixels.as_raw().len()).sum()
    }

    /// Whether `resource` has the dimensions this delta was recorded against
    pub fn matches(&self, resource: &RasterBuffer) -> bool {
        resource.dimensions() == (self.width, self.height)
    }

    /// Write every stored tile back into `resource`.
    ///
    /// Returns `false` without touching `resource` if its dimensions changed
    /// since the delta was recorded.
    pub fn apply_to(&self, resource: &mut RasterBuffer) -> bool {
        if !self.matches(resource) {
            log::debug!(
                "Skipping texture delta: recorded for {}x{}, resource is {}x{}",
                self.width,
                self.height,
                resource.width(),
                resource.height()
            );
            return false;
        }

        let grid = self.grid();
        for tile in &self.tiles {
            let Some(rect) = grid.tile_rect(tile.index) else {
                log::warn!("Texture delta tile {} lies outside the grid", tile.index);
                continue;
            };
            debug_assert_eq!(tile.pixels.dimensions(), (rect.width, rect.height));

            let payload = TileRect {
                x: 0,
                y: 0,
                width: rect.width,
                height: rect.height,
            };
            copy_subregion(resource, (rect.x, rect.y), &tile.pixels, payload);
        }
        true
    }

    /// Copy the current contents of this delta's tiles out of `resource`.
    ///
    /// Applying the result after `apply_to` puts `resource` back the way it
    /// is now. Returns `None` on a dimension mismatch.
    pub fn capture_inverse(&self, resource: &RasterBuffer) -> Option<TextureDelta> {
        if !self.matches(resource) {
            return None;
        }

        let grid = self.grid();
        let tiles = self
            .tiles
            .iter()
            .filter_map(|tile| {
                let rect = grid.tile_rect(tile.index)?;
                Some(DeltaTile {
                    index: tile.index,
                    pixels: extract_region(resource, rect),
                })
            })
            .collect();

        Some(TextureDelta {
            width: self.width,
            height: self.height,
            tile_size: self.tile_size,
            tiles,
        })
    }

    /// Whether `other` was recorded against a resource of the same shape
    pub fn is_compatible(&self, other: &TextureDelta) -> bool {
        (self.width, self.height, self.tile_size) == (other.width, other.height, other.tile_size)
    }

    /// Fold an older delta of the same resource into this one, draining it.
    ///
    /// The result covers the union of both tile sets; where both recorded a
    /// tile, the older payload wins so that applying the result goes back to
    /// the state before the older edit. Incompatible deltas are left alone.
    #[must_use = "returns whether the deltas were compatible"]
    pub fn absorb_older(&mut self, older: &mut TextureDelta) -> bool {
        if !self.is_compatible(older) {
            return false;
        }

        let mut merged: BTreeMap<u32, RasterBuffer> = self
            .tiles
            .drain(..)
            .map(|tile| (tile.index, tile.pixels))
            .collect();
        for tile in older.tiles.drain(..) {
            merged.insert(tile.index, tile.pixels);
        }

        self.tiles = merged
            .into_iter()
            .map(|(index, pixels)| DeltaTile { index, pixels })
            .collect();
        true
    }
}

/// Named baselines of mutable rasters and the comparator used to diff them
pub struct TextureHistory {
    snapshots: HashMap<String, TextureSnapshot>,
    comparator: Box<dyn TileComparator>,
    tile_size: u32,
}

impl TextureHistory {
    /// Create a history that compares tiles on the CPU
    pub fn new(tile_size: u32) -> Self {
        Self::with_comparator(tile_size, Box::new(CpuTileComparator))
    }

    pub fn with_comparator(tile_size: u32, comparator: Box<dyn TileComparator>) -> Self {
        Self {
            snapshots: HashMap::new(),
            comparator,
            tile_size: tile_size.max(1),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn has_snapshot(&self, name: &str) -> bool {
        self.snapshots.contains_key(name)
    }

    /// Copy `resource` into the baseline registered under `name`.
    ///
    /// The baseline storage is reused while the resource keeps its
    /// dimensions; `force_fresh` discards it first. Returns `None` if the
    /// baseline could not be allocated, in which case edits to this resource
    /// are simply not undoable.
    pub fn start_snapshot(
        &mut self,
        name: &str,
        resource: &RasterBuffer,
        force_fresh: bool,
    ) -> Option<SnapshotHandle> {
        if force_fresh {
            self.snapshots.remove(name);
        }

        let reusable = self
            .snapshots
            .get(name)
            .is_some_and(|snapshot| snapshot.baseline.dimensions() == resource.dimensions());

        if !reusable {
            self.snapshots.remove(name);

            let (width, height) = resource.dimensions();
            let Some(baseline) = try_allocate_raster(width, height) else {
                log::warn!("Texture snapshot '{}' unavailable, undo disabled for it", name);
                return None;
            };
            let grid = TileGrid::new(width, height, self.tile_size);
            log::debug!(
                "Allocated texture baseline '{}' ({}x{}, {} tiles)",
                name,
                width,
                height,
                grid.tile_count()
            );
            self.snapshots.insert(
                name.to_string(),
                TextureSnapshot {
                    baseline,
                    dirty: vec![false; grid.tile_count()],
                    grid,
                },
            );
        }

        let snapshot = self.snapshots.get_mut(name)?;
        copy_full_resource(&mut snapshot.baseline, resource);
        snapshot.dirty.fill(false);

        Some(SnapshotHandle {
            grid: snapshot.grid,
        })
    }

    /// Diff `resource` against the baseline registered under `name` and
    /// collect the baseline content of every changed tile.
    ///
    /// Without a baseline, or when nothing changed, the result is an empty
    /// delta.
    pub fn create_delta(&mut self, name: &str, resource: &RasterBuffer) -> TextureDelta {
        let (width, height) = resource.dimensions();
        let mut delta = TextureDelta::empty(width, height, self.tile_size);

        let Some(snapshot) = self.snapshots.get_mut(name) else {
            return delta;
        };
        if snapshot.baseline.dimensions() != (width, height) {
            log::warn!(
                "Texture '{}' was resized since its snapshot, no delta recorded",
                name
            );
            return delta;
        }

        snapshot.dirty.fill(false);
        self.comparator
            .compare(&snapshot.baseline, resource, snapshot.grid, &mut snapshot.dirty);

        let grid = snapshot.grid;
        delta.tile_size = grid.tile_size();
        let dirty_tiles = snapshot
            .dirty
            .iter()
            .enumerate()
            .filter_map(|(index, &dirty)| dirty.then_some(index as u32));
        for index in dirty_tiles {
            if let Some(rect) = grid.tile_rect(index) {
                delta.tiles.push(DeltaTile {
                    index,
                    pixels: extract_region(&snapshot.baseline, rect),
                });
            }
        }

        log::debug!(
            "Texture '{}': {} of {} tiles changed ({} bytes)",
            name,
            delta.tiles.len(),
            grid.tile_count(),
            delta.byte_size()
        );
        delta
    }

    /// Write a delta back into `resource`; a dimension mismatch is a no-op
    pub fn apply_delta(&self, resource: &mut RasterBuffer, delta: &TextureDelta) -> bool {
        delta.apply_to(resource)
    }

    /// Drop the baseline registered under `name`
    pub fn end_snapshot(&mut self, name: &str) {
        if self.snapshots.remove(name).is_some() {
            log::debug!("Released texture baseline '{}'", name);
        }
    }
}

impl Default for TextureHistory {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_TILE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::cell::Cell;
    use std::rc::Rc;

    fn noise(width: u32, height: u32) -> RasterBuffer {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 + y) as u8, (y * 13) as u8, (x ^ y) as u8, 255])
        })
    }

    fn paint(raster: &mut RasterBuffer, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                raster.put_pixel(x, y, Rgba([255, 0, 255, 255]));
            }
        }
    }

    #[test]
    fn test_round_trip_single_tile() {
        let mut history = TextureHistory::new(64);
        let mut raster = noise(256, 192);
        let original = raster.clone();

        let handle = history.start_snapshot("mask", &raster, false).unwrap();
        assert_eq!(handle.grid().tile_count(), 12);

        paint(&mut raster, 70, 70, 90, 80);
        let delta = history.create_delta("mask", &raster);

        assert_eq!(delta.tile_indices().collect::<Vec<_>>(), vec![5]);
        assert!(history.apply_delta(&mut raster, &delta));
        assert_eq!(raster, original);
    }

    #[test]
    fn test_unmodified_resource_gives_empty_delta() {
        let mut history = TextureHistory::new(64);
        let mut raster = noise(100, 100);
        let original = raster.clone();

        history.start_snapshot("mask", &raster, false).unwrap();
        let delta = history.create_delta("mask", &raster);

        assert!(delta.is_empty());
        assert_eq!((delta.width(), delta.height()), (100, 100));
        assert!(history.apply_delta(&mut raster, &delta));
        assert_eq!(raster, original);
    }

    #[test]
    fn test_delta_without_baseline_is_empty() {
        let mut history = TextureHistory::new(64);
        let raster = noise(32, 32);
        assert!(history.create_delta("missing", &raster).is_empty());
    }

    #[test]
    fn test_tiles_are_ascending_and_edge_tiles_clipped() {
        let mut history = TextureHistory::new(64);
        let mut raster = noise(130, 130);
        let original = raster.clone();

        history.start_snapshot("mask", &raster, false).unwrap();
        paint(&mut raster, 129, 129, 130, 130);
        paint(&mut raster, 0, 0, 2, 2);
        let delta = history.create_delta("mask", &raster);

        assert_eq!(delta.tile_indices().collect::<Vec<_>>(), vec![0, 8]);
        assert_eq!(delta.tiles()[1].pixels.dimensions(), (2, 2));

        assert!(delta.apply_to(&mut raster));
        assert_eq!(raster, original);
    }

    #[test]
    fn test_apply_rejects_dimension_mismatch() {
        let mut history = TextureHistory::new(16);
        let mut raster = noise(32, 32);
        history.start_snapshot("mask", &raster, false).unwrap();
        paint(&mut raster, 0, 0, 4, 4);
        let delta = history.create_delta("mask", &raster);
        assert!(!delta.is_empty());

        let mut other = noise(48, 32);
        let before = other.clone();
        assert!(!history.apply_delta(&mut other, &delta));
        assert_eq!(other, before);
    }

    #[test]
    fn test_restart_reuses_baseline_and_takes_new_contents() {
        let mut history = TextureHistory::new(32);
        let mut raster = noise(64, 64);

        history.start_snapshot("mask", &raster, false).unwrap();
        paint(&mut raster, 0, 0, 8, 8);
        history.start_snapshot("mask", &raster, false).unwrap();

        // Baseline now includes the first stroke
        assert!(history.create_delta("mask", &raster).is_empty());
    }

    #[test]
    fn test_force_fresh_retakes_baseline() {
        let mut history = TextureHistory::new(32);
        let mut raster = noise(64, 64);

        history.start_snapshot("mask", &raster, false).unwrap();
        paint(&mut raster, 0, 0, 8, 8);
        let first_stroke = raster.clone();

        let handle = history.start_snapshot("mask", &raster, true).unwrap();
        assert!(history.has_snapshot("mask"));
        assert_eq!(handle.grid().tile_count(), 4);
        assert!(history.create_delta("mask", &raster).is_empty());

        paint(&mut raster, 40, 40, 48, 48);
        let delta = history.create_delta("mask", &raster);
        assert_eq!(delta.tile_indices().collect::<Vec<_>>(), vec![3]);
        assert!(history.apply_delta(&mut raster, &delta));
        assert_eq!(raster, first_stroke);
    }

    #[test]
    fn test_resize_replaces_baseline() {
        let mut history = TextureHistory::new(32);
        history.start_snapshot("mask", &noise(64, 64), false).unwrap();

        let bigger = noise(96, 64);
        let handle = history.start_snapshot("mask", &bigger, false).unwrap();
        assert_eq!(handle.grid().columns(), 3);
        assert!(history.create_delta("mask", &bigger).is_empty());
    }

    #[test]
    fn test_end_snapshot_discards_baseline() {
        let mut history = TextureHistory::new(32);
        let mut raster = noise(64, 64);
        history.start_snapshot("mask", &raster, false).unwrap();
        history.end_snapshot("mask");
        assert!(!history.has_snapshot("mask"));

        paint(&mut raster, 0, 0, 8, 8);
        assert!(history.create_delta("mask", &raster).is_empty());
    }

    #[test]
    fn test_capture_inverse_round_trip() {
        let mut history = TextureHistory::new(32);
        let mut raster = noise(64, 64);
        let original = raster.clone();

        history.start_snapshot("mask", &raster, false).unwrap();
        paint(&mut raster, 40, 40, 50, 50);
        let edited = raster.clone();
        let undo = history.create_delta("mask", &raster);

        let redo = undo.capture_inverse(&raster).unwrap();
        assert!(undo.apply_to(&mut raster));
        assert_eq!(raster, original);
        assert!(redo.apply_to(&mut raster));
        assert_eq!(raster, edited);
    }

    #[test]
    fn test_absorb_older_keeps_oldest_payload() {
        let mut history = TextureHistory::new(32);
        let mut raster = noise(64, 64);
        let original = raster.clone();

        history.start_snapshot("mask", &raster, false).unwrap();
        paint(&mut raster, 0, 0, 4, 4);
        let mut older = history.create_delta("mask", &raster);

        history.start_snapshot("mask", &raster, false).unwrap();
        paint(&mut raster, 0, 0, 40, 4);
        let mut newer = history.create_delta("mask", &raster);

        assert!(newer.absorb_older(&mut older));
        assert!(older.is_empty());
        assert_eq!(newer.tile_indices().collect::<Vec<_>>(), vec![0, 1]);
        assert!(newer.apply_to(&mut raster));
        assert_eq!(raster, original);
    }

    #[test]
    fn test_absorb_older_rejects_other_dimensions() {
        let mut delta = TextureDelta::empty(64, 64, 32);
        let mut other = TextureDelta::empty(32, 64, 32);
        assert!(!delta.absorb_older(&mut other));
    }

    struct CountingComparator {
        calls: Rc<Cell<usize>>,
    }

    impl TileComparator for CountingComparator {
        fn compare(
            &self,
            baseline: &RasterBuffer,
            current: &RasterBuffer,
            grid: TileGrid,
            dirty: &mut [bool],
        ) {
            self.calls.set(self.calls.get() + 1);
            CpuTileComparator.compare(baseline, current, grid, dirty);
        }
    }

    #[test]
    fn test_custom_comparator_is_used() {
        let calls = Rc::new(Cell::new(0));
        let mut history = TextureHistory::with_comparator(
            16,
            Box::new(CountingComparator {
                calls: Rc::clone(&calls),
            }),
        );
        let raster = noise(32, 32);
        history.start_snapshot("mask", &raster, false).unwrap();
        history.create_delta("mask", &raster);
        assert_eq!(calls.get(), 1);
    }
}
