//! Regular-grid tiling of a volume into clipped, possibly overlapping patches

use crate::error::InferError;
use livseg_data::{Coordinate, SpatialShape};
use ndarray::{ArrayView4, s};
use tracing::debug;

/// Origins of every patch on a regular grid over a volume.
///
/// Origins step from 0 by `stride` on each axis while they stay inside the
/// volume, and are yielded z-major, then y, then x.
#[derive(Debug, Clone)]
pub struct PatchGrid {
    volume: SpatialShape,
    patch_size: SpatialShape,
    stride: SpatialShape,
    steps: [usize; 3],
    next: usize,
}

fn require_non_empty(what: &str, shape: SpatialShape) -> Result<(), InferError> {
    if shape.is_empty() {
        return Err(InferError::InvalidArgument(format!(
            "{} must be at least 1 on every axis, got {}",
            what, shape
        )));
    }
    Ok(())
}

impl PatchGrid {
    /// Build the grid for a volume of spatial shape `volume`.
    pub fn new(
        volume: SpatialShape,
        patch_size: SpatialShape,
        stride: SpatialShape,
    ) -> Result<Self, InferError> {
        require_non_empty("volume extent", volume)?;
        require_non_empty("patch size", patch_size)?;
        require_non_empty("stride", stride)?;

        let steps = [
            volume.depth.div_ceil(stride.depth),
            volume.height.div_ceil(stride.height),
            volume.width.div_ceil(stride.width),
        ];

        Ok(Self {
            volume,
            patch_size,
            stride,
            steps,
            next: 0,
        })
    }

    /// Total number of patches on the grid, independent of iteration progress.
    ///
    /// `Iterator::len` counts only the origins not yet yielded.
    pub fn patch_count(&self) -> usize {
        self.steps.iter().product()
    }

    pub fn volume(&self) -> SpatialShape {
        self.volume
    }

    pub fn patch_size(&self) -> SpatialShape {
        self.patch_size
    }

    pub fn stride(&self) -> SpatialShape {
        self.stride
    }

    /// Origin of the `index`-th patch in generation order.
    pub fn coordinate(&self, index: usize) -> Option<Coordinate> {
        if index >= self.patch_count() {
            return None;
        }
        let [_, ny, nx] = self.steps;
        let iz = index / (ny * nx);
        let iy = (index / nx) % ny;
        let ix = index % nx;
        Some(Coordinate::new(
            iz * self.stride.depth,
            iy * self.stride.height,
            ix * self.stride.width,
        ))
    }

    /// Extent of the patch at `origin` after clipping to the volume.
    ///
    /// Zero on an axis when the origin lies outside the volume.
    pub fn extent_at(&self, origin: Coordinate) -> SpatialShape {
        SpatialShape::new(
            self.patch_size.depth.min(self.volume.depth.saturating_sub(origin.z)),
            self.patch_size.height.min(self.volume.height.saturating_sub(origin.y)),
            self.patch_size.width.min(self.volume.width.saturating_sub(origin.x)),
        )
    }

    /// Borrow the clipped patch at `origin` out of `volume`.
    ///
    /// An origin outside the volume yields an empty view.
    pub fn patch<'a>(&self, volume: &ArrayView4<'a, f32>, origin: Coordinate) -> ArrayView4<'a, f32> {
        let extent = self.extent_at(origin);
        let z = origin.z.min(self.volume.depth);
        let y = origin.y.min(self.volume.height);
        let x = origin.x.min(self.volume.width);
        volume.clone().slice_move(s![
            ..,
            z..z + extent.depth,
            y..y + extent.height,
            x..x + extent.width
        ])
    }
}

impl Iterator for PatchGrid {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        let coordinate = self.coordinate(self.next)?;
        self.next += 1;
        Some(coordinate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.patch_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PatchGrid {}

/// Split `volume` into clipped patches on a regular grid.
///
/// Returns the patches and their origins as two positionally paired
/// sequences in z-major, y, x order. Patches borrow from `volume`; edge
/// patches are smaller than `patch_size` instead of padded.
#[tracing::instrument(skip_all, fields(shape = ?volume.dim()))]
pub fn tile<'a>(
    volume: ArrayView4<'a, f32>,
    patch_size: SpatialShape,
    stride: SpatialShape,
) -> Result<(Vec<ArrayView4<'a, f32>>, Vec<Coordinate>), InferError> {
    if volume.dim().0 == 0 {
        return Err(InferError::InvalidArgument(
            "volume must have at least one channel".to_string(),
        ));
    }

    let grid = PatchGrid::new(SpatialShape::of(&volume), patch_size, stride)?;
    let mut patches = Vec::with_capacity(grid.patch_count());
    let mut coordinates = Vec::with_capacity(grid.patch_count());

    for origin in grid.clone() {
        patches.push(grid.patch(&volume, origin));
        coordinates.push(origin);
    }

    debug!(
        "Tiled {} into {} patches (patch {}, stride {})",
        grid.volume(),
        patches.len(),
        patch_size,
        stride
    );
    Ok((patches, coordinates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use livseg_data::Volume;

    fn ramp(shape: (usize, usize, usize, usize)) -> Volume {
        Volume::from_shape_fn(shape, |(c, z, y, x)| (c * 1000 + z * 100 + y * 10 + x) as f32)
    }

    #[test]
    fn test_tile_generation_order() {
        let volume = ramp((1, 4, 4, 4));
        let (patches, coords) = tile(volume.view(), SpatialShape::cube(2), SpatialShape::cube(2)).unwrap();

        assert_eq!(patches.len(), 8);
        assert_eq!(coords.len(), 8);
        let expected: Vec<Coordinate> = [
            (0, 0, 0),
            (0, 0, 2),
            (0, 2, 0),
            (0, 2, 2),
            (2, 0, 0),
            (2, 0, 2),
            (2, 2, 0),
            (2, 2, 2),
        ]
        .into_iter()
        .map(Coordinate::from)
        .collect();
        assert_eq!(coords, expected);
    }

    #[test]
    fn test_tile_patch_contents_match_origin() {
        let volume = ramp((2, 5, 5, 5));
        let (patches, coords) = tile(volume.view(), SpatialShape::cube(3), SpatialShape::cube(2)).unwrap();

        for (patch, origin) in patches.iter().zip(&coords) {
            assert_eq!(patch.dim().0, 2);
            assert_eq!(patch[[1, 0, 0, 0]], volume[[1, origin.z, origin.y, origin.x]]);
        }
    }

    #[test]
    fn test_tile_boundary_clipping() {
        let volume = Volume::zeros((1, 10, 10, 10));
        let (patches, coords) = tile(volume.view(), SpatialShape::cube(4), SpatialShape::cube(4)).unwrap();

        // Origins 0, 4, 8 on each axis.
        assert_eq!(patches.len(), 27);
        let last = patches.last().unwrap();
        assert_eq!(*coords.last().unwrap(), Coordinate::new(8, 8, 8));
        assert_eq!(last.dim(), (1, 2, 2, 2));

        let (_, d, h, w) = patches[0].dim();
        assert_eq!((d, h, w), (4, 4, 4));

        // Mixed edge: full along z/y, clipped along x.
        assert_eq!(coords[2], Coordinate::new(0, 0, 8));
        assert_eq!(patches[2].dim(), (1, 4, 4, 2));
    }

    #[test]
    fn test_tile_overlapping_count() {
        let volume = Volume::zeros((1, 16, 12, 9));
        let (patches, _) = tile(
            volume.view(),
            SpatialShape::cube(6),
            SpatialShape::new(4, 3, 2),
        )
        .unwrap();
        // ceil(16/4) * ceil(12/3) * ceil(9/2)
        assert_eq!(patches.len(), 4 * 4 * 5);
    }

    #[test]
    fn test_tile_stride_larger_than_patch() {
        let volume = ramp((1, 1, 1, 10));
        let (patches, coords) = tile(
            volume.view(),
            SpatialShape::new(1, 1, 2),
            SpatialShape::new(1, 1, 5),
        )
        .unwrap();
        assert_eq!(coords, vec![Coordinate::new(0, 0, 0), Coordinate::new(0, 0, 5)]);
        assert_eq!(patches[1].iter().copied().collect::<Vec<_>>(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_tile_patch_larger_than_volume() {
        let volume = Volume::ones((1, 3, 3, 3));
        let (patches, coords) = tile(volume.view(), SpatialShape::cube(96), SpatialShape::cube(8)).unwrap();
        assert_eq!(coords, vec![Coordinate::origin()]);
        assert_eq!(patches[0].dim(), (1, 3, 3, 3));
    }

    #[test]
    fn test_tile_rejects_zero_sizes() {
        let volume = Volume::zeros((1, 4, 4, 4));
        let zero_patch = tile(volume.view(), SpatialShape::new(0, 2, 2), SpatialShape::cube(2));
        assert!(matches!(zero_patch, Err(InferError::InvalidArgument(_))));

        let zero_stride = tile(volume.view(), SpatialShape::cube(2), SpatialShape::new(2, 2, 0));
        assert!(matches!(zero_stride, Err(InferError::InvalidArgument(_))));

        let empty = Volume::zeros((1, 0, 4, 4));
        let empty_volume = tile(empty.view(), SpatialShape::cube(2), SpatialShape::cube(2));
        assert!(matches!(empty_volume, Err(InferError::InvalidArgument(_))));

        let no_channels = Volume::zeros((0, 4, 4, 4));
        assert!(tile(no_channels.view(), SpatialShape::cube(2), SpatialShape::cube(2)).is_err());
    }

    #[test]
    fn test_grid_is_exact_size() {
        let mut grid = PatchGrid::new(
            SpatialShape::new(10, 10, 10),
            SpatialShape::cube(4),
            SpatialShape::cube(4),
        )
        .unwrap();
        assert_eq!(grid.patch_count(), 27);
        assert_eq!(grid.len(), 27);
        grid.next();
        assert_eq!(grid.len(), 26);
        assert_eq!(grid.patch_count(), 27);
        assert_eq!(grid.coordinate(26), Some(Coordinate::new(8, 8, 8)));
        assert_eq!(grid.coordinate(27), None);
    }

    #[test]
    fn test_grid_extent_outside_volume() {
        let grid = PatchGrid::new(SpatialShape::cube(4), SpatialShape::cube(2), SpatialShape::cube(2)).unwrap();
        assert!(grid.extent_at(Coordinate::new(5, 0, 0)).is_empty());
        assert_eq!(grid.extent_at(Coordinate::new(3, 3, 3)), SpatialShape::cube(1));
    }

    #[test]
    fn test_grid_patch_outside_volume_is_empty() {
        let volume = ramp((2, 4, 4, 4));
        let grid = PatchGrid::new(SpatialShape::cube(4), SpatialShape::cube(2), SpatialShape::cube(2)).unwrap();

        let beyond = grid.patch(&volume.view(), Coordinate::new(5, 0, 0));
        assert_eq!(beyond.dim(), (2, 0, 2, 2));
        assert_eq!(beyond.len(), 0);

        let far = grid.patch(&volume.view(), Coordinate::new(9, 9, 9));
        assert_eq!(far.dim(), (2, 0, 0, 0));

        let edge = grid.patch(&volume.view(), Coordinate::new(3, 3, 3));
        assert_eq!(edge.dim(), (2, 1, 1, 1));
        assert_eq!(edge[[1, 0, 0, 0]], volume[[1, 3, 3, 3]]);
    }
}
