//! Core voxel-space types shared by the livseg crates.
//!
//! Volumes are stored channel-first as `(channels, depth, height, width)`.
//! Spatial triples are always ordered `(z, y, x)` to match that layout.

use ndarray::{Array3, Array4, ArrayBase, Data, Ix4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 4-D volume `(channels, depth, height, width)` of intensities or class scores.
pub type Volume = Array4<f32>;

/// A 3-D volume of discrete class labels `(depth, height, width)`.
pub type LabelVolume = Array3<u8>;

/// Origin of a patch inside its source volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// Depth offset.
    pub z: usize,
    /// Height offset.
    pub y: usize,
    /// Width offset.
    pub x: usize,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(z: usize, y: usize, x: usize) -> Self {
        Self { z, y, x }
    }

    /// The volume origin.
    pub fn origin() -> Self {
        Self::default()
    }

    pub fn to_array(self) -> [usize; 3] {
        [self.z, self.y, self.x]
    }
}

impl From<(usize, usize, usize)> for Coordinate {
    fn from((z, y, x): (usize, usize, usize)) -> Self {
        Self { z, y, x }
    }
}

impl From<[usize; 3]> for Coordinate {
    fn from([z, y, x]: [usize; 3]) -> Self {
        Self { z, y, x }
    }
}

impl From<Coordinate> for (usize, usize, usize) {
    fn from(c: Coordinate) -> Self {
        (c.z, c.y, c.x)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(z={}, y={}, x={})", self.z, self.y, self.x)
    }
}

/// Spatial extent `(depth, height, width)` of a volume, patch or stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpatialShape {
    pub depth: usize,
    pub height: usize,
    pub width: usize,
}

impl SpatialShape {
    /// Create a new shape.
    pub fn new(depth: usize, height: usize, width: usize) -> Self {
        Self {
            depth,
            height,
            width,
        }
    }

    /// A cube with the same extent on every axis.
    pub fn cube(extent: usize) -> Self {
        Self::new(extent, extent, extent)
    }

    /// Spatial shape of a channel-first 4-D array.
    pub fn of<S: Data>(array: &ArrayBase<S, Ix4>) -> Self {
        let (_, depth, height, width) = array.dim();
        Self::new(depth, height, width)
    }

    /// Number of voxels covered by this shape.
    pub fn voxel_count(&self) -> usize {
        self.depth * self.height * self.width
    }

    /// True when any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.depth == 0 || self.height == 0 || self.width == 0
    }

    pub fn to_array(self) -> [usize; 3] {
        [self.depth, self.height, self.width]
    }

    /// The shape as a `(depth, height, width)` tuple, handy for ndarray constructors.
    pub fn dim(self) -> (usize, usize, usize) {
        (self.depth, self.height, self.width)
    }
}

impl From<(usize, usize, usize)> for SpatialShape {
    fn from((depth, height, width): (usize, usize, usize)) -> Self {
        Self::new(depth, height, width)
    }
}

impl From<[usize; 3]> for SpatialShape {
    fn from([depth, height, width]: [usize; 3]) -> Self {
        Self::new(depth, height, width)
    }
}

impl fmt::Display for SpatialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.depth, self.height, self.width)
    }
}
