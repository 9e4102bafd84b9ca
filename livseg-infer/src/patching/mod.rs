//! Overlapping patch extraction and reassembly
//!
//! A volume is cut into clipped sub-volumes on a regular grid ([`tiler`]),
//! each patch is scored independently, and the per-patch scores are folded
//! back into a full-resolution volume by averaging overlaps ([`aggregator`]).

pub mod aggregator;
pub mod tiler;

pub use aggregator::{Accumulator, aggregate, aggregate_parallel};
pub use tiler::{PatchGrid, tile};

/// Default patch edge length, in voxels.
pub const DEFAULT_PATCH_SIZE: usize = 96;

/// Default grid step, in voxels. Much smaller than the patch so seams average out.
pub const DEFAULT_STRIDE: usize = 8;
