//! Constants used throughout the livseg binary.

/// Edge length of the sliding window, in voxels.
pub const PATCH_SIZE: usize = 96;

/// Step between window origins, in voxels.
pub const STRIDE: usize = 8;

/// Edge length every scan is resampled to.
pub const TARGET_SIZE: usize = livseg_data::DEFAULT_TARGET_SIZE;

/// Background, liver, tumor.
pub const NUM_CLASSES: usize = livseg_infer::SegmentationClass::COUNT;

/// Default edge length of the synthetic phantom before resampling.
pub const PHANTOM_SIZE: usize = 160;
