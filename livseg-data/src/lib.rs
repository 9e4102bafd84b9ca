//! Livseg Data Crate
//!
//! Volume types and scan preparation for volumetric segmentation.
//! This crate is model-agnostic and knows nothing about file formats: decoding
//! scans is left to a [`VolumeSource`] implementation supplied by the caller.
//!
//! ## Modules
//!
//! - [`types`]: voxel coordinates, spatial shapes and volume aliases
//! - [`dataset`]: pairing of scan images with their label volumes
//! - [`preprocess`]: intensity normalization and resampling
//! - [`source`]: the volume provider trait and sample preparation

pub mod dataset;
pub mod error;
pub mod preprocess;
pub mod source;
pub mod types;

pub use dataset::{ScanDataset, ScanPair, image_to_label_path};
pub use error::DataError;
pub use preprocess::{min_max_normalize, resize_nearest, resize_trilinear};
pub use source::{DEFAULT_TARGET_SIZE, Sample, VolumeSource, prepare_sample};
pub use types::{Coordinate, LabelVolume, SpatialShape, Volume};
