//! Livseg Inference Crate
//!
//! Patch-based inference for volumetric segmentation. A scan too large for
//! one network pass is cut into overlapping windows, each window is scored by
//! an external model, and the scores are averaged back into a full volume.
//!
//! ## Modules
//!
//! - [`patching`]: grid tiling of volumes and overlap-averaging reassembly
//! - [`sliding_window`]: model-driven inference over every window
//! - [`labels`]: arg-max decoding and Dice evaluation of class volumes

pub mod error;
pub mod labels;
pub mod patching;
pub mod sliding_window;

pub use error::InferError;
pub use labels::{SegmentationClass, argmax_labels, class_histogram, dice_per_class};
pub use patching::{Accumulator, PatchGrid, aggregate, aggregate_parallel, tile};
pub use sliding_window::{PatchInference, SlidingWindow};
