//! Volume providers and sample preparation.

use crate::error::DataError;
use crate::preprocess::{min_max_normalize, resize_nearest, resize_trilinear};
use crate::types::{LabelVolume, SpatialShape, Volume};
use ndarray::{Array3, Axis};
use tracing::debug;

/// Edge length of the cube every scan is resampled to before inference.
pub const DEFAULT_TARGET_SIZE: usize = 128;

/// A prepared scan: single-channel intensity volume plus its label volume.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Normalized intensities, shape `(1, depth, height, width)`.
    pub image: Volume,
    /// Class ids, shape `(depth, height, width)`.
    pub label: LabelVolume,
}

impl Sample {
    /// Spatial shape shared by image and label.
    pub fn shape(&self) -> SpatialShape {
        SpatialShape::of(&self.image)
    }
}

/// Trait for anything that can hand out prepared scans by index.
///
/// File decoding lives behind this trait; the rest of the workspace only sees
/// [`Sample`]s.
pub trait VolumeSource {
    /// Number of samples available.
    fn len(&self) -> usize;

    /// Check whether the source has no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load and prepare the sample at `index`.
    fn load(&self, index: usize) -> Result<Sample, DataError>;
}

/// Normalize and resample a raw scan/label pair to `target`.
///
/// The image is min-max normalized, resized trilinearly and given a leading
/// channel axis; the label is resized with nearest-neighbour sampling.
pub fn prepare_sample(
    mut image: Array3<f32>,
    label: &Array3<u8>,
    target: SpatialShape,
) -> Result<Sample, DataError> {
    if image.dim() != label.dim() {
        return Err(DataError::InvalidShape(format!(
            "image {} and label {} differ",
            SpatialShape::from(image.dim()),
            SpatialShape::from(label.dim())
        )));
    }

    min_max_normalize(&mut image);
    let image = resize_trilinear(&image, target)?.insert_axis(Axis(0));
    let label = resize_nearest(label, target)?;

    debug!("Prepared sample at {}", target);
    Ok(Sample { image, label })
}
