//! Intensity-band scorer standing in for the trained network.

use livseg_infer::{InferError, PatchInference, SegmentationClass};
use ndarray::{Array5, ArrayView5, Axis, stack};

/// Scores background / liver / tumor from normalized intensity alone.
///
/// Each class score is the signed distance of the voxel intensity into that
/// class's band, so arg-max picks the band the intensity falls in.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdModel {
    pub liver_threshold: f32,
    pub tumor_threshold: f32,
}

impl Default for ThresholdModel {
    fn default() -> Self {
        Self {
            liver_threshold: 0.35,
            tumor_threshold: 0.8,
        }
    }
}

impl PatchInference for ThresholdModel {
    fn predict(&self, batch: ArrayView5<'_, f32>) -> Result<Array5<f32>, InferError> {
        let channels = batch.dim().1;
        if channels != 1 {
            return Err(InferError::ShapeMismatch {
                expected: "1 input channel".to_string(),
                actual: format!("{} channels", channels),
            });
        }

        let (lo, hi) = (self.liver_threshold, self.tumor_threshold);
        let image = batch.index_axis(Axis(1), 0);
        let background = image.mapv(|v| lo - v);
        let liver = image.mapv(|v| (v - lo).min(hi - v));
        let tumor = image.mapv(|v| v - hi);

        let scores = stack(Axis(1), &[background.view(), liver.view(), tumor.view()])
            .map_err(|e| InferError::Model(e.to_string()))?;
        debug_assert_eq!(scores.dim().1, SegmentationClass::COUNT);
        Ok(scores)
    }
}
