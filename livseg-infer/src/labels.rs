//! Label decoding and overlap scores for aggregated class volumes.

use crate::error::InferError;
use livseg_data::LabelVolume;
use ndarray::{Array3, ArrayView3, ArrayView4, Zip};
use std::fmt;

/// Tissue classes predicted by the liver segmentation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SegmentationClass {
    Background = 0,
    Liver = 1,
    Tumor = 2,
}

impl SegmentationClass {
    /// Number of classes the model emits.
    pub const COUNT: usize = 3;

    pub const ALL: [SegmentationClass; Self::COUNT] = [Self::Background, Self::Liver, Self::Tumor];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Liver => "liver",
            Self::Tumor => "tumor",
        }
    }
}

impl fmt::Display for SegmentationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Per-voxel index of the highest class score.
///
/// Ties go to the lowest class, so voxels no patch covered (all scores 0)
/// decode as background.
pub fn argmax_labels(scores: ArrayView4<'_, f32>) -> Result<LabelVolume, InferError> {
    let (classes, d, h, w) = scores.dim();
    if classes == 0 || classes > u8::MAX as usize + 1 {
        return Err(InferError::InvalidArgument(format!(
            "cannot decode {} classes into u8 labels",
            classes
        )));
    }

    Ok(Array3::from_shape_fn((d, h, w), |(z, y, x)| {
        let mut best = 0;
        let mut best_score = scores[[0, z, y, x]];
        for c in 1..classes {
            let score = scores[[c, z, y, x]];
            if score > best_score {
                best = c;
                best_score = score;
            }
        }
        best as u8
    }))
}

/// Voxel count per class; labels `>= num_classes` are ignored.
pub fn class_histogram(labels: ArrayView3<'_, u8>, num_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; num_classes];
    for &label in labels.iter() {
        if let Some(slot) = counts.get_mut(label as usize) {
            *slot += 1;
        }
    }
    counts
}

/// Dice overlap `2|P∩T| / (|P|+|T|)` per class.
///
/// `None` for a class present in neither volume.
pub fn dice_per_class(
    prediction: ArrayView3<'_, u8>,
    truth: ArrayView3<'_, u8>,
    num_classes: usize,
) -> Result<Vec<Option<f64>>, InferError> {
    if prediction.dim() != truth.dim() {
        return Err(InferError::InvalidArgument(format!(
            "prediction {:?} and ground truth {:?} differ in shape",
            prediction.dim(),
            truth.dim()
        )));
    }

    let mut intersection = vec![0usize; num_classes];
    let predicted = class_histogram(prediction, num_classes);
    let actual = class_histogram(truth, num_classes);

    Zip::from(&prediction).and(&truth).for_each(|&p, &t| {
        if p == t {
            if let Some(slot) = intersection.get_mut(p as usize) {
                *slot += 1;
            }
        }
    });

    Ok((0..num_classes)
        .map(|c| {
            let total = predicted[c] + actual[c];
            (total > 0).then(|| 2.0 * intersection[c] as f64 / total as f64)
        })
        .collect())
}
