//! End-to-end run: prepare a scan, score it window by window, decode and evaluate.

use crate::config::RunConfig;
use crate::constants::NUM_CLASSES;
use crate::errors::AppError;
use crate::model::ThresholdModel;
use crate::phantom::PhantomSource;
use livseg_data::VolumeSource;
use livseg_infer::{PatchGrid, SegmentationClass, SlidingWindow, argmax_labels, class_histogram, dice_per_class};
use serde::Serialize;
use tracing::{info, warn};

/// Per-class outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub predicted_voxels: usize,
    pub true_voxels: usize,
    /// `None` when the class appears in neither volume.
    pub dice: Option<f64>,
}

/// Summary of one segmentation run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub shape: [usize; 3],
    pub windows: usize,
    pub classes: Vec<ClassReport>,
}

/// Segment one phantom sample with the configured sliding window.
#[tracing::instrument(skip_all)]
pub fn run(config: &RunConfig) -> Result<Report, AppError> {
    config.validate()?;

    let source = PhantomSource::new(config.phantom.clone(), config.target_size(), 1);
    let sample = source.load(0)?;
    let shape = sample.shape();
    info!("Loaded sample with shape {}", shape);

    let window = SlidingWindow::new(config.patch_size(), config.stride());
    let windows = PatchGrid::new(shape, window.patch_size, window.stride)?.patch_count();
    info!(
        "Running {} windows (patch {}, stride {}, parallel: {})",
        windows, window.patch_size, window.stride, config.parallel
    );

    let model = ThresholdModel::default();
    let scores = if config.parallel {
        window.run_parallel(sample.image.view(), &model)?
    } else {
        window.run(sample.image.view(), &model)?
    };
    let prediction = argmax_labels(scores.view())?;

    let predicted = class_histogram(prediction.view(), NUM_CLASSES);
    let actual = class_histogram(sample.label.view(), NUM_CLASSES);
    let dice = dice_per_class(prediction.view(), sample.label.view(), NUM_CLASSES)?;

    let classes: Vec<ClassReport> = SegmentationClass::ALL
        .iter()
        .enumerate()
        .map(|(i, class)| ClassReport {
            class: class.to_string(),
            predicted_voxels: predicted[i],
            true_voxels: actual[i],
            dice: dice[i],
        })
        .collect();

    for report in &classes {
        match report.dice {
            Some(dice) => info!(
                "{:>10}: {} predicted / {} true voxels, dice {:.4}",
                report.class, report.predicted_voxels, report.true_voxels, dice
            ),
            None => warn!("{:>10}: absent from prediction and ground truth", report.class),
        }
    }

    Ok(Report {
        shape: shape.to_array(),
        windows,
        classes,
    })
}
