//! Sliding-window inference example
//!
//! Tiles a synthetic two-sphere volume, scores every window with a simple
//! intensity model and decodes the averaged scores into labels.
//!
//! Usage:
//!   cargo run -p livseg-infer --example sliding_window

use livseg_data::{SpatialShape, Volume};
use livseg_infer::{InferError, SegmentationClass, SlidingWindow, argmax_labels, class_histogram};
use ndarray::{Array5, ArrayView5, Axis, stack};
use std::error::Error;
use tracing::info;

/// Soft scores for background (< 0.3), liver (0.3..0.8) and tumor (>= 0.8).
fn banded_model(batch: ArrayView5<'_, f32>) -> Result<Array5<f32>, InferError> {
    let image = batch.index_axis(Axis(1), 0);
    let background = image.mapv(|v| 0.3 - v);
    let liver = image.mapv(|v| 0.25 - (v - 0.55).abs());
    let tumor = image.mapv(|v| v - 0.8);
    stack(Axis(1), &[background.view(), liver.view(), tumor.view()])
        .map_err(|e| InferError::Model(e.to_string()))
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let size = 48;
    let center = size as f32 / 2.0;
    let volume = Volume::from_shape_fn((1, size, size, size), |(_, z, y, x)| {
        let r = ((z as f32 - center).powi(2) + (y as f32 - center).powi(2) + (x as f32 - center).powi(2)).sqrt();
        if r < 6.0 {
            1.0
        } else if r < 18.0 {
            0.5
        } else {
            0.0
        }
    });

    let window = SlidingWindow::new(SpatialShape::cube(24), SpatialShape::cube(8));
    let scores = window.run_parallel(volume.view(), &banded_model)?;
    let labels = argmax_labels(scores.view())?;

    for (class, count) in SegmentationClass::ALL
        .iter()
        .zip(class_histogram(labels.view(), SegmentationClass::COUNT))
    {
        info!("{:>10}: {} voxels", class, count);
    }
    Ok(())
}
