//! Intensity normalization and volume resampling.
//!
//! Scans arrive with arbitrary extents and Hounsfield ranges; the network
//! expects a fixed cube of intensities in `[0, 1]`. Images are resampled
//! trilinearly, label volumes with nearest-neighbour so class ids survive.

use crate::error::DataError;
use crate::types::SpatialShape;
use ndarray::{Array3, Zip};
use tracing::{debug, warn};

/// Rescale intensities in place to `[0, 1]`.
///
/// A constant volume has no range to stretch and becomes all zeros.
pub fn min_max_normalize(volume: &mut Array3<f32>) {
    let (min, max) = volume
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        if !volume.is_empty() {
            warn!("Volume has constant intensity {}, normalizing to zero", min);
        }
        volume.fill(0.0);
        return;
    }

    volume.mapv_inplace(|v| (v - min) / range);
}

/// Sample positions along one axis for half-pixel aligned linear interpolation.
///
/// Returns `(lower index, upper index, weight of upper)` per output index.
fn linear_taps(input: usize, output: usize) -> Vec<(usize, usize, f32)> {
    let scale = input as f32 / output as f32;
    (0..output)
        .map(|o| {
            let src = ((o as f32 + 0.5) * scale - 0.5).max(0.0);
            let lo = (src.floor() as usize).min(input - 1);
            let hi = (lo + 1).min(input - 1);
            (lo, hi, src - lo as f32)
        })
        .collect()
}

/// Source index per output index for nearest-neighbour resampling.
fn nearest_taps(input: usize, output: usize) -> Vec<usize> {
    let scale = input as f64 / output as f64;
    (0..output)
        .map(|o| ((o as f64 * scale).floor() as usize).min(input - 1))
        .collect()
}

fn check_resize(input: SpatialShape, target: SpatialShape) -> Result<(), DataError> {
    if input.is_empty() {
        return Err(DataError::InvalidShape(format!(
            "cannot resample an empty volume ({})",
            input
        )));
    }
    if target.is_empty() {
        return Err(DataError::InvalidShape(format!(
            "resize target must be non-empty, got {}",
            target
        )));
    }
    Ok(())
}

/// Trilinear resampling with half-pixel centers and clamped edges.
pub fn resize_trilinear(volume: &Array3<f32>, target: SpatialShape) -> Result<Array3<f32>, DataError> {
    let input = SpatialShape::from(volume.dim());
    check_resize(input, target)?;

    let tz = linear_taps(input.depth, target.depth);
    let ty = linear_taps(input.height, target.height);
    let tx = linear_taps(input.width, target.width);

    let mut out = Array3::<f32>::zeros(target.dim());
    Zip::indexed(&mut out).for_each(|(z, y, x), value| {
        let (z0, z1, wz) = tz[z];
        let (y0, y1, wy) = ty[y];
        let (x0, x1, wx) = tx[x];

        let lerp = |a: f32, b: f32, w: f32| a + (b - a) * w;
        let plane = |zi: usize| {
            let row = |yi: usize| lerp(volume[[zi, yi, x0]], volume[[zi, yi, x1]], wx);
            lerp(row(y0), row(y1), wy)
        };
        *value = lerp(plane(z0), plane(z1), wz);
    });

    debug!("Resized volume {} -> {} (trilinear)", input, target);
    Ok(out)
}

/// Nearest-neighbour resampling for label volumes.
pub fn resize_nearest(labels: &Array3<u8>, target: SpatialShape) -> Result<Array3<u8>, DataError> {
    let input = SpatialShape::from(labels.dim());
    check_resize(input, target)?;

    let tz = nearest_taps(input.depth, target.depth);
    let ty = nearest_taps(input.height, target.height);
    let tx = nearest_taps(input.width, target.width);

    let out = Array3::from_shape_fn(target.dim(), |(z, y, x)| labels[[tz[z], ty[y], tx[x]]]);

    debug!("Resized labels {} -> {} (nearest)", input, target);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_min_max_normalize_range() {
        let mut volume = Array3::from_shape_vec((1, 2, 2), vec![-100.0, 0.0, 100.0, 300.0]).unwrap();
        min_max_normalize(&mut volume);
        assert_eq!(volume[[0, 0, 0]], 0.0);
        assert_eq!(volume[[0, 1, 1]], 1.0);
        assert!((volume[[0, 0, 1]] - 0.25).abs() < 1e-6);
        assert!((volume[[0, 1, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_min_max_normalize_constant_volume() {
        let mut volume = Array3::from_elem((2, 2, 2), 42.0);
        min_max_normalize(&mut volume);
        assert!(volume.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_trilinear_identity_size() {
        let volume = Array3::from_shape_fn((3, 4, 5), |(z, y, x)| (z * 20 + y * 5 + x) as f32);
        let resized = resize_trilinear(&volume, SpatialShape::new(3, 4, 5)).unwrap();
        for (a, b) in resized.iter().zip(volume.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_trilinear_upsample_linear_ramp() {
        // Ramp 0,1 along x upsampled to 4 samples: half-pixel centers give 0, 0.25, 0.75, 1.
        let volume = Array3::from_shape_vec((1, 1, 2), vec![0.0, 1.0]).unwrap();
        let resized = resize_trilinear(&volume, SpatialShape::new(1, 1, 4)).unwrap();
        let expected = [0.0, 0.25, 0.75, 1.0];
        for (value, want) in resized.iter().zip(expected) {
            assert!((value - want).abs() < 1e-6, "{} vs {}", value, want);
        }
    }

    #[test]
    fn test_trilinear_constant_preserved() {
        let volume = Array3::from_elem((5, 3, 7), 0.5);
        let resized = resize_trilinear(&volume, SpatialShape::cube(8)).unwrap();
        assert!(resized.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_nearest_keeps_label_ids() {
        let labels = Array3::from_shape_vec((1, 1, 3), vec![0u8, 1, 2]).unwrap();
        let resized = resize_nearest(&labels, SpatialShape::new(2, 2, 6)).unwrap();
        assert_eq!(resized.dim(), (2, 2, 6));
        let row: Vec<u8> = resized.slice(ndarray::s![0, 0, ..]).to_vec();
        assert_eq!(row, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_nearest_downsample() {
        let labels = Array3::from_shape_fn((1, 1, 4), |(_, _, x)| x as u8);
        let resized = resize_nearest(&labels, SpatialShape::new(1, 1, 2)).unwrap();
        assert_eq!(resized.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_resize_rejects_empty_target() {
        let volume = Array3::<f32>::zeros((2, 2, 2));
        let result = resize_trilinear(&volume, SpatialShape::new(2, 0, 2));
        assert!(matches!(result, Err(DataError::InvalidShape(_))));

        let labels = Array3::<u8>::zeros((2, 2, 2));
        assert!(resize_nearest(&labels, SpatialShape::new(0, 2, 2)).is_err());
    }
}
