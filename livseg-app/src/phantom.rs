//! Synthetic abdominal phantom used as a stand-in volume source.
//!
//! A sphere of liver tissue with a smaller tumor sphere inside it, on an air
//! background, with seeded uniform noise so every run is reproducible.

use crate::config::PhantomConfig;
use livseg_data::{DataError, Sample, SpatialShape, VolumeSource, prepare_sample};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

const BACKGROUND_HU: f32 = -100.0;
const LIVER_HU: f32 = 60.0;
const TUMOR_HU: f32 = 150.0;

/// Procedural volume source; sample `i` is generated with seed `seed + i`.
pub struct PhantomSource {
    config: PhantomConfig,
    target: SpatialShape,
    samples: usize,
}

impl PhantomSource {
    pub fn new(config: PhantomConfig, target: SpatialShape, samples: usize) -> Self {
        Self {
            config,
            target,
            samples,
        }
    }

    /// Raw intensities and labels before normalization and resampling.
    pub fn generate(&self, seed: u64) -> (Array3<f32>, Array3<u8>) {
        let n = self.config.size;
        let center = n as f32 / 2.0;
        let liver_r = self.config.liver_radius * n as f32;
        let tumor_r = self.config.tumor_radius * n as f32;
        // Tumor sits off-center but fully inside the liver.
        let offset = (liver_r - tumor_r) * 0.5;
        let tumor_center = [center + offset, center, center - offset];

        let distance = |p: [f32; 3], c: [f32; 3]| {
            ((p[0] - c[0]).powi(2) + (p[1] - c[1]).powi(2) + (p[2] - c[2]).powi(2)).sqrt()
        };

        let label = Array3::from_shape_fn((n, n, n), |(z, y, x)| {
            let p = [z as f32 + 0.5, y as f32 + 0.5, x as f32 + 0.5];
            if distance(p, tumor_center) < tumor_r {
                2
            } else if distance(p, [center; 3]) < liver_r {
                1
            } else {
                0
            }
        });

        let mut rng = StdRng::seed_from_u64(seed);
        let noise = self.config.noise;
        let image = label.mapv(|class| {
            let base = match class {
                2 => TUMOR_HU,
                1 => LIVER_HU,
                _ => BACKGROUND_HU,
            };
            if noise > 0.0 {
                base + rng.gen_range(-noise..=noise)
            } else {
                base
            }
        });

        (image, label)
    }
}

impl VolumeSource for PhantomSource {
    fn len(&self) -> usize {
        self.samples
    }

    fn load(&self, index: usize) -> Result<Sample, DataError> {
        if index >= self.samples {
            return Err(DataError::IndexOutOfRange {
                index,
                len: self.samples,
            });
        }
        let (image, label) = self.generate(self.config.seed.wrapping_add(index as u64));
        debug!("Generated phantom {} at {}", index, SpatialShape::cube(self.config.size));
        prepare_sample(image, &label, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> PhantomConfig {
        PhantomConfig {
            size: 24,
            ..PhantomConfig::default()
        }
    }

    #[test]
    fn test_phantom_contains_all_classes() {
        let source = PhantomSource::new(small(), SpatialShape::cube(16), 1);
        let (_, label) = source.generate(0);
        for class in 0..3u8 {
            assert!(label.iter().any(|&l| l == class), "class {} missing", class);
        }
        let tumor = label.iter().filter(|&&l| l == 2).count();
        let liver = label.iter().filter(|&&l| l == 1).count();
        assert!(tumor < liver);
    }

    #[test]
    fn test_phantom_is_deterministic_per_seed() {
        let source = PhantomSource::new(small(), SpatialShape::cube(16), 2);
        let (a, _) = source.generate(7);
        let (b, _) = source.generate(7);
        let (c, _) = source.generate(8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_load_prepares_sample() {
        let source = PhantomSource::new(small(), SpatialShape::cube(16), 1);
        let sample = source.load(0).unwrap();
        assert_eq!(sample.image.dim(), (1, 16, 16, 16));
        assert_eq!(sample.label.dim(), (16, 16, 16));
        assert!(sample.image.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_load_out_of_range() {
        let source = PhantomSource::new(small(), SpatialShape::cube(16), 1);
        assert!(matches!(
            source.load(1),
            Err(DataError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }
}
