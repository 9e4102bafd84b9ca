//! Run configuration, loaded from an optional JSON file and overridden by CLI flags.

use crate::constants::{PATCH_SIZE, PHANTOM_SIZE, STRIDE, TARGET_SIZE};
use crate::errors::AppError;
use livseg_data::SpatialShape;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Parameters of the synthetic liver phantom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhantomConfig {
    /// Edge length of the raw phantom cube, in voxels.
    pub size: usize,
    /// Liver radius as a fraction of `size`.
    pub liver_radius: f32,
    /// Tumor radius as a fraction of `size`.
    pub tumor_radius: f32,
    /// Amplitude of uniform intensity noise, in HU.
    pub noise: f32,
    pub seed: u64,
}

impl Default for PhantomConfig {
    fn default() -> Self {
        Self {
            size: PHANTOM_SIZE,
            liver_radius: 0.3,
            tumor_radius: 0.08,
            noise: 10.0,
            seed: 0,
        }
    }
}

/// Everything one livseg run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Sliding window size `[depth, height, width]`.
    pub patch_size: [usize; 3],
    /// Step between windows `[depth, height, width]`.
    pub stride: [usize; 3],
    /// Shape every scan is resampled to before inference.
    pub target_size: [usize; 3],
    /// Score windows on all cores.
    pub parallel: bool,
    pub phantom: PhantomConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            patch_size: [PATCH_SIZE; 3],
            stride: [STRIDE; 3],
            target_size: [TARGET_SIZE; 3],
            parallel: false,
            phantom: PhantomConfig::default(),
        }
    }
}

impl RunConfig {
    /// Read a config file; fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        debug!("Loading config from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    pub fn patch_size(&self) -> SpatialShape {
        self.patch_size.into()
    }

    pub fn stride(&self) -> SpatialShape {
        self.stride.into()
    }

    pub fn target_size(&self) -> SpatialShape {
        self.target_size.into()
    }

    /// Reject settings that cannot produce a run.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, shape) in [
            ("patch_size", self.patch_size()),
            ("stride", self.stride()),
            ("target_size", self.target_size()),
        ] {
            if shape.is_empty() {
                return Err(AppError::Config(format!(
                    "{} must be positive on every axis, got {}",
                    name, shape
                )));
            }
        }

        let phantom = &self.phantom;
        if phantom.size == 0 {
            return Err(AppError::Config("phantom size must be positive".to_string()));
        }
        if !(phantom.tumor_radius > 0.0 && phantom.tumor_radius < phantom.liver_radius && phantom.liver_radius <= 0.5) {
            return Err(AppError::Config(format!(
                "phantom radii must satisfy 0 < tumor ({}) < liver ({}) <= 0.5",
                phantom.tumor_radius, phantom.liver_radius
            )));
        }
        if !phantom.noise.is_finite() || phantom.noise < 0.0 {
            return Err(AppError::Config(format!(
                "phantom noise must be a non-negative number, got {}",
                phantom.noise
            )));
        }
        Ok(())
    }
}
