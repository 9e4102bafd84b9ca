//! Reassembly of per-patch class scores into a full-resolution volume
//!
//! Scores are scatter-added into a sum buffer while a matching count buffer
//! records how many patches covered each voxel. The final volume is
//! `sum / max(count, 1)`: overlapping predictions are averaged, and voxels no
//! patch reached come out as 0 (unlabeled, background by default).

use crate::error::InferError;
use livseg_data::{Coordinate, SpatialShape, Volume};
use ndarray::{ArrayBase, ArrayView3, ArrayView4, Axis, Data, Ix4, Zip, s};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Running sum and coverage count for one aggregation.
///
/// Accumulators over the same shape merge by elementwise addition, so patches
/// can be folded on separate workers and combined in any order.
#[derive(Debug, Clone)]
pub struct Accumulator {
    sum: Volume,
    count: Volume,
}

impl Accumulator {
    /// Zeroed accumulator for `channels` classes over `shape`; callers have
    /// already checked both are non-empty.
    pub(crate) fn zeros(channels: usize, shape: SpatialShape) -> Self {
        let dim = (channels, shape.depth, shape.height, shape.width);
        Self {
            sum: Volume::zeros(dim),
            count: Volume::zeros(dim),
        }
    }

    /// Zeroed accumulator for `channels` classes over `shape`.
    ///
    /// Fails with [`InferError::InvalidArgument`] when `channels` is 0 or the
    /// shape is empty on any axis.
    pub fn new(channels: usize, shape: SpatialShape) -> Result<Self, InferError> {
        check_target(channels, shape)?;
        Ok(Self::zeros(channels, shape))
    }

    pub fn channels(&self) -> usize {
        self.sum.dim().0
    }

    pub fn shape(&self) -> SpatialShape {
        SpatialShape::of(&self.sum)
    }

    /// Number of patches that covered each voxel.
    pub fn coverage(&self) -> ArrayView3<'_, f32> {
        self.count.index_axis(Axis(0), 0)
    }

    /// Add `patch` into the buffers with its first voxel at `origin`.
    ///
    /// The patch is re-clipped against the target shape, so a patch reaching
    /// past the edge only contributes its overlapping part and a patch lying
    /// entirely outside contributes nothing.
    pub fn fold_patch(&mut self, patch: ArrayView4<'_, f32>, origin: Coordinate) -> Result<(), InferError> {
        let (channels, pd, ph, pw) = patch.dim();
        if channels != self.channels() {
            return Err(InferError::ShapeMismatch {
                expected: format!("{} channels", self.channels()),
                actual: format!("{} channels", channels),
            });
        }

        let target = self.shape();
        let dz = pd.min(target.depth.saturating_sub(origin.z));
        let dy = ph.min(target.height.saturating_sub(origin.y));
        let dx = pw.min(target.width.saturating_sub(origin.x));
        if dz == 0 || dy == 0 || dx == 0 {
            trace!("Patch at {} lies outside {}, skipped", origin, target);
            return Ok(());
        }

        let (zs, ys, xs) = (
            origin.z..origin.z + dz,
            origin.y..origin.y + dy,
            origin.x..origin.x + dx,
        );
        let scores = patch.slice(s![.., ..dz, ..dy, ..dx]);

        let mut sum = self.sum.slice_mut(s![.., zs.clone(), ys.clone(), xs.clone()]);
        sum += &scores;
        self.count
            .slice_mut(s![.., zs, ys, xs])
            .mapv_inplace(|c| c + 1.0);
        Ok(())
    }

    /// Combine two partial accumulators over the same shape.
    pub fn merge(mut self, other: Accumulator) -> Result<Self, InferError> {
        if self.sum.dim() != other.sum.dim() {
            return Err(InferError::ShapeMismatch {
                expected: format!("{:?}", self.sum.dim()),
                actual: format!("{:?}", other.sum.dim()),
            });
        }
        self.sum += &other.sum;
        self.count += &other.count;
        Ok(self)
    }

    /// Divide sums by coverage, flooring the count at 1.
    pub fn finalize(self) -> Volume {
        let Self { mut sum, count } = self;
        Zip::from(&mut sum)
            .and(&count)
            .for_each(|s, &c| *s /= c.max(1.0));
        sum
    }
}

fn check_target(channels: usize, shape: SpatialShape) -> Result<(), InferError> {
    if channels == 0 {
        return Err(InferError::InvalidArgument(
            "accumulator needs at least one channel".to_string(),
        ));
    }
    if shape.is_empty() {
        return Err(InferError::InvalidArgument(format!(
            "target shape must be at least 1 on every axis, got {}",
            shape
        )));
    }
    Ok(())
}

/// Check inputs and return the class count taken from the first patch.
fn validate<S: Data<Elem = f32>>(
    patch_outputs: &[ArrayBase<S, Ix4>],
    coordinates: &[Coordinate],
    target_shape: SpatialShape,
) -> Result<usize, InferError> {
    let first = patch_outputs.first().ok_or_else(|| {
        InferError::InvalidArgument("no patch outputs to aggregate".to_string())
    })?;

    if patch_outputs.len() != coordinates.len() {
        return Err(InferError::InvalidArgument(format!(
            "{} patch outputs but {} coordinates",
            patch_outputs.len(),
            coordinates.len()
        )));
    }

    let channels = first.dim().0;
    if let Some(index) = patch_outputs.iter().position(|p| p.dim().0 != channels) {
        return Err(InferError::InvalidArgument(format!(
            "patch {} has {} channels, expected {}",
            index,
            patch_outputs[index].dim().0,
            channels
        )));
    }

    check_target(channels, target_shape)?;
    Ok(channels)
}

/// Average overlapping patch scores back into a `[C, D, H, W]` volume.
///
/// `patch_outputs[i]` is placed at `coordinates[i]`; the class count `C` comes
/// from the first patch. Fails with [`InferError::InvalidArgument`] on empty
/// input, mismatched lengths, inconsistent channel counts or an empty target.
#[tracing::instrument(skip_all, fields(patches = patch_outputs.len(), target = %target_shape))]
pub fn aggregate<S: Data<Elem = f32>>(
    patch_outputs: &[ArrayBase<S, Ix4>],
    coordinates: &[Coordinate],
    target_shape: SpatialShape,
) -> Result<Volume, InferError> {
    let channels = validate(patch_outputs, coordinates, target_shape)?;

    let mut acc = Accumulator::zeros(channels, target_shape);
    for (patch, &origin) in patch_outputs.iter().zip(coordinates) {
        acc.fold_patch(patch.view(), origin)?;
    }

    debug!("Aggregated {} patches into {} classes", patch_outputs.len(), channels);
    Ok(acc.finalize())
}

/// [`aggregate`] with the fold spread over the rayon pool.
///
/// Each worker folds into its own accumulator; partials are merged by
/// elementwise addition. Matches [`aggregate`] up to float summation order.
#[tracing::instrument(skip_all, fields(patches = patch_outputs.len(), target = %target_shape))]
pub fn aggregate_parallel<S>(
    patch_outputs: &[ArrayBase<S, Ix4>],
    coordinates: &[Coordinate],
    target_shape: SpatialShape,
) -> Result<Volume, InferError>
where
    S: Data<Elem = f32> + Sync,
{
    let channels = validate(patch_outputs, coordinates, target_shape)?;

    let acc = patch_outputs
        .par_iter()
        .zip(coordinates.par_iter())
        .try_fold(
            || Accumulator::zeros(channels, target_shape),
            |mut acc, (patch, &origin)| {
                acc.fold_patch(patch.view(), origin)?;
                Ok::<_, InferError>(acc)
            },
        )
        .try_reduce(|| Accumulator::zeros(channels, target_shape), Accumulator::merge)?;

    debug!(
        "Aggregated {} patches into {} classes on {} threads",
        patch_outputs.len(),
        channels,
        rayon::current_num_threads()
    );
    Ok(acc.finalize())
}
