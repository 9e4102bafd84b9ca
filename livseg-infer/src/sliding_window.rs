//! Sliding-window inference over a full volume
//!
//! Runs a patch model over every window of a [`PatchGrid`] and averages the
//! per-window class scores back into one volume.

use crate::error::InferError;
use crate::patching::{Accumulator, DEFAULT_PATCH_SIZE, DEFAULT_STRIDE, PatchGrid};
use livseg_data::{Coordinate, SpatialShape, Volume};
use ndarray::{Array5, ArrayView4, ArrayView5, Axis};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{info, trace};

/// A model scoring one batch of patches.
///
/// The input is `[1, C_in, d, h, w]`; the output must be `[1, C_out, d, h, w]`
/// with the same spatial extent. Calls are expected to be deterministic.
pub trait PatchInference {
    fn predict(&self, batch: ArrayView5<'_, f32>) -> Result<Array5<f32>, InferError>;
}

impl<F> PatchInference for F
where
    F: Fn(ArrayView5<'_, f32>) -> Result<Array5<f32>, InferError>,
{
    fn predict(&self, batch: ArrayView5<'_, f32>) -> Result<Array5<f32>, InferError> {
        self(batch)
    }
}

/// Window geometry for sliding-window inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindow {
    pub patch_size: SpatialShape,
    pub stride: SpatialShape,
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(
            SpatialShape::cube(DEFAULT_PATCH_SIZE),
            SpatialShape::cube(DEFAULT_STRIDE),
        )
    }
}

impl SlidingWindow {
    pub fn new(patch_size: SpatialShape, stride: SpatialShape) -> Self {
        Self { patch_size, stride }
    }

    /// Score `volume` (`[C_in, D, H, W]`) window by window on the calling
    /// thread and return the averaged class scores `[C_out, D, H, W]`.
    #[tracing::instrument(skip_all, fields(shape = ?volume.dim()))]
    pub fn run<M>(&self, volume: ArrayView4<'_, f32>, model: &M) -> Result<Volume, InferError>
    where
        M: PatchInference + ?Sized,
    {
        let grid = self.grid(&volume)?;
        let started = Instant::now();

        let acc = grid
            .clone()
            .try_fold(None, |acc, origin| score_window(acc, &grid, &volume, origin, model))?;

        finish(acc, &grid, started)
    }

    /// [`SlidingWindow::run`] with windows scored on the rayon pool.
    ///
    /// Each worker folds into its own accumulator; partials are merged by
    /// elementwise addition, so the result matches `run` up to float
    /// summation order.
    #[tracing::instrument(skip_all, fields(shape = ?volume.dim()))]
    pub fn run_parallel<M>(&self, volume: ArrayView4<'_, f32>, model: &M) -> Result<Volume, InferError>
    where
        M: PatchInference + Sync + ?Sized,
    {
        let grid = self.grid(&volume)?;
        let started = Instant::now();

        let acc = (0..grid.patch_count())
            .into_par_iter()
            .filter_map(|index| grid.coordinate(index))
            .try_fold(
                || None,
                |acc, origin| score_window(acc, &grid, &volume, origin, model),
            )
            .try_reduce(|| None, merge_partials)?;

        finish(acc, &grid, started)
    }

    fn grid(&self, volume: &ArrayView4<'_, f32>) -> Result<PatchGrid, InferError> {
        if volume.dim().0 == 0 {
            return Err(InferError::InvalidArgument(
                "volume must have at least one channel".to_string(),
            ));
        }
        PatchGrid::new(SpatialShape::of(volume), self.patch_size, self.stride)
    }
}

fn finish(acc: Option<Accumulator>, grid: &PatchGrid, started: Instant) -> Result<Volume, InferError> {
    let acc = acc.ok_or_else(|| InferError::InvalidArgument("no windows to score".to_string()))?;
    info!(
        "Scored {} windows over {} in {:.2?}",
        grid.patch_count(),
        grid.volume(),
        started.elapsed()
    );
    Ok(acc.finalize())
}

/// Run the model on the window at `origin` and fold its scores into `acc`.
///
/// The accumulator is created from the first window's output, which fixes
/// the class count.
fn score_window<M: PatchInference + ?Sized>(
    acc: Option<Accumulator>,
    grid: &PatchGrid,
    volume: &ArrayView4<'_, f32>,
    origin: Coordinate,
    model: &M,
) -> Result<Option<Accumulator>, InferError> {
    let patch = grid.patch(volume, origin);
    let (_, d, h, w) = patch.dim();

    let scores = model.predict(patch.insert_axis(Axis(0)))?;
    let (batch, classes, sd, sh, sw) = scores.dim();
    if batch != 1 || (sd, sh, sw) != (d, h, w) {
        return Err(InferError::ShapeMismatch {
            expected: format!("[1, C, {}, {}, {}]", d, h, w),
            actual: format!("{:?}", scores.dim()),
        });
    }
    trace!("Window at {} -> {} classes", origin, classes);

    let mut acc = match acc {
        Some(acc) => acc,
        None => Accumulator::new(classes, grid.volume())?,
    };
    acc.fold_patch(scores.index_axis_move(Axis(0), 0).view(), origin)?;
    Ok(Some(acc))
}

fn merge_partials(
    left: Option<Accumulator>,
    right: Option<Accumulator>,
) -> Result<Option<Accumulator>, InferError> {
    match (left, right) {
        (Some(l), Some(r)) => l.merge(r).map(Some),
        (l, None) => Ok(l),
        (None, r) => Ok(r),
    }
}
