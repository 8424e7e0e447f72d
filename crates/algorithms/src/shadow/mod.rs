//! Shadow depth
//!
//! Simulates cast shadows over a DEM for a sun at a given bearing and
//! altitude. Each output cell holds how far below the shadow plane cast by
//! upstream terrain it lies: 0 for lit cells, negative inside a shadow, NaN
//! at no-data cells.
//!
//! The sun direction is reduced to an axis-aligned scan by shearing the grid
//! so that every sun ray runs along one axis of a working buffer. A running
//! maximum along that axis then yields the shadow plane. Rasters are
//! streamed in strips ([`StreamingAccumulator`]), carrying the depth along
//! each strip seam into the next one, so only one strip is held in memory.

mod accumulator;
mod chunking;
mod feedback;
mod geometry;
mod params;
mod shear;
mod smoothing;

pub use accumulator::{subtract_running_max, StreamingAccumulator};
pub use chunking::{chunk_bound, optimal_chunk, shear_remainder};
pub use feedback::{CancelFlag, Completion, Feedback, NoFeedback};
pub use geometry::{adjust_bearing, ScanGeometry};
pub use params::ShadowDepthParams;
pub use shear::ShearMap;
pub use smoothing::mean3x3;

use umbra_core::io::{BlockReader, BlockWriter, RasterBlockWriter};
use umbra_core::raster::Raster;
use umbra_core::{Algorithm, Error, Result};

/// Shadow depth algorithm
#[derive(Debug, Clone, Default)]
pub struct ShadowDepth;

impl Algorithm for ShadowDepth {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ShadowDepthParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Shadow Depth"
    }

    fn description(&self) -> &'static str {
        "Depth of terrain below the shadow plane cast by a low sun"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        shadow_depth(&input, params)
    }
}

/// Calculate shadow depth for an in-memory DEM
///
/// # Arguments
/// * `dem` - Input DEM raster
/// * `params` - Sun position, smoothing and chunking parameters
///
/// # Returns
/// Raster with the same georeferencing as `dem`: values `<= 0`, NaN at
/// no-data cells
pub fn shadow_depth(dem: &Raster<f64>, params: ShadowDepthParams) -> Result<Raster<f64>> {
    let mut target = dem.with_same_meta(f64::NAN);
    target.set_nodata(Some(f64::NAN));

    let mut writer = RasterBlockWriter::new(target);
    shadow_depth_streaming(dem, &mut writer, params, &NoFeedback)?;
    Ok(writer.into_raster())
}

/// Stream shadow depth from `reader` into `writer`.
///
/// The raster is validated before anything is read: fatal issues are
/// reported through `feedback` and returned as [`Error::Validation`],
/// warnings are reported and the run goes on. Cancellation is honoured
/// between setup steps and after every chunk.
///
/// # Errors
/// Invalid parameters, a fatal validation issue, or any read/write failure.
pub fn shadow_depth_streaming<R, W, F>(
    reader: &R,
    writer: &mut W,
    params: ShadowDepthParams,
    feedback: &F,
) -> Result<Completion>
where
    R: BlockReader + ?Sized,
    W: BlockWriter + ?Sized,
    F: Feedback + ?Sized,
{
    let params = params.validate()?;
    let meta = reader.metadata();

    if let Some(issue) = meta.validate() {
        feedback.report_error(&issue.message, issue.fatal);
        if issue.fatal {
            return Err(Error::Validation(issue.message));
        }
        tracing::warn!("{}", issue);
    }

    if feedback.is_canceled() {
        return Ok(Completion::Cancelled { chunks: 0 });
    }

    let geometry = ScanGeometry::resolve(params.direction, params.altitude, meta.pix_x, meta.pix_y);
    tracing::debug!(
        bearing = geometry.bearing,
        shear_angle = geometry.shear_angle,
        steep = geometry.steep,
        rev_x = geometry.rev_x,
        rev_y = geometry.rev_y,
        pixel_size = geometry.pixel_size,
        "scan geometry resolved"
    );

    let (rows, cols) = meta.shape();
    let bound = chunk_bound(&geometry, rows, cols, params.max_chunk_cells);
    let chunk = optimal_chunk(bound, geometry.slope)?;
    tracing::debug!(bound, chunk, "chunk size selected");

    if feedback.is_canceled() {
        return Ok(Completion::Cancelled { chunks: 0 });
    }

    let mut accumulator = StreamingAccumulator::new(
        geometry,
        meta.shape(),
        chunk,
        params.smooth,
        params.nodata_sentinel,
    )?;
    tracing::debug!(working_shape = ?accumulator.shear().working_shape(), "shear maps built");

    if feedback.is_canceled() {
        return Ok(Completion::Cancelled { chunks: 0 });
    }

    accumulator.run(reader, writer, feedback)
}
