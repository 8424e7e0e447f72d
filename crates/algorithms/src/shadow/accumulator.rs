//! Chunked shadow accumulation
//!
//! Chunks are visited in sun order. Each one is read, sheared into the
//! working buffer, scanned with a running maximum and sheared back. The only
//! state that survives from one chunk to the next is the boundary line: the
//! shadow depth along the downstream seam, which seeds the upstream seam of
//! the following chunk. Chunks therefore cannot be processed out of order.

use ndarray::{Array1, Array2, Axis, Zip};
use umbra_core::io::{BlockReader, BlockWriter};
use umbra_core::{ChunkWindows, Error, Result, WindowLoop};

use super::feedback::{Completion, Feedback};
use super::geometry::ScanGeometry;
use super::shear::ShearMap;
use super::smoothing::mean3x3;

/// Owns every buffer of a streaming run.
#[derive(Debug)]
pub struct StreamingAccumulator {
    geometry: ScanGeometry,
    shear: ShearMap,
    raster_shape: (usize, usize),
    chunk: usize,
    smooth: bool,
    sentinel: f64,
    scan: Array2<f64>,
    mask: Array2<bool>,
    working: Array2<f64>,
    working_mask: Array2<bool>,
    boundary: Array1<f64>,
}

impl StreamingAccumulator {
    /// Allocate buffers for a `raster_shape` (rows, cols) raster cut into
    /// chunks of `chunk` rows or columns.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] when `chunk` is zero;
    /// [`Error::InvalidDimensions`] when the raster is empty.
    pub fn new(
        geometry: ScanGeometry,
        raster_shape: (usize, usize),
        chunk: usize,
        smooth: bool,
        sentinel: f64,
    ) -> Result<Self> {
        let windows = Self::window_loop(&geometry, raster_shape, chunk)?;
        let buffer_shape = windows.buffer_shape();
        let shear = ShearMap::build(buffer_shape, &geometry)?;
        let working_shape = shear.working_shape();
        let seam_len = shear.seam_len();

        Ok(Self {
            geometry,
            shear,
            raster_shape,
            chunk,
            smooth,
            sentinel,
            scan: Array2::from_elem(buffer_shape, sentinel),
            mask: Array2::from_elem(buffer_shape, false),
            working: Array2::from_elem(working_shape, sentinel),
            working_mask: Array2::from_elem(working_shape, false),
            boundary: Array1::zeros(seam_len),
        })
    }

    fn window_loop(
        geometry: &ScanGeometry,
        (rows, cols): (usize, usize),
        chunk: usize,
    ) -> Result<WindowLoop> {
        WindowLoop::new(
            rows,
            cols,
            chunk,
            geometry.chunk_axis(),
            geometry.reverse_traversal(),
            0,
        )
    }

    /// Chunk windows in processing order
    pub fn windows(&self) -> Result<WindowLoop> {
        Self::window_loop(&self.geometry, self.raster_shape, self.chunk)
    }

    pub fn geometry(&self) -> &ScanGeometry {
        &self.geometry
    }

    pub fn shear(&self) -> &ShearMap {
        &self.shear
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Shadow depth carried to the next chunk
    pub fn boundary(&self) -> &Array1<f64> {
        &self.boundary
    }

    /// Working buffer as left by the last processed chunk
    pub fn working(&self) -> &Array2<f64> {
        &self.working
    }

    /// Forget the carried boundary, as before the first chunk of a run
    pub fn reset(&mut self) {
        self.boundary.fill(0.0);
    }

    /// Process one chunk and return its shadow depths for
    /// `windows.write_local`.
    ///
    /// No-data cells (NaN, or equal to `nodata`) come back as NaN. Chunks
    /// must be fed in the order [`windows`](Self::windows) yields them.
    pub fn process_chunk<R: BlockReader + ?Sized>(
        &mut self,
        reader: &R,
        windows: &ChunkWindows,
        nodata: Option<f64>,
    ) -> Result<Array2<f64>> {
        let sentinel = self.sentinel;

        self.scan.fill(sentinel);
        reader.read_into(&windows.read, windows.read_local.view_mut(&mut self.scan))?;
        Zip::from(&mut self.scan)
            .and(&mut self.mask)
            .for_each(|v, masked| {
                *masked = v.is_nan() || nodata.is_some_and(|nd| *v == nd);
                if *masked {
                    *v = sentinel;
                }
            });

        self.working.fill(sentinel);
        self.working_mask.fill(false);
        self.shear.scatter_with_offset(&self.scan, &mut self.working);
        self.shear.scatter_mask(&self.mask, &mut self.working_mask);

        for (&cell, &depth) in self.shear.first_line().iter().zip(self.boundary.iter()) {
            self.working[cell] -= depth;
        }

        subtract_running_max(&mut self.working, self.shear.axis());

        for (&cell, &depth) in self.shear.first_line().iter().zip(self.boundary.iter()) {
            self.working[cell] = depth;
        }

        // A no-data seam cell holds sentinel depth; carry an unshaded seam instead
        for (next, &cell) in self.boundary.iter_mut().zip(self.shear.last_line()) {
            *next = if self.working_mask[cell] { 0.0 } else { self.working[cell] };
        }

        let depth = self.shear.gather(&self.working);
        let mut block = windows.write_local.view(&depth).to_owned();
        if self.smooth {
            block = mean3x3(&block)?;
        }

        Zip::from(&mut block)
            .and(windows.write_local.view(&self.mask))
            .for_each(|v, &masked| {
                if masked {
                    *v = f64::NAN;
                }
            });

        Ok(block)
    }

    /// Stream every chunk from `reader` to `writer`.
    ///
    /// Progress is reported after each chunk, followed by a cancellation
    /// check. A cancelled run returns [`Completion::Cancelled`] without
    /// flushing `writer`; a finished run flushes it once at the end.
    pub fn run<R, W, F>(&mut self, reader: &R, writer: &mut W, feedback: &F) -> Result<Completion>
    where
        R: BlockReader + ?Sized,
        W: BlockWriter + ?Sized,
        F: Feedback + ?Sized,
    {
        let meta = reader.metadata();
        if meta.shape() != self.raster_shape {
            let (er, ec) = self.raster_shape;
            let (ar, ac) = meta.shape();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }

        self.reset();
        let windows = self.windows()?;
        let extent = windows.extent();
        let total = windows.chunk_count();

        let mut done = 0;
        for chunk in windows {
            let block = self.process_chunk(reader, &chunk, meta.nodata)?;
            writer.write_block(block.view(), &chunk.write)?;
            done += 1;

            let progress = (100.0 * (self.chunk * done) as f64 / extent as f64).min(100.0);
            feedback.set_progress(progress);
            tracing::trace!(chunk = chunk.index, total, progress, "chunk written");

            if feedback.is_canceled() {
                tracing::info!(chunks = done, total, "shading cancelled, output not flushed");
                return Ok(Completion::Cancelled { chunks: done });
            }
        }

        writer.flush()?;
        Ok(Completion::Finished { chunks: done })
    }
}

/// Replace each value with its difference to the running maximum along
/// `axis`. Results are `<= 0`, and the first value of every lane becomes 0.
pub fn subtract_running_max(working: &mut Array2<f64>, axis: usize) {
    for mut lane in working.lanes_mut(Axis(axis)) {
        let mut running = f64::NEG_INFINITY;
        for v in lane.iter_mut() {
            running = running.max(*v);
            *v -= running;
        }
    }
}
