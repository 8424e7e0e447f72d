//! Windowed block reads and buffered block writes

use crate::error::{Error, Result};
use crate::raster::{DemMetadata, Raster, RasterElement, Window};
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// Source of elevation samples that can be read one window at a time.
pub trait BlockReader {
    /// Grid size, pixel size and no-data value
    fn metadata(&self) -> DemMetadata;

    /// Read the raster window `window` into `out`, converting samples to
    /// `f64`. `out` must have the window's shape.
    fn read_into(&self, window: &Window, out: ArrayViewMut2<'_, f64>) -> Result<()>;
}

/// Sink for processed blocks.
///
/// Writes may be buffered; nothing is guaranteed to reach the destination
/// until [`BlockWriter::flush`] returns.
pub trait BlockWriter {
    /// Queue `block` for the raster window `window`
    fn write_block(&mut self, block: ArrayView2<'_, f64>, window: &Window) -> Result<()>;

    /// Commit every queued block
    fn flush(&mut self) -> Result<()>;
}

fn check_block_shape(window: &Window, shape: (usize, usize)) -> Result<()> {
    if window.shape() != shape {
        return Err(Error::SizeMismatch {
            er: window.rows,
            ec: window.cols,
            ar: shape.0,
            ac: shape.1,
        });
    }
    Ok(())
}

impl<T: RasterElement> BlockReader for Raster<T> {
    fn metadata(&self) -> DemMetadata {
        Raster::metadata(self)
    }

    fn read_into(&self, window: &Window, mut out: ArrayViewMut2<'_, f64>) -> Result<()> {
        check_block_shape(window, out.dim())?;
        let src = self.window(window)?;
        out.zip_mut_with(&src, |o, &v| *o = v.to_f64().unwrap_or(f64::NAN));
        Ok(())
    }
}

/// In-memory [`BlockWriter`] that assembles blocks into a target raster.
///
/// Blocks stay queued until [`flush`](BlockWriter::flush) is called; a writer
/// that is dropped or unwrapped without flushing leaves the target as it was
/// after the last flush.
#[derive(Debug)]
pub struct RasterBlockWriter {
    target: Raster<f64>,
    pending: Vec<(Window, Array2<f64>)>,
}

impl RasterBlockWriter {
    /// Create a writer over `target`
    pub fn new(target: Raster<f64>) -> Self {
        Self {
            target,
            pending: Vec::new(),
        }
    }

    /// Number of blocks waiting for a flush
    pub fn pending_blocks(&self) -> usize {
        self.pending.len()
    }

    /// Target raster as of the last flush
    pub fn target(&self) -> &Raster<f64> {
        &self.target
    }

    /// Consume the writer, discarding unflushed blocks
    pub fn into_raster(self) -> Raster<f64> {
        self.target
    }
}

impl BlockWriter for RasterBlockWriter {
    fn write_block(&mut self, block: ArrayView2<'_, f64>, window: &Window) -> Result<()> {
        check_block_shape(window, block.dim())?;
        window.check_fits(self.target.rows(), self.target.cols())?;
        self.pending.push((*window, block.to_owned()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for (window, block) in self.pending.drain(..) {
            self.target.window_mut(&window)?.assign(&block);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_raster_read_into_converts_samples() {
        let mut dem: Raster<i16> = Raster::new(4, 4);
        dem.set(1, 2, 120).unwrap();
        dem.set_nodata(Some(-1));

        let mut out = Array2::<f64>::zeros((2, 3));
        dem.read_into(&Window::new(1, 1, 2, 3), out.view_mut()).unwrap();

        assert_eq!(out[(0, 1)], 120.0);
        assert_eq!(BlockReader::metadata(&dem).nodata, Some(-1.0));
    }

    #[test]
    fn test_read_into_rejects_wrong_shape() {
        let dem: Raster<f64> = Raster::new(4, 4);
        let mut out = Array2::<f64>::zeros((2, 2));
        let err = dem.read_into(&Window::new(0, 0, 2, 3), out.view_mut());
        assert!(matches!(err, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_writes_land_only_on_flush() {
        let mut writer = RasterBlockWriter::new(Raster::filled(3, 3, f64::NAN));
        let block = array![[1.0, 2.0, 3.0]];
        writer.write_block(block.view(), &Window::new(2, 0, 1, 3)).unwrap();

        assert_eq!(writer.pending_blocks(), 1);
        assert!(writer.target().get(2, 1).unwrap().is_nan());

        writer.flush().unwrap();
        assert_eq!(writer.pending_blocks(), 0);
        assert_eq!(writer.target().get(2, 1).unwrap(), 2.0);
        assert!(writer.target().get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_unflushed_blocks_are_dropped() {
        let mut writer = RasterBlockWriter::new(Raster::new(2, 2));
        writer
            .write_block(array![[5.0, 5.0]].view(), &Window::new(0, 0, 1, 2))
            .unwrap();
        let raster = writer.into_raster();
        assert_eq!(raster.get(0, 0).unwrap(), 0.0);
    }
}
