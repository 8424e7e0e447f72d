//! Chunk windows for streaming a raster block by block
//!
//! A raster is cut into strips of `chunk` rows or `chunk` columns. Each strip
//! is read into a fixed-size chunk buffer, processed, and written back. The
//! [`WindowLoop`] iterator yields, per strip, where to read and write in
//! raster space and where that data sits inside the chunk buffer.

use crate::error::{Error, Result};
use ndarray::{s, ArrayBase, Data, DataMut, Ix2, SliceInfo, SliceInfoElem};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A rectangular region, either in raster space or in a chunk buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// First row of the region
    pub row_off: usize,
    /// First column of the region
    pub col_off: usize,
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
}

impl Window {
    /// Create a new window
    pub fn new(row_off: usize, col_off: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_off,
            col_off,
            rows,
            cols,
        }
    }

    /// Shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the window has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row range covered by the window
    pub fn row_range(&self) -> Range<usize> {
        self.row_off..self.row_off + self.rows
    }

    /// Column range covered by the window
    pub fn col_range(&self) -> Range<usize> {
        self.col_off..self.col_off + self.cols
    }

    /// Whether the window fits inside a grid of the given shape
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        self.row_off + self.rows <= rows && self.col_off + self.cols <= cols
    }

    /// Fail with [`Error::WindowOutOfBounds`] unless the window fits the grid
    pub fn check_fits(&self, rows: usize, cols: usize) -> Result<()> {
        if self.fits(rows, cols) {
            Ok(())
        } else {
            Err(Error::WindowOutOfBounds {
                row_off: self.row_off,
                col_off: self.col_off,
                win_rows: self.rows,
                win_cols: self.cols,
                rows,
                cols,
            })
        }
    }

    /// Slice argument for `ndarray` views of this window
    pub fn slice_info(&self) -> SliceInfo<[SliceInfoElem; 2], Ix2, Ix2> {
        s![self.row_range(), self.col_range()]
    }

    /// Immutable view of this window inside `array`
    pub fn view<'a, S>(&self, array: &'a ArrayBase<S, Ix2>) -> ndarray::ArrayView2<'a, S::Elem>
    where
        S: Data,
    {
        array.slice(self.slice_info())
    }

    /// Mutable view of this window inside `array`
    pub fn view_mut<'a, S>(
        &self,
        array: &'a mut ArrayBase<S, Ix2>,
    ) -> ndarray::ArrayViewMut2<'a, S::Elem>
    where
        S: DataMut,
    {
        array.slice_mut(self.slice_info())
    }
}

/// Axis along which a raster is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkAxis {
    /// Strips of `chunk` full-width rows
    Rows,
    /// Strips of `chunk` full-height columns
    Columns,
}

/// Windows for one chunk, as yielded by [`WindowLoop`].
///
/// `read`/`write` are raster-space windows; `read_local`/`write_local` are
/// the matching regions inside the chunk buffer. The two pairs only differ
/// when the loop was built with an overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindows {
    /// Zero-based position of this chunk in traversal order
    pub index: usize,
    /// Raster window to read
    pub read: Window,
    /// Where the read window lands in the chunk buffer
    pub read_local: Window,
    /// Raster window to write
    pub write: Window,
    /// Chunk buffer region holding the data to write
    pub write_local: Window,
}

/// Lazy, finite iterator over the chunk windows of a raster.
///
/// Chunks cover the whole raster along `axis`, in increasing order or, when
/// `reverse` is set, starting from the far end. A short final chunk is placed
/// in the buffer so that it stays contiguous with the previous chunk in
/// traversal order: at the start of the buffer going forward, at the end of
/// the buffer going in reverse.
#[derive(Debug, Clone)]
pub struct WindowLoop {
    rows: usize,
    cols: usize,
    chunk: usize,
    axis: ChunkAxis,
    reverse: bool,
    overlap: usize,
    next: usize,
    count: usize,
}

impl WindowLoop {
    /// Create a window loop over a `rows × cols` raster.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] when `chunk` is zero.
    pub fn new(
        rows: usize,
        cols: usize,
        chunk: usize,
        axis: ChunkAxis,
        reverse: bool,
        overlap: usize,
    ) -> Result<Self> {
        if chunk == 0 {
            return Err(Error::invalid_parameter("chunk", chunk, "must be at least 1"));
        }

        let extent = match axis {
            ChunkAxis::Rows => rows,
            ChunkAxis::Columns => cols,
        };

        Ok(Self {
            rows,
            cols,
            chunk,
            axis,
            reverse,
            overlap,
            next: 0,
            count: extent.div_ceil(chunk),
        })
    }

    /// Raster extent along the chunking axis
    pub fn extent(&self) -> usize {
        match self.axis {
            ChunkAxis::Rows => self.rows,
            ChunkAxis::Columns => self.cols,
        }
    }

    /// Total number of chunks
    pub fn chunk_count(&self) -> usize {
        self.count
    }

    /// Shape (rows, cols) of the buffer every chunk is read into
    pub fn buffer_shape(&self) -> (usize, usize) {
        let along = self.chunk + 2 * self.overlap;
        match self.axis {
            ChunkAxis::Rows => (along, self.cols),
            ChunkAxis::Columns => (self.rows, along),
        }
    }

    /// Build a window from a span along the chunking axis
    fn along(&self, start: usize, len: usize) -> Window {
        match self.axis {
            ChunkAxis::Rows => Window::new(start, 0, len, self.cols),
            ChunkAxis::Columns => Window::new(0, start, self.rows, len),
        }
    }
}

impl Iterator for WindowLoop {
    type Item = ChunkWindows;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }

        let k = self.next;
        let extent = self.extent();

        // Core span in raster space
        let (start, len) = if self.reverse {
            let end = extent - k * self.chunk;
            let start = end.saturating_sub(self.chunk);
            (start, end - start)
        } else {
            let start = k * self.chunk;
            (start, self.chunk.min(extent - start))
        };

        let read_start = start.saturating_sub(self.overlap);
        let read_end = (start + len + self.overlap).min(extent);

        let local_start = if self.reverse {
            self.overlap + self.chunk - len
        } else {
            self.overlap
        };
        let read_local_start = local_start - (start - read_start);

        self.next += 1;

        Some(ChunkWindows {
            index: k,
            read: self.along(read_start, read_end - read_start),
            read_local: self.along(read_local_start, read_end - read_start),
            write: self.along(start, len),
            write_local: self.along(local_start, len),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowLoop {}
