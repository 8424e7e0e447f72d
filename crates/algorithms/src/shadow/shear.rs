//! Shear transform between a chunk buffer and the sheared working buffer
//!
//! Every chunk cell is sent to one cell of a larger working buffer so that
//! cells lying on the same sun ray end up on the same working line. Along
//! that line the running maximum of `elevation + offset` is the height of
//! the shadow plane cast by everything upstream.

use ndarray::{Array2, Zip};
use umbra_core::{Error, Result};

use super::geometry::ScanGeometry;

/// Precomputed index and offset maps for one chunk buffer shape.
///
/// The maps depend only on the buffer shape and the scan geometry, so they
/// are built once per run and reused for every chunk.
#[derive(Debug, Clone)]
pub struct ShearMap {
    shape: (usize, usize),
    src_y: Array2<usize>,
    src_x: Array2<usize>,
    offset: Array2<f64>,
    working_shape: (usize, usize),
    first_line: Vec<(usize, usize)>,
    last_line: Vec<(usize, usize)>,
    axis: usize,
}

impl ShearMap {
    /// Build the shear maps for a chunk buffer of `shape` (rows, cols).
    ///
    /// # Errors
    /// [`Error::InvalidDimensions`] when the buffer is empty.
    pub fn build(shape: (usize, usize), geometry: &ScanGeometry) -> Result<Self> {
        let (rows, cols) = shape;
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { width: cols, height: rows });
        }

        let slope = geometry.slope;
        let iy = |r: usize| if geometry.rev_y { rows - 1 - r } else { r };
        let ix = |c: usize| if geometry.rev_x { c } else { cols - 1 - c };
        // `i + round(j · slope)`, rounding half away from zero
        let shift = |i: usize, j: usize| i + (j as f64 * slope).round() as usize;

        let mut src_y = Array2::<usize>::zeros(shape);
        let mut src_x = Array2::<usize>::zeros(shape);
        let mut offset = Array2::<f64>::zeros(shape);

        for r in 0..rows {
            for c in 0..cols {
                let along = ix(cols - 1 - c);
                let (y, x, off) = if geometry.steep {
                    (along, shift(iy(r), ix(c)), along as f64 + iy(r) as f64 * slope)
                } else {
                    (shift(ix(c), iy(r)), iy(r), iy(r) as f64 + along as f64 * slope)
                };
                src_y[(r, c)] = y;
                src_x[(r, c)] = x;
                offset[(r, c)] = off;
            }
        }

        offset *= geometry.offset_scale();

        let t_y = src_y.iter().copied().max().unwrap_or(0) + 1;
        let t_x = src_x.iter().copied().max().unwrap_or(0) + 1;

        // Seam lines: the upstream edge of the working buffer receives the
        // carried boundary, the downstream edge provides the next one
        let (first_line, last_line): (Vec<_>, Vec<_>) = if geometry.steep {
            (0..rows).map(|k| ((0, t_x - rows + k), (t_y - 1, k))).unzip()
        } else {
            (0..cols).map(|k| ((k, 0), (t_y - cols + k, t_x - 1))).unzip()
        };

        Ok(Self {
            shape,
            src_y,
            src_x,
            offset,
            working_shape: (t_y, t_x),
            first_line,
            last_line,
            axis: geometry.axis(),
        })
    }

    /// Chunk buffer shape the maps were built for
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Shape of the sheared working buffer
    pub fn working_shape(&self) -> (usize, usize) {
        self.working_shape
    }

    /// Working-buffer axis along which shadows accumulate
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Length of the boundary line carried between chunks
    pub fn seam_len(&self) -> usize {
        self.first_line.len()
    }

    /// Working cells receiving the carried boundary
    pub fn first_line(&self) -> &[(usize, usize)] {
        &self.first_line
    }

    /// Working cells handed on as the next boundary
    pub fn last_line(&self) -> &[(usize, usize)] {
        &self.last_line
    }

    /// Height offset of each chunk cell
    pub fn offset(&self) -> &Array2<f64> {
        &self.offset
    }

    /// Working cell that chunk cell `(r, c)` maps to
    pub fn target(&self, r: usize, c: usize) -> (usize, usize) {
        (self.src_y[(r, c)], self.src_x[(r, c)])
    }

    /// Write `values + offset` into the working buffer
    pub fn scatter_with_offset(&self, values: &Array2<f64>, working: &mut Array2<f64>) {
        Zip::from(values)
            .and(&self.src_y)
            .and(&self.src_x)
            .and(&self.offset)
            .for_each(|&v, &y, &x, &off| working[(y, x)] = v + off);
    }

    /// Copy a per-cell flag into working space
    pub fn scatter_mask(&self, mask: &Array2<bool>, working: &mut Array2<bool>) {
        Zip::from(mask)
            .and(&self.src_y)
            .and(&self.src_x)
            .for_each(|&m, &y, &x| working[(y, x)] = m);
    }

    /// Read the working buffer back into chunk layout
    pub fn gather(&self, working: &Array2<f64>) -> Array2<f64> {
        Array2::from_shape_fn(self.shape, |(r, c)| {
            working[(self.src_y[(r, c)], self.src_x[(r, c)])]
        })
    }
}
