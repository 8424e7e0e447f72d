//! 3×3 mean filter for finished depth blocks

use crate::maybe_rayon::*;
use ndarray::Array2;
use umbra_core::{Error, Result};

/// Replace every cell with the unweighted mean of its 3×3 neighbourhood.
///
/// Edge and corner cells average only the neighbours that lie inside the
/// block. NaN is not skipped: it propagates to every cell that sees it.
pub fn mean3x3(block: &Array2<f64>) -> Result<Array2<f64>> {
    let (rows, cols) = block.dim();
    if rows == 0 || cols == 0 {
        return Ok(block.clone());
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let r0 = row.saturating_sub(1);
            let r1 = (row + 1).min(rows - 1);

            (0..cols)
                .map(|col| {
                    let c0 = col.saturating_sub(1);
                    let c1 = (col + 1).min(cols - 1);

                    let mut sum = 0.0;
                    for r in r0..=r1 {
                        for c in c0..=c1 {
                            sum += block[(r, c)];
                        }
                    }
                    sum / ((r1 - r0 + 1) * (c1 - c0 + 1)) as f64
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}
