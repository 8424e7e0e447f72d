//! Chunk length selection
//!
//! Sheared lines are rasterized by rounding `n · slope` to whole cells. The
//! boundary line carried from one chunk to the next is only aligned with the
//! shear when a chunk ends close to an integer offset, so the chunk length is
//! chosen to minimize that rounding remainder.

use umbra_core::{Error, Result};

use super::geometry::ScanGeometry;

/// Largest chunk length allowed by the raster extent and a memory budget.
///
/// `max_chunk_cells` bounds the size of one chunk buffer; every chunk spans
/// the full raster across the chunking axis.
pub fn chunk_bound(
    geometry: &ScanGeometry,
    rows: usize,
    cols: usize,
    max_chunk_cells: usize,
) -> usize {
    let (extent, across) = if geometry.steep { (cols, rows) } else { (rows, cols) };
    let budget = (max_chunk_cells / across.max(1)).max(1);
    extent.min(budget)
}

/// Signed distance of `n · slope` to the nearest integer, in `(-0.5, 0.5]`.
pub fn shear_remainder(n: usize, slope: f64) -> f64 {
    let r = (n as f64 * slope).rem_euclid(1.0);
    if r > 0.5 { r - 1.0 } else { r }
}

/// Pick the chunk length with the smallest shear rounding remainder.
///
/// Candidates are `1..bound`. Remainders are compared in absolute value
/// rounded to two decimals; among equal scores the largest candidate wins.
/// A bound of 1 leaves no candidates and yields 1.
///
/// # Errors
/// [`Error::InvalidParameter`] when `bound` is zero.
pub fn optimal_chunk(bound: usize, slope: f64) -> Result<usize> {
    if bound == 0 {
        return Err(Error::invalid_parameter(
            "chunk",
            bound,
            "chunk size must be at least one row or column",
        ));
    }

    let mut best = bound.min(1);
    let mut best_score = f64::INFINITY;
    for n in (1..bound).rev() {
        let score = (shear_remainder(n, slope).abs() * 100.0).round() / 100.0;
        if score < best_score {
            best = n;
            best_score = score;
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_bound_rejected() {
        assert!(optimal_chunk(0, 0.3).is_err());
    }

    #[test]
    fn test_unit_bound() {
        assert_eq!(optimal_chunk(1, 0.3).unwrap(), 1);
    }

    #[test]
    fn test_zero_slope_takes_largest_candidate() {
        assert_eq!(optimal_chunk(10, 0.0).unwrap(), 9);
        assert_eq!(optimal_chunk(512, 0.0).unwrap(), 511);
    }

    #[test]
    fn test_diagonal_slope() {
        let slope = 45_f64.to_radians().tan();
        assert_eq!(optimal_chunk(100, slope).unwrap(), 99);
    }

    #[test]
    fn test_half_slope_prefers_even_lengths() {
        // 0.5 · n is whole only for even n
        assert_eq!(optimal_chunk(10, 0.5).unwrap(), 8);
        assert_eq!(optimal_chunk(11, 0.5).unwrap(), 10);
    }

    #[test]
    fn test_third_slope() {
        let chunk = optimal_chunk(50, 1.0 / 3.0).unwrap();
        assert_eq!(chunk % 3, 0);
        assert_eq!(chunk, 48);
    }

    #[test]
    fn test_deterministic() {
        let slope = 17_f64.to_radians().tan();
        let first = optimal_chunk(1000, slope).unwrap();
        for _ in 0..5 {
            assert_eq!(optimal_chunk(1000, slope).unwrap(), first);
        }
        assert!(first >= 1 && first < 1000);
    }

    #[test]
    fn test_shear_remainder_range() {
        assert_relative_eq!(shear_remainder(3, 0.3), -0.1, epsilon = 1e-12);
        assert_relative_eq!(shear_remainder(1, 0.3), 0.3, epsilon = 1e-12);
        assert_relative_eq!(shear_remainder(5, 0.5), 0.5, epsilon = 1e-12);
        for n in 1..200 {
            let r = shear_remainder(n, 0.2679);
            assert!(r > -0.5 && r <= 0.5);
        }
    }

    #[test]
    fn test_chunk_bound() {
        let shallow = ScanGeometry::resolve(0.0, 10.0, 1.0, 1.0);
        assert_eq!(chunk_bound(&shallow, 100, 50, usize::MAX), 100);
        assert_eq!(chunk_bound(&shallow, 100, 50, 1000), 20);
        assert_eq!(chunk_bound(&shallow, 100, 50, 10), 1);

        let steep = ScanGeometry::resolve(90.0, 10.0, 1.0, 1.0);
        assert_eq!(chunk_bound(&steep, 100, 50, usize::MAX), 50);
        assert_eq!(chunk_bound(&steep, 100, 50, 1000), 10);
    }
}
