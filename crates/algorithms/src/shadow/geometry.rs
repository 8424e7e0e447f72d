//! Scan geometry: from sun position and pixel size to shear parameters
//!
//! The sun bearing is folded into a 0–45° shear angle `s`. Bearings within
//! 45° of east or west are *steep*: the raster is cut into column strips and
//! scanned along X. All other bearings are scanned along Y in row strips.
//! Reflection flags record which way the light travels along each axis.

use umbra_core::ChunkAxis;

/// Immutable per-run scan parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanGeometry {
    /// Bearing actually used, after correction for non-square pixels (degrees)
    pub bearing: f64,
    /// Bearing folded into 0–45° (degrees)
    pub shear_angle: f64,
    /// Shear factor, `tan(shear_angle)`
    pub slope: f64,
    /// Sun altitude factor, `tan(altitude)`
    pub tilt: f64,
    /// Whether the scan runs along X (column strips)
    pub steep: bool,
    /// Index direction along X must be mirrored
    pub rev_x: bool,
    /// Index direction along Y must be mirrored
    pub rev_y: bool,
    /// Ground distance per scan step
    pub pixel_size: f64,
}

impl ScanGeometry {
    /// Resolve the scan geometry.
    ///
    /// `direction` is the sun bearing in degrees clockwise from north,
    /// `[0, 360)`; `altitude` the sun angle above the horizon, `[0, 89]`;
    /// `pix_x`/`pix_y` the positive ground pixel size. Ranges are the
    /// caller's responsibility.
    ///
    /// For non-square pixels the bearing is first corrected with
    /// [`adjust_bearing`]. The pixel-size blend below then uses the folded
    /// corrected angle as-is; on diagonal bearings this is an approximation.
    pub fn resolve(direction: f64, altitude: f64, pix_x: f64, pix_y: f64) -> Self {
        let bearing = if pix_x != pix_y {
            adjust_bearing(direction, pix_x, pix_y)
        } else {
            direction
        };

        let steep = (45.0..=135.0).contains(&bearing) || (225.0..=315.0).contains(&bearing);

        let mut s = bearing % 90.0;
        if s > 45.0 {
            s = 90.0 - s;
        }
        let (sin_s, cos_s) = s.to_radians().sin_cos();

        let pixel_size = if steep {
            pix_x * cos_s + pix_y * sin_s
        } else {
            pix_x * sin_s + pix_y * cos_s
        };

        Self {
            bearing,
            shear_angle: s,
            slope: s.to_radians().tan(),
            tilt: altitude.to_radians().tan(),
            steep,
            rev_x: !(180.0..=360.0).contains(&bearing),
            rev_y: (90.0..=270.0).contains(&bearing),
            pixel_size,
        }
    }

    /// Axis of the sheared working buffer along which the running maximum
    /// is taken
    pub fn axis(&self) -> usize {
        if self.steep { 0 } else { 1 }
    }

    /// How the raster is cut into chunks
    pub fn chunk_axis(&self) -> ChunkAxis {
        if self.steep {
            ChunkAxis::Columns
        } else {
            ChunkAxis::Rows
        }
    }

    /// Whether chunks are visited from the far end of the raster
    pub fn reverse_traversal(&self) -> bool {
        if self.steep { self.rev_x } else { self.rev_y }
    }

    /// Height gained per unit of shear offset: projects the offset onto the
    /// sun direction and raises it by the sun altitude
    pub fn offset_scale(&self) -> f64 {
        self.pixel_size * self.shear_angle.to_radians().cos() * self.tilt
    }
}

/// Correct a ground bearing for non-square pixels.
///
/// A ground direction `(sin θ, cos θ)` spans `sin θ / pix_x` columns and
/// `cos θ / pix_y` rows; the result is the bearing of that pixel-space vector,
/// in `[0, 360)`.
pub fn adjust_bearing(direction: f64, pix_x: f64, pix_y: f64) -> f64 {
    let (sin_t, cos_t) = direction.to_radians().sin_cos();
    let adjusted = (sin_t / pix_x).atan2(cos_t / pix_y).to_degrees();
    let adjusted = adjusted.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360
    if adjusted >= 360.0 { 0.0 } else { adjusted }
}
