//! Shadow depth parameters

use serde::{Deserialize, Serialize};
use umbra_core::{Error, Result};

/// Parameters for shadow depth calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowDepthParams {
    /// Sun direction in degrees (0 = North, clockwise, 0–360)
    pub direction: f64,
    /// Sun altitude in degrees above the horizon (0–89)
    pub altitude: f64,
    /// Apply a 3×3 mean filter to every output block
    pub smooth: bool,
    /// Upper bound on the cells held by one chunk buffer
    pub max_chunk_cells: usize,
    /// Stand-in elevation for no-data cells during accumulation. Must sit
    /// well below any real `elevation - offset`.
    pub nodata_sentinel: f64,
}

impl Default for ShadowDepthParams {
    fn default() -> Self {
        Self {
            direction: 315.0, // NW illumination
            altitude: 10.0,
            smooth: true,
            max_chunk_cells: 1 << 24,
            nodata_sentinel: -9999.0,
        }
    }
}

impl ShadowDepthParams {
    /// Check ranges and normalize a direction of 360° to 0°.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] naming the first offending field.
    pub fn validate(&self) -> Result<Self> {
        if !(0.0..=360.0).contains(&self.direction) {
            return Err(Error::invalid_parameter(
                "direction",
                self.direction,
                "sun direction must be within 0 to 360 degrees",
            ));
        }
        if !(0.0..=89.0).contains(&self.altitude) {
            return Err(Error::invalid_parameter(
                "altitude",
                self.altitude,
                "sun angle must be within 0 to 89 degrees",
            ));
        }
        if self.max_chunk_cells == 0 {
            return Err(Error::invalid_parameter(
                "max_chunk_cells",
                self.max_chunk_cells,
                "chunk budget must be positive",
            ));
        }
        if !self.nodata_sentinel.is_finite() {
            return Err(Error::invalid_parameter(
                "nodata_sentinel",
                self.nodata_sentinel,
                "sentinel must be a finite number",
            ));
        }

        let mut params = *self;
        if params.direction == 360.0 {
            params.direction = 0.0;
        }
        Ok(params)
    }
}
