//! DEM metadata and pre-flight validation

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a streaming algorithm needs to know about an elevation raster
/// before reading any of its samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemMetadata {
    /// Ground width of one pixel
    pub pix_x: f64,
    /// Ground height of one pixel
    pub pix_y: f64,
    /// Number of columns
    pub xsize: usize,
    /// Number of rows
    pub ysize: usize,
    /// No-data sentinel, if declared
    pub nodata: Option<f64>,
}

impl DemMetadata {
    /// Grid shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.ysize, self.xsize)
    }

    /// Whether pixels are non-square
    pub fn is_anisotropic(&self) -> bool {
        self.pix_x != self.pix_y
    }

    /// Check the raster can be processed.
    ///
    /// Returns `None` when everything is in order. A fatal issue means no
    /// processing may start; a non-fatal one is a warning for the caller to
    /// surface.
    pub fn validate(&self) -> Option<ValidationIssue> {
        if self.xsize == 0 || self.ysize == 0 {
            return Some(ValidationIssue::fatal(format!(
                "raster is empty ({} x {})",
                self.xsize, self.ysize
            )));
        }

        for (name, size) in [("width", self.pix_x), ("height", self.pix_y)] {
            if !size.is_finite() || size <= 0.0 {
                return Some(ValidationIssue::fatal(format!(
                    "pixel {} must be a positive number, got {}",
                    name, size
                )));
            }
        }

        if self.is_anisotropic() {
            return Some(ValidationIssue::warning(format!(
                "pixels are not square ({} x {}); shading along diagonal bearings is approximate",
                self.pix_x, self.pix_y
            )));
        }

        None
    }
}

/// A problem found by [`DemMetadata::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Human-readable description
    pub message: String,
    /// Whether processing must be aborted
    pub fatal: bool,
}

impl ValidationIssue {
    /// An issue that aborts processing
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }

    /// An issue worth reporting that does not stop processing
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
