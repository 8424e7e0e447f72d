//! # Umbra Core
//!
//! Core types, traits and I/O for the Umbra terrain shading library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `Window` / `WindowLoop`: chunk windows for streaming a raster block by block
//! - `BlockReader` / `BlockWriter`: windowed reads and buffered, explicitly
//!   flushed writes
//! - `DemMetadata` and DEM validation
//! - GeoTIFF I/O

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{
    ChunkAxis, ChunkWindows, DemMetadata, GeoTransform, Raster, RasterElement, ValidationIssue,
    Window, WindowLoop,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::io::{BlockReader, BlockWriter, RasterBlockWriter};
    pub use crate::raster::{ChunkAxis, DemMetadata, GeoTransform, Raster, Window, WindowLoop};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in Umbra.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(
        &self,
        input: Self::Input,
    ) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
