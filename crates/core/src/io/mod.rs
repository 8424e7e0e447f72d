//! I/O operations for reading and writing elevation rasters
//!
//! - [`BlockReader`] / [`BlockWriter`]: windowed access used by streaming
//!   algorithms
//! - GeoTIFF file I/O through the `tiff` crate
//! - With the `gdal` feature, [`GdalDem`] streams windows straight from any
//!   GDAL-readable dataset

mod block;
#[cfg(feature = "gdal")]
mod gdal_io;
mod native;

pub use block::{BlockReader, BlockWriter, RasterBlockWriter};
#[cfg(feature = "gdal")]
pub use gdal_io::GdalDem;
pub use native::{read_geotiff, write_geotiff, GeoTiffOptions, SampleFormat};
