//! Windowed DEM access through GDAL
//!
//! Unlike [`read_geotiff`](super::read_geotiff), [`GdalDem`] never loads the
//! whole raster: each [`BlockReader::read_into`] call reads just one window
//! from the dataset, so arbitrarily large DEMs can be shaded chunk by chunk.

use crate::crs::CRS;
use crate::error::Result;
use crate::io::BlockReader;
use crate::raster::{DemMetadata, GeoTransform, Raster, Window};
use gdal::Dataset;
use ndarray::ArrayViewMut2;
use std::path::Path;

/// A single band of a GDAL dataset, read window by window.
pub struct GdalDem {
    dataset: Dataset,
    band: usize,
    transform: GeoTransform,
    crs: Option<CRS>,
    metadata: DemMetadata,
}

impl GdalDem {
    /// Open `path` and use band `band` (1-indexed, defaults to 1)
    pub fn open<P: AsRef<Path>>(path: P, band: Option<usize>) -> Result<Self> {
        let dataset = Dataset::open(path.as_ref())?;
        let band = band.unwrap_or(1);
        let nodata = dataset.rasterband(band)?.no_data_value();

        let transform = dataset
            .geo_transform()
            .map(GeoTransform::from_gdal)
            .unwrap_or_default();

        let crs = dataset.spatial_ref().ok().and_then(|srs| {
            match srs.auth_code() {
                Ok(code) if srs.is_geographic() => Some(CRS::geographic_from_epsg(code as u32)),
                Ok(code) => Some(CRS::from_epsg(code as u32)),
                Err(_) => srs.to_wkt().ok().map(CRS::from_wkt),
            }
        });

        let (xsize, ysize) = dataset.raster_size();
        let (pix_x, pix_y) = transform.pixel_size();

        Ok(Self {
            dataset,
            band,
            transform,
            crs,
            metadata: DemMetadata {
                pix_x,
                pix_y,
                xsize,
                ysize,
                nodata,
            },
        })
    }

    /// Empty output raster with this dataset's georeferencing, every cell NaN
    pub fn output_raster(&self) -> Raster<f64> {
        let mut raster = Raster::filled(self.metadata.ysize, self.metadata.xsize, f64::NAN);
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(Some(f64::NAN));
        raster
    }
}

impl BlockReader for GdalDem {
    fn metadata(&self) -> DemMetadata {
        self.metadata
    }

    fn read_into(&self, window: &Window, mut out: ArrayViewMut2<'_, f64>) -> Result<()> {
        window.check_fits(self.metadata.ysize, self.metadata.xsize)?;
        let band = self.dataset.rasterband(self.band)?;
        let size = (window.cols, window.rows);
        let buffer = band.read_as::<f64>(
            (window.col_off as isize, window.row_off as isize),
            size,
            size,
            None,
        )?;

        let block = ndarray::ArrayView2::from_shape(window.shape(), buffer.data())
            .map_err(|e| crate::Error::Other(e.to_string()))?;
        out.assign(&block);
        Ok(())
    }
}
