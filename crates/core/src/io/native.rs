//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Georeferencing is limited to what elevation
//! shading needs: pixel scale and tie point, the `GDAL_NODATA` tag and the
//! EPSG code from the GeoKey directory.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray64Float};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

const GT_MODEL_TYPE_KEY: u32 = 1024;
const GT_RASTER_TYPE_KEY: u32 = 1025;
const GEOGRAPHIC_TYPE_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_KEY: u32 = 3072;

/// Sample precision of written files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// IEEE 32-bit float
    #[default]
    Float32,
    /// IEEE 64-bit float
    Float64,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Sample precision
    pub sample_format: SampleFormat,
}

/// Read a GeoTIFF file into a Raster
///
/// Only the first image of the file is read; `band` is accepted for API
/// symmetry with GDAL-backed readers and must be `None` or `Some(1)`.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    if !matches!(band, None | Some(1)) {
        return Err(Error::invalid_parameter(
            "band",
            format!("{:?}", band),
            "native reader supports single-band files only",
        ));
    }
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    fn cast_all<S: Copy + num_traits::NumCast, T: RasterElement>(buf: Vec<S>) -> Vec<T> {
        buf.into_iter()
            .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
            .collect()
    }

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF pixel format".into())),
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    if let Some(nodata) = read_nodata(&mut decoder) {
        raster.set_nodata(num_traits::cast(nodata));
    }
    raster.set_crs(read_crs(&mut decoder));

    Ok(raster)
}

/// GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// No-data value from the ASCII `GDAL_NODATA` tag
fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    text.trim_end_matches('\0').trim().parse().ok()
}

/// EPSG code from the GeoKey directory
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u32_vec(Tag::GeoKeyDirectoryTag).ok()?;
    let entries = keys.get(4..)?;

    // Entries are [key id, tag location, count, value]; location 0 means inline
    entries.chunks_exact(4).find_map(|entry| match entry {
        [GEOGRAPHIC_TYPE_KEY, 0, 1, code] => Some(CRS::geographic_from_epsg(*code)),
        [PROJECTED_CS_TYPE_KEY, 0, 1, code] => Some(CRS::from_epsg(*code)),
        _ => None,
    })
}

/// Write a Raster to a GeoTIFF file
///
/// Writes a single float band with pixel scale, tie point, GeoKey directory
/// and, when the raster declares one, the `GDAL_NODATA` tag.
pub fn write_geotiff<T, P>(
    raster: &Raster<T>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer, options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    match options.sample_format {
        SampleFormat::Float32 => {
            let data: Vec<f32> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
                .collect();
            let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(&data)?;
        }
        SampleFormat::Float64 => {
            let data: Vec<f64> = raster
                .data()
                .iter()
                .map(|&v| v.to_f64().unwrap_or(f64::NAN))
                .collect();
            let mut image = encoder.new_image::<Gray64Float>(cols as u32, rows as u32)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(&data)?;
        }
    }

    Ok(())
}

fn write_geo_tags<T, W, K>(dir: &mut DirectoryEncoder<'_, W, K>, raster: &Raster<T>) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
    K: TiffKind,
{
    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;

    dir.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys(raster.crs())[..])?;

    if let Some(nodata) = raster.nodata().and_then(RasterElement::to_f64) {
        let text = if nodata.is_nan() {
            "nan".to_string()
        } else {
            nodata.to_string()
        };
        dir.write_tag(Tag::GdalNodata, text.as_str())?;
    }

    Ok(())
}

/// GeoKey directory: model type, raster type (PixelIsArea) and the EPSG code
/// when it fits an inline SHORT
fn geo_keys(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs.and_then(|c| c.epsg().and_then(|e| u16::try_from(e).ok()).map(|e| (c, e)));

    let model_type = match code {
        Some((c, _)) if c.is_geographic() => 2,
        _ => 1,
    };

    let mut keys: Vec<u16> = vec![
        GT_MODEL_TYPE_KEY as u16, 0, 1, model_type,
        GT_RASTER_TYPE_KEY as u16, 0, 1, 1,
    ];
    if let Some((c, epsg)) = code {
        let key = if c.is_geographic() {
            GEOGRAPHIC_TYPE_KEY
        } else {
            PROJECTED_CS_TYPE_KEY
        };
        keys.extend_from_slice(&[key as u16, 0, 1, epsg]);
    }

    let n_keys = (keys.len() / 4) as u16;
    let mut directory = vec![1, 1, 0, n_keys];
    directory.extend(keys);
    directory
}
