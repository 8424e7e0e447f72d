//! Umbra CLI - shadow depth modelling for elevation rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use umbra_algorithms::shadow::{shadow_depth_streaming, Completion, Feedback, ShadowDepthParams};
use umbra_core::io::{write_geotiff, BlockReader, GeoTiffOptions, RasterBlockWriter};
use umbra_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "umbra")]
#[command(author, version, about = "Shadow depth modelling for elevation rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Depth of terrain below the shadow plane cast by the sun
    ShadowDepth {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Sun direction in degrees (0=North, clockwise)
        #[arg(short, long, default_value = "315")]
        direction: f64,
        /// Sun angle in degrees above horizon (0-89)
        #[arg(short, long, default_value = "10")]
        angle: f64,
        /// Skip the 3x3 mean filter on the output
        #[arg(long)]
        no_smooth: bool,
        /// Maximum number of cells held in one chunk buffer
        #[arg(long, default_value_t = ShadowDepthParams::default().max_chunk_cells)]
        max_chunk_cells: usize,
        /// Elevation substituted for no-data cells during the scan
        #[arg(long, default_value = "-9999", allow_hyphen_values = true)]
        nodata_sentinel: f64,
    },
}

// ─── Progress ───────────────────────────────────────────────────────────

/// Progress bar driven by the streaming run
struct ProgressFeedback {
    bar: ProgressBar,
}

impl ProgressFeedback {
    fn new(msg: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(msg.to_string());
        Self { bar }
    }
}

impl Feedback for ProgressFeedback {
    fn set_progress(&self, percent: f64) {
        self.bar.set_position(percent.round() as u64);
    }

    fn report_error(&self, message: &str, fatal: bool) {
        if fatal {
            self.bar.suspend(|| error!("{}", message));
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Open the input DEM through GDAL; only windows are read during the run
#[cfg(feature = "gdal")]
fn open_dem(path: &PathBuf) -> Result<(Box<dyn BlockReader>, Raster<f64>)> {
    let dem = umbra_core::io::GdalDem::open(path, None).context("Failed to open raster")?;
    let target = dem.output_raster();
    let meta = dem.metadata();
    info!("Input: {} x {}", meta.xsize, meta.ysize);
    Ok((Box::new(dem), target))
}

/// Load the input DEM from a GeoTIFF
#[cfg(not(feature = "gdal"))]
fn open_dem(path: &PathBuf) -> Result<(Box<dyn BlockReader>, Raster<f64>)> {
    let dem = read_dem(path)?;
    let mut target = dem.with_same_meta(f64::NAN);
    target.set_nodata(Some(f64::NAN));
    Ok((Box::new(dem), target))
}

fn read_dem(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> =
        umbra_core::io::read_geotiff(path, None).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster = read_dem(&input)?;
            let meta = raster.metadata();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", meta.xsize, meta.ysize, raster.len());
            println!("Pixel size: {} x {}", meta.pix_x, meta.pix_y);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = meta.nodata {
                println!("NoData: {}", nodata);
            }
            match meta.validate() {
                Some(issue) => println!("Validation: {}", issue),
                None => println!("Validation: ok"),
            }
            println!("\nStatistics:");
            if let (Some(min), Some(max)) = (stats.min, stats.max) {
                println!("  Min: {:.4}", min);
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::ShadowDepth {
            input,
            output,
            direction,
            angle,
            no_smooth,
            max_chunk_cells,
            nodata_sentinel,
        } => {
            let params = ShadowDepthParams {
                direction,
                altitude: angle,
                smooth: !no_smooth,
                max_chunk_cells,
                nodata_sentinel,
            };

            let (dem, target) = open_dem(&input)?;
            let mut writer = RasterBlockWriter::new(target);

            let start = Instant::now();
            let feedback = ProgressFeedback::new("Shading");
            let completion = shadow_depth_streaming(dem.as_ref(), &mut writer, params, &feedback)
                .context("Failed to calculate shadow depth");
            feedback.bar.finish_and_clear();
            let elapsed = start.elapsed();

            match completion? {
                Completion::Finished { chunks } => info!("Processed {} chunks", chunks),
                Completion::Cancelled { chunks } => {
                    anyhow::bail!("Shading cancelled after {} chunks", chunks)
                }
            }

            let result = writer.into_raster();
            let stats = result.statistics();
            if let (Some(mean), Some(std_dev)) = (stats.mean, stats.std_dev) {
                info!("Shadow depth mean {:.4}, std dev {:.4}", mean, std_dev);
            }

            write_result(&result, &output)?;
            done("Shadow depth", &output, elapsed);
        }
    }

    Ok(())
}
