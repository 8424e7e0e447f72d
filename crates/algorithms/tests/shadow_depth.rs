//! End-to-end shadow depth tests on small synthetic DEMs.

use std::cell::RefCell;

use approx::assert_relative_eq;
use umbra_algorithms::shadow::{
    shadow_depth, shadow_depth_streaming, CancelFlag, Completion, Feedback, NoFeedback,
    ShadowDepth, ShadowDepthParams,
};
use umbra_core::io::{read_geotiff, write_geotiff, GeoTiffOptions, RasterBlockWriter};
use umbra_core::{Algorithm, Error, GeoTransform, Raster, CRS};

fn params(direction: f64, altitude: f64) -> ShadowDepthParams {
    ShadowDepthParams {
        direction,
        altitude,
        smooth: false,
        ..Default::default()
    }
}

/// Flat ground with one 10 m pillar in the middle
fn pillar() -> Raster<f64> {
    let mut dem = Raster::filled(11, 11, 0.0);
    dem.set(5, 5, 10.0).unwrap();
    dem
}

fn hills(rows: usize, cols: usize) -> Raster<f64> {
    let mut dem = Raster::new(rows, cols);
    for r in 0..rows {
        for c in 0..cols {
            let (y, x) = (r as f64, c as f64);
            dem.set(r, c, 200.0 + 25.0 * (y * 0.45).sin() * (x * 0.3).cos() - 0.5 * x).unwrap();
        }
    }
    dem
}

/// Records everything the run reports
#[derive(Default)]
struct Recorder {
    progress: RefCell<Vec<f64>>,
    errors: RefCell<Vec<(String, bool)>>,
    cancel_after: Option<usize>,
}

impl Feedback for Recorder {
    fn set_progress(&self, percent: f64) {
        self.progress.borrow_mut().push(percent);
    }

    fn is_canceled(&self) -> bool {
        self.cancel_after
            .is_some_and(|n| self.progress.borrow().len() >= n)
    }

    fn report_error(&self, message: &str, fatal: bool) {
        self.errors.borrow_mut().push((message.to_string(), fatal));
    }
}

fn nan_target(rows: usize, cols: usize) -> RasterBlockWriter {
    RasterBlockWriter::new(Raster::filled(rows, cols, f64::NAN))
}

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[test]
fn flat_dem_has_no_shadow() {
    let mut dem = Raster::filled(10, 10, 100.0);
    dem.set_nodata(Some(-9999.0));

    let out = shadow_depth(&dem, params(315.0, 10.0)).unwrap();
    assert_eq!(out.shape(), (10, 10));
    assert!(out.data().iter().all(|&v| v == 0.0));
}

#[test]
fn flat_dem_has_no_shadow_from_any_direction() {
    let dem = Raster::filled(17, 13, 42.0);
    for direction in (0..=360).step_by(15) {
        for altitude in [0.0, 10.0, 45.0, 89.0] {
            let out = shadow_depth(&dem, params(direction as f64, altitude)).unwrap();
            assert!(
                out.data().iter().all(|&v| v == 0.0),
                "direction {} altitude {}",
                direction,
                altitude
            );
        }
    }
}

#[test]
fn step_casts_shadow_downslope() {
    let mut dem = Raster::filled(10, 10, 100.0);
    for r in 5..10 {
        for c in 0..10 {
            dem.set(r, c, 50.0).unwrap();
        }
    }

    let out = shadow_depth(&dem, params(0.0, 45.0)).unwrap();

    for c in 0..10 {
        for r in 0..5 {
            assert_eq!(out.get(r, c).unwrap(), 0.0, "lit cell ({}, {})", r, c);
        }
        // 50 m drop, rising back 1 m per pixel at 45°
        for r in 5..9 {
            let expected = -50.0 + (r - 4) as f64;
            assert_relative_eq!(out.get(r, c).unwrap(), expected, epsilon = 1e-9);
        }
        // Last row sits in a chunk of its own and inherits the carried seam
        assert_relative_eq!(out.get(9, c).unwrap(), out.get(8, c).unwrap(), epsilon = 1e-9);
    }
}

#[test]
fn full_turn_matches_north() {
    let dem = hills(20, 20);
    let north = shadow_depth(&dem, params(0.0, 15.0)).unwrap();
    let full_turn = shadow_depth(&dem, params(360.0, 15.0)).unwrap();
    assert_eq!(north.data(), full_turn.data());
}

// ---------------------------------------------------------------------------
// Shadow direction
// ---------------------------------------------------------------------------

#[test]
fn pillar_shadow_falls_away_from_sun() {
    // (sun direction, shaded cell, lit cell on the sun side)
    let cases = [
        (0.0, (6, 5), (4, 5)),
        (90.0, (5, 4), (5, 6)),
        (180.0, (4, 5), (6, 5)),
        (270.0, (5, 6), (5, 4)),
        (315.0, (6, 6), (4, 4)),
        (135.0, (4, 4), (6, 6)),
    ];

    let dem = pillar();
    for (direction, shaded, lit) in cases {
        let out = shadow_depth(&dem, params(direction, 10.0)).unwrap();
        let depth = out.get(shaded.0, shaded.1).unwrap();
        assert!(depth < -5.0, "{} deg: {:?} = {}", direction, shaded, depth);
        assert_eq!(out.get(lit.0, lit.1).unwrap(), 0.0, "{} deg: {:?}", direction, lit);
        assert_eq!(out.get(5, 5).unwrap(), 0.0, "{} deg: pillar top is lit", direction);
    }
}

#[test]
fn higher_sun_gives_shallower_shadow() {
    let dem = pillar();
    let low = shadow_depth(&dem, params(0.0, 10.0)).unwrap();
    let high = shadow_depth(&dem, params(0.0, 60.0)).unwrap();
    assert!(high.get(6, 5).unwrap() > low.get(6, 5).unwrap());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn depth_never_positive_and_nan_only_at_nodata() {
    let mut dem = hills(23, 19);
    dem.set_nodata(Some(-9999.0));
    for (r, c) in [(0, 0), (3, 7), (11, 11), (22, 18), (15, 2)] {
        dem.set(r, c, -9999.0).unwrap();
    }
    dem.set(8, 8, f64::NAN).unwrap();

    for smooth in [false, true] {
        for direction in [0.0, 40.0, 90.0, 160.0, 225.0, 300.0] {
            let p = ShadowDepthParams {
                smooth,
                ..params(direction, 20.0)
            };
            let out = shadow_depth(&dem, p).unwrap();

            for r in 0..23 {
                for c in 0..19 {
                    let input = dem.get(r, c).unwrap();
                    let depth = out.get(r, c).unwrap();
                    if input == -9999.0 || input.is_nan() {
                        assert!(depth.is_nan(), "({}, {}) should be NaN", r, c);
                    } else {
                        assert!(depth <= 0.0, "({}, {}) = {} at {} deg", r, c, depth, direction);
                    }
                }
            }
        }
    }
}

#[test]
fn flat_dem_with_nodata_stays_flat() {
    let mut dem = Raster::filled(12, 12, 7.0);
    dem.set_nodata(Some(-1.0));
    dem.set(6, 6, -1.0).unwrap();

    let out = shadow_depth(&dem, params(200.0, 30.0)).unwrap();
    assert!(out.get(6, 6).unwrap().is_nan());
    assert_eq!(out.data().iter().filter(|v| v.is_nan()).count(), 1);
    assert!(out.data().iter().filter(|v| !v.is_nan()).all(|&v| v == 0.0));
}

#[test]
fn smoothing_keeps_flat_dem_flat() {
    let dem = Raster::filled(9, 14, 3.0);
    let p = ShadowDepthParams {
        smooth: true,
        ..params(110.0, 25.0)
    };
    let out = shadow_depth(&dem, p).unwrap();
    for &v in out.data().iter() {
        assert_relative_eq!(v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn output_keeps_georeferencing() {
    let mut dem = hills(8, 8);
    dem.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, 30.0, -30.0));
    let out = shadow_depth(&dem, params(315.0, 10.0)).unwrap();
    assert_eq!(out.transform(), dem.transform());
    assert!(out.nodata().is_some_and(f64::is_nan));
}

/// 10x10 step: rows 0-4 at 100 m, rows 5-9 at 50 m
fn step(pixel: f64) -> Raster<f64> {
    let mut dem = Raster::filled(10, 10, 100.0);
    for r in 5..10 {
        for c in 0..10 {
            dem.set(r, c, 50.0).unwrap();
        }
    }
    dem.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, pixel, -pixel));
    dem
}

#[test]
fn geotiff_pipeline_keeps_nodata_and_pixel_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dem.tif");
    let output = dir.path().join("depth.tif");

    let mut dem = step(2.0);
    dem.set_crs(Some(CRS::from_epsg(32633)));
    dem.set_nodata(Some(-9999.0));
    let holes = [(2, 3), (7, 6)];
    for (r, c) in holes {
        dem.set(r, c, -9999.0).unwrap();
    }
    write_geotiff(&dem, &input, Some(GeoTiffOptions::default())).unwrap();

    let loaded: Raster<f64> = read_geotiff(&input, None).unwrap();
    assert_eq!(loaded.nodata(), Some(-9999.0));
    assert_eq!(loaded.pixel_size(), (2.0, 2.0));

    let out = shadow_depth(&loaded, params(0.0, 45.0)).unwrap();
    write_geotiff(&out, &output, Some(GeoTiffOptions::default())).unwrap();
    let written: Raster<f64> = read_geotiff(&output, None).unwrap();

    assert_eq!(written.transform(), dem.transform());
    assert_eq!(written.crs().and_then(CRS::epsg), Some(32633));
    assert!(written.nodata().is_some_and(f64::is_nan));

    // Shadow plane rises one pixel size per row at 45 degrees
    let unit = shadow_depth(&step(1.0), params(0.0, 45.0)).unwrap();
    for r in 0..9 {
        for c in 0..10 {
            let depth = written.get(r, c).unwrap();
            if holes.contains(&(r, c)) {
                assert!(depth.is_nan(), "({}, {}) should be NaN", r, c);
                continue;
            }
            assert!(!depth.is_nan(), "({}, {}) should have a depth", r, c);
            if r < 5 {
                assert_eq!(depth, 0.0);
            } else {
                let rise = (r - 4) as f64;
                assert_relative_eq!(depth, -50.0 + 2.0 * rise, epsilon = 1e-6);
                assert_relative_eq!(depth - unit.get(r, c).unwrap(), rise, epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn anisotropic_pixels_warn_and_run() {
    let mut dem = Raster::filled(10, 10, 100.0);
    dem.set_transform(GeoTransform::new(0.0, 10.0, 2.0, -1.0));

    let recorder = Recorder::default();
    let mut writer = nan_target(10, 10);
    let done = shadow_depth_streaming(&dem, &mut writer, params(45.0, 10.0), &recorder).unwrap();

    assert!(!done.is_cancelled());
    let errors = recorder.errors.borrow();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].1);
    assert!(writer.target().data().iter().all(|&v| v == 0.0));
}

#[test]
fn small_budget_streams_many_chunks() {
    let dem = Raster::filled(10, 10, 5.0);
    let p = ShadowDepthParams {
        max_chunk_cells: 30,
        ..params(0.0, 10.0)
    };

    let recorder = Recorder::default();
    let mut writer = nan_target(10, 10);
    let done = shadow_depth_streaming(&dem, &mut writer, p, &recorder).unwrap();

    // 3 rows fit the budget, 2 rows minimize the (zero) shear remainder
    assert_eq!(done, Completion::Finished { chunks: 5 });
    assert_eq!(writer.pending_blocks(), 0);
    assert!(writer.target().data().iter().all(|&v| v == 0.0));

    let progress = recorder.progress.borrow();
    assert_eq!(progress.len(), 5);
    assert!(progress.windows(2).all(|w| w[1] >= w[0]));
    assert_relative_eq!(progress[0], 20.0, epsilon = 1e-12);
    assert_relative_eq!(*progress.last().unwrap(), 100.0, epsilon = 1e-12);
}

#[test]
fn progress_is_capped_at_100() {
    // 10 rows, chunk 9: the short last chunk would overshoot
    let dem = Raster::filled(10, 10, 5.0);
    let recorder = Recorder::default();
    let mut writer = nan_target(10, 10);
    shadow_depth_streaming(&dem, &mut writer, params(0.0, 10.0), &recorder).unwrap();

    let progress = recorder.progress.borrow();
    assert_eq!(progress.len(), 2);
    assert_relative_eq!(progress[0], 90.0, epsilon = 1e-12);
    assert_eq!(progress[1], 100.0);
}

// ---------------------------------------------------------------------------
// Cancellation and validation
// ---------------------------------------------------------------------------

#[test]
fn cancelled_run_leaves_output_unflushed() {
    let dem = hills(30, 30);
    let p = ShadowDepthParams {
        max_chunk_cells: 150,
        ..params(0.0, 10.0)
    };

    let recorder = Recorder { cancel_after: Some(1), ..Default::default() };
    let mut writer = nan_target(30, 30);
    let done = shadow_depth_streaming(&dem, &mut writer, p, &recorder).unwrap();

    assert_eq!(done, Completion::Cancelled { chunks: 1 });
    assert_eq!(writer.pending_blocks(), 1);
    assert!(writer.target().data().iter().all(|v| v.is_nan()));
}

#[test]
fn cancel_before_start_reads_nothing() {
    let dem = hills(10, 10);
    let flag = CancelFlag::new();
    flag.cancel();

    let mut writer = nan_target(10, 10);
    let done = shadow_depth_streaming(&dem, &mut writer, params(0.0, 10.0), &flag).unwrap();
    assert_eq!(done, Completion::Cancelled { chunks: 0 });
    assert_eq!(writer.pending_blocks(), 0);
}

#[test]
fn invalid_pixel_size_is_fatal() {
    let mut dem = Raster::filled(5, 5, 1.0);
    dem.set_transform(GeoTransform::new(0.0, 0.0, 0.0, -1.0));

    let recorder = Recorder::default();
    let mut writer = nan_target(5, 5);
    let result = shadow_depth_streaming(&dem, &mut writer, params(0.0, 10.0), &recorder);

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(recorder.errors.borrow().len(), 1);
    assert!(recorder.errors.borrow()[0].1);
    assert!(recorder.progress.borrow().is_empty());
}

#[test]
fn out_of_range_parameters_rejected() {
    let dem = Raster::filled(5, 5, 1.0);
    assert!(matches!(
        shadow_depth(&dem, params(400.0, 10.0)),
        Err(Error::InvalidParameter { name: "direction", .. })
    ));
    assert!(matches!(
        shadow_depth(&dem, params(0.0, 90.0)),
        Err(Error::InvalidParameter { name: "altitude", .. })
    ));
}

#[test]
fn algorithm_trait_uses_defaults() {
    let dem = hills(12, 12);
    let algo = ShadowDepth;
    assert_eq!(algo.name(), "Shadow Depth");

    let via_trait = algo.execute_default(dem.clone()).unwrap();
    let direct = shadow_depth(&dem, ShadowDepthParams::default()).unwrap();
    assert_eq!(via_trait.data(), direct.data());

    let mut writer = nan_target(12, 12);
    let done = shadow_depth_streaming(&dem, &mut writer, ShadowDepthParams::default(), &NoFeedback)
        .unwrap();
    assert!(!done.is_cancelled());
    assert_eq!(writer.target().data(), direct.data());
}
