use crate::core::ground::geometry::{RowContext, RowGeometry};
use crate::core::ground::ground_model::{GroundModel, TimestepConditions};
use crate::core::ground::irradiance::HorizontalIrradiance;
use crate::core::solar_geometry::SunPosition;
use crate::errors::{BifacialGroundError, ConfigurationError};
use crate::input::TrackingMode;
use crate::output::{Output, SinkOutput};
use crate::run_project;
use approx::assert_relative_eq;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// Keeps everything written to it in memory, keyed by location.
#[derive(Clone, Debug, Default)]
struct MemoryOutput {
    files: Rc<RefCell<HashMap<String, Rc<RefCell<Vec<u8>>>>>>,
}

struct MemoryWriter(Rc<RefCell<Vec<u8>>>);

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Output for MemoryOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        let buffer = Rc::new(RefCell::new(vec![]));
        self.files
            .borrow_mut()
            .insert(location_key.to_string(), buffer.clone());
        Ok(MemoryWriter(buffer))
    }
}

impl MemoryOutput {
    fn keys(&self) -> Vec<String> {
        let mut keys = self.files.borrow().keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }

    fn records(&self, location_key: &str) -> Vec<Vec<String>> {
        let files = self.files.borrow();
        let contents = files[location_key].borrow();
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(contents.as_slice())
            .records()
            .map(|record| record.unwrap().iter().map(String::from).collect())
            .collect();
        records
    }
}

fn input_json(tracking_mode: &str, bifacial: bool, diagnostics: bool) -> String {
    format!(
        r#"{{
            "GroundSegments": 10,
            "Array": {{
                "tracking_mode": "{tracking_mode}",
                "bifacial": {bifacial},
                "tilt": {tilt},
                "azimuth": 0,
                "pitch": 3,
                "clearance": 0.2,
                "bandwidth": 1,
                "transmission_factor": 0.05
            }},
            "Diagnostics": {diagnostics}
        }}"#,
        tilt = 0.3f64.to_degrees(),
    )
}

#[fixture]
fn timeseries() -> String {
    format!(
        "timestamp,sun_zenith,sun_azimuth,direct_horizontal,diffuse_horizontal\n\
         2024-06-21 12:00,{zenith},0,800,100\n",
        zenith = 0.5f64.to_degrees(),
    )
}

#[fixture]
fn row_geometry() -> RowGeometry {
    RowGeometry::new(0.3, 0., 3., 0.2, 1., 0.05).unwrap()
}

fn noon_conditions(zenith: f64) -> TimestepConditions {
    TimestepConditions {
        timestamp: NaiveDate::from_ymd_opt(2024, 6, 21)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
        sun: SunPosition {
            zenith,
            azimuth: 0.,
        },
        irradiance: HorizontalIrradiance {
            direct: 800.,
            diffuse: 100.,
        },
        orientation: None,
    }
}

#[rstest]
fn test_fixed_tilt_scenario(timeseries: String, row_geometry: RowGeometry) {
    let output = MemoryOutput::default();

    let results = run_project(
        input_json("fixed_tilt", true, false).as_bytes(),
        timeseries.as_bytes(),
        output.clone(),
    )
    .unwrap();

    let ground = results.ground.unwrap();
    assert_eq!(ground.len(), 1);
    let segments = &ground[0];

    // same scenario evaluated directly against the ground model
    let expected = GroundModel::new(TrackingMode::FixedTilt, row_geometry, 10)
        .unwrap()
        .timestep(0, &noon_conditions(0.5))
        .unwrap();
    assert_eq!(segments.shade_flags, expected.shade_flags);

    for context in [RowContext::Interior, RowContext::First, RowContext::Last] {
        let irradiance = segments.irradiance.get(context);
        let sky_view_factors = segments.sky_view_factors.get(context);
        assert_eq!(irradiance.len(), 10);
        for (segment, value) in irradiance.iter().enumerate() {
            let diffuse = 100. * sky_view_factors[segment];
            assert!(
                *value >= diffuse - 1e-9 && *value <= diffuse + 800. + 1e-9,
                "{context} segment {segment} irradiance {value} out of bounds"
            );
            assert_relative_eq!(*value, expected.irradiance.get(context)[segment], epsilon = 1e-9);
        }
    }

    // row 0's shadow falls on [0.1093, 1.2261) of the span behind it,
    // and no existing row casts a shadow onto the first row's span
    let shaded_below_row = vec![true, true, true, true, false, false, false, false, false, false];
    assert_eq!(segments.shade_flags.interior, shaded_below_row);
    assert_eq!(segments.shade_flags.last, shaded_below_row);
    assert_eq!(segments.shade_flags.first, vec![false; 10]);

    for (context, values) in segments.irradiance.iter() {
        let shade_flags = segments.shade_flags.get(context);
        let sky_view_factors = segments.sky_view_factors.get(context);
        for (segment, value) in values.iter().enumerate() {
            let beam = if shade_flags[segment] { 800. * 0.05 } else { 800. };
            assert_relative_eq!(*value, 100. * sky_view_factors[segment] + beam, epsilon = 1e-9);
        }
    }

    let records = output.records("results");
    assert_eq!(output.keys(), vec!["results"]);
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].len(), 1 + 3 * 10 + 3);
    assert_eq!(records[0][0], "Timestamp");
    assert_eq!(records[0][1], "interior 0");
    assert_eq!(records[0][31], "interior mean");
    assert_eq!(records[2][0], "2024-06-21 12:00");
    let interior_mean: f64 = records[2][31].parse().unwrap();
    assert_relative_eq!(
        interior_mean,
        segments.irradiance.interior.iter().sum::<f64>() / 10.,
        epsilon = 1e-9
    );
}

#[rstest]
fn test_scenario_is_reproducible(timeseries: String) {
    let run = || {
        run_project(
            input_json("fixed_tilt", true, false).as_bytes(),
            timeseries.as_bytes(),
            SinkOutput,
        )
        .unwrap()
    };

    assert_eq!(run(), run());
}

#[rstest]
fn test_diagnostics_written_for_fixed_tilt(timeseries: String) {
    let output = MemoryOutput::default();

    let results = run_project(
        input_json("fixed_tilt", true, true).as_bytes(),
        timeseries.as_bytes(),
        output.clone(),
    )
    .unwrap();

    assert_eq!(
        output.keys(),
        vec!["results", "shade_flags", "sky_view_factors"]
    );

    let sky_view_factors = output.records("sky_view_factors");
    assert_eq!(sky_view_factors[0], vec!["Segment", "interior", "first", "last"]);
    assert_eq!(sky_view_factors.len(), 1 + 10);
    let fixed = results.fixed_sky_view_factors.unwrap();
    let first_segment: f64 = sky_view_factors[1][2].parse().unwrap();
    assert_relative_eq!(first_segment, fixed.first[0]);

    let shade_flags = output.records("shade_flags");
    assert_eq!(shade_flags.len(), 2);
    assert!(shade_flags[1][1..]
        .iter()
        .all(|flag| flag == "0" || flag == "1"));
}

#[rstest]
fn test_diagnostics_follow_tracker() {
    let output = MemoryOutput::default();
    let timeseries = "\
timestamp,sun_zenith,sun_azimuth,direct_horizontal,diffuse_horizontal,tilt,azimuth,clearance
2024-06-21 09:00,50,100,400,90,-30,270,0.4
2024-06-21 12:00,28,180,800,100,5,90,0.8
2024-06-21 15:00,50,260,400,90,30,90,0.4
";

    let results = run_project(
        input_json("single_axis", true, true).as_bytes(),
        timeseries.as_bytes(),
        output.clone(),
    )
    .unwrap();

    assert_eq!(results.fixed_sky_view_factors, None);
    let ground = results.ground.unwrap();
    assert_eq!(ground.len(), 3);
    // the morning and afternoon orientations mirror one another
    assert_eq!(ground[0].sky_view_factors, ground[2].sky_view_factors);
    assert_ne!(ground[0].sky_view_factors, ground[1].sky_view_factors);

    let sky_view_factors = output.records("sky_view_factors");
    assert_eq!(sky_view_factors.len(), 1 + 3);
    assert_eq!(sky_view_factors[1][0], "2024-06-21 09:00");
}

#[rstest]
fn test_tracker_without_orientation_is_rejected(timeseries: String) {
    let output = MemoryOutput::default();

    let result = run_project(
        input_json("single_axis", true, false).as_bytes(),
        timeseries.as_bytes(),
        output.clone(),
    );

    assert!(matches!(
        result,
        Err(BifacialGroundError::Configuration(
            ConfigurationError::MissingTrackerOrientation { index: 0 }
        ))
    ));
    assert!(output.keys().is_empty());
}

#[rstest]
#[case("tilted_single_axis")]
#[case("two_axis")]
fn test_unsupported_tracker_is_rejected_before_running(
    timeseries: String,
    #[case] tracking_mode: &str,
) {
    let output = MemoryOutput::default();

    let result = run_project(
        input_json(tracking_mode, true, false).as_bytes(),
        timeseries.as_bytes(),
        output.clone(),
    );

    assert!(matches!(
        result,
        Err(BifacialGroundError::Configuration(
            ConfigurationError::UnsupportedTrackingMode(_)
        ))
    ));
    assert!(output.keys().is_empty());
}

#[rstest]
fn test_monofacial_array_has_no_ground_results(timeseries: String) {
    let output = MemoryOutput::default();

    let results = run_project(
        input_json("two_axis", false, true).as_bytes(),
        timeseries.as_bytes(),
        output.clone(),
    )
    .unwrap();

    assert_eq!(results.ground, None);
    assert!(output.keys().is_empty());
}

#[rstest]
fn test_invalid_input_is_rejected(timeseries: String) {
    let result = run_project("{}".as_bytes(), timeseries.as_bytes(), SinkOutput);

    assert!(matches!(result, Err(BifacialGroundError::InvalidRequest(_))));
}

#[rstest]
fn test_night_timestep_receives_diffuse_and_transmitted_beam_only(row_geometry: RowGeometry) {
    let model = GroundModel::new(TrackingMode::FixedTilt, row_geometry, 10).unwrap();

    let result = model.timestep(0, &noon_conditions(1.7)).unwrap();

    for (context, values) in result.irradiance.iter() {
        assert!(result.shade_flags.get(context).iter().all(|shaded| *shaded));
        for (value, sky_view_factor) in values.iter().zip(result.sky_view_factors.get(context)) {
            assert_relative_eq!(*value, 100. * sky_view_factor + 800. * 0.05);
        }
    }
}

#[rstest]
fn test_sparse_flat_rows_barely_affect_ground() {
    let geometry = RowGeometry::new(0., 0., 1000., 0.2, 1., 0.05).unwrap();
    let model = GroundModel::new(TrackingMode::FixedTilt, geometry, 10).unwrap();

    let result = model.timestep(0, &noon_conditions(0.3)).unwrap();

    for (context, shade_flags) in result.shade_flags.iter() {
        assert!(shade_flags.iter().all(|shaded| !shaded), "{context} shaded");
    }
    for (_, sky_view_factors) in result.sky_view_factors.iter() {
        assert!(sky_view_factors
            .iter()
            .all(|value| *value > 0.99 && *value <= 1.));
    }
}
