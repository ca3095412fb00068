mod compare_floats;
pub mod core;
pub mod errors;
pub mod input;
pub mod output;
pub mod read_timeseries_file;
pub mod simulation;

#[cfg(test)]
mod tests;

use crate::compare_floats::mean;
use crate::core::ground::geometry::{ByRowContext, RowContext};
use crate::core::ground::ground_model::GroundSegmentSet;
use crate::core::ground::sky_view::SkyViewFactors;
pub use crate::errors::BifacialGroundError;
use crate::input::ingest_for_processing;
use crate::output::Output;
use crate::read_timeseries_file::timeseries_data_to_vec;
use crate::simulation::Simulation;
pub use crate::simulation::RunResults;
use chrono::NaiveDateTime;
use csv::WriterBuilder;
use std::io::Read;
use strum::IntoEnumIterator;
use tracing::info;

const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Runs the ground irradiance model for a JSON configuration and a CSV series
/// of timestep conditions, writing results to `output`.
pub fn run_project(
    input: impl Read,
    timeseries: impl Read,
    output: impl Output,
) -> Result<RunResults, BifacialGroundError> {
    let input = ingest_for_processing(input)?;
    let conditions = timeseries_data_to_vec(timeseries)?;

    let simulation = Simulation::from_inputs(&input, conditions)?;
    let results = simulation.run()?;

    let Some(ground) = results.ground.as_ref() else {
        info!("no ground results to write");
        return Ok(results);
    };

    write_results_file(&output, &results.timestamps, ground, results.segment_count)
        .map_err(BifacialGroundError::OutputFailure)?;

    if input.diagnostics && !output.is_noop() {
        write_diagnostic_files(&output, &results, ground)
            .map_err(BifacialGroundError::OutputFailure)?;
    }

    Ok(results)
}

fn write_diagnostic_files(
    output: &impl Output,
    results: &RunResults,
    ground: &[GroundSegmentSet],
) -> Result<(), anyhow::Error> {
    match results.fixed_sky_view_factors.as_deref() {
        Some(sky_view_factors) => {
            write_fixed_sky_view_factors_file(output, sky_view_factors, results.segment_count)?
        }
        None => write_tracked_sky_view_factors_file(
            output,
            &results.timestamps,
            ground,
            results.segment_count,
        )?,
    }
    write_shade_flags_file(output, &results.timestamps, ground, results.segment_count)?;

    Ok(())
}

fn segment_headings(segment_count: usize) -> Vec<String> {
    RowContext::iter()
        .flat_map(|context| (0..segment_count).map(move |segment| format!("{context} {segment}")))
        .collect()
}

/// One row of values per context, flattened in the order of `segment_headings`.
fn flatten<T: Copy>(values: &ByRowContext<Vec<T>>) -> impl Iterator<Item = T> + '_ {
    values.iter().flat_map(|(_, values)| values.iter().copied())
}

fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_OUTPUT_FORMAT).to_string()
}

fn write_results_file(
    output: &impl Output,
    timestamps: &[NaiveDateTime],
    ground: &[GroundSegmentSet],
    segment_count: usize,
) -> Result<(), anyhow::Error> {
    let output_key = "results";
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut headings = vec!["Timestamp".to_string()];
    headings.extend(segment_headings(segment_count));
    headings.extend(RowContext::iter().map(|context| format!("{context} mean")));
    let mut units_row = vec!["[datetime]"];
    units_row.extend(vec!["[W/m2]"; headings.len() - 1]);

    writer.write_record(&headings)?;
    writer.write_record(&units_row)?;

    for (timestamp, segments) in timestamps.iter().zip(ground) {
        let mut row = vec![format_timestamp(timestamp)];
        row.extend(flatten(&segments.irradiance).map(|value| value.to_string()));
        row.extend(
            segments
                .irradiance
                .iter()
                .map(|(_, values)| mean(values).to_string()),
        );
        writer.write_record(&row)?;
    }

    writer.flush()?;

    Ok(())
}

fn write_fixed_sky_view_factors_file(
    output: &impl Output,
    sky_view_factors: &SkyViewFactors,
    segment_count: usize,
) -> Result<(), anyhow::Error> {
    let output_key = "sky_view_factors";
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut headings = vec!["Segment".to_string()];
    headings.extend(RowContext::iter().map(|context| context.to_string()));
    writer.write_record(&headings)?;

    for segment in 0..segment_count {
        let mut row = vec![segment.to_string()];
        row.extend(
            sky_view_factors
                .iter()
                .map(|(_, values)| values[segment].to_string()),
        );
        writer.write_record(&row)?;
    }

    writer.flush()?;

    Ok(())
}

fn write_tracked_sky_view_factors_file(
    output: &impl Output,
    timestamps: &[NaiveDateTime],
    ground: &[GroundSegmentSet],
    segment_count: usize,
) -> Result<(), anyhow::Error> {
    let output_key = "sky_view_factors";
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut headings = vec!["Timestamp".to_string()];
    headings.extend(segment_headings(segment_count));
    writer.write_record(&headings)?;

    for (timestamp, segments) in timestamps.iter().zip(ground) {
        let mut row = vec![format_timestamp(timestamp)];
        row.extend(flatten(&*segments.sky_view_factors).map(|value| value.to_string()));
        writer.write_record(&row)?;
    }

    writer.flush()?;

    Ok(())
}

fn write_shade_flags_file(
    output: &impl Output,
    timestamps: &[NaiveDateTime],
    ground: &[GroundSegmentSet],
    segment_count: usize,
) -> Result<(), anyhow::Error> {
    let output_key = "shade_flags";
    info!("writing out to {output_key}");
    let writer = output.writer_for_location_key(output_key)?;
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut headings = vec!["Timestamp".to_string()];
    headings.extend(segment_headings(segment_count));
    writer.write_record(&headings)?;

    for (timestamp, segments) in timestamps.iter().zip(ground) {
        let mut row = vec![format_timestamp(timestamp)];
        row.extend(flatten(&segments.shade_flags).map(|shaded| u8::from(shaded).to_string()));
        writer.write_record(&row)?;
    }

    writer.flush()?;

    Ok(())
}
