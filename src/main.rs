extern crate bifacial_ground;

use anyhow::Context;
use bifacial_ground::output::FileOutput;
use bifacial_ground::run_project;
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct GroundArgs {
    /// JSON file describing the array
    input_file: String,
    /// CSV file of sun position and horizontal irradiance per timestep
    timeseries_file: String,
    /// Directory to write results to, defaulting to the directory of the input file
    #[arg(long, short)]
    output_dir: Option<PathBuf>,
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = GroundArgs::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let input_path = Path::new(&args.input_file);
    let input_file_stem = input_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("bifacial_ground");
    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });
    let output = FileOutput::new(output_dir, format!("{input_file_stem}__{{}}.csv"));

    let input = BufReader::new(
        File::open(input_path)
            .with_context(|| format!("Could not open input file {}", args.input_file))?,
    );
    let timeseries = BufReader::new(
        File::open(&args.timeseries_file)
            .with_context(|| format!("Could not open timeseries file {}", args.timeseries_file))?,
    );

    match run_project(input, timeseries, output) {
        Ok(results) => {
            info!(timesteps = results.timestamps.len(), "run complete");
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e.into())
        }
    }
}
