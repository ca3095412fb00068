use crate::core::ground::ground_model::{TimestepConditions, TrackerOrientation};
use crate::core::ground::irradiance::HorizontalIrradiance;
use crate::core::solar_geometry::SunPosition;
use anyhow::{bail, ensure, Context};
use chrono::NaiveDateTime;
use csv::ReaderBuilder as CsvReaderBuilder;
use serde::Deserialize;
use std::io::Read;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One row of the timeseries file. Angles are in degrees, irradiance in W/m2
/// and clearance in m. The orientation columns are only needed for trackers.
#[derive(Debug, Deserialize)]
struct TimeseriesRecord {
    timestamp: String,
    sun_zenith: f64,
    sun_azimuth: f64,
    direct_horizontal: f64,
    diffuse_horizontal: f64,
    #[serde(default)]
    tilt: Option<f64>,
    #[serde(default)]
    azimuth: Option<f64>,
    #[serde(default)]
    clearance: Option<f64>,
}

impl TimeseriesRecord {
    fn into_conditions(self) -> anyhow::Result<TimestepConditions> {
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .with_context(|| format!("Could not parse timestamp '{}'", self.timestamp))?;

        ensure!(
            (0. ..=180.).contains(&self.sun_zenith),
            "sun zenith must be between 0 and 180 degrees, got {}",
            self.sun_zenith
        );
        ensure!(
            self.sun_azimuth.is_finite(),
            "sun azimuth must be finite, got {}",
            self.sun_azimuth
        );
        for (name, irradiance) in [
            ("direct", self.direct_horizontal),
            ("diffuse", self.diffuse_horizontal),
        ] {
            ensure!(
                irradiance.is_finite() && irradiance >= 0.,
                "{name} horizontal irradiance must be a non-negative number, got {irradiance}"
            );
        }

        let orientation = match (self.tilt, self.azimuth, self.clearance) {
            (Some(tilt), Some(azimuth), Some(clearance)) => {
                ensure!(
                    tilt.is_finite() && azimuth.is_finite() && clearance.is_finite(),
                    "tracker orientation must be finite, got tilt {tilt}, azimuth {azimuth}, clearance {clearance}"
                );
                Some(TrackerOrientation {
                    tilt: tilt.to_radians(),
                    azimuth: azimuth.to_radians(),
                    clearance,
                })
            }
            (None, None, None) => None,
            _ => bail!("tracker tilt, azimuth and clearance must be given together"),
        };

        Ok(TimestepConditions {
            timestamp,
            sun: SunPosition {
                zenith: self.sun_zenith.to_radians(),
                azimuth: self.sun_azimuth.to_radians(),
            },
            irradiance: HorizontalIrradiance {
                direct: self.direct_horizontal,
                diffuse: self.diffuse_horizontal,
            },
            orientation,
        })
    }
}

pub fn timeseries_data_to_vec(file: impl Read) -> anyhow::Result<Vec<TimestepConditions>> {
    let mut reader = CsvReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    reader
        .deserialize::<TimeseriesRecord>()
        .enumerate()
        .map(|(index, record)| {
            record
                .map_err(anyhow::Error::from)
                .and_then(TimeseriesRecord::into_conditions)
                .with_context(|| format!("Invalid timeseries row {}", index + 1))
        })
        .collect()
}
