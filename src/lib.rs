pub mod config;
pub mod data_loading;
pub mod error;
pub mod heart_analysis;
pub mod output;
pub mod phase_analysis;
pub mod preprocessing;
pub mod regions;
pub mod statistics;
pub mod summary;

#[cfg(test)]
mod test_support;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, info};
use serde::Serialize;

pub use error::{Result, SleepError};
pub use regions::{Region, RegionType};
pub use statistics::Statistics;
pub use summary::{ChartBand, Summary};

/// First header cell of an export that was already segmented on the device.
pub const REGION_EXPORT_HEADER: &str = "Region Type";

/// Motion ceiling reported for summaries that carry no samples.
pub const DEFAULT_MAX_MOTION: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub motion: f64,
    pub heart_rate: Option<f64>,
    pub sdnn: Option<f64>,
    pub hrv_estimate: f64,
    pub sleep_discriminant: f64,
    pub is_sleeping: bool,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, motion: f64) -> Self {
        Self {
            timestamp,
            motion,
            heart_rate: None,
            sdnn: None,
            hrv_estimate: 0.0,
            sleep_discriminant: 0.0,
            is_sleeping: false,
        }
    }
}

/// Optional channels present in an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Channels {
    pub heart_rate: bool,
    pub sdnn: bool,
}

/// A night of resampled, classified samples.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub samples: Vec<Sample>,
    pub tz: Tz,
    pub channels: Channels,
    pub rem_threshold: f64,
}

impl Session {
    /// Runs a raw export body through parsing, REM threshold estimation,
    /// resampling and classification.
    pub fn from_rows(rows: &[Vec<String>], tz: Tz) -> Result<Self> {
        let raw = data_loading::parse_samples(rows)?;
        info!(
            "Parsed {} samples (heart rate: {}, sdnn: {})",
            raw.samples.len(),
            raw.channels.heart_rate,
            raw.channels.sdnn
        );

        let estimate = heart_analysis::estimate_rem_threshold(&raw.samples, raw.channels);
        debug!("REM threshold: {}", estimate.threshold);

        let resampled = preprocessing::resample(&estimate.samples);
        let samples = phase_analysis::classify(&resampled);

        Ok(Self {
            samples,
            tz,
            channels: raw.channels,
            rem_threshold: estimate.threshold,
        })
    }

    pub fn uses_heart_rate(&self) -> bool {
        self.channels.heart_rate
    }

    pub fn uses_sdnn(&self) -> bool {
        self.channels.sdnn
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    pub fn motion_series(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.samples.iter().map(|s| (s.timestamp, s.motion)).collect()
    }

    /// `None` when the export had no heart rate column.
    pub fn heart_rate_series(&self) -> Option<Vec<(DateTime<Utc>, f64)>> {
        if !self.uses_heart_rate() {
            return None;
        }

        Some(
            self.samples
                .iter()
                .map(|s| (s.timestamp, s.heart_rate.unwrap_or_default()))
                .collect(),
        )
    }

    pub fn max_motion(&self) -> f64 {
        if self.samples.is_empty() {
            return DEFAULT_MAX_MOTION;
        }

        self.samples.iter().map(|s| s.motion).fold(0.0, f64::max)
    }
}

/// Summarises a full export table, header row included.
///
/// The header only decides which kind of export this is: a first cell of
/// [`REGION_EXPORT_HEADER`] means the rows are device-segmented regions,
/// anything else means raw motion samples.
pub fn summarise_export(table: &[Vec<String>], tz: Tz) -> Result<Summary> {
    let Some((header, body)) = table.split_first() else {
        return Err(SleepError::InsufficientData { rows: 0 });
    };

    let region_export = header
        .first()
        .is_some_and(|cell| cell.trim() == REGION_EXPORT_HEADER);

    if region_export {
        info!("Summary export with {} region rows", body.len());
        summary::parse_regions(body, tz)
    } else {
        info!("Full export with {} sample rows", body.len());
        summary::summarise_data(Session::from_rows(body, tz)?)
    }
}
