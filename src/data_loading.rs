use crate::error::{Result, SleepError};
use crate::regions::{Region, RegionType};
use crate::{Channels, Sample};
use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::fs::File;
use std::path::Path;

/// Exports with fewer rows than this cannot describe a night.
pub const MIN_ROWS: usize = 2;

/// Tag marking a REM row in a region export; every other tag is waking.
pub const REM_TAG: &str = "rem";

/// Parsed samples in export order, before resampling.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub samples: Vec<Sample>,
    pub channels: Channels,
}

/// Reads an export CSV into string rows. Rows may have differing lengths.
pub fn read_csv_file(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Optional heart rate / SDNN columns
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record =
            result.with_context(|| format!("Failed to read CSV row from {}", path.display()))?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parses `[timestampMillis, motion, heartRate?, sdnn?]` rows.
///
/// Row indices in errors are positions within `rows`.
pub fn parse_samples(rows: &[Vec<String>]) -> Result<RawSeries> {
    if rows.len() < MIN_ROWS {
        return Err(SleepError::InsufficientData { rows: rows.len() });
    }

    let mut channels = Channels::default();
    let mut samples = Vec::with_capacity(rows.len());

    for (row, fields) in rows.iter().enumerate() {
        let timestamp = parse_timestamp(row, 0, fields)?;
        let motion = parse_field(row, 1, fields)?.max(0.0);
        let mut sample = Sample::new(timestamp, motion);

        if fields.len() > 2 {
            sample.heart_rate = Some(parse_field(row, 2, fields)?);
            channels.heart_rate = true;
        }

        if fields.len() > 3 {
            sample.sdnn = Some(parse_field(row, 3, fields)?);
            channels.sdnn = true;
        }

        trace!("Row {}: {:?}", row, sample);
        samples.push(sample);
    }

    Ok(RawSeries { samples, channels })
}

/// Parses `[tag, startMillis, endMillis]` rows into labelled regions.
///
/// Rows must be in time order and must not overlap.
pub fn parse_region_rows(rows: &[Vec<String>]) -> Result<Vec<Region>> {
    if rows.len() < MIN_ROWS {
        return Err(SleepError::InsufficientData { rows: rows.len() });
    }

    let mut regions: Vec<Region> = Vec::with_capacity(rows.len());

    for (row, fields) in rows.iter().enumerate() {
        let tag = fields.first().map(|s| s.trim()).unwrap_or_default();
        let region_type = if tag == REM_TAG {
            RegionType::REM
        } else {
            RegionType::Waking
        };

        let start = parse_timestamp(row, 1, fields)?;
        let end = parse_timestamp(row, 2, fields)?;
        if end < start {
            return Err(malformed(row, 2, fields));
        }
        if regions.last().is_some_and(|prev| start < prev.end) {
            return Err(malformed(row, 1, fields));
        }

        regions.push(Region {
            start,
            end,
            region_type,
        });
    }

    Ok(regions)
}

fn parse_field(row: usize, column: usize, fields: &[String]) -> Result<f64> {
    fields
        .get(column)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(row, column, fields))
}

fn parse_timestamp(row: usize, column: usize, fields: &[String]) -> Result<DateTime<Utc>> {
    let millis = parse_field(row, column, fields)?;
    DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| malformed(row, column, fields))
}

fn malformed(row: usize, column: usize, fields: &[String]) -> SleepError {
    SleepError::MalformedField {
        row,
        column,
        value: fields.get(column).cloned().unwrap_or_default(),
    }
}
