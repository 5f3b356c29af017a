use crate::error::{Result, SleepError};
use crate::regions::{self, Region, RegionType};
use crate::statistics::Statistics;
use crate::{data_loading, Session, DEFAULT_MAX_MOTION};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::info;
use serde::Serialize;

const TITLE_FORMAT: &str = "Sleep Summary for %A, %B %-d";
const EXPORTED_TITLE_FORMAT: &str = "Exported Sleep Summary from %A, %B %-d";

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Absent for region exports, which carry no samples.
    pub session: Option<Session>,
    pub statistics: Statistics,
    pub regions: Vec<Region>,
    pub title: String,
    pub tz: Tz,
}

/// A shaded stretch of the night chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBand {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub height: f64,
    pub region_type: RegionType,
    /// Legend entry, only set on the first band of each type.
    pub label: Option<&'static str>,
}

/// Segments a classified session and computes its statistics.
pub fn summarise_data(session: Session) -> Result<Summary> {
    let (Some(start), Some(end)) = (session.start(), session.end()) else {
        return Err(SleepError::DegenerateSession("session has no samples"));
    };

    let regions = regions::segment_session(&session);
    let mut statistics = Statistics::compute(&regions, start, end)?;
    statistics.heart_rate_enabled = session.uses_heart_rate();

    let title = format_title(TITLE_FORMAT, start, session.tz);
    info!("{}: {} regions", title, regions.len());

    Ok(Summary {
        tz: session.tz,
        session: Some(session),
        statistics,
        regions,
        title,
    })
}

/// Summarises a region export body. The first row's start and the last
/// row's end bound the session.
pub fn parse_regions(rows: &[Vec<String>], tz: Tz) -> Result<Summary> {
    let labelled = data_loading::parse_region_rows(rows)?;
    let (Some(first), Some(last)) = (labelled.first(), labelled.last()) else {
        return Err(SleepError::InsufficientData { rows: 0 });
    };
    let (start, end) = (first.start, last.end);

    let regions = regions::fill_sleep_gaps(&labelled);
    let mut statistics = Statistics::compute(&regions, start, end)?;
    statistics.heart_rate_enabled = labelled.iter().any(|r| r.region_type == RegionType::REM);
    statistics.is_summary_export = true;

    let title = format_title(EXPORTED_TITLE_FORMAT, start, tz);
    info!("{}: {} regions", title, regions.len());

    Ok(Summary {
        session: None,
        statistics,
        regions,
        title,
        tz,
    })
}

fn format_title(format: &str, start: DateTime<Utc>, tz: Tz) -> String {
    start.with_timezone(&tz).format(format).to_string()
}

impl Summary {
    pub fn max_motion(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(DEFAULT_MAX_MOTION, Session::max_motion)
    }

    /// One band per waking or REM region, as tall as the chart's motion axis.
    pub fn chart_bands(&self) -> Vec<ChartBand> {
        let height = self.max_motion();
        let mut first_waking = true;
        let mut first_rem = true;

        self.regions
            .iter()
            .filter(|r| r.region_type != RegionType::Sleeping)
            .map(|r| {
                let label = match r.region_type {
                    RegionType::Waking if first_waking => {
                        first_waking = false;
                        Some("Light Sleep / Waking")
                    }
                    RegionType::REM if first_rem => {
                        first_rem = false;
                        Some("REM Sleep")
                    }
                    _ => None,
                };

                ChartBand {
                    start: r.start,
                    end: r.end,
                    height,
                    region_type: r.region_type,
                    label,
                }
            })
            .collect()
    }
}
