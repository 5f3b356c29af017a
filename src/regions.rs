use crate::{Channels, Sample, Session};
use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use serde::Serialize;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    Waking,
    Sleeping,
    REM,
}

/// A half-open interval `[start, end)` sharing one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub region_type: RegionType,
}

impl Region {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Whether any sample rises above the REM threshold on the session's
/// variability channel: SDNN when the device reports it, the HRV estimate
/// otherwise. A zero threshold disables REM detection.
pub fn rem_in_range(samples: &[Sample], channels: Channels, rem_threshold: f64) -> bool {
    if !channels.heart_rate || rem_threshold <= 0.0 {
        return false;
    }

    samples.iter().any(|s| {
        let variability = if channels.sdnn {
            s.sdnn.unwrap_or_default()
        } else {
            s.hrv_estimate
        };
        variability > rem_threshold
    })
}

/// Collapses per-sample sleep labels into contiguous regions.
///
/// Each run of equal labels becomes one region ending where the next run
/// starts; the last region ends at the last sample. Waking runs that cross
/// the REM threshold become REM, except at the very end of the night.
pub fn segment_session(session: &Session) -> Vec<Region> {
    let samples = &session.samples;
    let mut regions = Vec::new();
    let mut offset = 0;

    for run in samples.chunk_by(|a, b| a.is_sleeping == b.is_sleeping) {
        let next = offset + run.len();

        let region_type = if run[0].is_sleeping {
            RegionType::Sleeping
        } else if rem_in_range(run, session.channels, session.rem_threshold) {
            RegionType::REM
        } else {
            RegionType::Waking
        };

        let end = samples.get(next).unwrap_or(&run[run.len() - 1]).timestamp;
        regions.push(Region {
            start: run[0].timestamp,
            end,
            region_type,
        });

        offset = next;
    }

    // A night cannot end in REM
    if let Some(last) = regions.last_mut() {
        if last.region_type == RegionType::REM {
            last.region_type = RegionType::Waking;
        }
    }

    debug!("Segmented {} samples into {} regions", samples.len(), regions.len());
    regions
}

/// Fills the gaps between device-labelled regions with sleep.
///
/// Region exports only list waking and REM stretches; the time between them
/// is the deep sleep the device already excluded.
pub fn fill_sleep_gaps(labelled: &[Region]) -> Vec<Region> {
    let mut regions = Vec::with_capacity(labelled.len() * 2);
    regions.extend(labelled.first().copied());

    for pair in labelled.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.start > prev.end {
            regions.push(Region {
                start: prev.end,
                end: next.start,
                region_type: RegionType::Sleeping,
            });
        }
        regions.push(next);
    }

    regions
}
