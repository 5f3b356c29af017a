use crate::error::{Result, SleepError};
use crate::regions::{Region, RegionType};
use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub heart_rate_enabled: bool,
    pub is_summary_export: bool,
    pub start_time: DateTime<Utc>,
    pub first_sleep: DateTime<Utc>,
    pub last_wake: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Share of the whole session spent in (deep) sleep.
    pub sleep_efficiency: f64,
    /// Share of the first-sleep to last-wake window spent in (deep) sleep.
    pub sleep_efficiency_fslw: f64,
    pub rem_percent: f64,
    /// Whatever the window holds besides deep sleep and REM. Can go negative
    /// when REM dominates.
    pub light_percent: f64,
    #[serde(serialize_with = "serialize_seconds")]
    pub sleep_duration: TimeDelta,
}

impl Statistics {
    /// Computes session statistics over regions spanning `[start, end]`.
    ///
    /// Both flags are left false; callers fill them in.
    pub fn compute(
        regions: &[Region],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        let (first_sleep, last_wake) = sleep_window(regions, start, end);

        let total_time = end - start;
        let window_time = last_wake - first_sleep;
        if total_time <= TimeDelta::zero() {
            return Err(SleepError::DegenerateSession("session has zero length"));
        }
        if window_time <= TimeDelta::zero() {
            return Err(SleepError::DegenerateSession(
                "first sleep to last wake window has zero length",
            ));
        }

        let mut total_deep_time = TimeDelta::zero();
        let mut window_deep_time = TimeDelta::zero();
        let mut rem_time = TimeDelta::zero();

        for region in regions {
            // Regions are contiguous, so the one ending at last wake is the
            // last one inside the window
            let in_window = region.end > first_sleep && region.end <= last_wake;

            match region.region_type {
                RegionType::Sleeping => {
                    total_deep_time += region.duration();
                    if in_window {
                        window_deep_time += region.duration();
                    }
                }
                RegionType::REM if in_window => rem_time += region.duration(),
                _ => {}
            }
        }

        let sleep_efficiency_fslw = ratio(window_deep_time, window_time);
        let rem_percent = ratio(rem_time, window_time);

        let statistics = Self {
            heart_rate_enabled: false,
            is_summary_export: false,
            start_time: start,
            first_sleep,
            last_wake,
            end_time: end,
            sleep_efficiency: ratio(total_deep_time, total_time),
            sleep_efficiency_fslw,
            rem_percent,
            light_percent: 1.0 - rem_percent - sleep_efficiency_fslw,
            sleep_duration: window_time,
        };

        debug!("Statistics: {:?}", statistics);
        Ok(statistics)
    }
}

/// First sleep onset and last wake, falling back to the session bounds when
/// they cross.
pub fn sleep_window(
    regions: &[Region],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_sleep = regions
        .iter()
        .find(|r| matches!(r.region_type, RegionType::Sleeping | RegionType::REM))
        .map_or(start, |r| r.start);

    let last_wake = regions
        .iter()
        .rev()
        .find(|r| r.region_type == RegionType::Waking)
        .map_or(end, |r| r.start);

    if first_sleep > last_wake {
        (start, end)
    } else {
        (first_sleep, last_wake)
    }
}

fn ratio(part: TimeDelta, whole: TimeDelta) -> f64 {
    part.num_milliseconds() as f64 / whole.num_milliseconds() as f64
}

fn serialize_seconds<S: Serializer>(
    delta: &TimeDelta,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(delta.num_seconds())
}
