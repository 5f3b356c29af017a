use crate::Sample;
use chrono::{DateTime, TimeDelta, Utc};
use log::debug;

/// Spacing of the resampled series.
pub const TIME_STEP_SECONDS: i64 = 60;

/// Linearly interpolates raw samples onto a uniform one-minute grid.
///
/// The grid starts at the first raw timestamp and stops once the next step
/// would pass the last one, or would leave the representable time range.
/// Raw samples must be in non-decreasing time order;
/// they are not sorted here.
pub fn resample(raw: &[Sample]) -> Vec<Sample> {
    let (Some(first), Some(last)) = (raw.first(), raw.last()) else {
        return Vec::new();
    };

    let step = TimeDelta::seconds(TIME_STEP_SECONDS);
    let mut resampled = Vec::new();
    let mut lower = 0;
    let mut next = Some(first.timestamp);

    while let Some(current) = next.filter(|t| *t <= last.timestamp) {
        // Sweep forward only
        while lower + 2 < raw.len() && current > raw[lower + 1].timestamp {
            lower += 1;
        }
        let upper = (lower + 1).min(raw.len() - 1);

        let ratio = interpolation_ratio(raw[lower].timestamp, raw[upper].timestamp, current);
        resampled.push(interpolate(&raw[lower], &raw[upper], current, ratio));

        next = current.checked_add_signed(step);
    }

    debug!(
        "Resampled {} raw samples into {} one-minute samples",
        raw.len(),
        resampled.len()
    );
    resampled
}

/// Position of `target` between `lower` and `upper`, clamped to [0, 1].
/// A zero-length bracket resolves to the later reading.
pub fn interpolation_ratio(
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
    target: DateTime<Utc>,
) -> f64 {
    let span = (upper - lower).num_milliseconds();
    if span <= 0 {
        return 1.0;
    }

    let offset = (target - lower).num_milliseconds();
    (offset as f64 / span as f64).clamp(0.0, 1.0)
}

fn interpolate(lower: &Sample, upper: &Sample, timestamp: DateTime<Utc>, ratio: f64) -> Sample {
    let motion = lerp(lower.motion, upper.motion, ratio).round().max(0.0);

    Sample {
        heart_rate: lerp_channel(lower.heart_rate, upper.heart_rate, ratio),
        sdnn: lerp_channel(lower.sdnn, upper.sdnn, ratio),
        hrv_estimate: lerp(lower.hrv_estimate, upper.hrv_estimate, ratio),
        ..Sample::new(timestamp, motion)
    }
}

fn lerp(a: f64, b: f64, ratio: f64) -> f64 {
    a * (1.0 - ratio) + b * ratio
}

// A reading missing on one side counts as zero
fn lerp_channel(a: Option<f64>, b: Option<f64>, ratio: f64) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(lerp(a.unwrap_or_default(), b.unwrap_or_default(), ratio)),
    }
}
