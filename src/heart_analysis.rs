use crate::{Channels, Sample};
use log::{debug, trace};

/// Fixed threshold used when the device reports SDNN directly.
pub const SDNN_REM_THRESHOLD: f64 = 0.19;

/// Smoothing factor of the heart rate low-pass filter. Filters out changes
/// faster than roughly ten per minute.
pub const LOWPASS_ALPHA: f64 = 0.15;

/// Deviations at or below this many bpm are treated as noise.
pub const HRV_NOISE_FLOOR: f64 = 18.0;

pub const REM_PERCENTILE: f64 = 0.8;

/// Threshold plus the samples annotated with their HRV estimate.
#[derive(Debug, Clone)]
pub struct RemEstimate {
    pub threshold: f64,
    pub samples: Vec<Sample>,
}

/// Derives the session's REM threshold. A threshold of zero disables REM
/// detection.
///
/// Without SDNN, every returned sample carries its heart rate deviation from
/// the low-passed baseline in `hrv_estimate`. The input is left untouched.
pub fn estimate_rem_threshold(samples: &[Sample], channels: Channels) -> RemEstimate {
    if !channels.heart_rate {
        return RemEstimate {
            threshold: 0.0,
            samples: samples.to_vec(),
        };
    }

    if channels.sdnn {
        return RemEstimate {
            threshold: SDNN_REM_THRESHOLD,
            samples: samples.to_vec(),
        };
    }

    let heart_rates: Vec<f64> = samples
        .iter()
        .map(|s| s.heart_rate.unwrap_or_default())
        .collect();
    let estimates = hrv_estimates(&heart_rates);

    let annotated = samples
        .iter()
        .zip(&estimates)
        .map(|(sample, &hrv_estimate)| Sample {
            hrv_estimate,
            ..*sample
        })
        .collect();

    RemEstimate {
        threshold: percentile_threshold(&estimates),
        samples: annotated,
    }
}

/// Single-pole low-pass filter seeded at `seed`.
pub fn low_pass(values: &[f64], alpha: f64, seed: f64) -> Vec<f64> {
    values
        .iter()
        .scan(seed, |state, &x| {
            *state += alpha * (x - *state);
            Some(*state)
        })
        .collect()
}

/// Absolute deviation of each heart rate from its low-passed value, with the
/// filter seeded at the mean heart rate.
pub fn hrv_estimates(heart_rates: &[f64]) -> Vec<f64> {
    if heart_rates.is_empty() {
        return Vec::new();
    }

    let mean = heart_rates.iter().sum::<f64>() / heart_rates.len() as f64;
    debug!("Mean heart rate: {:.1}", mean);

    low_pass(heart_rates, LOWPASS_ALPHA, mean)
        .iter()
        .zip(heart_rates)
        .map(|(filtered, raw)| (filtered - raw).abs())
        .collect()
}

/// The 80th percentile of the deviations above the noise floor, taken at
/// sorted index `round(0.8 * n)`. Zero when nothing clears the floor.
pub fn percentile_threshold(estimates: &[f64]) -> f64 {
    let mut filtered: Vec<f64> = estimates
        .iter()
        .copied()
        .filter(|&x| x > HRV_NOISE_FLOOR)
        .collect();

    trace!(
        "{} of {} HRV estimates above noise floor",
        filtered.len(),
        estimates.len()
    );

    if filtered.is_empty() {
        return 0.0;
    }

    filtered.sort_by(f64::total_cmp);
    let rank = (REM_PERCENTILE * filtered.len() as f64).round() as usize;
    filtered[rank.min(filtered.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::at_minute;

    fn with_heart_rates(heart_rates: &[f64]) -> Vec<Sample> {
        heart_rates
            .iter()
            .enumerate()
            .map(|(i, &hr)| Sample {
                heart_rate: Some(hr),
                ..Sample::new(at_minute(i as i64), 0.0)
            })
            .collect()
    }

    #[test]
    fn disabled_without_heart_rate() {
        let samples = with_heart_rates(&[60.0, 120.0, 60.0]);
        let estimate = estimate_rem_threshold(&samples, Channels::default());

        assert_eq!(estimate.threshold, 0.0);
        assert_eq!(estimate.samples, samples);
    }

    #[test]
    fn sdnn_uses_fixed_threshold() {
        let samples = with_heart_rates(&[60.0, 120.0, 60.0]);
        let channels = Channels {
            heart_rate: true,
            sdnn: true,
        };

        let estimate = estimate_rem_threshold(&samples, channels);
        assert_eq!(estimate.threshold, SDNN_REM_THRESHOLD);
        assert!(estimate.samples.iter().all(|s| s.hrv_estimate == 0.0));
    }

    #[test]
    fn low_pass_converges() {
        let filtered = low_pass(&[10.0, 10.0, 10.0], 0.5, 0.0);
        assert_eq!(filtered, vec![5.0, 7.5, 8.75]);
    }

    #[test]
    fn steady_heart_rate_has_no_threshold() {
        let samples = with_heart_rates(&[60.0; 30]);
        let channels = Channels {
            heart_rate: true,
            sdnn: false,
        };

        let estimate = estimate_rem_threshold(&samples, channels);
        assert_eq!(estimate.threshold, 0.0);
        assert!(estimate.samples.iter().all(|s| s.hrv_estimate == 0.0));
    }

    #[test]
    fn estimates_are_written_to_a_copy() {
        let samples = with_heart_rates(&[60.0, 100.0, 60.0, 60.0]);
        let channels = Channels {
            heart_rate: true,
            sdnn: false,
        };

        let estimate = estimate_rem_threshold(&samples, channels);

        // mean 70: state 68.5 -> |68.5 - 60| = 8.5, state 73.225 -> 26.775
        assert!((estimate.samples[0].hrv_estimate - 8.5).abs() < 1e-9);
        assert!((estimate.samples[1].hrv_estimate - 26.775).abs() < 1e-9);
        assert!(samples.iter().all(|s| s.hrv_estimate == 0.0));
        // Only one deviation clears the floor
        assert!((estimate.threshold - 26.775).abs() < 1e-9);
    }

    #[test]
    fn percentile_uses_rounded_rank() {
        // 19..=28: ten values above the floor, rank round(8.0) = 8
        let mut estimates: Vec<f64> = (19..=28).rev().map(f64::from).collect();
        estimates.extend([1.0, 18.0, 5.0]);
        assert_eq!(percentile_threshold(&estimates), 27.0);

        // three values: round(2.4) = 2
        assert_eq!(percentile_threshold(&[30.0, 20.0, 25.0]), 30.0);

        // two values: round(1.6) = 2, clamped to the last
        assert_eq!(percentile_threshold(&[30.0, 20.0]), 30.0);
    }

    #[test]
    fn percentile_empty_after_floor() {
        assert_eq!(percentile_threshold(&[18.0, 3.0, 0.0]), 0.0);
        assert_eq!(percentile_threshold(&[]), 0.0);
    }
}
