use crate::Sample;
use log::debug;

/// Weight `j` applies to the motion `WINDOW_LEAD` samples before `i + j`.
pub const SLEEP_WEIGHTS: [u16; 7] = [106, 54, 58, 76, 230, 74, 67];

/// Samples before the scored point covered by the window.
pub const WINDOW_LEAD: usize = 4;

/// Motion ceiling, and the activity assumed before the first sample.
pub const MOTION_CAP: f64 = 300.0;

pub const DISCRIMINANT_SCALE: f64 = 0.001;

/// Motion seen by weight `j` when scoring point `i`.
///
/// Looks up sample `i + j - 4`. Positions before the start read as
/// [`MOTION_CAP`] (assume awake); positions past the end repeat the last
/// sample. Every value is capped at [`MOTION_CAP`].
pub fn window_motion(motions: &[f64], i: usize, j: usize) -> f64 {
    let Some(index) = (i + j).checked_sub(WINDOW_LEAD) else {
        return MOTION_CAP;
    };

    let index = index.min(motions.len().saturating_sub(1));
    motions.get(index).map_or(MOTION_CAP, |m| m.min(MOTION_CAP))
}

/// Weighted motion score around point `i`; below 1 means sleeping.
pub fn sleep_discriminant(motions: &[f64], i: usize) -> f64 {
    let weighted: f64 = SLEEP_WEIGHTS
        .iter()
        .enumerate()
        .map(|(j, &weight)| f64::from(weight) * window_motion(motions, i, j))
        .sum();

    weighted * DISCRIMINANT_SCALE
}

/// Scores and labels every sample, returning the annotated series.
pub fn classify(samples: &[Sample]) -> Vec<Sample> {
    let motions: Vec<f64> = samples.iter().map(|s| s.motion).collect();

    let classified: Vec<Sample> = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let discriminant = sleep_discriminant(&motions, i);
            Sample {
                sleep_discriminant: discriminant,
                is_sleeping: discriminant < 1.0,
                ..*sample
            }
        })
        .collect();

    debug!(
        "Classified {} of {} samples as sleeping",
        classified.iter().filter(|s| s.is_sleeping).count(),
        classified.len()
    );
    classified
}
