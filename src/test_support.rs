use crate::{Channels, Sample, Session};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub fn at_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

pub fn at_minute(minute: i64) -> DateTime<Utc> {
    at_millis(minute * 60_000)
}

pub fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect()
}

/// A UTC session of one-minute samples with the given sleep labels, starting
/// at the epoch.
pub fn session_from_labels(labels: &[bool]) -> Session {
    let samples = labels
        .iter()
        .enumerate()
        .map(|(i, &is_sleeping)| Sample {
            is_sleeping,
            ..Sample::new(at_minute(i as i64), 0.0)
        })
        .collect();

    Session {
        samples,
        tz: Tz::UTC,
        channels: Channels::default(),
        rem_threshold: 0.0,
    }
}
