use crate::{Session, Summary};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::io::{self, Write};
use std::path::Path;

const CSV_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Writes `<stem>_regions.csv` and, for full exports, `<stem>_samples.csv`
/// next to `base_path`.
pub fn write_summary_to_csv(base_path: &str, summary: &Summary) -> Result<()> {
    let path = Path::new(base_path);
    let dir = path.parent().unwrap_or(Path::new("."));

    // Create directory if it doesn't exist
    std::fs::create_dir_all(dir)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("summary");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");

    let regions_path = dir.join(format!("{}_regions.{}", stem, ext));
    println!("Writing regions to {}", regions_path.display());
    write_regions_csv(std::fs::File::create(regions_path)?, summary)?;

    if let Some(session) = &summary.session {
        let samples_path = dir.join(format!("{}_samples.{}", stem, ext));
        println!("Writing samples to {}", samples_path.display());
        write_samples_csv(std::fs::File::create(samples_path)?, session)?;
    }

    Ok(())
}

pub fn write_regions_csv<W: Write>(writer: W, summary: &Summary) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["start", "end", "region_type", "minutes"])?;

    for region in &summary.regions {
        writer.write_record([
            local(region.start, summary.tz),
            local(region.end, summary.tz),
            format!("{:?}", region.region_type),
            region.duration().num_minutes().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_samples_csv<W: Write>(writer: W, session: &Session) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "timestamp",
        "motion",
        "heart_rate",
        "sdnn",
        "hrv_estimate",
        "sleep_discriminant",
        "sleeping",
    ])?;

    for sample in &session.samples {
        writer.write_record([
            local(sample.timestamp, session.tz),
            sample.motion.to_string(),
            sample.heart_rate.map(|v| v.to_string()).unwrap_or_default(),
            sample.sdnn.map(|v| v.to_string()).unwrap_or_default(),
            sample.hrv_estimate.to_string(),
            format!("{:.3}", sample.sleep_discriminant),
            sample.is_sleeping.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(CSV_TIME_FORMAT).to_string()
}

/// `0.1234` -> `"12.3"`
pub fn format_percent(value: f64) -> String {
    format!("{:.1}", value * 100.0)
}

/// Local wall-clock time, `HH:MM`.
pub fn format_clock(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

fn rounded_minutes(delta: TimeDelta) -> i64 {
    (delta.num_milliseconds() as f64 / 60_000.0).round() as i64
}

/// `"7 hours 5 minutes"`, rounded to the nearest minute.
pub fn format_duration(delta: TimeDelta) -> String {
    let minutes = rounded_minutes(delta);
    format!("{} hours {} minutes", minutes / 60, minutes % 60)
}

/// A fraction of a duration in short form, e.g. `"1h23m"`, `"45m"` or
/// `"-10m"`.
pub fn format_portion(fraction: f64, delta: TimeDelta) -> String {
    let minutes = (fraction * delta.num_milliseconds() as f64 / 60_000.0).round() as i64;
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    match minutes / 60 {
        0 => format!("{}{}m", sign, minutes),
        hours => format!("{}{}h{}m", sign, hours, minutes % 60),
    }
}

pub fn write_report<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    let stats = &summary.statistics;
    let tz = summary.tz;

    writeln!(out, "\n{}", summary.title)?;
    writeln!(out, "------------------------")?;
    writeln!(
        out,
        "Tracked: {} - {}",
        format_clock(stats.start_time, tz),
        format_clock(stats.end_time, tz)
    )?;
    writeln!(
        out,
        "Asleep: {} - {} ({})",
        format_clock(stats.first_sleep, tz),
        format_clock(stats.last_wake, tz),
        format_duration(stats.sleep_duration)
    )?;
    writeln!(
        out,
        "Sleep efficiency: {}% ({}% of the whole night)",
        format_percent(stats.sleep_efficiency_fslw),
        format_percent(stats.sleep_efficiency)
    )?;
    writeln!(
        out,
        "Deep sleep: {}",
        format_portion(stats.sleep_efficiency_fslw, stats.sleep_duration)
    )?;
    if stats.heart_rate_enabled {
        writeln!(
            out,
            "REM sleep: {}% ({})",
            format_percent(stats.rem_percent),
            format_portion(stats.rem_percent, stats.sleep_duration)
        )?;
    }
    writeln!(
        out,
        "Light sleep / waking: {}% ({})",
        format_percent(stats.light_percent),
        format_portion(stats.light_percent, stats.sleep_duration)
    )?;

    writeln!(out, "\nRegions:")?;
    for region in &summary.regions {
        writeln!(
            out,
            "  {:?}: {} - {}",
            region.region_type,
            format_clock(region.start, tz),
            format_clock(region.end, tz)
        )?;
    }

    Ok(())
}

pub fn print_summary(summary: &Summary) -> Result<()> {
    write_report(&mut io::stdout().lock(), summary).context("Failed to print summary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{parse_regions, summarise_data};
    use crate::test_support::{session_from_labels, table};

    fn region_export() -> Summary {
        let rows = table(&[
            &["wake", "0", "600000"],
            &["rem", "3600000", "5400000"],
            &["wake", "27000000", "28800000"],
        ]);
        parse_regions(&rows, Tz::UTC).unwrap()
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(format_percent(0.1234), "12.3");
        assert_eq!(format_percent(1.0), "100.0");
        assert_eq!(format_percent(0.0), "0.0");
    }

    #[test]
    fn duration_rounds_to_minute() {
        assert_eq!(
            format_duration(TimeDelta::minutes(425) + TimeDelta::seconds(31)),
            "7 hours 6 minutes"
        );
        assert_eq!(format_duration(TimeDelta::seconds(29)), "0 hours 0 minutes");
    }

    #[test]
    fn portion_of_duration() {
        assert_eq!(format_portion(0.5, TimeDelta::hours(3)), "1h30m");
        assert_eq!(format_portion(0.25, TimeDelta::hours(1)), "15m");
        assert_eq!(format_portion(-0.5, TimeDelta::hours(3)), "-1h30m");
        assert_eq!(format_portion(-0.25, TimeDelta::hours(1)), "-15m");
    }

    #[test]
    fn clock_in_zone() {
        let instant = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_clock(instant, Tz::UTC), "22:13");
        assert_eq!(format_clock(instant, Tz::Asia__Tokyo), "07:13");
    }

    #[test]
    fn regions_csv() {
        let summary = region_export();
        let mut buffer = Vec::new();
        write_regions_csv(&mut buffer, &summary).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "start,end,region_type,minutes");
        assert_eq!(lines[1], "1970-01-01 00:00,1970-01-01 00:10,Waking,10");
        assert_eq!(lines[2], "1970-01-01 00:10,1970-01-01 01:00,Sleeping,50");
        assert_eq!(lines[3], "1970-01-01 01:00,1970-01-01 01:30,REM,30");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn samples_csv() {
        let summary = summarise_data(session_from_labels(&[false, true, false])).unwrap();
        let mut buffer = Vec::new();
        write_samples_csv(&mut buffer, summary.session.as_ref().unwrap()).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "1970-01-01 00:01,0,,,0,0.000,true");
    }

    #[test]
    fn report_mentions_rem_only_with_heart_rate() {
        let mut buffer = Vec::new();
        write_report(&mut buffer, &region_export()).unwrap();
        let report = String::from_utf8(buffer).unwrap();

        assert!(report.contains("Exported Sleep Summary from Thursday, January 1"));
        assert!(report.contains("Asleep: 00:10 - 07:30 (7 hours 20 minutes)"));
        assert!(report.contains("REM sleep: 6.8% (30m)"));

        let summary = summarise_data(session_from_labels(&[false, true, true, false])).unwrap();
        let mut buffer = Vec::new();
        write_report(&mut buffer, &summary).unwrap();
        assert!(!String::from_utf8(buffer).unwrap().contains("REM sleep"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn report_write_errors_surface() {
        let err = write_report(&mut ClosedPipe, &region_export()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn csv_files_next_to_prefix() {
        let dir = std::env::temp_dir().join(format!("sleep-summary-out-{}", std::process::id()));
        let prefix = dir.join("night.csv");

        let summary = summarise_data(session_from_labels(&[false, true, true, false])).unwrap();
        write_summary_to_csv(prefix.to_str().unwrap(), &summary).unwrap();

        assert!(dir.join("night_regions.csv").exists());
        assert!(dir.join("night_samples.csv").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
