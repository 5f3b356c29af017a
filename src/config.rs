use crate::error::{Result, SleepError};
use chrono_tz::Tz;
use clap::Parser;
use std::path::PathBuf;

/// Summarise a night of sleep data exported from a watch
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the exported CSV (raw samples or a region export)
    #[arg(help = "Path to the exported CSV (raw samples or a region export)")]
    pub input_path: PathBuf,

    /// IANA time zone used for titles and clock times (e.g. Europe/London)
    #[arg(long, env = "SLEEP_SUMMARY_TZ", default_value = "UTC")]
    pub tz: String,

    /// CSV output file prefix (e.g. /path/to/output/prefix)
    #[arg(long)]
    pub csv_output: Option<String>,

    /// Print the summary as JSON instead of a report
    #[arg(long)]
    pub json: bool,
}

/// Resolves an IANA zone name such as `Europe/London`.
pub fn resolve_time_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| SleepError::InvalidTimeZone {
            name: name.to_owned(),
            reason: e.to_string(),
        })
}
