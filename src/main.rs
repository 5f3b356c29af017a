use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use sleep_summary::config::{self, Args};
use sleep_summary::{data_loading, output, summarise_export};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();
    let tz = config::resolve_time_zone(&args.tz)
        .with_context(|| format!("Invalid --tz value: {}", args.tz))?;

    let table = data_loading::read_csv_file(&args.input_path)?;
    info!(
        "Loaded {} rows from {}",
        table.len(),
        args.input_path.display()
    );

    let summary = summarise_export(&table, tz)
        .with_context(|| format!("Failed to summarise {}", args.input_path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        output::print_summary(&summary)?;
    }

    if let Some(prefix) = &args.csv_output {
        output::write_summary_to_csv(prefix, &summary)?;
    }

    Ok(())
}
