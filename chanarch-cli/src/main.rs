//! chanarch command-line front end.
//!
//! Parses the invocation, resolves the day-first timestamps in the
//! selected zone, and hands a typed `RunConfig` to the retrieval engine.
//! The engine never exits the process itself; the exit-code decision is
//! made here.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;

use chanarch_appliance::ApplianceClient;
use chanarch_core::{ChanError, RunConfig, SamplingMode, TimeZoneMode};

#[derive(Debug, Parser)]
#[command(
    name = "chanarch",
    version,
    about = "Retrieve archived channel history and write an aligned table report",
    after_help = "Times are day-first, e.g. \"16/06/2020 16:30:00\" or \"16/Jun/2020\".\n\
                  The archive endpoint comes from --archives or CHANARCH_ARCHIVES."
)]
struct Cli {
    /// Report destination path.
    output_file: PathBuf,

    /// Window start, e.g. "16/06/2020 16:30:00".
    start: String,

    /// Window end, e.g. "17/06/2020 16:30:00".
    end: String,

    /// Channel (process variable) names, 1 to 20.
    #[arg(required = true, num_args = 1..=20)]
    channels: Vec<String>,

    /// Interpret and render times in UTC instead of local time.
    #[arg(long)]
    utc: bool,

    /// Retrieve server-native samples page by page (default is server-side
    /// linear reduction).
    #[arg(long)]
    raw: bool,

    /// Resample onto a fixed grid with this spacing, in seconds.
    #[arg(long, value_name = "SECONDS")]
    fixed: Option<f64>,

    /// Archiver appliance base URL; falls back to CHANARCH_ARCHIVES.
    #[arg(long, value_name = "URL")]
    archives: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => println!("chanarch complete"),
        Err(e) => {
            eprintln!("chanarch: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<(), ChanError> {
    let zone = if cli.utc {
        TimeZoneMode::Utc
    } else {
        TimeZoneMode::Local
    };

    let global_start = parse_stamp(&cli.start, zone).ok_or_else(|| {
        ChanError::config(format!(
            "invalid start time {:?}; valid example is \"16/06/2020 16:30:00\"",
            cli.start
        ))
    })?;
    let global_end = parse_stamp(&cli.end, zone).ok_or_else(|| {
        ChanError::config(format!(
            "invalid end time {:?}; valid example is \"17/06/2020 16:30:00\"",
            cli.end
        ))
    })?;

    let archives = cli
        .archives
        .or_else(|| std::env::var("CHANARCH_ARCHIVES").ok())
        .ok_or_else(|| {
            ChanError::config("no archive endpoint; pass --archives or set CHANARCH_ARCHIVES")
        })?;

    let cfg = RunConfig {
        zone,
        mode: if cli.raw {
            SamplingMode::Raw
        } else {
            SamplingMode::Linear
        },
        fixed_interval: cli.fixed,
        output_path: cli.output_file,
        global_start,
        global_end,
    };

    let client = Arc::new(ApplianceClient::new(archives));
    chanarch::run(cfg, cli.channels, client).await
}

/// Parse a day-first timestamp in the selected zone.
///
/// Accepted shapes: `dd/MM/yyyy` or `dd/MMM/yyyy` dates, optionally
/// followed by `HH:MM:SS`, `HH:MM`, or a bare hour.
fn parse_stamp(image: &str, zone: TimeZoneMode) -> Option<DateTime<Utc>> {
    let trimmed = image.trim();
    let (date_part, time_part) = match trimmed.split_once(' ') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (trimmed, None),
    };

    let date = ["%d/%b/%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(date_part, f).ok())?;
    let time = match time_part {
        None => NaiveTime::MIN,
        Some(t) => parse_time(t)?,
    };
    let naive = date.and_time(time);

    match zone {
        TimeZoneMode::Utc => Some(Utc.from_utc_datetime(&naive)),
        TimeZoneMode::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn parse_time(image: &str) -> Option<NaiveTime> {
    for f in ["%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(image, f) {
            return Some(t);
        }
    }
    image
        .parse::<u32>()
        .ok()
        .and_then(|h| NaiveTime::from_hms_opt(h, 0, 0))
}
