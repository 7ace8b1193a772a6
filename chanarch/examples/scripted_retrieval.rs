//! Run the retrieval engine against a scripted mock archive and print the
//! resulting report. No archiver required; useful for eyeballing the table
//! layout.

use std::sync::Arc;

use chanarch_core::{Quality, RunConfig, Sample, SamplingMode, TimeZoneMode};
use chanarch_mock::MockArchive;
use chrono::{DateTime, Utc};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid fixture timestamp")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let out = std::env::temp_dir().join("chanarch_example_report.txt");
    let cfg = RunConfig {
        zone: TimeZoneMode::Utc,
        mode: SamplingMode::Raw,
        fixed_interval: None,
        output_path: out.clone(),
        global_start: ts(0),
        global_end: ts(60),
    };

    let mock = Arc::new(MockArchive::new());
    mock.script_page(
        "sim://ramp",
        (0..=6)
            .map(|i| Sample {
                ts: ts(i * 10),
                value: i as f64 * 0.5,
                valid: true,
                quality: Quality::Good,
            })
            .collect(),
    );

    chanarch::run(cfg, vec!["sim://ramp".into()], mock).await?;

    print!("{}", std::fs::read_to_string(&out)?);
    Ok(())
}
