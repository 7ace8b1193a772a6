//! Table rendering for reconciled channel series.
//!
//! The output is for human consumption; row/column order and the `nil`
//! sentinel are nevertheless a compatibility contract for downstream
//! tooling, so the layout here is deliberately fixed-width.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use chrono::{DateTime, Duration, Utc};

use chanarch_core::{ChanError, Channel, ChannelStatus, RunConfig, Sample};

/// Render `channels` into the configured output file.
///
/// # Errors
/// Returns `ChanError::Output` if the destination cannot be created or
/// written; the failure is fatal and never retried.
pub fn write_report(channels: &[Channel], cfg: &RunConfig) -> Result<(), ChanError> {
    let path = cfg.output_path.display().to_string();
    tracing::info!(path = %path, "writing report");
    let file = File::create(&cfg.output_path).map_err(|e| ChanError::output(&path, &e))?;
    let mut out = BufWriter::new(file);
    render(channels, cfg, &mut out).map_err(|e| ChanError::output(&path, &e))?;
    out.flush().map_err(|e| ChanError::output(&path, &e))?;
    Ok(())
}

/// Render one or many reconciled series as an aligned table.
///
/// # Errors
/// Propagates I/O failures from the underlying writer.
pub fn render<W: Write>(channels: &[Channel], cfg: &RunConfig, out: &mut W) -> io::Result<()> {
    if let [channel] = channels {
        render_single(channel, cfg, out)?;
    } else {
        render_multi(channels, cfg, out)?;
    }
    writeln!(out)?;
    writeln!(out, "# end")?;
    Ok(())
}

fn render_single<W: Write>(channel: &Channel, cfg: &RunConfig, out: &mut W) -> io::Result<()> {
    let Some(first) = channel.series.first() else {
        return Ok(());
    };
    let first_ts = first.ts;
    writeln!(out)?;
    writeln!(
        out,
        "#   No  Time                          Relative Time             Value      Valid    Severity"
    )?;
    for (j, s) in channel.series.iter().enumerate() {
        writeln!(
            out,
            "{:6}   {:>20} {} {:12.3}  {:>16} {:>8} {:>10}",
            j,
            cfg.zone.format(s.ts),
            cfg.zone.label(s.ts),
            elapsed_secs(first_ts, s.ts),
            value_cell(Some(s)),
            if s.valid { "okay" } else { "no" },
            s.quality.to_string(),
        )?;
    }
    Ok(())
}

fn render_multi<W: Write>(channels: &[Channel], cfg: &RunConfig, out: &mut W) -> io::Result<()> {
    // Channels are numbered 1 to N for human consumption.
    for (i, channel) in channels.iter().enumerate() {
        writeln!(out, "# {:3} {}", i + 1, channel.name)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "#   No   Time                        Rel. Time    Values..."
    )?;

    let rows = channels
        .iter()
        .filter(|c| c.status == ChannelStatus::Okay)
        .map(|c| c.series.len())
        .max()
        .unwrap_or(0);
    let interval = cfg.fixed_interval.unwrap_or(1.0);

    for j in 0..rows {
        let cells: Vec<Option<&Sample>> = channels
            .iter()
            .map(|c| {
                if c.status == ChannelStatus::Okay {
                    c.series.get(j)
                } else {
                    None
                }
            })
            .collect();

        // Channel 0 is the reference clock; fall back to the shared grid
        // when it has no sample on this row.
        let ref_ts = cells
            .first()
            .copied()
            .flatten()
            .map_or_else(|| grid_time(cfg.global_start, interval, j), |s| s.ts);

        write!(
            out,
            "{:6}   {:>20} {} {:12.3} ",
            j,
            cfg.zone.format(ref_ts),
            cfg.zone.label(ref_ts),
            elapsed_secs(cfg.global_start, ref_ts),
        )?;
        for cell in &cells {
            write!(out, " {:>16}", value_cell(*cell))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn grid_time(start: DateTime<Utc>, interval_secs: f64, j: usize) -> DateTime<Utc> {
    start + Duration::milliseconds((j as f64 * interval_secs * 1000.0).round() as i64)
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

fn value_cell(sample: Option<&Sample>) -> String {
    match sample {
        Some(s) if s.is_displayable() => sci(s.value),
        _ => "nil".to_string(),
    }
}

/// Fixed-width scientific notation with a signed two-digit exponent,
/// e.g. `1.12345678e+00`.
fn sci(value: f64) -> String {
    let raw = format!("{value:.8e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => raw,
    }
}
