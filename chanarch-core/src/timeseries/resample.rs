use chrono::{DateTime, Duration, Utc};

use crate::types::Sample;

/// Resample a series onto a uniform grid under the step-hold policy.
///
/// The grid starts at the first sample's timestamp and runs to `end`
/// inclusive with spacing `interval_secs`. Each grid point carries the
/// last real sample at or before it: value, validity flag, and quality
/// together, so a gap after data loss propagates as invalid rather than
/// stale-but-valid. An empty input yields an empty output.
#[must_use]
pub fn resample_step_hold(
    samples: &[Sample],
    interval_secs: f64,
    end: DateTime<Utc>,
) -> Vec<Sample> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };

    // Work in whole milliseconds so the grid cannot drift.
    let step_ms = ((interval_secs * 1000.0).round() as i64).max(1);

    let mut out = Vec::new();
    let mut held = 0usize;
    let mut offset_ms: i64 = 0;
    loop {
        let ts = first.ts + Duration::milliseconds(offset_ms);
        if ts > end {
            break;
        }
        while held + 1 < samples.len() && samples[held + 1].ts <= ts {
            held += 1;
        }
        out.push(Sample { ts, ..samples[held] });
        offset_ms += step_ms;
    }
    out
}

/// Drop trailing samples past the requested window end.
///
/// Repeatedly removes the last sample while the second-to-last timestamp
/// is still at or past `end`, but never reduces the series below 2
/// samples: raw mode preserves server-native boundaries, so the sample
/// straddling `end` stays.
pub fn trim_trailing(series: &mut Vec<Sample>, end: DateTime<Utc>) {
    while series.len() > 2 {
        let penultimate = series[series.len() - 2].ts;
        if penultimate < end {
            break;
        }
        series.pop();
    }
}
