use crate::timeseries::resample::{resample_step_hold, trim_trailing};
use crate::types::{Channel, RunConfig, Sample};

/// Post-process one channel after its retrieval completes.
///
/// - Fixed interval, single channel: resample in place onto a uniform grid
///   starting at the series' own first timestamp and ending at the window
///   end.
/// - Fixed interval, multiple channels (`multi`): prepend a synthetic
///   invalid sample at exactly the window start before resampling, so every
///   channel's grid shares the same origin and the report rows align.
/// - No fixed interval (raw mode): trim trailing samples past the window
///   end instead.
pub fn post_process(channel: &mut Channel, cfg: &RunConfig, multi: bool) {
    if let Some(interval) = cfg.fixed_interval {
        let before = channel.series.len();
        let mut working = std::mem::take(&mut channel.series);
        if multi {
            working.insert(0, Sample::placeholder(cfg.global_start));
        }
        channel.series = resample_step_hold(&working, interval, cfg.global_end);
        tracing::info!(
            channel = %channel.name,
            before,
            after = channel.series.len(),
            "resampled"
        );
    } else {
        trim_trailing(&mut channel.series, cfg.global_end);
    }
}
