//! The data model: samples, channels, and the run configuration.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::ChanError;

/// Upper bound on the number of channels a single run may query.
pub const MAX_CHANNELS: usize = 20;

/// Maximum number of points requested per archive page.
pub const MAX_POINTS_PER_PAGE: usize = 20_000;

/// Smallest permitted fixed resample interval, in seconds.
pub const MIN_FIXED_INTERVAL: f64 = 0.25;

/// Archiver quality attached to each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// No alarm condition.
    Good,
    /// The archiver marked the point invalid; its value is meaningless.
    Invalid,
    /// Any other archiver severity code.
    Severity(u16),
}

impl Quality {
    /// Whether a value carrying this quality may be rendered as a number.
    #[must_use]
    pub const fn is_displayable(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Invalid => write!(f, "invalid"),
            Self::Severity(code) => write!(f, "sev({code})"),
        }
    }
}

/// One timestamped observation retrieved from the archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Observation time. Always stored in UTC; the run's [`TimeZoneMode`]
    /// applies at rendering only.
    pub ts: DateTime<Utc>,
    /// Observed value.
    pub value: f64,
    /// Whether the value was valid at observation time.
    pub valid: bool,
    /// Archiver quality/severity for the observation.
    pub quality: Quality,
}

impl Sample {
    /// Whether this sample should be rendered as a number rather than `nil`.
    #[must_use]
    pub const fn is_displayable(&self) -> bool {
        self.valid && self.quality.is_displayable()
    }

    /// Synthetic invalid sample used to pad aligned multi-channel grids.
    #[must_use]
    pub fn placeholder(ts: DateTime<Utc>) -> Self {
        Self {
            ts,
            value: 0.0,
            valid: false,
            quality: Quality::Invalid,
        }
    }
}

/// Retrieval outcome for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelStatus {
    /// Not yet retrieved.
    #[default]
    Pending,
    /// At least one successful non-empty page was received.
    Okay,
    /// Retrieval completed without any usable data.
    Failed,
}

/// One named data channel and its accumulated series.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel (process variable) name as known to the archive service.
    pub name: String,
    /// Retrieval outcome.
    pub status: ChannelStatus,
    /// Number of pages received for this channel, successful or not.
    pub page_count: u32,
    /// Reconciled, time-ordered series. No duplicate timestamps.
    pub series: Vec<Sample>,
}

impl Channel {
    /// New pending channel with an empty series.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ChannelStatus::Pending,
            page_count: 0,
            series: Vec::new(),
        }
    }
}

/// Time zone used for rendered timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeZoneMode {
    /// Render in the host's local zone.
    #[default]
    Local,
    /// Render in UTC.
    Utc,
}

impl TimeZoneMode {
    /// Render `ts` in this zone using the report's `dd/mm/yyyy HH:MM:SS` form.
    #[must_use]
    pub fn format(self, ts: DateTime<Utc>) -> String {
        match self {
            Self::Utc => ts.format("%d/%m/%Y %H:%M:%S").to_string(),
            Self::Local => ts
                .with_timezone(&Local)
                .format("%d/%m/%Y %H:%M:%S")
                .to_string(),
        }
    }

    /// Short zone label appended after rendered timestamps.
    #[must_use]
    pub fn label(self, ts: DateTime<Utc>) -> String {
        match self {
            Self::Utc => "UTC".to_string(),
            Self::Local => ts.with_timezone(&Local).format("%z").to_string(),
        }
    }
}

/// Server-side retrieval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplingMode {
    /// Server-native samples; the client paginates until the window is covered.
    Raw,
    /// Server-side linear reduction; one request satisfies the window.
    #[default]
    Linear,
}

/// Immutable per-run configuration, fixed after [`RunConfig::validated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Zone for rendered timestamps.
    pub zone: TimeZoneMode,
    /// Server-side retrieval mode.
    pub mode: SamplingMode,
    /// Fixed resample interval in seconds, when requested (or forced).
    pub fixed_interval: Option<f64>,
    /// Report destination.
    pub output_path: PathBuf,
    /// Start of the requested window.
    pub global_start: DateTime<Utc>,
    /// End of the requested window.
    pub global_end: DateTime<Utc>,
}

impl RunConfig {
    /// Validate and normalise the configuration for `channel_count` channels.
    ///
    /// Clamps a sub-minimum fixed interval up to [`MIN_FIXED_INTERVAL`] and
    /// forces a 1.0 s interval for multi-channel runs, both with a warning.
    ///
    /// # Errors
    /// Returns `ChanError::Config` for an inverted window, an empty channel
    /// list, or more than [`MAX_CHANNELS`] channels.
    pub fn validated(mut self, channel_count: usize) -> Result<Self, ChanError> {
        if channel_count == 0 {
            return Err(ChanError::config("no channel names supplied"));
        }
        if channel_count > MAX_CHANNELS {
            return Err(ChanError::config(format!(
                "at most {MAX_CHANNELS} channels supported, got {channel_count}"
            )));
        }
        if self.global_start >= self.global_end {
            return Err(ChanError::config(format!(
                "start time {} is not before end time {}",
                self.zone.format(self.global_start),
                self.zone.format(self.global_end)
            )));
        }
        if let Some(interval) = self.fixed_interval {
            if !interval.is_finite() || interval <= 0.0 {
                return Err(ChanError::config(format!(
                    "fixed interval must be a positive number of seconds, got {interval}"
                )));
            }
            if interval < MIN_FIXED_INTERVAL {
                tracing::warn!(
                    requested = interval,
                    "fixed interval limited to no less than {MIN_FIXED_INTERVAL} seconds"
                );
                self.fixed_interval = Some(MIN_FIXED_INTERVAL);
            }
        } else if channel_count > 1 {
            // Row alignment across channels needs a shared grid.
            tracing::warn!("multiple channels - auto selecting fixed interval of 1.0 s");
            self.fixed_interval = Some(1.0);
        }
        Ok(self)
    }
}
