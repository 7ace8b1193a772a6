//! The retrieval state machine.
//!
//! Pure and tick-driven: the driver feeds one [`Event`] per tick (or a
//! page arrival) and executes the returned [`Action`]s. All timeouts are
//! tick counts, never sleeps, so tests can step the machine to any state
//! without a runtime or a clock.

use chrono::{DateTime, Duration, Utc};

use chanarch_core::{
    ChanError, Channel, ChannelStatus, MAX_POINTS_PER_PAGE, RunConfig, Sample, SamplingMode,
    merge_page, post_process,
};

/// Tick period of the driver, in milliseconds.
pub const TICK_MS: u64 = 100;

/// Settling delay before the first readiness probe, in seconds.
const SETTLE_SECS: f64 = 20.0;
/// How long to wait for the archiver interface to become ready.
const READY_TIMEOUT_SECS: f64 = 60.0;
/// How long to wait for each page response.
const RESPONSE_TIMEOUT_SECS: f64 = 60.0;

/// Convert a wall-clock delay into a tick count (rounded up, at least 1).
fn ticks(seconds: f64) -> u32 {
    let t = ((seconds * 1000.0) / TICK_MS as f64).ceil() as u32;
    t.max(1)
}

/// Retrieval progresses through these states, one transition per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Validate configuration.
    Setup,
    /// Fixed settling delay before probing the archiver.
    InitialDelay,
    /// Poll the readiness predicate until ready or timed out.
    AwaitReady,
    /// Reset the cursor and select the next pending channel.
    BeginChannel,
    /// Issue one paginated request for the current channel.
    SendPage,
    /// Count down the response deadline for the in-flight page.
    AwaitPage,
    /// Emit the report.
    Finalize,
    /// Normal completion.
    Done,
    /// Fatal termination; the fatal action has already been emitted.
    ErrorExit,
}

/// Inputs to the machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// One driver tick, carrying a snapshot of the readiness predicate.
    Tick {
        /// `ArchiveClient::is_ready()` at the time of the tick.
        archiver_ready: bool,
    },
    /// A page response (or folded transport failure) for the current channel.
    Page {
        /// Whether the service answered successfully.
        okay: bool,
        /// Samples carried by the page.
        samples: Vec<Sample>,
        /// Supplementary text from the service.
        diagnostic: String,
    },
}

/// Outputs the driver must execute.
#[derive(Debug)]
pub enum Action {
    /// Issue one paginated archive request.
    RequestPage {
        /// Channel name to query.
        name: String,
        /// Inclusive UTC window start.
        start: DateTime<Utc>,
        /// Padded UTC window end.
        end: DateTime<Utc>,
        /// Point cap for the page.
        max_points: usize,
        /// Server-side retrieval mode.
        mode: SamplingMode,
    },
    /// All channels terminal: render the report.
    WriteReport,
    /// The run completed; the driver should return success.
    Finished,
    /// Fatal condition; the driver should surface the error.
    Fatal(ChanError),
}

/// The retrieval state machine for one run.
#[derive(Debug)]
pub struct Retrieval {
    /// Run configuration; normalised by the `Setup` transition.
    pub cfg: RunConfig,
    /// Fixed ordered channel list, established at construction.
    pub channels: Vec<Channel>,
    /// Current state.
    pub state: State,
    /// Index of the channel currently being retrieved.
    pub index: usize,
    /// Watermark of the requested window satisfied for the current channel.
    pub cursor: DateTime<Utc>,
    /// Ticks remaining on the current deadline.
    pub timeout: u32,
}

impl Retrieval {
    /// New machine in `Setup` for the given configuration and channel names.
    #[must_use]
    pub fn new(cfg: RunConfig, names: Vec<String>) -> Self {
        let cursor = cfg.global_start;
        let channels = names.into_iter().map(Channel::new).collect();
        Self {
            cfg,
            channels,
            state: State::Setup,
            index: 0,
            cursor,
            timeout: 0,
        }
    }

    /// Advance by one event, returning the successor machine and the
    /// actions the driver must execute.
    #[must_use]
    pub fn handle(mut self, event: Event) -> (Self, Vec<Action>) {
        match (self.state, event) {
            (State::Setup, Event::Tick { .. }) => {
                match self.cfg.clone().validated(self.channels.len()) {
                    Ok(cfg) => {
                        tracing::info!(
                            start = %cfg.zone.format(cfg.global_start),
                            end = %cfg.zone.format(cfg.global_end),
                            zone = %cfg.zone.label(cfg.global_start),
                            "retrieval window"
                        );
                        self.cfg = cfg;
                        self.timeout = ticks(SETTLE_SECS);
                        self.state = State::InitialDelay;
                        (self, Vec::new())
                    }
                    Err(e) => {
                        self.state = State::ErrorExit;
                        (self, vec![Action::Fatal(e)])
                    }
                }
            }

            (State::InitialDelay, Event::Tick { .. }) => {
                self.timeout -= 1;
                if self.timeout == 0 {
                    self.timeout = ticks(READY_TIMEOUT_SECS);
                    self.state = State::AwaitReady;
                }
                (self, Vec::new())
            }

            (State::AwaitReady, Event::Tick { archiver_ready }) => {
                if archiver_ready {
                    tracing::info!("archiver interface ready");
                    self.state = State::BeginChannel;
                    return (self, Vec::new());
                }
                self.timeout -= 1;
                if self.timeout == 0 {
                    self.state = State::ErrorExit;
                    return (
                        self,
                        vec![Action::Fatal(ChanError::ReadinessTimeout {
                            seconds: READY_TIMEOUT_SECS as u64,
                        })],
                    );
                }
                if self.timeout == 40 || self.timeout == 20 {
                    tracing::warn!("still awaiting archiver interface initialisation");
                }
                (self, Vec::new())
            }

            (State::BeginChannel, Event::Tick { .. }) => {
                self.cursor = self.cfg.global_start;
                while self.index < self.channels.len()
                    && self.channels[self.index].status != ChannelStatus::Pending
                {
                    self.index += 1;
                }
                self.state = if self.index < self.channels.len() {
                    State::SendPage
                } else {
                    State::Finalize
                };
                (self, Vec::new())
            }

            (State::SendPage, Event::Tick { .. }) => {
                // Pad by 5% and floor at 60 s to tolerate server-side
                // rounding and degenerate zero-length windows.
                let remaining =
                    (self.cfg.global_end - self.cursor).num_milliseconds() as f64 / 1000.0;
                let pad_secs = (remaining * 1.05).max(60.0);
                let end = self.cursor + Duration::milliseconds((pad_secs * 1000.0).round() as i64);
                let name = self.channels[self.index].name.clone();
                tracing::info!(
                    channel = %name,
                    from = %self.cfg.zone.format(self.cursor),
                    to = %self.cfg.zone.format(end),
                    "archive request issued"
                );
                self.timeout = ticks(RESPONSE_TIMEOUT_SECS);
                self.state = State::AwaitPage;
                let action = Action::RequestPage {
                    name,
                    start: self.cursor,
                    end,
                    max_points: MAX_POINTS_PER_PAGE,
                    mode: self.cfg.mode,
                };
                (self, vec![action])
            }

            (State::AwaitPage, Event::Tick { .. }) => {
                self.timeout -= 1;
                if self.timeout == 0 {
                    let channel = self.channels[self.index].name.clone();
                    self.state = State::ErrorExit;
                    return (
                        self,
                        vec![Action::Fatal(ChanError::ResponseTimeout {
                            channel,
                            seconds: RESPONSE_TIMEOUT_SECS as u64,
                        })],
                    );
                }
                if self.timeout == 40 || self.timeout == 20 {
                    tracing::warn!(
                        channel = %self.channels[self.index].name,
                        "still awaiting archiver response"
                    );
                }
                (self, Vec::new())
            }

            (
                State::AwaitPage,
                Event::Page {
                    okay,
                    samples,
                    diagnostic,
                },
            ) => self.on_page(okay, samples, &diagnostic),

            (State::Finalize, Event::Tick { .. }) => {
                self.state = State::Done;
                (self, vec![Action::WriteReport])
            }

            (State::Done, Event::Tick { .. }) => (self, vec![Action::Finished]),

            (State::ErrorExit, _) => (self, Vec::new()),

            // A page arriving in any other state has no current channel to
            // fold into; drop it.
            (_, Event::Page { .. }) => (self, Vec::new()),
        }
    }

    fn on_page(mut self, okay: bool, samples: Vec<Sample>, diagnostic: &str) -> (Self, Vec<Action>) {
        let multi = self.channels.len() > 1;
        let pre_cursor = self.cursor;
        let channel = &mut self.channels[self.index];
        channel.page_count += 1;
        tracing::info!(
            channel = %channel.name,
            status = if okay { "okay" } else { "failed" },
            points = samples.len(),
            diagnostic,
            "archive response received"
        );

        let mut complete = true;
        if okay && !samples.is_empty() {
            channel.status = ChannelStatus::Okay;
            let accumulated = std::mem::take(&mut channel.series);
            channel.series = merge_page(accumulated, samples);
            if let Some(last) = channel.series.last() {
                let last_ts = last.ts;
                if self.cfg.mode == SamplingMode::Raw && last_ts < self.cfg.global_end {
                    if last_ts > pre_cursor {
                        tracing::info!(channel = %channel.name, "requesting more data");
                        self.cursor = last_ts;
                        complete = false;
                    } else {
                        // No forward progress: force-complete rather than
                        // loop on the same window.
                        tracing::debug!(channel = %channel.name, "page made no forward progress");
                    }
                }
            }
        }

        if complete {
            post_process(channel, &self.cfg, multi);
            if channel.status == ChannelStatus::Pending {
                channel.status = ChannelStatus::Failed;
            }
            self.index += 1;
            self.state = if self.index < self.channels.len() {
                State::BeginChannel
            } else {
                State::Finalize
            };
        } else {
            self.state = State::SendPage;
        }
        (self, Vec::new())
    }
}
