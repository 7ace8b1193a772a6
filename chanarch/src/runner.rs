//! Tokio driver for the retrieval state machine.
//!
//! One event per 100 ms tick; at most one page request in flight. The
//! driver never blocks inside a tick: page fetches run as a spawned task
//! whose completion is delivered as the next [`Event::Page`], and all
//! deadlines live inside the machine as tick counts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use chanarch_core::{ArchiveClient, ChanError, PageRequest, RunConfig};

use crate::machine::{Action, Event, Retrieval, TICK_MS};
use crate::report;

/// Drive one retrieval run to completion against `client`.
///
/// Returns `Ok(())` on normal completion. Fatal conditions (validation
/// failure, readiness or response timeout, report output failure) bubble
/// up as `Err`; the exit-code decision belongs to the caller.
///
/// # Errors
/// See [`ChanError`] for the fatal taxonomy.
pub async fn run(
    cfg: RunConfig,
    names: Vec<String>,
    client: Arc<dyn ArchiveClient>,
) -> Result<(), ChanError> {
    tracing::info!(archive = %client.describe(), "starting retrieval");

    let mut machine = Retrieval::new(cfg, names);
    let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut inflight: Option<JoinHandle<Event>> = None;

    loop {
        let event = match inflight.as_mut() {
            Some(handle) => {
                tokio::select! {
                    _ = interval.tick() => Event::Tick {
                        archiver_ready: client.is_ready(),
                    },
                    joined = handle => match joined {
                        Ok(event) => event,
                        Err(join_err) => Event::Page {
                            okay: false,
                            samples: Vec::new(),
                            diagnostic: join_err.to_string(),
                        },
                    },
                }
            }
            None => {
                interval.tick().await;
                Event::Tick {
                    archiver_ready: client.is_ready(),
                }
            }
        };
        if matches!(event, Event::Page { .. }) {
            inflight = None;
        }

        let (next, actions) = machine.handle(event);
        machine = next;

        for action in actions {
            match action {
                Action::RequestPage {
                    name,
                    start,
                    end,
                    max_points,
                    mode,
                } => {
                    let client = Arc::clone(&client);
                    inflight = Some(tokio::spawn(async move {
                        let req = PageRequest {
                            start,
                            end,
                            max_points,
                            mode,
                        };
                        match client.fetch_page(&name, req).await {
                            Ok(page) => Event::Page {
                                okay: page.okay,
                                samples: page.samples,
                                diagnostic: page.diagnostic,
                            },
                            // Transport failures become a failed page for
                            // this channel, not a fatal run error.
                            Err(e) => Event::Page {
                                okay: false,
                                samples: Vec::new(),
                                diagnostic: e.to_string(),
                            },
                        }
                    }));
                }
                Action::WriteReport => {
                    report::write_report(&machine.channels, &machine.cfg)?;
                }
                Action::Finished => {
                    tracing::info!("retrieval complete");
                    return Ok(());
                }
                Action::Fatal(e) => return Err(e),
            }
        }
    }
}
