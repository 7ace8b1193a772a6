//! chanarch
//!
//! The retrieval engine: a tick-driven state machine that polls an archive
//! service channel by channel and page by page, reconciles the paginated
//! responses into gap-free series, post-processes them onto a uniform grid,
//! and renders the result as an aligned table.
//!
//! The state machine itself ([`machine::Retrieval`]) is pure: it consumes
//! [`machine::Event`]s and returns [`machine::Action`]s, so every
//! transition can be driven directly in tests. The tokio driver
//! ([`runner::run`]) feeds it one event per 100 ms tick and executes the
//! actions against an [`chanarch_core::ArchiveClient`].
#![warn(missing_docs)]

/// The pure retrieval state machine.
pub mod machine;
/// Table rendering for reconciled channel series.
pub mod report;
/// Tokio tick driver that executes the state machine against a client.
pub mod runner;

pub use machine::{Action, Event, Retrieval, State, TICK_MS};
pub use report::{render, write_report};
pub use runner::run;
