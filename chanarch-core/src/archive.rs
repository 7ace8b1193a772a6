//! The archive-service collaborator interface.
//!
//! The retrieval engine treats the archive service as a black box behind
//! [`ArchiveClient`]: a cheap readiness snapshot plus one async paginated
//! fetch. Concrete connectors (`chanarch-appliance`, `chanarch-mock`)
//! implement this trait; the service's own retry/backoff policy is its
//! business, not ours.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChanError;
use crate::types::{Sample, SamplingMode};

/// One bounded request for a sub-range of the retrieval window.
///
/// Times are UTC regardless of the run's rendering zone; archivers work
/// in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Inclusive window start.
    pub start: DateTime<Utc>,
    /// Window end, already padded by the state machine.
    pub end: DateTime<Utc>,
    /// Cap on the number of points the response may carry.
    pub max_points: usize,
    /// Server-side retrieval mode.
    pub mode: SamplingMode,
}

/// One page of archive data.
#[derive(Debug, Clone, Default)]
pub struct PageResponse {
    /// Whether the service answered the request successfully.
    pub okay: bool,
    /// Time-ordered samples for the requested sub-range. May be empty.
    pub samples: Vec<Sample>,
    /// Free-form supplementary text from the service, logged verbatim.
    pub diagnostic: String,
}

/// A client of the external archive service.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Snapshot of service readiness. Must be cheap; connectors keep it
    /// current with a background probe rather than blocking here.
    fn is_ready(&self) -> bool;

    /// Fetch one page of history for `channel`.
    ///
    /// # Errors
    /// Transport-level failures surface as `Err`; the retrieval engine
    /// folds them into a failed page for the affected channel rather than
    /// aborting the run.
    async fn fetch_page(
        &self,
        channel: &str,
        req: PageRequest,
    ) -> Result<PageResponse, ChanError>;

    /// Human-readable description of the backing service, for logs.
    fn describe(&self) -> String;
}
