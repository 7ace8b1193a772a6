use crate::types::Sample;

/// Fold one response page into a channel's accumulated series.
///
/// - An empty `existing` series yields `incoming` verbatim.
/// - Otherwise every leading `incoming` sample whose timestamp is at or
///   before the last accumulated timestamp is dropped (pages overlap at
///   the cursor), and the remainder is appended.
///
/// Idempotent under re-application of an empty or fully-overlapping page,
/// and the result is strictly increasing in timestamp whenever both inputs
/// are.
#[must_use]
pub fn merge_page(existing: Vec<Sample>, incoming: Vec<Sample>) -> Vec<Sample> {
    let Some(last) = existing.last() else {
        return incoming;
    };
    let last_ts = last.ts;
    let mut merged = existing;
    merged.extend(incoming.into_iter().skip_while(|s| s.ts <= last_ts));
    merged
}

// Inline tests omitted; covered by property tests in `chanarch-core/tests/`.
