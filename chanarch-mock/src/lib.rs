//! chanarch-mock
//!
//! Deterministic [`ArchiveClient`] for tests and examples: pages are
//! scripted per channel ahead of the run, readiness can be delayed by a
//! poll count, and every request is logged for assertions. No timers, no
//! network; `fetch_page` resolves immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chanarch_core::{ArchiveClient, ChanError, PageRequest, PageResponse, Sample};

/// One scripted answer to a `fetch_page` call.
#[derive(Debug, Clone)]
pub enum ScriptedPage {
    /// Successful page carrying these samples.
    Data(Vec<Sample>),
    /// Successful page with no samples.
    Empty,
    /// Failed request with this diagnostic.
    Fail(String),
}

/// Scripted archive client.
///
/// Pages are consumed front to back per channel; once a channel's script
/// is exhausted, further requests answer as successful-but-empty, which a
/// retrieval run treats as end of data.
pub struct MockArchive {
    ready_after: usize,
    polls: AtomicUsize,
    scripts: Mutex<HashMap<String, VecDeque<ScriptedPage>>>,
    requests: Mutex<Vec<(String, PageRequest)>>,
}

impl Default for MockArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArchive {
    /// Mock that reports ready from the first poll.
    #[must_use]
    pub fn new() -> Self {
        Self::ready_after(0)
    }

    /// Mock that reports not-ready for the first `polls` readiness checks.
    #[must_use]
    pub fn ready_after(polls: usize) -> Self {
        Self {
            ready_after: polls,
            polls: AtomicUsize::new(0),
            scripts: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful page of `samples` for `channel`.
    pub fn script_page(&self, channel: &str, samples: Vec<Sample>) {
        self.push(channel, ScriptedPage::Data(samples));
    }

    /// Queue a successful empty page for `channel`.
    pub fn script_empty(&self, channel: &str) {
        self.push(channel, ScriptedPage::Empty);
    }

    /// Queue a failed request for `channel`.
    pub fn script_failure(&self, channel: &str, msg: &str) {
        self.push(channel, ScriptedPage::Fail(msg.to_string()));
    }

    /// Every request seen so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<(String, PageRequest)> {
        self.requests.lock().expect("mock request log poisoned").clone()
    }

    fn push(&self, channel: &str, page: ScriptedPage) {
        self.scripts
            .lock()
            .expect("mock script table poisoned")
            .entry(channel.to_string())
            .or_default()
            .push_back(page);
    }
}

#[async_trait]
impl ArchiveClient for MockArchive {
    fn is_ready(&self) -> bool {
        self.polls.fetch_add(1, Ordering::Relaxed) >= self.ready_after
    }

    async fn fetch_page(
        &self,
        channel: &str,
        req: PageRequest,
    ) -> Result<PageResponse, ChanError> {
        self.requests
            .lock()
            .expect("mock request log poisoned")
            .push((channel.to_string(), req));

        let next = self
            .scripts
            .lock()
            .expect("mock script table poisoned")
            .get_mut(channel)
            .and_then(VecDeque::pop_front)
            .unwrap_or(ScriptedPage::Empty);

        Ok(match next {
            ScriptedPage::Data(samples) => PageResponse {
                okay: true,
                samples,
                diagnostic: "scripted page".to_string(),
            },
            ScriptedPage::Empty => PageResponse {
                okay: true,
                samples: Vec::new(),
                diagnostic: "script exhausted".to_string(),
            },
            ScriptedPage::Fail(msg) => PageResponse {
                okay: false,
                samples: Vec::new(),
                diagnostic: msg,
            },
        })
    }

    fn describe(&self) -> String {
        "chanarch-mock (scripted)".to_string()
    }
}
