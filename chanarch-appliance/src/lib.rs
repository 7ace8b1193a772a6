//! chanarch-appliance
//!
//! Concrete [`ArchiveClient`] backed by an EPICS Archiver Appliance style
//! JSON retrieval endpoint (`<base>/data/getData.json`).
//!
//! Readiness is maintained by a background probe against the appliance
//! version endpoint, so `is_ready` stays a cheap atomic snapshot the way
//! the retrieval engine expects. Construct the client inside a tokio
//! runtime.
#![warn(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;

use chanarch_core::{
    ArchiveClient, ChanError, PageRequest, PageResponse, Quality, Sample, SamplingMode,
};

const PROBE_PERIOD: Duration = Duration::from_millis(500);

/// HTTP client for one archiver appliance.
pub struct ApplianceClient {
    base: String,
    http: reqwest::Client,
    ready: Arc<AtomicBool>,
}

impl ApplianceClient {
    /// Client for the appliance rooted at `base_url` (e.g.
    /// `http://archiver:17668/retrieval`). Spawns the readiness probe, so
    /// a tokio runtime must be current.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::new();
        let ready = Arc::new(AtomicBool::new(false));

        let probe_base = base.clone();
        let probe_http = http.clone();
        let probe_ready = Arc::clone(&ready);
        tokio::spawn(async move {
            let url = format!("{probe_base}/bpl/getVersion");
            loop {
                match probe_http.get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        tracing::info!(appliance = %probe_base, "archiver appliance reachable");
                        probe_ready.store(true, Ordering::Release);
                        return;
                    }
                    Ok(resp) => {
                        tracing::debug!(status = %resp.status(), "appliance probe rejected");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "appliance probe failed");
                    }
                }
                tokio::time::sleep(PROBE_PERIOD).await;
            }
        });

        Self { base, http, ready }
    }

    /// The PV expression sent to the appliance for this retrieval mode.
    ///
    /// `Raw` asks for server-native events; `Linear` delegates reduction to
    /// the appliance's `optimized` post-processor, bounded by the page's
    /// point cap.
    fn pv_expression(channel: &str, req: &PageRequest) -> String {
        match req.mode {
            SamplingMode::Raw => channel.to_string(),
            SamplingMode::Linear => format!("optimized_{}({})", req.max_points, channel),
        }
    }
}

#[async_trait]
impl ArchiveClient for ApplianceClient {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn fetch_page(
        &self,
        channel: &str,
        req: PageRequest,
    ) -> Result<PageResponse, ChanError> {
        let url = format!("{}/data/getData.json", self.base);
        let pv = Self::pv_expression(channel, &req);
        let from = req.start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let to = req.end.to_rfc3339_opts(SecondsFormat::Millis, true);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("pv", pv.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ChanError::archive(channel, e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ChanError::archive(
                channel,
                format!("appliance answered HTTP {}", resp.status()),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ChanError::archive(channel, e.to_string()))?;
        let payloads: Vec<PvPayload> = serde_json::from_str(&body)
            .map_err(|e| ChanError::data(format!("unparseable appliance payload: {e}")))?;

        let mut samples: Vec<Sample> = payloads
            .into_iter()
            .flat_map(|p| p.data)
            .filter_map(EventRow::into_sample)
            .collect();
        samples.sort_by_key(|s| s.ts);
        samples.truncate(req.max_points);

        let diagnostic = format!("{} events from appliance", samples.len());
        Ok(PageResponse {
            okay: true,
            samples,
            diagnostic,
        })
    }

    fn describe(&self) -> String {
        format!("archiver appliance at {}", self.base)
    }
}

#[derive(Debug, Deserialize)]
struct PvPayload {
    #[serde(default)]
    data: Vec<EventRow>,
}

/// One archived event as the appliance serialises it.
#[derive(Debug, Deserialize)]
struct EventRow {
    secs: i64,
    #[serde(default)]
    nanos: u32,
    val: f64,
    #[serde(default)]
    severity: u16,
}

impl EventRow {
    fn into_sample(self) -> Option<Sample> {
        let ts = DateTime::from_timestamp(self.secs, self.nanos)?;
        let quality = match self.severity {
            0 => Quality::Good,
            3 => Quality::Invalid,
            code => Quality::Severity(code),
        };
        Some(Sample {
            ts,
            value: self.val,
            valid: quality != Quality::Invalid,
            quality,
        })
    }
}
