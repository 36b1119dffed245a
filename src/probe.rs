//! Liveness probing of external links.
//!
//! One GET per link with a per-request timeout, at most `parallel_limit`
//! requests in flight across the batch (semaphore admission, no priority
//! queue). Any completed response is recorded with its status code and
//! content type — a 404 is a result, not a failure; only timeouts and
//! transport errors produce the `error` outcome. One request's timeout
//! never cancels another. Results are returned in input order regardless
//! of completion order.

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::json::save_json;
use crate::models::{ExternalLink, Location};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Status line and content type of a completed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseLog {
    pub status_code: u16,
    pub content_type: Option<String>,
}

/// Outcome of probing one link: a completed response, or the string
/// `"error"` for a timeout or transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeResponse {
    Response(ResponseLog),
    Error(ErrorMarker),
}

/// Serializes as the bare string `"error"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMarker {
    Error,
}

impl ProbeResponse {
    pub fn error() -> Self {
        ProbeResponse::Error(ErrorMarker::Error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProbeResponse::Error(_))
    }
}

/// Probe record for one link, as persisted to `links.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLinkLog {
    pub url: String,
    pub locations: Vec<Location>,
    /// Epoch seconds at request start.
    pub access_timestamp: i64,
    pub response: ProbeResponse,
}

/// Probe every link and return one log per link, in input order.
///
/// Each task writes only its own result slot; the batch completes when
/// every link has one. A single slow link costs at most its own timeout.
pub async fn probe_external_links(
    links: Vec<ExternalLink>,
    parallel_limit: usize,
    timeout: Duration,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<Vec<ExternalLinkLog>> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;
    let semaphore = Arc::new(Semaphore::new(parallel_limit));
    let total = links.len() as u64;
    let completed = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = links
        .into_iter()
        .map(|link| {
            let client = client.clone();
            let semaphore = Arc::clone(&semaphore);
            let reporter = Arc::clone(&reporter);
            let completed = Arc::clone(&completed);
            tokio::spawn(async move {
                // Closed only if the semaphore is dropped, which it is not.
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let log = probe_one(&client, link).await;
                let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.report(ProgressEvent::Probe { n, total });
                log
            })
        })
        .collect();

    let mut logs = Vec::with_capacity(handles.len());
    for handle in handles {
        logs.push(handle.await.context("Probe task panicked")?);
    }
    Ok(logs)
}

async fn probe_one(client: &reqwest::Client, link: ExternalLink) -> ExternalLinkLog {
    let access_timestamp = Utc::now().timestamp();
    let response = match client.get(&link.url).send().await {
        Ok(response) => {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(String::from);
            ProbeResponse::Response(ResponseLog {
                status_code: response.status().as_u16(),
                content_type,
            })
        }
        Err(_) => ProbeResponse::error(),
    };
    ExternalLinkLog {
        url: link.url,
        locations: link.locations,
        access_timestamp,
        response,
    }
}

/// Persist the probe log. Written only after the whole batch completed; no
/// partial writes.
pub fn save_probe_log(path: &Path, logs: &[ExternalLinkLog]) -> Result<()> {
    save_json(path, logs)
}
