//! Consumer side of the citation endpoint: a cache-first fetch wrapper that
//! always yields a usable number.

pub mod cache;
pub mod store;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::apis::USER_AGENT;
use crate::server::CITATIONS_ROUTE;
use cache::CitationCache;

/// Budget for one call to the citation endpoint.
pub const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a UI element shows for a paper. `error` is a soft diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationState {
    pub citations: u64,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl CitationState {
    fn loading(fallback: u64) -> Self {
        Self { citations: fallback, is_loading: true, error: None }
    }

    fn ready(citations: u64) -> Self {
        Self { citations, is_loading: false, error: None }
    }

    fn degraded(fallback: u64, error: String) -> Self {
        Self { citations: fallback, is_loading: false, error: Some(error) }
    }
}

#[derive(Deserialize)]
struct CitationResponse {
    citations: u64,
}

#[derive(Clone)]
pub struct CitationClient {
    http: reqwest::Client,
    endpoint: String,
    cache: CitationCache,
}

impl CitationClient {
    /// `base_url` is the API server origin, e.g. `http://localhost:3001`.
    pub fn new(base_url: &str, cache: CitationCache) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, cache, ENDPOINT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        cache: CitationCache,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()?,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CITATIONS_ROUTE),
            cache,
        })
    }

    /// Cache first, then the endpoint. Never fails: any problem yields
    /// `fallback` with the reason in `error`.
    pub async fn get_citations(&self, title: &str, fallback: u64) -> CitationState {
        if title.trim().is_empty() {
            return CitationState::ready(fallback);
        }

        if let Some(citations) = self.cache.get(title) {
            tracing::debug!("Cache hit for {:?}", title);
            return CitationState::ready(citations);
        }

        match self.fetch(title).await {
            Ok(citations) => {
                self.cache.put(title, citations);
                CitationState::ready(citations)
            }
            Err(e) => {
                tracing::warn!("Citation fetch failed for {:?}, using {}: {}", title, fallback, e);
                CitationState::degraded(fallback, e)
            }
        }
    }

    async fn fetch(&self, title: &str) -> Result<u64, String> {
        let resp = self.http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await
            .map_err(|e| if e.is_timeout() {
                format!("request timed out: {e}")
            } else {
                format!("request failed: {e}")
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("endpoint returned {status}"));
        }

        let body = resp.text().await.map_err(|e| format!("reading body: {e}"))?;
        let parsed: CitationResponse =
            serde_json::from_str(&body).map_err(|e| format!("malformed response: {e}"))?;
        Ok(parsed.citations)
    }

    /// Run a lookup in the background. The handle starts out loading and the
    /// task is aborted when the handle is dropped.
    pub fn spawn_lookup(&self, title: impl Into<String>, fallback: u64) -> LookupHandle {
        let title = title.into();
        let initial = if title.trim().is_empty() {
            CitationState::ready(fallback)
        } else {
            CitationState::loading(fallback)
        };
        let (tx, rx) = watch::channel(initial);

        let client = self.clone();
        let task = tokio::spawn(async move {
            let state = client.get_citations(&title, fallback).await;
            let _ = tx.send(state);
        });

        LookupHandle { rx, task }
    }
}

pub struct LookupHandle {
    rx: watch::Receiver<CitationState>,
    task: JoinHandle<()>,
}

impl LookupHandle {
    pub fn state(&self) -> CitationState {
        self.rx.borrow().clone()
    }

    /// Wait until the lookup is no longer loading.
    pub async fn settled(&mut self) -> CitationState {
        if let Ok(state) = self.rx.wait_for(|state| !state.is_loading).await {
            return state.clone();
        }
        // Sender gone without settling: report whatever was last published.
        self.rx.borrow().clone()
    }
}

impl Drop for LookupHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
