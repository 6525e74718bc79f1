pub mod semantic_scholar;
pub mod serpapi;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wall-clock budget for a single provider query.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

pub(crate) const USER_AGENT: &str = "scholar-citations/0.1";

/// Fail-soft result of a provider query. `citations` is only meaningful when `found` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub citations: u64,
    pub found: bool,
}

impl ProviderResult {
    pub fn found(citations: u64) -> Self {
        Self { citations, found: true }
    }

    pub fn not_found() -> Self {
        Self { citations: 0, found: false }
    }
}

/// What a provider positively learned about a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(u64),
    NotFound,
}

impl From<Lookup> for ProviderResult {
    fn from(lookup: Lookup) -> Self {
        match lookup {
            Lookup::Found(citations) => ProviderResult::found(citations),
            Lookup::NotFound => ProviderResult::not_found(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait CitationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn timeout(&self) -> Duration {
        PROVIDER_TIMEOUT
    }

    /// Query the upstream source. Errors stay inside the adapter; callers use
    /// [`CitationProvider::fetch_citations`].
    async fn lookup(&self, title: &str) -> Result<Lookup, ProviderError>;

    /// Never fails: timeouts and errors are logged and collapse to not-found.
    async fn fetch_citations(&self, title: &str) -> ProviderResult {
        let budget = self.timeout();
        let outcome = match tokio::time::timeout(budget, self.lookup(title)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(budget)),
        };

        match outcome {
            Ok(lookup) => {
                tracing::debug!("Provider {} answered {:?} for {:?}", self.name(), lookup, title);
                lookup.into()
            }
            Err(e) => {
                tracing::warn!("Provider {} failed for {:?}: {}", self.name(), title, e);
                ProviderResult::not_found()
            }
        }
    }
}

/// Coerce an upstream citation figure into a count. Negative, non-numeric or
/// missing values become 0.
pub fn normalize_count(value: Option<&serde_json::Value>) -> u64 {
    use serde_json::Value;

    match value {
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                u
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f > 0.0 { f.trunc() as u64 } else { 0 }
            } else {
                0
            }
        }
        Some(Value::String(s)) => {
            let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
            digits.parse::<u64>().unwrap_or(0)
        }
        _ => 0,
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
}
