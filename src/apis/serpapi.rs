use super::{build_http_client, normalize_count, read_json, CitationProvider, Lookup, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://serpapi.com";

/// Google search via SerpApi, restricted to scholar.google.com. Requires an API key.
pub struct SerpApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl SerpApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, timeout, BASE_URL)
    }

    pub fn with_base_url(
        api_key: String,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[derive(Deserialize)]
struct SerpResponse {
    error: Option<String>,
    organic_results: Option<Vec<OrganicResult>>,
}

#[derive(Deserialize)]
struct OrganicResult {
    inline_links: Option<InlineLinks>,
}

#[derive(Deserialize)]
struct InlineLinks {
    cited_by: Option<CitedBy>,
}

#[derive(Deserialize)]
struct CitedBy {
    // Kept loose so string or negative totals are normalized rather than rejected.
    total: Option<serde_json::Value>,
}

/// First organic result wins; its "cited by" total is the count.
fn parse_search(resp: SerpResponse) -> Result<Lookup, ProviderError> {
    if let Some(err) = resp.error {
        // SerpApi reports "no results" through the error field with a 200.
        if err.contains("hasn't returned any results") {
            return Ok(Lookup::NotFound);
        }
        return Err(ProviderError::Parse(err));
    }

    let first = resp.organic_results.unwrap_or_default().into_iter().next();
    Ok(match first {
        Some(result) => {
            let total = result
                .inline_links
                .and_then(|links| links.cited_by)
                .and_then(|cited_by| cited_by.total);
            Lookup::Found(normalize_count(total.as_ref()))
        }
        None => Lookup::NotFound,
    })
}

#[async_trait]
impl CitationProvider for SerpApiClient {
    fn name(&self) -> &str { "serpapi" }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn lookup(&self, title: &str) -> Result<Lookup, ProviderError> {
        let q = format!("\"{}\" site:scholar.google.com", title);
        let resp = self.client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", q.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send().await?;
        parse_search(read_json(resp).await?)
    }
}
