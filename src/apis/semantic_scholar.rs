use super::{build_http_client, normalize_count, read_json, CitationProvider, Lookup, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

const FIELDS: &str = "title,citationCount";

/// Free title search against the Semantic Scholar graph API.
pub struct SemanticScholarClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl SemanticScholarClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, timeout, BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
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

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[derive(Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<S2Paper>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    citation_count: Option<serde_json::Value>,
}

fn parse_search(resp: S2SearchResponse) -> Lookup {
    match resp.data.unwrap_or_default().into_iter().next() {
        Some(paper) => Lookup::Found(normalize_count(paper.citation_count.as_ref())),
        None => Lookup::NotFound,
    }
}

#[async_trait]
impl CitationProvider for SemanticScholarClient {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn lookup(&self, title: &str) -> Result<Lookup, ProviderError> {
        let url = format!("{}/paper/search", self.base_url);
        let resp = self.add_auth(
            self.client.get(&url)
                .query(&[
                    ("query", title),
                    ("limit", "1"),
                    ("fields", FIELDS),
                ])
        ).send().await?;
        Ok(parse_search(read_json(resp).await?))
    }
}
