use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::apis::{self, CitationProvider, ProviderError, PROVIDER_TIMEOUT};

const DEFAULT_PORT: u16 = 3001;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub serpapi_api_key: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    pub provider_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            serpapi_api_key: None,
            semantic_scholar_api_key: None,
            provider_timeout: PROVIDER_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = match std::env::var("SCHOLAR_CITATIONS_ADDR") {
            Ok(raw) => raw.parse::<SocketAddr>().unwrap_or_else(|e| {
                tracing::warn!("Invalid SCHOLAR_CITATIONS_ADDR {:?}: {}, using {}", raw, e, defaults.bind_addr);
                defaults.bind_addr
            }),
            Err(_) => defaults.bind_addr,
        };

        let provider_timeout = match std::env::var("CITATION_PROVIDER_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!("Invalid CITATION_PROVIDER_TIMEOUT_SECS {:?}, using default", raw);
                    defaults.provider_timeout
                }
            },
            Err(_) => defaults.provider_timeout,
        };

        Self {
            bind_addr,
            serpapi_api_key: non_empty_var("SERPAPI_API_KEY"),
            semantic_scholar_api_key: non_empty_var("SEMANTIC_SCHOLAR_API_KEY"),
            provider_timeout,
        }
    }

    /// Build the single network provider for this process. A SerpApi key selects
    /// the primary provider; otherwise the free Semantic Scholar search is used.
    pub fn build_provider(&self) -> Result<Arc<dyn CitationProvider>, ProviderError> {
        let provider: Arc<dyn CitationProvider> = match &self.serpapi_api_key {
            Some(key) => Arc::new(apis::serpapi::SerpApiClient::new(
                key.clone(),
                self.provider_timeout,
            )?),
            None => Arc::new(apis::semantic_scholar::SemanticScholarClient::new(
                self.semantic_scholar_api_key.clone(),
                self.provider_timeout,
            )?),
        };
        Ok(provider)
    }

    /// Describe the provider selection, for startup logs and the health route.
    pub fn provider_status(&self) -> ProviderStatus {
        match self.serpapi_api_key {
            Some(_) => ProviderStatus {
                provider: "serpapi".into(),
                note: "SERPAPI_API_KEY set".into(),
            },
            None => ProviderStatus {
                provider: "semantic_scholar".into(),
                note: if self.semantic_scholar_api_key.is_some() {
                    "No SerpApi key, Semantic Scholar API key set".into()
                } else {
                    "No SerpApi key, Semantic Scholar without key (rate limited)".into()
                },
            },
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub note: String,
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
