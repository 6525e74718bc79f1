use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::apis::{CitationProvider, ProviderError};
use crate::config::Config;
use crate::fallback::{FallbackLookup, StaticFallbackTable};

/// Final answer for a title, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub citations: u64,
    pub title: String,
    pub found: bool,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Missing or invalid title parameter")]
    InvalidTitle,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProviderError> for ResolveError {
    fn from(e: ProviderError) -> Self {
        ResolveError::Internal(e.to_string())
    }
}

/// Walks the degradation ladder for one title: the configured provider, then
/// the static table, then zero. Each tier is tried at most once.
#[derive(Clone)]
pub struct Resolver {
    provider: Arc<dyn CitationProvider>,
    fallback: Arc<dyn FallbackLookup>,
}

impl Resolver {
    pub fn new(provider: Arc<dyn CitationProvider>, fallback: Arc<dyn FallbackLookup>) -> Self {
        Self { provider, fallback }
    }

    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        Ok(Self::new(
            config.build_provider()?,
            Arc::new(StaticFallbackTable::known()),
        ))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn resolve(&self, title: &str) -> Result<ResolutionOutcome, ResolveError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ResolveError::InvalidTitle);
        }

        let result = self.provider.fetch_citations(title).await;
        if result.found {
            return Ok(ResolutionOutcome {
                citations: result.citations,
                title: title.to_string(),
                found: true,
            });
        }

        let citations = self.fallback.lookup(title);
        tracing::info!(
            "{} had no match for {:?}, static fallback gives {}",
            self.provider.name(),
            title,
            citations
        );
        Ok(ResolutionOutcome {
            citations,
            title: title.to_string(),
            found: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::Lookup;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        answer: Lookup,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(answer: Lookup) -> Arc<Self> {
            Arc::new(Self { answer, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl CitationProvider for FixedProvider {
        fn name(&self) -> &str { "fixed" }

        async fn lookup(&self, _title: &str) -> Result<Lookup, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    struct CountingFallback {
        table: StaticFallbackTable,
        calls: AtomicUsize,
    }

    impl FallbackLookup for CountingFallback {
        fn lookup(&self, title: &str) -> u64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table.lookup(title)
        }
    }

    fn counting_fallback() -> Arc<CountingFallback> {
        Arc::new(CountingFallback {
            table: StaticFallbackTable::known(),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_not_found_uses_static_table() {
        let provider = FixedProvider::new(Lookup::NotFound);
        let resolver = Resolver::new(provider.clone(), Arc::new(StaticFallbackTable::known()));

        let outcome = resolver
            .resolve("Crisis Response through Social Cues Analysis")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ResolutionOutcome {
                citations: 0,
                title: "Crisis Response through Social Cues Analysis".into(),
                found: false,
            }
        );

        let outcome = resolver
            .resolve("Exploring media consumption and mental health among students")
            .await
            .unwrap();
        assert_eq!(outcome.citations, 4);
        assert!(!outcome.found);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_found_skips_fallback() {
        let provider = FixedProvider::new(Lookup::Found(12));
        let fallback = counting_fallback();
        let resolver = Resolver::new(provider.clone(), fallback.clone());

        let outcome = resolver.resolve("  Some Indexed Paper \n").await.unwrap();
        assert_eq!(outcome.citations, 12);
        assert_eq!(outcome.title, "Some Indexed Paper");
        assert!(outcome.found);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_title_never_reaches_provider() {
        let provider = FixedProvider::new(Lookup::Found(1));
        let resolver = Resolver::new(provider.clone(), Arc::new(StaticFallbackTable::known()));

        for title in ["", "   ", "\t\n"] {
            assert!(matches!(resolver.resolve(title).await, Err(ResolveError::InvalidTitle)));
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeated_resolve_is_stable() {
        let provider = FixedProvider::new(Lookup::NotFound);
        let resolver = Resolver::new(provider, Arc::new(StaticFallbackTable::known()));

        let first = resolver.resolve("Exploring media consumption and mental health").await.unwrap();
        let second = resolver.resolve("Exploring media consumption and mental health").await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_config_picks_provider() {
        let resolver = Resolver::from_config(&Config::default()).unwrap();
        assert_eq!(resolver.provider_name(), "semantic_scholar");
    }
}
