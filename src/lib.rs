//! Citation-count resolution for paper titles.
//!
//! A request walks a fixed degradation ladder: the configured network provider
//! (SerpApi when `SERPAPI_API_KEY` is set, Semantic Scholar otherwise), then a
//! static table of known counts, then zero. [`client`] holds the consumer side,
//! a 24 hour cache in front of the HTTP endpoint.

pub mod apis;
pub mod client;
pub mod config;
pub mod fallback;
pub mod resolve;
pub mod server;

pub use apis::{CitationProvider, ProviderResult};
pub use config::Config;
pub use resolve::{ResolutionOutcome, Resolver};
