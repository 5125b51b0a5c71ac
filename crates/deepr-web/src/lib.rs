//! deepr-web: web capabilities for deepr
//!
//! - Search: SerpApi-backed web search returning ranked links
//! - Fetch: page text through a Jina-style reader endpoint, or a direct
//!   HTTP fetch with local HTML-to-text extraction

pub mod direct;
pub mod jina;
pub mod serpapi;

use std::time::Duration;

pub use direct::DirectFetcher;
pub use jina::JinaReader;
pub use serpapi::SerpApiSearch;

pub const DEFAULT_USER_AGENT: &str = concat!("deepr/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by every capability of a research run.
pub fn build_client(timeout: Duration, user_agent: Option<&str>) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .timeout(timeout)
        .build()
}

pub(crate) fn transport_error(e: reqwest::Error) -> deepr_core::Error {
    if e.is_timeout() {
        deepr_core::Error::timeout(e.to_string())
    } else {
        deepr_core::Error::network(e.to_string())
    }
}
