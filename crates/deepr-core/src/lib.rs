//! deepr-core: Core types and capability traits for deepr
//!
//! This crate provides the contracts the research loop is written against:
//! text completion, web search and page-text fetching, plus the shared
//! error type and the fixed model catalog.

pub mod error;
pub mod fetch;
pub mod message;
pub mod models;
pub mod provider;
pub mod search;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::Error;
pub use fetch::PageFetcher;
pub use message::{Message, Role, Usage};
pub use models::{find_model, ModelEntry, CATALOG, DEFAULT_MODEL};
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
pub use search::SearchProvider;

pub type Result<T> = std::result::Result<T, Error>;
