//! Listing sources: where fresh snapshots come from.

pub mod kufar;

use crate::config::QuerySpec;
use crate::model::Listing;
use async_trait::async_trait;

pub use kufar::KufarClient;

#[derive(Debug)]
pub enum FetchError {
    /// Transport failure, including timeouts
    Network(reqwest::Error),
    /// Non-2xx HTTP status
    Status(u16),
    /// Body did not decode into listings
    Malformed(String),
}

impl FetchError {
    /// Whether another attempt within the same query may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(code) => *code == 429 || *code >= 500,
            FetchError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Network(err)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(e) => write!(f, "Network error: {}", e),
            FetchError::Status(code) => write!(f, "Listing API returned HTTP {}", code),
            FetchError::Malformed(msg) => write!(f, "Malformed listing response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetches the current listings for one query.
///
/// Implementations hold no pagination state between calls.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<Listing>, FetchError>;

    /// Get source name for logging
    fn source_name(&self) -> &'static str;
}
