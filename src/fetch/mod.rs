//! Fetch-fallback client
//!
//! Retrieves page content through an ordered chain of transports: a direct
//! request first, then each configured relay proxy. The first transport that
//! answers with a 2xx response wins. There is no retry within a transport;
//! a failure falls straight through to the next one.

mod client;
mod proxy;

pub use client::{build_http_client, FallbackClient, FetchedPage, Transport};
pub use proxy::ProxyEndpoint;

use thiserror::Error;

/// Errors produced by the fetch-fallback client
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every transport in the chain failed
    #[error("All transports failed for {url}: {last_error} (attempts: {})", attempts.join("; "))]
    Exhausted {
        url: String,
        last_error: String,
        /// One entry per transport tried, in order
        attempts: Vec<String>,
    },

    #[error("Invalid fetch target {url}: {message}")]
    InvalidTarget { url: String, message: String },
}

impl FetchError {
    /// Number of transports attempted before giving up
    pub fn attempt_count(&self) -> usize {
        match self {
            Self::Exhausted { attempts, .. } => attempts.len(),
            Self::InvalidTarget { .. } => 0,
        }
    }
}
