//! Transport chain implementation
//!
//! This module handles all HTTP traffic for the pipeline, including:
//! - Building HTTP clients with a proper user agent string
//! - The direct request
//! - Relay proxy requests and envelope unwrapping
//! - Error classification for diagnostics

use crate::config::{Config, UserAgentConfig};
use crate::fetch::proxy::ProxyEndpoint;
use crate::fetch::FetchError;
use crate::DiscoveryError;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// The transport that produced a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Direct,
    Proxy(String),
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Proxy(name) => write!(f, "proxy:{}", name),
        }
    }
}

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested (not the proxy URL)
    pub url: String,
    pub content: String,
    pub transport: Transport,
    pub status_code: u16,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total request timeout
///
/// # Example
///
/// ```no_run
/// use grant_scout::config::UserAgentConfig;
/// use grant_scout::fetch::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "GrantScout".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.org/about".to_string(),
///     contact_email: "crawler@example.org".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages through the direct-then-proxies fallback chain
#[derive(Debug, Clone)]
pub struct FallbackClient {
    client: Client,
    direct: bool,
    proxies: Vec<ProxyEndpoint>,
}

impl FallbackClient {
    /// Creates a client from the `[user-agent]` and `[fetch]` configuration
    pub fn from_config(config: &Config) -> Result<Self, DiscoveryError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.fetch.timeout_secs),
        )?;
        let proxies = config.fetch.proxies.iter().map(ProxyEndpoint::from).collect();
        let fallback = Self::new(client, config.fetch.direct, proxies);
        tracing::debug!("Fetch chain has {} transports", fallback.chain_len());
        Ok(fallback)
    }

    pub fn new(client: Client, direct: bool, proxies: Vec<ProxyEndpoint>) -> Self {
        Self {
            client,
            direct,
            proxies,
        }
    }

    /// Number of transports in the chain
    pub fn chain_len(&self) -> usize {
        usize::from(self.direct) + self.proxies.len()
    }

    /// Fetches a URL, falling through the transport chain until one succeeds
    ///
    /// # Request Flow
    ///
    /// 1. Direct GET (if enabled)
    /// 2. Each proxy in order, with the target percent-encoded into its template
    /// 3. Proxy bodies are unwrapped according to the proxy's envelope
    ///
    /// Non-2xx statuses, network errors, empty bodies and malformed envelopes
    /// all count as a transport failure.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - Content from the first transport that succeeded
    /// * `Err(FetchError::Exhausted)` - Every transport failed; carries the last
    ///   error and the full list of attempts
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidTarget {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidTarget {
                url: url.to_string(),
                message: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let mut attempts = Vec::new();

        if self.direct {
            match self.get(url).await {
                Ok((status_code, content)) if !content.trim().is_empty() => {
                    tracing::debug!("Fetched {} directly", url);
                    return Ok(FetchedPage {
                        url: url.to_string(),
                        content,
                        transport: Transport::Direct,
                        status_code,
                    });
                }
                Ok(_) => attempts.push("direct: empty body".to_string()),
                Err(e) => {
                    tracing::debug!("Direct fetch of {} failed: {}", url, e);
                    attempts.push(format!("direct: {}", e));
                }
            }
        }

        for proxy in &self.proxies {
            let request_url = proxy.request_url(url);
            let outcome = match self.get(&request_url).await {
                Ok((status_code, body)) => proxy
                    .unwrap_body(body)
                    .map(|content| (status_code, content)),
                Err(e) => Err(e),
            };

            match outcome {
                Ok((status_code, content)) => {
                    tracing::debug!("Fetched {} via proxy {}", url, proxy.name);
                    return Ok(FetchedPage {
                        url: url.to_string(),
                        content,
                        transport: Transport::Proxy(proxy.name.clone()),
                        status_code,
                    });
                }
                Err(e) => {
                    tracing::debug!("Proxy {} failed for {}: {}", proxy.name, url, e);
                    attempts.push(format!("{}: {}", proxy.name, e));
                }
            }
        }

        let last_error = attempts
            .last()
            .cloned()
            .unwrap_or_else(|| "no transports configured".to_string());
        tracing::warn!(
            "All {} transports failed for {}: {}",
            attempts.len(),
            url,
            last_error
        );

        Err(FetchError::Exhausted {
            url: url.to_string(),
            last_error,
            attempts,
        })
    }

    /// Performs one GET and classifies the failure, if any
    async fn get(&self, url: &str) -> Result<(u16, String), String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                "connection refused".to_string()
            } else {
                e.to_string()
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok((status.as_u16(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestScout".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.org/about".to_string(),
            contact_email: "crawler@example.org".to_string(),
        }
    }

    fn client(direct: bool, proxies: Vec<ProxyEndpoint>) -> FallbackClient {
        let http = build_http_client(&test_user_agent(), Duration::from_secs(5)).unwrap();
        FallbackClient::new(http, direct, proxies)
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&test_user_agent(), Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_direct_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>grants</html>"))
            .mount(&server)
            .await;

        let page = client(true, vec![])
            .fetch(&format!("{}/grants", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.transport, Transport::Direct);
        assert_eq!(page.content, "<html>grants</html>");
        assert_eq!(page.status_code, 200);
    }

    #[tokio::test]
    async fn test_falls_through_to_json_proxy() {
        let origin = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&origin)
            .await;

        let relay = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&relay)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("url", format!("{}/page", origin.uri())))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"contents":"<html>wrapped</html>"}"#),
            )
            .mount(&relay)
            .await;

        let proxies = vec![
            ProxyEndpoint::raw("broken", &format!("{}/broken?u={{url}}", relay.uri())),
            ProxyEndpoint::json("origins", &format!("{}/get?url={{url}}", relay.uri()), "contents"),
        ];

        let page = client(true, proxies)
            .fetch(&format!("{}/page", origin.uri()))
            .await
            .unwrap();

        assert_eq!(page.transport, Transport::Proxy("origins".to_string()));
        assert_eq!(page.content, "<html>wrapped</html>");
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_every_attempt() {
        let origin = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&origin)
            .await;

        let proxies = vec![
            ProxyEndpoint::raw("first", &format!("{}/p1?{{url}}", origin.uri())),
            ProxyEndpoint::raw("second", &format!("{}/p2?{{url}}", origin.uri())),
        ];

        let client = client(true, proxies);
        assert_eq!(client.chain_len(), 3);
        let err = client
            .fetch(&format!("{}/missing", origin.uri()))
            .await
            .unwrap_err();

        match err {
            FetchError::Exhausted {
                last_error,
                attempts,
                ..
            } => {
                assert_eq!(attempts.len(), client.chain_len());
                assert!(attempts[0].starts_with("direct"));
                assert_eq!(last_error, "second: HTTP 500");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_target_rejected_without_requests() {
        let err = client(true, vec![]).fetch("ftp://files.example.org").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidTarget { .. }));
        assert_eq!(err.attempt_count(), 0);
    }
}
