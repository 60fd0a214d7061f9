//! X API v2 client
//!
//! Uses `reqwest` with OAuth 1.0a user-context signing. Every response body
//! is read to completion inside the call that produced it, so nothing stays
//! open across loop iterations.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::api::LikesApi;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::oauth::OAuthSigner;
use crate::rate_limit::RESET_HEADER;
use crate::types::{LikedPage, RetractBody, RetractOutcome};

/// Longest slice of an error body kept in `ApiError::Status`
const BODY_EXCERPT_LEN: usize = 512;

pub struct XClient {
    http: reqwest::Client,
    config: Arc<Config>,
    base_url: Url,
}

impl XClient {
    /// Create a client for the configured base URL
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Request` if the base URL cannot carry path segments
    /// or the HTTP client cannot be constructed.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let base_url = Url::parse(&config.api.base_url)
            .map_err(|e| ApiError::Request(format!("Invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Request(format!(
                "Base URL cannot carry a path: {}",
                config.api.base_url
            ))
            .into());
        }

        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.api.timeout_secs));

        // Local endpoints (test servers, dev proxies) never go through HTTP(S)_PROXY
        if is_loopback(&base_url) {
            builder = builder.no_proxy();
        }

        let http = builder
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Request("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn liked_items_url(&self, account_id: &str) -> std::result::Result<Url, ApiError> {
        let mut url = self.endpoint(&["users", account_id, "liked_tweets"])?;
        if let Some(max_results) = self.config.api.max_results {
            url.query_pairs_mut()
                .append_pair("max_results", &max_results.to_string());
        }
        Ok(url)
    }

    pub fn retract_url(
        &self,
        account_id: &str,
        item_id: &str,
    ) -> std::result::Result<Url, ApiError> {
        self.endpoint(&["users", account_id, "likes", item_id])
    }

    fn signed_request(
        &self,
        method: Method,
        url: Url,
    ) -> std::result::Result<reqwest::RequestBuilder, ApiError> {
        let authorization =
            OAuthSigner::new(&self.config.credentials).authorization(method.as_str(), &url, &[])?;

        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, authorization)
            .header(USER_AGENT, &self.config.api.user_agent))
    }
}

#[async_trait]
impl LikesApi for XClient {
    async fn fetch_liked(&self, account_id: &str) -> Result<LikedPage> {
        let url = self.liked_items_url(account_id)?;
        tracing::debug!(%url, "Fetching liked items");

        let response = self
            .signed_request(Method::GET, url)?
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("fetching likes: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("reading response body: {}", e)))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            }
            .into());
        }

        let page: LikedPage = serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("parsing liked items: {}", e)))?;
        tracing::debug!(count = page.len(), "Decoded liked items page");

        Ok(page)
    }

    async fn retract_like(&self, account_id: &str, item_id: &str) -> Result<RetractOutcome> {
        let url = self.retract_url(account_id, item_id)?;
        let request = self
            .signed_request(Method::DELETE, url)?
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        tracing::debug!(url = %request.url(), "Retracting like");

        let response = self.http.execute(request).await.map_err(ApiError::from)?;

        let status = response.status().as_u16();
        let rate_limit_reset = response
            .headers()
            .get(RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The outcome is already known; an unreadable body only loses `liked`
        let liked = match response.text().await {
            Ok(body) => serde_json::from_str::<RetractBody>(&body)
                .ok()
                .map(|b| b.data.liked),
            Err(e) => {
                tracing::debug!("Could not read delete response body: {}", e);
                None
            }
        };

        Ok(RetractOutcome {
            status,
            rate_limit_reset,
            liked,
        })
    }

    fn name(&self) -> &str {
        "x"
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
        Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= BODY_EXCERPT_LEN {
        return body.to_string();
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, ApiConfig};

    fn config_with(api: ApiConfig) -> Arc<Config> {
        let env = |key: &str| Some(format!("{}-value", key.to_lowercase()));
        let mut config = Config::from_lookup(env, FileConfig::default()).unwrap();
        config.api = api;
        Arc::new(config)
    }

    #[test]
    fn test_liked_items_url() {
        let client = XClient::new(config_with(ApiConfig::default())).unwrap();
        let url = client.liked_items_url("12345").unwrap();
        assert_eq!(url.as_str(), "https://api.x.com/2/users/12345/liked_tweets");
    }

    #[test]
    fn test_liked_items_url_with_page_size() {
        let client = XClient::new(config_with(ApiConfig {
            max_results: Some(100),
            ..ApiConfig::default()
        }))
        .unwrap();
        let url = client.liked_items_url("12345").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.x.com/2/users/12345/liked_tweets?max_results=100"
        );
    }

    #[test]
    fn test_retract_url_with_trailing_slash_base() {
        let client = XClient::new(config_with(ApiConfig {
            base_url: "http://localhost:9000/2/".to_string(),
            ..ApiConfig::default()
        }))
        .unwrap();
        let url = client.retract_url("12345", "67890").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/2/users/12345/likes/67890");
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let client = XClient::new(config_with(ApiConfig::default())).unwrap();
        let url = client.retract_url("12345", "a b?").unwrap();
        assert_eq!(url.as_str(), "https://api.x.com/2/users/12345/likes/a%20b%3F");
    }

    #[test]
    fn test_base_url_without_path_support_is_rejected() {
        let result = XClient::new(config_with(ApiConfig {
            base_url: "mailto:someone@example.com".to_string(),
            ..ApiConfig::default()
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_is_loopback() {
        assert!(is_loopback(&Url::parse("http://127.0.0.1:8080/2").unwrap()));
        assert!(is_loopback(&Url::parse("http://LOCALHOST/2").unwrap()));
        assert!(is_loopback(&Url::parse("http://[::1]:9000/2").unwrap()));
        assert!(!is_loopback(&Url::parse("https://api.x.com/2").unwrap()));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let short = "{\"title\":\"Unauthorized\"}";
        assert_eq!(excerpt(short), short);

        let long = "é".repeat(BODY_EXCERPT_LEN);
        let cut = excerpt(&long);
        assert!(cut.ends_with('…'));
        assert!(cut.len() <= BODY_EXCERPT_LEN + '…'.len_utf8());
    }
}
