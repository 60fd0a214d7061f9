//! OAuth 1.0a request signing (HMAC-SHA1, RFC 5849)
//!
//! The likes endpoints require user-context auth. Every request gets a fresh
//! nonce and timestamp and an `Authorization: OAuth ...` header computed
//! over the method, the normalized URL and all query parameters.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::ExposeSecret;
use sha1::Sha1;
use url::Url;

use crate::config::Credentials;
use crate::error::ApiError;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// Percent-encode per RFC 3986: everything but `A-Z a-z 0-9 - . _ ~`
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Signs requests with a borrowed set of credentials
pub struct OAuthSigner<'a> {
    credentials: &'a Credentials,
}

impl<'a> OAuthSigner<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// Build the `Authorization` header value for a request made now
    ///
    /// `extra` carries form-encoded body parameters, if any. Query parameters
    /// are taken from `url`.
    pub fn authorization(
        &self,
        method: &str,
        url: &Url,
        extra: &[(String, String)],
    ) -> Result<String, ApiError> {
        let nonce = generate_nonce();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_with(method, url, extra, &nonce, timestamp)
    }

    /// Deterministic variant of [`OAuthSigner::authorization`]
    pub fn authorization_with(
        &self,
        method: &str,
        url: &Url,
        extra: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, ApiError> {
        let oauth_params = self.oauth_params(nonce, timestamp);
        let base = signature_base_string(method, url, &oauth_params, extra);
        let signature = self.sign(&base)?;

        let mut header_params = oauth_params;
        header_params.push(("oauth_signature".to_string(), signature));

        let fields: Vec<String> = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect();

        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
        vec![
            (
                "oauth_consumer_key".to_string(),
                self.credentials.consumer_key.expose_secret().to_string(),
            ),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            (
                "oauth_token".to_string(),
                self.credentials.access_token.expose_secret().to_string(),
            ),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ]
    }

    /// HMAC-SHA1 over the base string, base64 encoded
    pub fn sign(&self, base: &str) -> Result<String, ApiError> {
        let key = format!(
            "{}&{}",
            percent_encode(self.credentials.consumer_secret.expose_secret()),
            percent_encode(self.credentials.access_secret.expose_secret())
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| ApiError::Signing(e.to_string()))?;
        mac.update(base.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// `scheme://host[:port]/path` with no query or fragment
pub fn normalized_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

pub fn signature_base_string(
    method: &str,
    url: &Url,
    oauth_params: &[(String, String)],
    extra: &[(String, String)],
) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(
            oauth_params
                .iter()
                .chain(extra.iter())
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    params.sort();

    let param_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(&normalized_url(url)),
        percent_encode(&param_string)
    )
}
