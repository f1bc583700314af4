// src/publish.rs
//! Post publication to X (Twitter) over API v2.
//!
//! v2 still authenticates user-context writes with OAuth 1.0a, so the
//! client signs each request itself: RFC 3986 percent-encoding, the sorted
//! parameter base string, HMAC-SHA1 over the consumer/token secret pair.
//! JSON-body requests sign only the oauth_* parameters.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::Engine as _;
use hmac::Mac as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ConfigStore, TwitterConfig};
use crate::error::AgentError;

/// Hard platform limit on post length, in characters.
pub const POST_CHAR_LIMIT: usize = 280;

const ELLIPSIS: &str = "...";
const POST_ENDPOINT: &str = "https://api.twitter.com/2/tweets";

type HmacSha1 = hmac::Hmac<sha1::Sha1>;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `text` and return the platform id of the created post.
    async fn publish(&self, text: &str) -> Result<String, AgentError>;
    /// Short platform label for logs.
    fn name(&self) -> &'static str;
}

/// Clip `text` to the platform limit. Anything longer than 280 characters
/// keeps its first 277 and gains a `...` suffix, landing on exactly 280.
pub fn clip_for_post(text: &str) -> String {
    if text.chars().count() <= POST_CHAR_LIMIT {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(POST_CHAR_LIMIT - ELLIPSIS.len()).collect();
    clipped.push_str(ELLIPSIS);
    clipped
}

/// RFC 3986 percent-encoding; everything outside `A-Za-z0-9-._~` escapes.
fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Assemble the OAuth signature base string: method, encoded URL, and the
/// sorted, encoded parameter pairs, double-encoded as one component.
fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}&{}&{}", method, percent_encode(url), percent_encode(&param_string))
}

/// HMAC-SHA1 over the base string, keyed by `consumer_secret&token_secret`,
/// base64-encoded.
fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("hmac accepts any key length");
    mac.update(base.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Build the `Authorization: OAuth ...` header value for one request.
fn authorization_header(
    creds: &TwitterConfig,
    method: &str,
    url: &str,
    nonce: &str,
    timestamp: u64,
) -> String {
    let oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), creds.api_key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), creds.access_token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];
    let base = signature_base_string(method, url, &oauth_params);
    let signature = sign(&base, &creds.api_key_secret, &creds.access_token_secret);

    let mut header_params = oauth_params;
    header_params.push(("oauth_signature".to_string(), signature));
    header_params.sort();
    let joined = header_params
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {joined}")
}

fn oauth_nonce() -> String {
    use rand::distr::{Alphanumeric, SampleString};
    Alphanumeric.sample_string(&mut rand::rng(), 32)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Serialize)]
struct PostRequest {
    text: String,
}

#[derive(Deserialize)]
struct PostResponse {
    data: PostData,
}

#[derive(Deserialize)]
struct PostData {
    id: String,
}

pub struct XApiClient {
    http: reqwest::Client,
    store: Arc<ConfigStore>,
}

impl XApiClient {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("finnews-agent/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self { http, store }
    }
}

#[async_trait]
impl Publisher for XApiClient {
    async fn publish(&self, text: &str) -> Result<String, AgentError> {
        let cfg = self.store.load()?;
        let body = PostRequest {
            text: clip_for_post(text),
        };
        debug!(chars = body.text.chars().count(), "posting to x");

        let authorization =
            authorization_header(&cfg.twitter, "POST", POST_ENDPOINT, &oauth_nonce(), unix_now());
        let resp = self
            .http
            .post(POST_ENDPOINT)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await
            .context("x api request")
            .map_err(AgentError::Publish)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::Publish(anyhow!(
                "x api responded {status}: {}",
                snippet(&body)
            )));
        }

        let parsed: PostResponse = resp
            .json()
            .await
            .context("decoding x api response")
            .map_err(AgentError::Publish)?;
        info!(post_id = %parsed.data.id, "posted update");
        Ok(parsed.data.id)
    }

    fn name(&self) -> &'static str {
        "x"
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
