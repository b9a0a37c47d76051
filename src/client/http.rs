//! HTTP Client
//!
//! Async JSON client with bounded retry of transient failures.

use crate::error::{MeshError, Result};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// How a request authenticates
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    /// `Authorization: Bearer <key>`
    Bearer(&'a str),

    /// Key sent in a named header (e.g. `x-goog-api-key`)
    Header { name: &'static str, value: &'a str },
}

/// HTTP client with retry handling
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,

    /// Retries allowed for connection errors, timeouts and 429s
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(max_retries: u32) -> Result<Self> {
        Self::with_timeout(max_retries, Duration::from_secs(300))
    }

    /// Create a new HTTP client with a per-request timeout
    pub fn with_timeout(max_retries: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| MeshError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries,
        })
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<T, R>(
        &self,
        url: &str,
        body: &T,
        auth: Auth<'_>,
        extra_headers: Option<&HeaderMap>,
        target: &str,
    ) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let body_json = serde_json::to_string(body)?;
        let text = self
            .execute(
                Method::POST,
                url,
                Some(body_json),
                auth,
                extra_headers,
                target,
                true,
            )
            .await?;
        decode(&text)
    }

    /// POST a JSON body, ignoring any response body.
    ///
    /// Used for inserts: a request that timed out may already have been
    /// applied, so only connection errors and 429s are retried.
    pub async fn post_discard<T: Serialize>(
        &self,
        url: &str,
        body: &T,
        auth: Auth<'_>,
        extra_headers: Option<&HeaderMap>,
        target: &str,
    ) -> Result<()> {
        let body_json = serde_json::to_string(body)?;
        self.execute(
            Method::POST,
            url,
            Some(body_json),
            auth,
            extra_headers,
            target,
            false,
        )
        .await
            .map(|_| ())
    }

    /// GET and decode a JSON response
    pub async fn get_json<R: DeserializeOwned>(
        &self,
        url: &str,
        auth: Auth<'_>,
        extra_headers: Option<&HeaderMap>,
        target: &str,
    ) -> Result<R> {
        let text = self
            .execute(Method::GET, url, None, auth, extra_headers, target, true)
            .await?;
        decode(&text)
    }

    /// Send a request, retrying transient failures, and return the body text
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
        auth: Auth<'_>,
        extra_headers: Option<&HeaderMap>,
        target: &str,
        retry_timeouts: bool,
    ) -> Result<String> {
        let headers = build_headers(auth, extra_headers)?;

        let mut policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Some(Duration::from_secs(30)),
            multiplier: 2.0,
            ..Default::default()
        };
        policy.reset();

        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(ref body) = body {
                request = request.body(body.clone());
            }

            let error = match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let response_body = resp.text().await.unwrap_or_default();

                    if status.is_success() {
                        return Ok(response_body);
                    }

                    if is_rate_limit_error(status, &response_body) {
                        MeshError::RateLimited {
                            provider: target.to_string(),
                        }
                    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
                    {
                        return Err(MeshError::Auth(truncate(&response_body).to_string()));
                    } else {
                        return Err(MeshError::Request(format!(
                            "{} returned status {}: {}",
                            target,
                            status,
                            truncate(&response_body)
                        )));
                    }
                }
                Err(e) if e.is_connect() || (retry_timeouts && e.is_timeout()) => e.into(),
                Err(e) => return Err(e.into()),
            };

            retries += 1;
            if retries > self.max_retries {
                return Err(error);
            }

            let Some(wait) = policy.next_backoff() else {
                return Err(error);
            };

            tracing::debug!(
                target_name = %target,
                attempt = retries,
                wait_ms = wait.as_millis() as u64,
                error = %error,
                "retrying request"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Convert configured header pairs into a header map, skipping invalid entries
pub fn header_map(pairs: &HashMap<String, String>) -> Option<HeaderMap> {
    if pairs.is_empty() {
        return None;
    }

    let mut headers = HeaderMap::new();
    for (key, value) in pairs {
        if let (Ok(name), Ok(val)) = (
            HeaderName::try_from(key.as_str()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, val);
        }
    }
    Some(headers)
}

fn build_headers(auth: Auth<'_>, extra_headers: Option<&HeaderMap>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    match auth {
        Auth::Bearer(key) => {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| MeshError::Config(format!("Invalid API key format: {}", e)))?,
            );
        }
        Auth::Header { name, value } => {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(value)
                    .map_err(|e| MeshError::Config(format!("Invalid API key format: {}", e)))?,
            );
        }
    }

    if let Some(extra) = extra_headers {
        for (key, value) in extra {
            headers.insert(key.clone(), value.clone());
        }
    }

    Ok(headers)
}

fn decode<R: DeserializeOwned>(body: &str) -> Result<R> {
    serde_json::from_str(body).map_err(|e| {
        MeshError::Response(format!(
            "Failed to parse response: {}. Body: {}",
            e,
            truncate(body)
        ))
    })
}

/// Detect if a response indicates a rate limit error
pub fn is_rate_limit_error(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }

    // Some providers return 400 or 403 with rate limit messages
    let lower_body = body.to_lowercase();
    lower_body.contains("rate limit")
        || lower_body.contains("rate_limit")
        || lower_body.contains("too many requests")
        || lower_body.contains("quota exceeded")
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(500) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_client_creation() {
        assert!(HttpClient::new(1).is_ok());
    }

    #[test]
    fn test_is_rate_limit_error() {
        assert!(is_rate_limit_error(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(is_rate_limit_error(
            StatusCode::BAD_REQUEST,
            "rate limit exceeded"
        ));
        assert!(is_rate_limit_error(StatusCode::FORBIDDEN, "Too Many Requests"));
        assert!(!is_rate_limit_error(StatusCode::OK, "success"));
        assert!(!is_rate_limit_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error"
        ));
    }

    #[test]
    fn test_header_map_skips_invalid() {
        let pairs: HashMap<String, String> = [
            ("x-team".to_string(), "mesh".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ]
        .into_iter()
        .collect();

        let headers = header_map(&pairs).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-team").unwrap(), "mesh");
        assert!(header_map(&HashMap::new()).is_none());
    }

    #[tokio::test]
    async fn test_post_json_sends_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/echo")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::Json(json!({"q": 1})))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let client = HttpClient::new(0).unwrap();
        let value: serde_json::Value = client
            .post_json(
                &format!("{}/echo", server.url()),
                &json!({"q": 1}),
                Auth::Bearer("sk-test"),
                None,
                "test",
            )
            .await
            .unwrap();

        assert_eq!(value["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/keys")
            .with_status(401)
            .with_body("invalid key")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(3).unwrap();
        let result: Result<serde_json::Value> = client
            .get_json(
                &format!("{}/keys", server.url()),
                Auth::Header {
                    name: "x-goog-api-key",
                    value: "bad",
                },
                None,
                "test",
            )
            .await;

        assert!(matches!(result, Err(MeshError::Auth(_))));
        mock.assert_async().await;
    }

    /// Accepts connections and never answers; returns the URL and a connection count
    async fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                open.push(socket);
            }
        });
        (url, connections)
    }

    #[tokio::test]
    async fn test_timed_out_insert_not_retried() {
        let (url, connections) = silent_server().await;
        let client = HttpClient::with_timeout(2, Duration::from_millis(100)).unwrap();

        let result = client
            .post_discard(
                &format!("{}/rest/v1/model_usage_logs", url),
                &json!({"success": true}),
                Auth::Bearer("svc"),
                None,
                "usage-log",
            )
            .await;

        assert!(matches!(result, Err(MeshError::Timeout(_))));
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timed_out_read_retried() {
        let (url, connections) = silent_server().await;
        let client = HttpClient::with_timeout(1, Duration::from_millis(100)).unwrap();

        let result: Result<serde_json::Value> = client
            .get_json(&format!("{}/keys", url), Auth::Bearer("svc"), None, "settings")
            .await;

        assert!(matches!(result, Err(MeshError::Timeout(_))));
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/busy")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let client = HttpClient::new(1).unwrap();
        let result = client
            .post_discard(
                &format!("{}/busy", server.url()),
                &json!({}),
                Auth::Bearer("k"),
                None,
                "busy-provider",
            )
            .await;

        assert!(matches!(
            result,
            Err(MeshError::RateLimited { ref provider }) if provider == "busy-provider"
        ));
        mock.assert_async().await;
    }
}
