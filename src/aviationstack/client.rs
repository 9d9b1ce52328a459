//! Resilient API client: one `fetch` masks transient failures behind a
//! bounded exponential-backoff retry policy.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde_json::{Map, Value};

use super::config::ClientConfig;
use super::error::ErrorPayload;
use super::types::{SuccessEnvelope, normalize};

/// Query parameter carrying the API credential.
const ACCESS_KEY_PARAM: &str = "access_key";

/// Seam between the MCP dispatch layer and the HTTP client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchResource: Send + Sync {
    /// Fetch one page of a named Aviationstack resource (e.g. `flights`).
    async fn fetch(
        &self,
        resource: &str,
        params: &Map<String, Value>,
    ) -> Result<SuccessEnvelope, ErrorPayload>;
}

/// Asynchronous Aviationstack client with retry, timeout and error mapping.
///
/// Holds no mutable cross-call state; one instance can be shared across
/// concurrent callers without locking.
#[derive(Debug)]
pub struct AviationstackClient {
    client: Client,
    config: ClientConfig,
}

impl AviationstackClient {
    /// Builds the client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ErrorPayload> {
        // Duration::from_secs_f64 panics on negative or non-finite input.
        if !(config.timeout_seconds.is_finite() && config.timeout_seconds >= 0.0)
            || !(config.backoff_seconds.is_finite() && config.backoff_seconds >= 0.0)
        {
            return Err(ErrorPayload::client_initialization_failed(
                "timeout and backoff must be non-negative numbers of seconds",
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("avstack-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs_f64(config.timeout_seconds))
            .build()
            .map_err(|e| {
                ErrorPayload::client_initialization_failed(format!(
                    "Failed to initialize the HTTP client: {}",
                    e
                ))
            })?;

        Ok(Self { client, config })
    }

    /// Builds the client from environment variables.
    ///
    /// Fails with `missing_api_key` before any network call when the
    /// credential is absent.
    pub fn from_env() -> Result<Self, ErrorPayload> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint_url(&self, resource: &str) -> String {
        let base = &self.config.base_url;
        if base.ends_with('/') {
            format!("{}{}", base, resource)
        } else {
            format!("{}/{}", base, resource)
        }
    }

    /// Merges caller params with the credential; the client's own
    /// `access_key` always wins over a caller-supplied one.
    fn query_pairs(&self, params: &Map<String, Value>) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .filter(|(key, _)| key.as_str() != ACCESS_KEY_PARAM)
            .map(|(key, value)| (key.clone(), query_value(value)))
            .collect();
        pairs.push((ACCESS_KEY_PARAM.to_string(), self.config.api_key.clone()));
        pairs
    }

    /// One request/inspect cycle without retries.
    async fn attempt(
        &self,
        resource: &str,
        query: &[(String, String)],
    ) -> Result<SuccessEnvelope, ErrorPayload> {
        let url = self.endpoint_url(resource);
        debug!("GET {} ...", url);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ErrorPayload::network_error(&e))?;

        // Status and body are inspected explicitly; error_for_status would
        // throw away the error body Aviationstack attaches to 4xx/5xx.
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let text = response
            .text()
            .await
            .map_err(|e| ErrorPayload::network_error(&e))?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if status.as_u16() >= 400 {
            return Err(ErrorPayload::from_http_status(
                status,
                body.as_ref(),
                retry_after.as_deref(),
            ));
        }

        let body = body.ok_or_else(|| {
            ErrorPayload::unexpected(format!(
                "Aviationstack returned a non-JSON body with HTTP {}",
                status.as_u16()
            ))
        })?;

        // Aviationstack embeds errors inside a 200 payload in some cases.
        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            return Err(ErrorPayload::from_body_error(error, status.as_u16()));
        }

        Ok(normalize(resource, body))
    }
}

#[async_trait]
impl FetchResource for AviationstackClient {
    #[tracing::instrument(skip(self, params))]
    async fn fetch(
        &self,
        resource: &str,
        params: &Map<String, Value>,
    ) -> Result<SuccessEnvelope, ErrorPayload> {
        let query = self.query_pairs(params);
        let mut attempt: usize = 0;

        loop {
            match self.attempt(resource, &query).await {
                Ok(envelope) => return Ok(envelope),
                Err(error) if !error.retryable => {
                    debug!("{}: non-retryable error: {}", resource, error);
                    return Err(error);
                }
                Err(error) if attempt >= self.config.max_retries => {
                    warn!(
                        "{}: giving up after {} attempts: {}",
                        resource,
                        attempt + 1,
                        error
                    );
                    return Err(error.into_retries_exhausted());
                }
                Err(error) => {
                    let delay = self.config.backoff_seconds * 2f64.powi(attempt as i32);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:.2}s...",
                        resource,
                        attempt + 1,
                        self.config.max_retries + 1,
                        error,
                        delay
                    );
                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Instant;

    fn test_client(base_url: &str, max_retries: usize) -> AviationstackClient {
        let config = ClientConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            timeout_seconds: 5.0,
            max_retries,
            backoff_seconds: 0.01,
        };
        AviationstackClient::new(config).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_normalizes_success() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("access_key".into(), "test-key".into()),
                Matcher::UrlEncoded("flight_number".into(), "BA123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "data": [{"flight_number": "BA123"}],
                    "pagination": {"current_page": 1, "limit": 100, "total": 1}
                }"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let envelope = client
            .fetch("flights", &params(&[("flight_number", "BA123")]))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "meta": {
                    "provider": "aviationstack",
                    "resource": "flights",
                    "page": 1,
                    "per_page": 100,
                    "total": 1
                },
                "items": [{"flight_number": "BA123"}],
                "raw": {
                    "data": [{"flight_number": "BA123"}],
                    "pagination": {"current_page": 1, "limit": 100, "total": 1}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_wraps_singleton_data() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/airports")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": {"iata_code": "LHR"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let envelope = client.fetch("airports", &Map::new()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(envelope.items, vec![json!({"iata_code": "LHR"})]);
        assert_eq!(envelope.meta.page, None);
    }

    #[tokio::test]
    async fn test_fetch_injects_credential_over_caller_value() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::UrlEncoded("access_key".into(), "test-key".into()))
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        client
            .fetch("flights", &params(&[("access_key", "spoofed")]))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_404_fails_immediately_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error": {"code": "404", "message": "not found"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code, Some("404".to_string()));
        assert_eq!(err.message, "not found");
        assert_eq!(err.status_code, Some(404));
        assert!(!err.retryable);
        assert!(!err.rate_limited);
    }

    #[tokio::test]
    async fn test_fetch_429_with_zero_retries_yields_terminal_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("Retry-After", "30")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), 0);
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code, Some("max_retries_exceeded".to_string()));
        assert!(!err.retryable);
        assert!(err.rate_limited);
        assert_eq!(err.retry_after_seconds, Some(30.0));
        assert_eq!(err.status_code, Some(429));
    }

    #[tokio::test]
    async fn test_fetch_5xx_retries_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/airlines")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let err = client.fetch("airlines", &Map::new()).await.unwrap_err();

        // Initial attempt plus two retries.
        mock.assert_async().await;
        assert_eq!(err.code, Some("max_retries_exceeded".to_string()));
        assert_eq!(err.status_code, Some(503));
        assert!(!err.rate_limited);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_fetch_body_rate_limit_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": {"code": "rate_limit_reached", "message": "quota exceeded"}}"#)
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server.url(), 1);
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code, Some("max_retries_exceeded".to_string()));
        assert!(err.rate_limited);
        assert_eq!(err.message, "quota exceeded");
        assert_eq!(err.retry_after_seconds, None);
    }

    #[tokio::test]
    async fn test_fetch_body_error_other_wording_fails_immediately() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"error": {"code": "invalid_access_key", "message": "access key invalid"}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code, Some("invalid_access_key".to_string()));
        assert!(!err.retryable);
        assert!(!err.rate_limited);
        assert_eq!(err.status_code, Some(200));
    }

    #[tokio::test]
    async fn test_fetch_non_json_2xx_body_is_unexpected_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code, Some("unexpected_error".to_string()));
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_backoff_doubles_between_retries() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let mut config = ClientConfig::new("test-key");
        config.base_url = server.url();
        config.max_retries = 2;
        config.backoff_seconds = 0.05;
        let client = AviationstackClient::new(config).unwrap();

        let start = Instant::now();
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(err.code, Some("max_retries_exceeded".to_string()));
        // Sleeps are 0.05 * 2^0 and 0.05 * 2^1 before retries 1 and 2.
        assert!(elapsed >= Duration::from_millis(150), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_fetch_non_429_4xx_ignores_retry_after_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("Retry-After", "30")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.retry_after_seconds, None);
        assert!(!err.rate_limited);
        assert_eq!(err.message, "HTTP 400 from Aviationstack");
    }

    #[tokio::test]
    async fn test_fetch_transport_failure_retries_until_exhausted() {
        // Grab a port the OS considers free, then release it so connections
        // are refused and no response is ever produced.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let mut config = ClientConfig::new("test-key");
        config.base_url = format!("http://127.0.0.1:{}/", port);
        config.max_retries = 1;
        config.backoff_seconds = 0.05;
        let client = AviationstackClient::new(config).unwrap();

        let start = Instant::now();
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();

        // The connect error classifies as retryable network_error, so one
        // backoff sleep and one retry run before the terminal shape is
        // surfaced.
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(err.code, Some("max_retries_exceeded".to_string()));
        assert!(!err.retryable);
        assert!(!err.rate_limited);
        assert_eq!(err.status_code, None);
        assert_eq!(err.retry_after_seconds, None);
        assert!(err.message.contains("Network error"));
    }

    #[tokio::test]
    async fn test_fetch_transport_failure_with_zero_retries() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = test_client(&format!("http://127.0.0.1:{}/", port), 0);
        let err = client.fetch("flights", &Map::new()).await.unwrap_err();
        assert_eq!(err.code, Some("max_retries_exceeded".to_string()));
    }

    #[test]
    fn test_new_rejects_negative_durations() {
        let mut config = ClientConfig::new("test-key");
        config.backoff_seconds = -1.0;
        let err = AviationstackClient::new(config).unwrap_err();
        assert_eq!(err.code, Some("client_initialization_failed".to_string()));
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_base_url_without_trailing_slash() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        // server.url() has no trailing slash.
        let client = test_client(&server.url(), 0);
        client.fetch("flights", &Map::new()).await.unwrap();
        mock.assert_async().await;
    }
}
