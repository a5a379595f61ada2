//! Outbound webhook HTTP client.
//!
//! One [`WebhookDispatcher::dispatch`] call is exactly one POST attempt.
//! There is no retry: the caller gets a classified [`DispatchResult`] and
//! decides whether to surface it or just log it.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};

use super::diagnostics::{classify_response, classify_transport, DispatchResult, RawResponse, TransportFailure};
use super::payload::WebhookPayload;
use crate::error::AppError;

/// Hard ceiling for a webhook round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const USER_AGENT: &str = "Storefront-Webhook/1.0";
pub const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
/// Header marking diagnostic sends.
pub const TEST_MARKER_HEADER: &str = "X-Webhook-Test";

/// Check that `url` is an absolute `http`/`https` URL.
pub fn validate_url(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url.trim()).map_err(|err| err.to_string())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("URL must use http or https, got '{}'", other)),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(parsed)
}

/// `Authorization` header value for `token`, if any.
///
/// Blank tokens produce no header; a token that already carries the
/// `Bearer ` prefix is passed through unchanged.
pub fn bearer_header(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        None
    } else if token.starts_with("Bearer ") {
        Some(token.to_string())
    } else {
        Some(format!("Bearer {}", token))
    }
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    http: Client,
}

impl WebhookDispatcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build HTTP client: {}", err)))?;
        Ok(Self { http })
    }

    /// POST `payload` to `url` once and classify the outcome.
    pub async fn dispatch(&self, url: &str, token: Option<&str>, payload: &WebhookPayload) -> DispatchResult {
        let target = match validate_url(url) {
            Ok(target) => target,
            Err(reason) => return DispatchResult::invalid_url(url, &reason),
        };

        let mut request = self
            .http
            .post(target)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_VALUE)
            .json(payload);

        if payload.test {
            request = request.header(TEST_MARKER_HEADER, "true");
        }
        if let Some(value) = token.and_then(bearer_header) {
            request = request.header(AUTHORIZATION, value);
        }

        tracing::debug!(event = %payload.event, url, test = payload.test, "Dispatching webhook");

        match request.send().await {
            Ok(response) => {
                let raw = read_response(response).await;
                classify_response(&raw, url)
            }
            Err(err) => classify_transport(&TransportFailure::from_reqwest(&err), url),
        }
    }
}

async fn read_response(response: reqwest::Response) -> RawResponse {
    let status = response.status();
    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let (body, body_error) = match response.text().await {
        Ok(body) => (body, None),
        Err(err) => {
            tracing::warn!("Failed to read webhook response body: {}", err);
            (String::new(), Some(err.to_string()))
        }
    };

    RawResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
        headers,
        body,
        body_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::net::TcpListener;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::webhooks::diagnostics::ErrorKind;
    use crate::webhooks::event::{EventKind, NotificationEvent};

    fn production_payload() -> WebhookPayload {
        WebhookPayload::from_event(&NotificationEvent::stock_alert(1, "Tea", 0, 5), false, Utc::now())
    }

    #[test]
    fn validate_url_rejects_non_urls() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("/webhook/stock").is_err());
        assert!(validate_url("ftp://example.com/hook").is_err());
        assert!(validate_url("https://n8n.example.com/webhook/stock").is_ok());
        assert!(validate_url("http://localhost:5678/webhook-test/sale").is_ok());
    }

    #[test]
    fn bearer_prefix_is_not_doubled() {
        assert_eq!(bearer_header("abc123").as_deref(), Some("Bearer abc123"));
        assert_eq!(bearer_header("Bearer abc123").as_deref(), Some("Bearer abc123"));
        assert_eq!(bearer_header("   "), None);
    }

    #[tokio::test]
    async fn invalid_url_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::new().unwrap();
        let result = dispatcher.dispatch("not a url", Some("t"), &production_payload()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::InvalidUrl));
        server.verify().await;
    }

    #[tokio::test]
    async fn sends_headers_and_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/stock"))
            .and(header("content-type", "application/json"))
            .and(header("user-agent", USER_AGENT))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({ "event": "stock_alert", "test": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::new().unwrap();
        let url = format!("{}/webhook/stock", server.uri());
        let result = dispatcher.dispatch(&url, Some("Bearer secret"), &production_payload()).await;

        assert!(result.success, "{:?}", result);
        assert_eq!(result.http_status, Some(200));
        assert_eq!(result.response_body.unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn test_payload_carries_marker_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(TEST_MARKER_HEADER, "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::new().unwrap();
        let payload = WebhookPayload::test_for(EventKind::Sale, Utc::now());
        let result = dispatcher.dispatch(&server.uri(), None, &payload).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn not_found_response_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("The requested webhook is not registered"))
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::new().unwrap();
        let result = dispatcher.dispatch(&server.uri(), None, &production_payload()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::HttpError));
        assert_eq!(result.http_status, Some(404));
        assert!(result.message.contains("webhook not found"));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let dispatcher = WebhookDispatcher::with_timeout(Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let result = dispatcher.dispatch(&server.uri(), None, &production_payload()).await;

        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn closed_port_is_connection_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let dispatcher = WebhookDispatcher::new().unwrap();
        let result = dispatcher
            .dispatch(&format!("http://127.0.0.1:{}/hook", port), None, &production_payload())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::ConnectionRefused));
    }

    #[tokio::test]
    async fn unknown_host_is_dns_failure() {
        let dispatcher = WebhookDispatcher::new().unwrap();
        let result = dispatcher
            .dispatch("http://no-such-host.invalid/webhook/stock", None, &production_payload())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::DnsFailure));
        assert!(result.suggestion.is_some());
    }
}
