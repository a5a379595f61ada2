//! Connectivity diagnostics.
//!
//! Turns the raw outcome of a dispatch (a transport failure or an HTTP
//! response) into a [`DispatchResult`] with an error category, a human
//! message and a remediation hint. Everything in here is pure: the same
//! input always classifies the same way.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::io;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dispatcher::DEFAULT_TIMEOUT;

/// Failure categories for a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "InvalidURL")]
    InvalidUrl,
    Timeout,
    #[serde(rename = "DNSFailure")]
    DnsFailure,
    ConnectionRefused,
    NetworkError,
    #[serde(rename = "HTTPError")]
    HttpError,
    /// 2xx response whose body was not JSON. Non-fatal.
    ParseError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "InvalidURL",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::DnsFailure => "DNSFailure",
            ErrorKind::ConnectionRefused => "ConnectionRefused",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::HttpError => "HTTPError",
            ErrorKind::ParseError => "ParseError",
        }
    }
}

/// Why a request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Dns,
    ConnectionRefused,
    Other { name: String, detail: String },
}

impl TransportFailure {
    /// Categorise a `reqwest` error by inspecting it and its source chain.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportFailure::Timeout;
        }

        let mut source: Option<&(dyn StdError + 'static)> = err.source();
        let mut chain = vec![err.to_string()];
        while let Some(cause) = source {
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                match io_err.kind() {
                    io::ErrorKind::ConnectionRefused => return TransportFailure::ConnectionRefused,
                    io::ErrorKind::TimedOut => return TransportFailure::Timeout,
                    _ => {}
                }
            }
            chain.push(cause.to_string());
            source = cause.source();
        }

        let text = chain.join(": ");
        Self::from_message(
            if err.is_connect() { "ConnectError" } else { "RequestError" },
            &text,
        )
    }

    /// Fallback categorisation from the rendered error text.
    pub fn from_message(name: &str, text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        if lower.contains("dns error")
            || lower.contains("failed to lookup address")
            || lower.contains("name or service not known")
            || lower.contains("no such host")
        {
            TransportFailure::Dns
        } else if lower.contains("connection refused") {
            TransportFailure::ConnectionRefused
        } else if lower.contains("timed out") {
            TransportFailure::Timeout
        } else {
            TransportFailure::Other {
                name: name.to_string(),
                detail: text.to_string(),
            }
        }
    }
}

/// A response as received from the webhook endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Set when the headers arrived but reading the body failed.
    pub body_error: Option<String>,
}

/// The structured outcome of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DispatchResult {
    pub fn invalid_url(url: &str, reason: &str) -> Self {
        Self {
            success: false,
            http_status: None,
            response_body: None,
            error_kind: Some(ErrorKind::InvalidUrl),
            message: format!("Invalid webhook URL: {}", reason),
            suggestion: Some(
                "Use an absolute http:// or https:// URL, e.g. https://your-n8n.com/webhook/workflow-name"
                    .to_string(),
            ),
            details: Some(serde_json::json!({ "url": url })),
        }
    }

    /// HTTP status returned by the admin "test webhook" endpoint.
    pub fn admin_status(&self) -> StatusCode {
        if self.success {
            return StatusCode::OK;
        }
        match self.error_kind {
            Some(ErrorKind::Timeout) => StatusCode::REQUEST_TIMEOUT,
            Some(ErrorKind::DnsFailure) => StatusCode::NOT_FOUND,
            Some(ErrorKind::ConnectionRefused) => StatusCode::SERVICE_UNAVAILABLE,
            Some(ErrorKind::NetworkError) => StatusCode::INTERNAL_SERVER_ERROR,
            Some(ErrorKind::InvalidUrl)
            | Some(ErrorKind::HttpError)
            | Some(ErrorKind::ParseError)
            | None => StatusCode::BAD_REQUEST,
        }
    }
}

/// Classify a request that never completed.
pub fn classify_transport(failure: &TransportFailure, url: &str) -> DispatchResult {
    let (kind, message, suggestion, details) = match failure {
        TransportFailure::Timeout => (
            ErrorKind::Timeout,
            format!(
                "Timeout: webhook did not respond within {} seconds",
                DEFAULT_TIMEOUT.as_secs()
            ),
            "Check that the webhook server is online and responding quickly",
            serde_json::json!({ "url": url }),
        ),
        TransportFailure::Dns => (
            ErrorKind::DnsFailure,
            "Domain not found: could not resolve the URL's host".to_string(),
            "Check that the URL is correct and the domain exists",
            serde_json::json!({ "url": url }),
        ),
        TransportFailure::ConnectionRefused => (
            ErrorKind::ConnectionRefused,
            "Connection refused: the server is not accepting connections".to_string(),
            "Check that the webhook server is running and reachable",
            serde_json::json!({ "url": url }),
        ),
        TransportFailure::Other { name, detail } => (
            ErrorKind::NetworkError,
            format!("Connectivity error: {}", detail),
            "Check your internet connection and that the URL is reachable",
            serde_json::json!({ "url": url, "name": name }),
        ),
    };

    DispatchResult {
        success: false,
        http_status: None,
        response_body: None,
        error_kind: Some(kind),
        message,
        suggestion: Some(suggestion.to_string()),
        details: Some(details),
    }
}

/// Message and suggestion for a non-2xx status.
pub fn http_status_hint(status: u16, status_text: &str) -> (String, &'static str) {
    let (reason, suggestion) = match status {
        400 => (
            "invalid data sent to the webhook",
            "Check that the webhook accepts the JSON format being sent",
        ),
        401 => (
            "authentication token invalid or missing",
            "Check that the n8n token is correct and valid",
        ),
        403 => (
            "access to the webhook denied",
            "Check the token permissions or the endpoint's security settings",
        ),
        404 => (
            "webhook not found",
            "Check that the URL is correct and the endpoint exists in n8n. Example: https://your-n8n.com/webhook/workflow-name",
        ),
        405 => (
            "method not allowed",
            "The webhook must accept POST requests",
        ),
        408 => (
            "request timeout",
            "The webhook took too long to respond",
        ),
        429 => (
            "too many requests",
            "Wait a few minutes before testing again",
        ),
        500 => (
            "internal error on the webhook server",
            "Check the n8n logs for more details",
        ),
        502 => (
            "bad gateway",
            "The webhook server is unavailable or has proxy problems",
        ),
        503 => (
            "service unavailable",
            "The webhook server is temporarily unavailable",
        ),
        _ => {
            let reason = if status_text.is_empty() { "unknown error" } else { status_text };
            return (
                format!("Webhook returned error {}: {}", status, reason),
                "Check the webhook configuration in n8n",
            );
        }
    };

    (format!("Webhook returned error {}: {}", status, reason), suggestion)
}

/// Parse a response body as JSON, falling back to the raw text.
///
/// Returns the body value and whether JSON parsing failed on a non-empty body.
pub fn parse_body(body: &str) -> (Option<Value>, bool) {
    if body.is_empty() {
        return (None, false);
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => (Some(value), false),
        Err(_) => (Some(Value::String(body.to_string())), true),
    }
}

/// Classify a response that was received.
pub fn classify_response(raw: &RawResponse, url: &str) -> DispatchResult {
    let (body, parse_failed) = parse_body(&raw.body);

    if (200..300).contains(&raw.status) {
        let mut details = serde_json::json!({
            "status": raw.status,
            "statusText": raw.status_text,
            "data": body,
            "headers": raw.headers,
        });
        let message = match &raw.body_error {
            Some(err) => {
                details["bodyError"] = Value::String(err.clone());
                format!("Webhook responded with {} but the body could not be read", raw.status)
            }
            None => format!("Webhook responded with {}", raw.status),
        };
        return DispatchResult {
            success: true,
            http_status: Some(raw.status),
            response_body: body.clone(),
            error_kind: (parse_failed || raw.body_error.is_some()).then_some(ErrorKind::ParseError),
            message,
            suggestion: None,
            details: Some(details),
        };
    }

    let (message, suggestion) = http_status_hint(raw.status, &raw.status_text);
    DispatchResult {
        success: false,
        http_status: Some(raw.status),
        response_body: body.clone(),
        error_kind: Some(ErrorKind::HttpError),
        message,
        suggestion: Some(suggestion.to_string()),
        details: Some(serde_json::json!({
            "status": raw.status,
            "statusText": raw.status_text,
            "url": url,
            "responseBody": body,
            "headers": raw.headers,
            "bodyError": raw.body_error,
        })),
    }
}
