//! Page-speed report provider.
//!
//! Calls the public PageSpeed Insights endpoint once per pass and extracts the
//! performance score plus the headline lighthouse audits. Every field of the
//! response may be absent; only a missing `lighthouseResult` or an `error`
//! object fails the request.

use crate::error::SampleError;
use crate::models::AuditSummary;
use crate::sampler::ReportProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Default PageSpeed Insights endpoint.
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Audit carrying the duration used as the regional base load time.
pub const LCP_AUDIT: &str = "largest-contentful-paint";

/// Audits shown in reports, in display order.
pub const HEADLINE_AUDITS: [&str; 6] = [
    "first-contentful-paint",
    LCP_AUDIT,
    "total-blocking-time",
    "cumulative-layout-shift",
    "speed-index",
    "interactive",
];

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: Option<LighthouseResult>,
    error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: Categories,
    #[serde(default)]
    audits: HashMap<String, Audit>,
}

#[derive(Debug, Default, Deserialize)]
struct Categories {
    performance: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
}

/// A single lighthouse audit entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Audit {
    pub title: Option<String>,
    #[serde(rename = "displayValue")]
    pub display_value: Option<String>,
    #[serde(rename = "numericValue")]
    pub numeric_value: Option<f64>,
}

/// The parts of a page-speed report the sampler uses.
#[derive(Debug, Clone, Default)]
pub struct PerformanceReport {
    /// Performance category score in `[0, 1]`.
    pub score: Option<f64>,
    pub audits: HashMap<String, Audit>,
}

impl PerformanceReport {
    /// Decode a raw response body.
    pub fn from_json(body: &str) -> Result<Self, SampleError> {
        let response: ApiResponse =
            serde_json::from_str(body).map_err(|e| SampleError::Decode(e.to_string()))?;

        if let Some(error) = response.error {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            return Err(SampleError::Provider(message));
        }

        let result = response.lighthouse_result.ok_or(SampleError::MissingReport)?;

        Ok(Self {
            score: result.categories.performance.and_then(|p| p.score),
            audits: result.audits,
        })
    }

    /// Score scaled to `0..=100`.
    pub fn score_percent(&self) -> Option<u8> {
        self.score
            .filter(|s| s.is_finite())
            .map(|s| (s.clamp(0.0, 1.0) * 100.0).round() as u8)
    }

    /// Largest contentful paint in milliseconds.
    ///
    /// The display string is preferred; the numeric value is the fallback.
    pub fn largest_contentful_paint_ms(&self) -> Option<f64> {
        let audit = self.audits.get(LCP_AUDIT)?;
        audit
            .display_value
            .as_deref()
            .and_then(parse_duration_ms)
            .or(audit.numeric_value)
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
    }

    /// Headline audits present in the report, in display order.
    pub fn headline_audits(&self) -> Vec<AuditSummary> {
        HEADLINE_AUDITS
            .iter()
            .filter_map(|id| {
                let audit = self.audits.get(*id)?;
                let display_value = audit.display_value.clone()?;
                Some(AuditSummary {
                    id: id.to_string(),
                    title: audit.title.clone().unwrap_or_else(|| id.to_string()),
                    display_value,
                })
            })
            .collect()
    }
}

/// Parse a human-readable duration such as `2.4 s`, `850 ms` or `1,200 ms`.
///
/// Returns `None` for values that are not durations (e.g. layout-shift scores).
pub fn parse_duration_ms(text: &str) -> Option<f64> {
    let text = text.replace('\u{a0}', " ");
    let text = text.trim();

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number.replace(',', "").parse().ok()?;

    match unit.trim() {
        "ms" => Some(value),
        "s" => Some(value * 1000.0),
        "min" => Some(value * 60_000.0),
        _ => None,
    }
}

/// HTTP client for the PageSpeed Insights API.
pub struct PageSpeedClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    strategy: String,
    timeout_seconds: u64,
}

impl PageSpeedClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        strategy: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
            api_key,
            strategy: strategy.into(),
            timeout_seconds,
        })
    }

    fn query(&self, target: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("url", target.to_string()),
            ("strategy", self.strategy.clone()),
        ];
        if let Some(ref key) = self.api_key {
            query.push(("key", key.clone()));
        }
        query
    }
}

#[async_trait]
impl ReportProvider for PageSpeedClient {
    async fn fetch(&self, target: &str) -> Result<PerformanceReport, SampleError> {
        info!("Requesting page-speed report for {}", target);

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&self.query(target))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SampleError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    SampleError::Connect(self.api_url.clone())
                } else {
                    SampleError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SampleError::Request(e.to_string()))?;
        debug!("Report response: HTTP {} ({} bytes)", status, body.len());

        if !status.is_success() {
            // Prefer the provider's own message when the body carries one
            return match PerformanceReport::from_json(&body) {
                Err(SampleError::Provider(message)) => Err(SampleError::Provider(message)),
                _ => Err(SampleError::Http {
                    status: status.as_u16(),
                    body,
                }),
            };
        }

        PerformanceReport::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const FULL_REPORT: &str = r#"{
        "id": "https://example.com/",
        "lighthouseResult": {
            "categories": { "performance": { "score": 0.87 } },
            "audits": {
                "first-contentful-paint": { "title": "First Contentful Paint", "displayValue": "1.1\u00a0s", "numericValue": 1104.2 },
                "largest-contentful-paint": { "title": "Largest Contentful Paint", "displayValue": "2.4\u00a0s", "numericValue": 2391.7 },
                "total-blocking-time": { "title": "Total Blocking Time", "displayValue": "120\u00a0ms", "numericValue": 120 },
                "cumulative-layout-shift": { "title": "Cumulative Layout Shift", "displayValue": "0.02", "numericValue": 0.02 },
                "speed-index": { "title": "Speed Index", "displayValue": "3.0\u00a0s" },
                "unused-javascript": { "title": "Reduce unused JavaScript" }
            }
        }
    }"#;

    #[test]
    fn test_parse_full_report() {
        let report = PerformanceReport::from_json(FULL_REPORT).unwrap();

        assert_eq!(report.score_percent(), Some(87));
        assert_eq!(report.largest_contentful_paint_ms(), Some(2400.0));

        let audits = report.headline_audits();
        let ids: Vec<_> = audits.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "first-contentful-paint",
                "largest-contentful-paint",
                "total-blocking-time",
                "cumulative-layout-shift",
                "speed-index",
            ]
        );
        assert_eq!(audits[2].display_value, "120\u{a0}ms");
    }

    #[test]
    fn test_error_body_is_reported() {
        let body = r#"{"error": {"code": 500, "message": "Lighthouse returned error: NO_FCP"}}"#;
        let err = PerformanceReport::from_json(body).unwrap_err();

        assert!(matches!(err, SampleError::Provider(_)));
        assert!(err.to_string().contains("NO_FCP"));
    }

    #[test]
    fn test_error_without_message() {
        let body = r#"{"error": "quota exceeded"}"#;
        let err = PerformanceReport::from_json(body).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_missing_lighthouse_result() {
        let err = PerformanceReport::from_json(r#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, SampleError::MissingReport));
    }

    #[test]
    fn test_invalid_json() {
        let err = PerformanceReport::from_json("<html>").unwrap_err();
        assert!(matches!(err, SampleError::Decode(_)));
    }

    #[test]
    fn test_absent_fields_are_tolerated() {
        let report = PerformanceReport::from_json(r#"{"lighthouseResult": {}}"#).unwrap();

        assert_eq!(report.score_percent(), None);
        assert_eq!(report.largest_contentful_paint_ms(), None);
        assert!(report.headline_audits().is_empty());
    }

    #[test]
    fn test_lcp_falls_back_to_numeric_value() {
        let body = r#"{"lighthouseResult": {"audits": {
            "largest-contentful-paint": { "displayValue": "n/a", "numericValue": 1830.5 }
        }}}"#;
        let report = PerformanceReport::from_json(body).unwrap();
        assert_eq!(report.largest_contentful_paint_ms(), Some(1830.5));
    }

    #[test]
    fn test_parse_duration_ms() {
        assert_eq!(parse_duration_ms("2.4 s"), Some(2400.0));
        assert_eq!(parse_duration_ms("850 ms"), Some(850.0));
        assert_eq!(parse_duration_ms("1,250\u{a0}ms"), Some(1250.0));
        assert_eq!(parse_duration_ms(" 3s "), Some(3000.0));
        assert_eq!(parse_duration_ms("1.5 min"), Some(90_000.0));
        assert_eq!(parse_duration_ms("0.02"), None);
        assert_eq!(parse_duration_ms(""), None);
        assert_eq!(parse_duration_ms("fast"), None);
    }

    #[test]
    fn test_query_includes_strategy_and_key() {
        let client = PageSpeedClient::new(DEFAULT_API_URL, Some("k".to_string()), "mobile", 10)
            .unwrap();
        let query = client.query("https://example.com");

        assert!(query.contains(&("url", "https://example.com".to_string())));
        assert!(query.contains(&("strategy", "mobile".to_string())));
        assert!(query.contains(&("key", "k".to_string())));
    }

    /// Serve one canned HTTP response on a local port.
    ///
    /// Returns the endpoint URL and a handle yielding the request head.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        (format!("http://{}/runPagespeed", addr), handle)
    }

    #[tokio::test]
    async fn test_fetch_parses_successful_response() {
        let (url, server) = serve_once("200 OK", FULL_REPORT).await;
        let client = PageSpeedClient::new(url, None, "desktop", 5).unwrap();

        let report = client.fetch("https://example.com").await.unwrap();
        assert_eq!(report.score_percent(), Some(87));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /runPagespeed?"));
        assert!(request.contains("strategy=desktop"));
        assert!(request.contains("url=https%3A%2F%2Fexample.com"));
    }

    #[tokio::test]
    async fn test_fetch_error_status_with_provider_message() {
        let (url, _server) = serve_once(
            "400 Bad Request",
            r#"{"error": {"code": 400, "message": "Invalid value at 'url'"}}"#,
        )
        .await;
        let client = PageSpeedClient::new(url, None, "mobile", 5).unwrap();

        let err = client.fetch("not-a-url").await.unwrap_err();
        match err {
            SampleError::Provider(message) => assert!(message.contains("Invalid value")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_error_status_with_plain_body() {
        let (url, _server) = serve_once("500 Internal Server Error", "upstream failure").await;
        let client = PageSpeedClient::new(url, None, "mobile", 5).unwrap();

        let err = client.fetch("https://example.com").await.unwrap_err();
        match err {
            SampleError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream failure");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{}/runPagespeed", addr);
        let client = PageSpeedClient::new(url.clone(), None, "mobile", 5).unwrap();

        let err = client.fetch("https://example.com").await.unwrap_err();
        match err {
            SampleError::Connect(endpoint) => assert_eq!(endpoint, url),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without answering
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let url = format!("http://{}/runPagespeed", addr);
        let client = PageSpeedClient::new(url, None, "mobile", 1).unwrap();

        let err = client.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, SampleError::Timeout(1)));
    }
}
