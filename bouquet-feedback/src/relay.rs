//! Best-effort relay to the remote collector
//!
//! The collector is an opaque endpoint, typically a spreadsheet script.
//! Records are posted once as JSON text with a `text/plain` content type;
//! nothing in the response is relied upon. Every failure is returned as a
//! [`TransportFailure`] for the pipeline to log.

use async_trait::async_trait;
use bouquet_common::config::{PayloadLayout, RelayConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportFailure;
use crate::record::FeedbackRecord;
use crate::schema::Draft;

const USER_AGENT: &str = concat!("bouquet-feedback/", env!("CARGO_PKG_VERSION"));
const CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Sink for normalized records
#[async_trait]
pub trait Relay: Send + Sync {
    async fn send(&self, record: &FeedbackRecord) -> Result<(), TransportFailure>;
}

/// Body posted to the collector for `record`
pub fn payload(record: &FeedbackRecord, layout: PayloadLayout) -> Value {
    match layout {
        PayloadLayout::Canonical => Draft::from(record).into_value(),
        PayloadLayout::Sheet => json!({
            "Nazwa_bukietu": record.subject_name,
            "Zadowolon": record.satisfied.sheet_label(),
            "Ocena": record.rating.value(),
            "Komentarz": record.comment,
        }),
    }
}

/// Relay over HTTP POST
pub struct HttpRelay {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    layout: PayloadLayout,
}

impl HttpRelay {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        layout: PayloadLayout,
    ) -> Result<Self, TransportFailure> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportFailure::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            timeout,
            layout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn send(&self, record: &FeedbackRecord) -> Result<(), TransportFailure> {
        let body = serde_json::to_string(&payload(record, self.layout))
            .map_err(|e| TransportFailure::Encode(e.to_string()))?;

        debug!(endpoint = %self.endpoint, subject = %record.subject_name, "Relaying feedback");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportFailure::Timeout(self.timeout.as_secs())
                } else {
                    TransportFailure::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportFailure::Status(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TransportFailure::UnreadableResponse(e.to_string()))?;

        debug!(status = status.as_u16(), bytes = text.len(), "Collector accepted feedback");
        Ok(())
    }
}

/// Used when no collector endpoint is configured
pub struct NoopRelay;

#[async_trait]
impl Relay for NoopRelay {
    async fn send(&self, record: &FeedbackRecord) -> Result<(), TransportFailure> {
        debug!(subject = %record.subject_name, "No collector configured, relay skipped");
        Ok(())
    }
}

/// Relay for the given configuration
pub fn from_config(config: &RelayConfig) -> Result<Arc<dyn Relay>, TransportFailure> {
    match config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => Ok(Arc::new(HttpRelay::new(
            endpoint,
            Duration::from_secs(config.timeout_secs),
            config.payload,
        )?)),
        None => Ok(Arc::new(NoopRelay)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Rating, Satisfaction};
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use tokio::sync::mpsc;

    fn record() -> FeedbackRecord {
        FeedbackRecord {
            subject_name: "Spring Mix".to_string(),
            satisfied: Satisfaction::No,
            rating: Rating::new(2).unwrap(),
            comment: "Wilted".to_string(),
            submitted_at: None,
        }
    }

    /// Collector stub answering with `status`; forwards (content-type, body)
    async fn spawn_collector(status: StatusCode) -> (String, mpsc::UnboundedReceiver<(String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/exec",
            post(move |headers: HeaderMap, body: String| {
                let tx = tx.clone();
                async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let _ = tx.send((content_type, body));
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/exec", addr), rx)
    }

    #[test]
    fn test_canonical_payload() {
        let body = payload(&record(), PayloadLayout::Canonical);
        assert_eq!(body["subjectName"], "Spring Mix");
        assert_eq!(body["satisfied"], "no");
        assert_eq!(body["rating"], 2);
        assert_eq!(body["comment"], "Wilted");
    }

    #[test]
    fn test_sheet_payload() {
        let body = payload(&record(), PayloadLayout::Sheet);
        assert_eq!(body["Nazwa_bukietu"], "Spring Mix");
        assert_eq!(body["Zadowolon"], "Nie");
        assert_eq!(body["Ocena"], 2);
        assert_eq!(body["Komentarz"], "Wilted");
    }

    #[tokio::test]
    async fn test_http_relay_posts_text_json() {
        let (url, mut rx) = spawn_collector(StatusCode::OK).await;
        let relay = HttpRelay::new(url, Duration::from_secs(5), PayloadLayout::Canonical).unwrap();

        relay.send(&record()).await.unwrap();

        let (content_type, body) = rx.recv().await.unwrap();
        assert_eq!(content_type, "text/plain;charset=utf-8");
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["subjectName"], "Spring Mix");
    }

    #[tokio::test]
    async fn test_http_relay_reports_status() {
        let (url, _rx) = spawn_collector(StatusCode::INTERNAL_SERVER_ERROR).await;
        let relay = HttpRelay::new(url, Duration::from_secs(5), PayloadLayout::Sheet).unwrap();

        assert_eq!(
            relay.send(&record()).await,
            Err(TransportFailure::Status(500))
        );
    }

    #[tokio::test]
    async fn test_http_relay_unreachable_collector() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let relay = HttpRelay::new(
            format!("http://{}/exec", addr),
            Duration::from_secs(5),
            PayloadLayout::Canonical,
        )
        .unwrap();

        assert!(matches!(
            relay.send(&record()).await,
            Err(TransportFailure::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_http_relay_times_out() {
        let app = Router::new().route(
            "/exec",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                StatusCode::OK
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let relay = HttpRelay::new(
            format!("http://{}/exec", addr),
            Duration::from_secs(1),
            PayloadLayout::Canonical,
        )
        .unwrap();

        assert_eq!(
            relay.send(&record()).await,
            Err(TransportFailure::Timeout(1))
        );
    }

    #[tokio::test]
    async fn test_http_relay_truncated_response_is_unreadable() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises a longer body than it sends, then closes the connection
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\nshort")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let relay = HttpRelay::new(
            format!("http://{}/exec", addr),
            Duration::from_secs(5),
            PayloadLayout::Canonical,
        )
        .unwrap();

        assert!(matches!(
            relay.send(&record()).await,
            Err(TransportFailure::UnreadableResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_without_endpoint_is_noop() {
        let relay = from_config(&RelayConfig::default()).unwrap();
        assert!(relay.send(&record()).await.is_ok());
    }
}
