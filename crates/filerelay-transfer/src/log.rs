//! Transfer history clients.

use async_trait::async_trait;
use tracing::debug;

use filerelay_core::error::{AppError, ErrorKind};
use filerelay_core::result::AppResult;
use filerelay_core::traits::TransferLog;
use filerelay_core::types::TransferRecord;

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransferLog;

#[async_trait]
impl TransferLog for NoopTransferLog {
    async fn record(&self, record: TransferRecord) -> AppResult<()> {
        debug!(file = %record.file_name, "Transfer log disabled, record dropped");
        Ok(())
    }
}

/// Posts records as JSON to a history service.
#[derive(Debug, Clone)]
pub struct HttpTransferLog {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpTransferLog {
    /// Client posting to `url`, optionally with a bearer token.
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl TransferLog for HttpTransferLog {
    async fn record(&self, record: TransferRecord) -> AppResult<()> {
        let mut request = self.client.post(&self.url).json(&record);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Transfer history request failed: {e}"),
                e,
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external(format!(
                "Transfer history service returned {status}"
            )));
        }

        debug!(file = %record.file_name, receiver = %record.receiver, "Transfer logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    use filerelay_core::types::{TransferStatus, UserId};

    use super::*;

    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
    }

    async fn history_stub(status: StatusCode) -> (String, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route(
                "/api/transfers",
                post(
                    move |State(seen): State<Seen>,
                          headers: HeaderMap,
                          axum::Json(body): axum::Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        seen.requests.lock().expect("lock").push((auth, body));
                        status
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}/api/transfers"), seen)
    }

    fn record() -> TransferRecord {
        TransferRecord::now(
            UserId::new("alice"),
            UserId::new("bob"),
            "notes.txt".to_string(),
            5,
            "text/plain".to_string(),
            TransferStatus::Completed,
        )
    }

    #[tokio::test]
    async fn test_posts_record_with_bearer_token() {
        let (url, seen) = history_stub(StatusCode::CREATED).await;
        let log = HttpTransferLog::new(url, Some("secret".to_string()));

        log.record(record()).await.expect("record");

        let requests = seen.requests.lock().expect("lock").clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.as_deref(), Some("Bearer secret"));
        assert_eq!(requests[0].1["fileName"], "notes.txt");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_external_error() {
        let (url, _seen) = history_stub(StatusCode::SERVICE_UNAVAILABLE).await;
        let log = HttpTransferLog::new(url, None);

        let err = log.record(record()).await.expect_err("503");

        assert_eq!(err.kind, ErrorKind::ExternalService);
        assert!(err.message.contains("503"));
    }
}
