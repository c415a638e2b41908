use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::types::InferencePayload;

/// Status and raw body of one inference call.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: u16,
    pub body: String,
}

impl BackendReply {
    pub fn is_loading(&self) -> bool {
        self.status == 503
    }
}

/// Transport to the hosted inference service. `Err` means the request never produced a reply.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn post(
        &self,
        url: &str,
        token: &str,
        payload: &InferencePayload<'_>,
    ) -> Result<BackendReply>;
}

pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    #[tracing::instrument(skip(self, token, payload), fields(input_len = payload.inputs.len()))]
    async fn post(
        &self,
        url: &str,
        token: &str,
        payload: &InferencePayload<'_>,
    ) -> Result<BackendReply> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(status, body_len = body.len(), "Inference endpoint replied");

        Ok(BackendReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn flaky_model(
        State(calls): State<Arc<AtomicUsize>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, String) {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if auth != "Bearer hf_test" {
            return (StatusCode::UNAUTHORIZED, "bad token".into());
        }
        if call == 0 {
            return (StatusCode::SERVICE_UNAVAILABLE, "loading".into());
        }
        let reply = serde_json::json!([[{"label": "POSITIVE", "score": 0.9}], body["inputs"]]);
        (StatusCode::OK, reply.to_string())
    }

    #[tokio::test]
    async fn posts_json_with_bearer_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/models/test", post(flaky_model))
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let backend = HttpBackend::new(Duration::from_secs(5)).unwrap();
        let url = format!("http://{addr}/models/test");
        let payload = InferencePayload { inputs: "hello" };

        let first = backend.post(&url, "hf_test", &payload).await.unwrap();
        assert!(first.is_loading());

        let second = backend.post(&url, "hf_test", &payload).await.unwrap();
        assert_eq!(second.status, 200);
        let body: serde_json::Value = serde_json::from_str(&second.body).unwrap();
        assert_eq!(body[1], "hello");

        let denied = backend.post(&url, "wrong", &payload).await.unwrap();
        assert_eq!(denied.status, 401);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(Duration::from_secs(2)).unwrap();
        let payload = InferencePayload { inputs: "hello" };
        let result = backend
            .post(&format!("http://{addr}/models/x"), "hf_test", &payload)
            .await;
        assert!(result.is_err());
    }
}
