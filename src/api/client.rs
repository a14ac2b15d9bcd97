use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::types::{Envelope, Run, Schedule, SchedulePayload, Target, TargetPayload};
use super::{ApiError, Backend};
use crate::config::ApiConfig;
use crate::filters::RunFilters;

/// reqwest-backed implementation of [`Backend`].
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        if !envelope.success {
            return Err(ApiError::Backend {
                status: envelope.status_code,
                message: envelope.message,
            });
        }
        Ok(envelope.data)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        kind: &'static str,
        id: Uuid,
    ) -> Result<T, ApiError> {
        self.send(request).await?.ok_or_else(|| ApiError::NotFound {
            kind,
            id: id.to_string(),
        })
    }

    async fn fetch_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, ApiError> {
        Ok(self.send(request).await?.unwrap_or_default())
    }
}

/// Pull a human-readable message out of an error body: the envelope's
/// `message`, or a FastAPI `detail` (string or validation list).
fn error_message(body: &Value) -> Option<String> {
    if let Some(detail) = body.get("detail") {
        match detail {
            Value::String(s) if !s.is_empty() => return Some(s.clone()),
            Value::Array(items) => {
                if let Some(msg) = items.first().and_then(|i| i.get("msg")).and_then(Value::as_str) {
                    return Some(msg.to_string());
                }
            }
            _ => {}
        }
    }
    body.get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_targets(&self) -> Result<Vec<Target>, ApiError> {
        self.fetch_list(self.client.get(self.url("/targets"))).await
    }

    async fn get_target(&self, id: Uuid) -> Result<Target, ApiError> {
        let req = self.client.get(self.url(&format!("/targets/{id}")));
        self.fetch(req, "target", id).await
    }

    async fn create_target(&self, payload: &TargetPayload) -> Result<Target, ApiError> {
        let req = self.client.post(self.url("/targets")).json(payload);
        self.send(req).await?.ok_or_else(|| ApiError::Backend {
            status: 200,
            message: "create returned no target".into(),
        })
    }

    async fn update_target(&self, id: Uuid, payload: &TargetPayload) -> Result<Target, ApiError> {
        let req = self.client.put(self.url(&format!("/targets/{id}"))).json(payload);
        self.fetch(req, "target", id).await
    }

    async fn delete_target(&self, id: Uuid) -> Result<(), ApiError> {
        let req = self.client.delete(self.url(&format!("/targets/{id}")));
        self.send::<Value>(req).await.map(|_| ())
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>, ApiError> {
        self.fetch_list(self.client.get(self.url("/schedules"))).await
    }

    async fn get_schedule(&self, id: Uuid) -> Result<Schedule, ApiError> {
        let req = self.client.get(self.url(&format!("/schedules/{id}")));
        self.fetch(req, "schedule", id).await
    }

    async fn create_schedule(&self, payload: &SchedulePayload) -> Result<Schedule, ApiError> {
        let req = self.client.post(self.url("/schedules")).json(payload);
        self.send(req).await?.ok_or_else(|| ApiError::Backend {
            status: 200,
            message: "create returned no schedule".into(),
        })
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        payload: &SchedulePayload,
    ) -> Result<Schedule, ApiError> {
        let req = self.client.put(self.url(&format!("/schedules/{id}"))).json(payload);
        self.fetch(req, "schedule", id).await
    }

    async fn delete_schedule(&self, id: Uuid) -> Result<(), ApiError> {
        let req = self.client.delete(self.url(&format!("/schedules/{id}")));
        self.send::<Value>(req).await.map(|_| ())
    }

    async fn pause_schedule(&self, id: Uuid) -> Result<Schedule, ApiError> {
        let req = self.client.post(self.url(&format!("/schedules/{id}/pause")));
        self.fetch(req, "schedule", id).await
    }

    async fn resume_schedule(&self, id: Uuid) -> Result<Schedule, ApiError> {
        let req = self.client.post(self.url(&format!("/schedules/{id}/resume")));
        self.fetch(req, "schedule", id).await
    }

    async fn list_schedule_runs(
        &self,
        id: Uuid,
        filters: &RunFilters,
    ) -> Result<Vec<Run>, ApiError> {
        let mut params = filters.to_params();
        params.retain(|(key, _)| *key != "schedule_id");
        let req = self
            .client
            .get(self.url(&format!("/schedules/{id}/runs")))
            .query(&params);
        self.fetch_list(req).await
    }

    async fn list_runs(&self, filters: &RunFilters) -> Result<Vec<Run>, ApiError> {
        let req = self.client.get(self.url("/runs")).query(&filters.to_params());
        self.fetch_list(req).await
    }

    async fn get_run(&self, id: Uuid) -> Result<Run, ApiError> {
        let req = self.client.get(self.url(&format!("/runs/{id}")));
        self.fetch(req, "run", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_prefers_detail() {
        let body = json!({"detail": "Schedule not found", "message": "ignored"});
        assert_eq!(error_message(&body).as_deref(), Some("Schedule not found"));
    }

    #[test]
    fn test_error_message_from_validation_list() {
        let body = json!({"detail": [{"loc": ["body", "name"], "msg": "field required"}]});
        assert_eq!(error_message(&body).as_deref(), Some("field required"));
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = json!({"success": false, "status_code": 400, "message": "bad target"});
        assert_eq!(error_message(&body).as_deref(), Some("bad target"));
        assert_eq!(error_message(&json!({})), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new(&ApiConfig {
            base_url: "http://localhost:8000/".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(backend.url("/runs"), "http://localhost:8000/runs");
    }
}
