//! API layer -- the scheduler's REST contract and the client that speaks it.

mod client;
pub mod types;

pub use self::client::HttpBackend;
pub use self::types::{
    Envelope, Redirect, Run, Schedule, ScheduleMode, SchedulePayload, Target, TargetPayload,
};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::filters::RunFilters;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid JSON in {field}")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} must be a whole number")]
    InvalidNumber { field: &'static str },

    #[error("{field} must be a valid id")]
    InvalidId { field: &'static str },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
}

impl ApiError {
    /// Text shown in the page's error banner. Backend messages and local
    /// validation errors are shown verbatim; anything else falls back to the
    /// action's generic message.
    pub fn banner(&self, fallback: &str) -> String {
        match self {
            ApiError::Backend { message, .. } if !message.is_empty() => message.clone(),
            ApiError::InvalidJson { .. }
            | ApiError::InvalidNumber { .. }
            | ApiError::InvalidId { .. } => self.to_string(),
            ApiError::NotFound { .. } => self.to_string(),
            _ => fallback.to_string(),
        }
    }

    /// True for errors raised before any request was issued.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidJson { .. } | ApiError::InvalidNumber { .. } | ApiError::InvalidId { .. }
        )
    }
}

/// Every endpoint the console consumes.
///
/// [`HttpBackend`] is the production implementation; controllers only ever
/// see `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_targets(&self) -> Result<Vec<Target>, ApiError>;
    async fn get_target(&self, id: Uuid) -> Result<Target, ApiError>;
    async fn create_target(&self, payload: &TargetPayload) -> Result<Target, ApiError>;
    async fn update_target(&self, id: Uuid, payload: &TargetPayload) -> Result<Target, ApiError>;
    async fn delete_target(&self, id: Uuid) -> Result<(), ApiError>;

    async fn list_schedules(&self) -> Result<Vec<Schedule>, ApiError>;
    async fn get_schedule(&self, id: Uuid) -> Result<Schedule, ApiError>;
    async fn create_schedule(&self, payload: &SchedulePayload) -> Result<Schedule, ApiError>;
    async fn update_schedule(&self, id: Uuid, payload: &SchedulePayload)
        -> Result<Schedule, ApiError>;
    async fn delete_schedule(&self, id: Uuid) -> Result<(), ApiError>;
    async fn pause_schedule(&self, id: Uuid) -> Result<Schedule, ApiError>;
    async fn resume_schedule(&self, id: Uuid) -> Result<Schedule, ApiError>;
    async fn list_schedule_runs(&self, id: Uuid, filters: &RunFilters)
        -> Result<Vec<Run>, ApiError>;

    async fn list_runs(&self, filters: &RunFilters) -> Result<Vec<Run>, ApiError>;
    async fn get_run(&self, id: Uuid) -> Result<Run, ApiError>;
}
