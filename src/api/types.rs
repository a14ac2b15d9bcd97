//! Wire types for the scheduler REST contract.
//!
//! Records are decoded once at this boundary. In particular a schedule's
//! interval/window distinction becomes an explicit [`ScheduleMode`] here so no
//! other module has to look at `duration_seconds` to know what it is holding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Response envelope wrapping every backend payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Reusable HTTP request template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    pub timeout_seconds: u32,
    pub retry_count: u32,
    pub retry_delay_seconds: u32,
    pub follow_redirects: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /targets` and `PUT /targets/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPayload {
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub timeout_seconds: u32,
    pub retry_count: u32,
    pub retry_delay_seconds: u32,
    pub follow_redirects: bool,
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// How a schedule invokes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Runs every `interval_seconds`, indefinitely.
    Interval,
    /// Runs every `interval_seconds` until `duration_seconds` have elapsed.
    Window { duration_seconds: u64 },
}

impl ScheduleMode {
    pub fn from_duration(duration_seconds: Option<u64>) -> Self {
        match duration_seconds {
            Some(duration_seconds) => ScheduleMode::Window { duration_seconds },
            None => ScheduleMode::Interval,
        }
    }

    pub fn duration_seconds(&self) -> Option<u64> {
        match self {
            ScheduleMode::Interval => None,
            ScheduleMode::Window { duration_seconds } => Some(*duration_seconds),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScheduleMode::Interval => "Interval",
            ScheduleMode::Window { .. } => "Window",
        }
    }
}

impl std::fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Recurring invocation policy attached to a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScheduleWire", into = "ScheduleWire")]
pub struct Schedule {
    pub id: Uuid,
    pub name: String,
    pub target_id: Uuid,
    pub interval_seconds: u64,
    pub mode: ScheduleMode,
    pub paused: bool,
    pub temporal_workflow_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat representation used on the wire, where the mode is implied by the
/// presence of `duration_seconds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduleWire {
    id: Uuid,
    name: String,
    target_id: Uuid,
    interval_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u64>,
    #[serde(default)]
    paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temporal_workflow_id: Option<String>,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    updated_at: DateTime<Utc>,
}

impl From<ScheduleWire> for Schedule {
    fn from(w: ScheduleWire) -> Self {
        Self {
            id: w.id,
            name: w.name,
            target_id: w.target_id,
            interval_seconds: w.interval_seconds,
            mode: ScheduleMode::from_duration(w.duration_seconds),
            paused: w.paused,
            temporal_workflow_id: w.temporal_workflow_id,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

impl From<Schedule> for ScheduleWire {
    fn from(s: Schedule) -> Self {
        Self {
            id: s.id,
            name: s.name,
            target_id: s.target_id,
            interval_seconds: s.interval_seconds,
            duration_seconds: s.mode.duration_seconds(),
            paused: s.paused,
            temporal_workflow_id: s.temporal_workflow_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Body of `POST /schedules` and `PUT /schedules/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePayload {
    pub name: String,
    pub target_id: Uuid,
    pub interval_seconds: u64,
    pub mode: ScheduleMode,
}

impl Serialize for SchedulePayload {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("target_id", &self.target_id)?;
        map.serialize_entry("interval_seconds", &self.interval_seconds)?;
        if let Some(duration) = self.mode.duration_seconds() {
            map.serialize_entry("duration_seconds", &duration)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// One hop of a followed redirect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
    pub status_code: u16,
}

/// Append-only execution record of a schedule's target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub schedule_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub run_number: u64,
    #[serde(with = "timestamp")]
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_count: Option<u32>,
    #[serde(default)]
    pub redirect_history: Vec<Redirect>,
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// The backend emits both offset-aware RFC 3339 timestamps and naive ones
/// (which are UTC). Accept either, always write RFC 3339.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
