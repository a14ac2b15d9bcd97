//! Create/edit form drafts.
//!
//! Drafts hold raw field text exactly as typed. Converting a draft into a
//! request payload is where client-side validation happens: structured JSON
//! fields must parse and numeric fields must be whole numbers, otherwise the
//! conversion fails and no request is issued.

use std::collections::BTreeMap;
use std::str::FromStr;

use uuid::Uuid;

use crate::api::{ApiError, Schedule, ScheduleMode, SchedulePayload, Target, TargetPayload};

fn parse_number<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidNumber { field })
}

// ---------------------------------------------------------------------------
// Target form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TargetDraft {
    pub name: String,
    pub url: String,
    pub method: String,
    /// JSON object of header names to values.
    pub headers: String,
    /// Optional JSON body; blank means no body.
    pub body: String,
    pub timeout_seconds: String,
    pub retry_count: String,
    pub retry_delay_seconds: String,
    pub follow_redirects: bool,
}

impl Default for TargetDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            method: "GET".to_string(),
            headers: "{}".to_string(),
            body: String::new(),
            timeout_seconds: "30".to_string(),
            retry_count: "0".to_string(),
            retry_delay_seconds: "1".to_string(),
            follow_redirects: true,
        }
    }
}

impl TargetDraft {
    /// Pre-fill from an existing target for editing.
    pub fn from_target(target: &Target) -> Self {
        let headers = serde_json::to_string_pretty(&target.headers).unwrap_or_else(|_| "{}".into());
        let body = target
            .body
            .as_ref()
            .filter(|b| !b.is_null())
            .and_then(|b| serde_json::to_string_pretty(b).ok())
            .unwrap_or_default();
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            method: target.method.clone(),
            headers,
            body,
            timeout_seconds: target.timeout_seconds.to_string(),
            retry_count: target.retry_count.to_string(),
            retry_delay_seconds: target.retry_delay_seconds.to_string(),
            follow_redirects: target.follow_redirects,
        }
    }

    pub fn to_payload(&self) -> Result<TargetPayload, ApiError> {
        let headers_text = if self.headers.trim().is_empty() {
            "{}"
        } else {
            self.headers.as_str()
        };
        let headers: BTreeMap<String, String> = serde_json::from_str(headers_text)
            .map_err(|source| ApiError::InvalidJson {
                field: "headers",
                source,
            })?;

        let body = if self.body.trim().is_empty() {
            None
        } else {
            let value: serde_json::Value =
                serde_json::from_str(&self.body).map_err(|source| ApiError::InvalidJson {
                    field: "body",
                    source,
                })?;
            Some(value)
        };

        Ok(TargetPayload {
            name: self.name.clone(),
            url: self.url.clone(),
            method: self.method.to_uppercase(),
            headers,
            body,
            timeout_seconds: parse_number("timeout_seconds", &self.timeout_seconds)?,
            retry_count: parse_number("retry_count", &self.retry_count)?,
            retry_delay_seconds: parse_number("retry_delay_seconds", &self.retry_delay_seconds)?,
            follow_redirects: self.follow_redirects,
        })
    }
}

// ---------------------------------------------------------------------------
// Schedule form
// ---------------------------------------------------------------------------

/// Which mode the schedule form is set to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleKind {
    #[default]
    Interval,
    Window,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDraft {
    pub name: String,
    pub target_id: String,
    pub kind: ScheduleKind,
    pub interval_seconds: String,
    /// Only sent in window mode.
    pub duration_seconds: String,
}

impl Default for ScheduleDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            target_id: String::new(),
            kind: ScheduleKind::Interval,
            interval_seconds: "60".to_string(),
            duration_seconds: "3600".to_string(),
        }
    }
}

impl ScheduleDraft {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let (kind, duration_seconds) = match schedule.mode {
            ScheduleMode::Interval => (ScheduleKind::Interval, "3600".to_string()),
            ScheduleMode::Window { duration_seconds } => {
                (ScheduleKind::Window, duration_seconds.to_string())
            }
        };
        Self {
            name: schedule.name.clone(),
            target_id: schedule.target_id.to_string(),
            kind,
            interval_seconds: schedule.interval_seconds.to_string(),
            duration_seconds,
        }
    }

    pub fn to_payload(&self) -> Result<SchedulePayload, ApiError> {
        let target_id = Uuid::parse_str(self.target_id.trim())
            .map_err(|_| ApiError::InvalidId { field: "target_id" })?;
        let mode = match self.kind {
            ScheduleKind::Interval => ScheduleMode::Interval,
            ScheduleKind::Window => ScheduleMode::Window {
                duration_seconds: parse_number("duration_seconds", &self.duration_seconds)?,
            },
        };
        Ok(SchedulePayload {
            name: self.name.clone(),
            target_id,
            interval_seconds: parse_number("interval_seconds", &self.interval_seconds)?,
            mode,
        })
    }
}

// ---------------------------------------------------------------------------
// Form state
// ---------------------------------------------------------------------------

/// A page's create/edit form: visibility, the record being edited (if any),
/// and the draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState<D> {
    pub visible: bool,
    pub editing: Option<Uuid>,
    pub draft: D,
}

impl<D: Default> FormState<D> {
    pub fn open(&mut self) {
        self.visible = true;
    }

    pub fn edit(&mut self, id: Uuid, draft: D) {
        self.visible = true;
        self.editing = Some(id);
        self.draft = draft;
    }

    /// Hide and reset to defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
