//! Typed projections of the query string.
//!
//! Nothing here has an identity of its own: every value is recomputed from
//! [`QueryParams`] on each navigation event. [`Tracked`] remembers the last
//! value a controller acted on, so a navigation event that leaves a
//! controller's keys unchanged does not trigger another fetch.

use crate::query::{QueryParams, QueryPatch};

pub const SCHEDULE_ID: &str = "schedule_id";
pub const STATUS: &str = "status";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const RUN_ID: &str = "run_id";
pub const TARGET_ID: &str = "target_id";
pub const CREATE: &str = "create";

/// Status values offered by the run filter.
pub const RUN_STATUS_OPTIONS: [(&str, &str); 7] = [
    ("success", "Success"),
    ("timeout", "Timeout"),
    ("dns_error", "DNS Error"),
    ("connection_error", "Connection Error"),
    ("http_4xx", "HTTP 4xx"),
    ("http_5xx", "HTTP 5xx"),
    ("error", "Error"),
];

/// A value derived purely from the query string.
pub trait Projection: Clone + PartialEq + Send + Sync + 'static {
    fn project(query: &QueryParams) -> Self;
}

fn non_empty(query: &QueryParams, key: &str) -> Option<String> {
    query.get(key).filter(|v| !v.is_empty()).cloned()
}

// ---------------------------------------------------------------------------
// Run filters
// ---------------------------------------------------------------------------

/// One dimension of the run filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFilterKey {
    ScheduleId,
    Status,
    StartTime,
    EndTime,
}

impl RunFilterKey {
    pub const ALL: [RunFilterKey; 4] = [
        RunFilterKey::ScheduleId,
        RunFilterKey::Status,
        RunFilterKey::StartTime,
        RunFilterKey::EndTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunFilterKey::ScheduleId => SCHEDULE_ID,
            RunFilterKey::Status => STATUS,
            RunFilterKey::StartTime => START_TIME,
            RunFilterKey::EndTime => END_TIME,
        }
    }
}

/// Run list filters. Start and end times are `datetime-local` strings
/// (`YYYY-MM-DDTHH:MM`) passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilters {
    pub schedule_id: Option<String>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl RunFilters {
    pub fn get(&self, key: RunFilterKey) -> Option<&str> {
        match key {
            RunFilterKey::ScheduleId => self.schedule_id.as_deref(),
            RunFilterKey::Status => self.status.as_deref(),
            RunFilterKey::StartTime => self.start_time.as_deref(),
            RunFilterKey::EndTime => self.end_time.as_deref(),
        }
    }

    /// Set one dimension; an empty value clears it.
    pub fn set(&mut self, key: RunFilterKey, value: Option<&str>) {
        let value = value.filter(|v| !v.is_empty()).map(str::to_string);
        match key {
            RunFilterKey::ScheduleId => self.schedule_id = value,
            RunFilterKey::Status => self.status = value,
            RunFilterKey::StartTime => self.start_time = value,
            RunFilterKey::EndTime => self.end_time = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        RunFilterKey::ALL.iter().all(|k| self.get(*k).is_none())
    }

    /// Patch writing every filter key: present values are set, absent ones removed.
    pub fn to_patch(&self) -> QueryPatch {
        RunFilterKey::ALL
            .iter()
            .fold(QueryPatch::new(), |patch, key| patch.set_opt(key.as_str(), self.get(*key)))
    }

    /// Request query parameters, one per present filter.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        RunFilterKey::ALL
            .iter()
            .filter_map(|key| self.get(*key).map(|v| (key.as_str(), v.to_string())))
            .collect()
    }
}

impl Projection for RunFilters {
    fn project(query: &QueryParams) -> Self {
        Self {
            schedule_id: non_empty(query, SCHEDULE_ID),
            status: non_empty(query, STATUS),
            start_time: non_empty(query, START_TIME),
            end_time: non_empty(query, END_TIME),
        }
    }
}

/// Lists with no query-driven filters (targets, schedules).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilters;

impl Projection for NoFilters {
    fn project(_query: &QueryParams) -> Self {
        NoFilters
    }
}

// ---------------------------------------------------------------------------
// Form visibility and selection
// ---------------------------------------------------------------------------

/// Whether the create form is open (`create=true`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormVisibility {
    pub create: bool,
}

impl Projection for FormVisibility {
    fn project(query: &QueryParams) -> Self {
        Self {
            create: query.get(CREATE).map(String::as_str) == Some("true"),
        }
    }
}

/// The id named by a page's selection key, if any.
pub fn selected_id(query: &QueryParams, key: &str) -> Option<String> {
    non_empty(query, key)
}

// ---------------------------------------------------------------------------
// Tracked
// ---------------------------------------------------------------------------

/// Last-applied value of a projection.
#[derive(Debug, Default)]
pub struct Tracked<P> {
    last: Option<P>,
}

impl<P: Projection> Tracked<P> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Project `query` and compare with the last applied value. Returns the new
    /// value only when it differs, recording it as applied.
    pub fn observe(&mut self, query: &QueryParams) -> Option<P> {
        let next = P::project(query);
        if self.last.as_ref() == Some(&next) {
            return None;
        }
        self.last = Some(next.clone());
        Some(next)
    }

    pub fn applied(&self) -> Option<&P> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse_query, Navigation, QueryStore};

    #[test]
    fn test_run_filters_projection() {
        let query = parse_query("?schedule_id=s1&status=http_5xx&run_id=r1");
        let filters = RunFilters::project(&query);
        assert_eq!(filters.schedule_id.as_deref(), Some("s1"));
        assert_eq!(filters.status.as_deref(), Some("http_5xx"));
        assert!(filters.start_time.is_none());
        assert_eq!(
            filters.to_params(),
            vec![("schedule_id", "s1".to_string()), ("status", "http_5xx".to_string())]
        );
    }

    #[test]
    fn test_filter_round_trip_for_every_key_subset() {
        let values = ["s-1", "timeout", "2025-03-01T10:00", "2025-03-02T08:30"];
        for mask in 0u8..16 {
            let mut filters = RunFilters::default();
            for (i, key) in RunFilterKey::ALL.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    filters.set(*key, Some(values[i]));
                }
            }

            let store = QueryStore::from_url("/runs?status=stale&run_id=r9");
            store.set_state(&filters.to_patch(), Navigation::Replace);
            assert_eq!(RunFilters::project(&store.params()), filters, "mask {mask}");
            assert_eq!(store.get(RUN_ID).as_deref(), Some("r9"));
        }
    }

    #[test]
    fn test_form_visibility_requires_true() {
        assert!(FormVisibility::project(&parse_query("?create=true")).create);
        assert!(!FormVisibility::project(&parse_query("?create=1")).create);
        assert!(!FormVisibility::project(&parse_query("")).create);
    }

    #[test]
    fn test_tracked_ignores_unrelated_changes() {
        let mut tracked: Tracked<RunFilters> = Tracked::new();
        assert!(tracked.observe(&parse_query("?status=error")).is_some());
        assert!(tracked.observe(&parse_query("?status=error&run_id=r1")).is_none());
        assert!(tracked.observe(&parse_query("?status=timeout&run_id=r1")).is_some());
        assert_eq!(
            tracked.applied().and_then(|f| f.status.as_deref()),
            Some("timeout")
        );
    }

    #[test]
    fn test_tracked_first_observation_of_empty_applies() {
        let mut tracked: Tracked<NoFilters> = Tracked::new();
        assert!(tracked.observe(&QueryParams::new()).is_some());
        assert!(tracked.observe(&parse_query("?create=true")).is_none());
    }
}
