//! Plain-text rendering of records for the terminal.

use std::fmt::Display;

use uuid::Uuid;

use crate::api::{Run, Schedule, Target};
use crate::filters::{RunFilterKey, RunFilters};
use crate::status::classify;

const NA: &str = "N/A";

/// First eight characters of an id.
pub fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

pub fn or_na<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string())
}

pub fn latency(latency_ms: Option<f64>) -> String {
    latency_ms
        .map(|ms| format!("{ms:.2}ms"))
        .unwrap_or_else(|| NA.to_string())
}

/// Status text with its severity class, e.g. `http_5xx [warning]`.
pub fn badge(status: &str) -> String {
    let shown = if status.is_empty() { NA } else { status };
    format!("{shown} [{}]", classify(status))
}

/// A run's own name, else its schedule's name, else a shortened schedule id.
pub fn schedule_label(run: &Run, schedules: &[Schedule]) -> String {
    if let Some(name) = run.name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    schedules
        .iter()
        .find(|s| s.id == run.schedule_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("Schedule {}...", short_id(run.schedule_id)))
}

pub fn target_label(schedule: &Schedule, targets: &[Target]) -> String {
    targets
        .iter()
        .find(|t| t.id == schedule.target_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("{}...", short_id(schedule.target_id)))
}

fn target_url(schedule: &Schedule, targets: &[Target]) -> Option<String> {
    targets
        .iter()
        .find(|t| t.id == schedule.target_id)
        .map(|t| t.url.clone())
}

/// Active run filters as `key=value` pairs.
pub fn filter_summary(filters: &RunFilters) -> String {
    RunFilterKey::ALL
        .iter()
        .filter_map(|key| filters.get(*key).map(|v| format!("{}={v}", key.as_str())))
        .collect::<Vec<_>>()
        .join(", ")
}

fn ruler(widths: &[usize]) -> String {
    widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-|-")
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

pub fn targets_table(targets: &[Target]) -> String {
    if targets.is_empty() {
        return "No targets found.".to_string();
    }
    let mut lines = vec![
        format!("{:<36} | {:<20} | {:<7} | {:<40} | Timeout", "ID", "Name", "Method", "URL"),
        ruler(&[36, 20, 7, 40, 7]),
    ];
    for t in targets {
        lines.push(format!(
            "{:<36} | {:<20} | {:<7} | {:<40} | {}s",
            t.id, t.name, t.method, t.url, t.timeout_seconds
        ));
    }
    lines.join("\n")
}

pub fn schedules_table(schedules: &[Schedule], targets: &[Target]) -> String {
    if schedules.is_empty() {
        return "No schedules found.".to_string();
    }
    let mut lines = vec![
        format!(
            "{:<36} | {:<20} | {:<20} | {:<8} | {:<10} | Status",
            "ID", "Name", "Target", "Type", "Interval"
        ),
        ruler(&[36, 20, 20, 8, 10, 6]),
    ];
    for s in schedules {
        lines.push(format!(
            "{:<36} | {:<20} | {:<20} | {:<8} | {:<10} | {}",
            s.id,
            s.name,
            target_label(s, targets),
            s.mode.label(),
            format!("{}s", s.interval_seconds),
            if s.paused { "Paused" } else { "Active" }
        ));
    }
    lines.join("\n")
}

pub fn runs_table(runs: &[Run], schedules: &[Schedule]) -> String {
    if runs.is_empty() {
        return "No runs found.".to_string();
    }
    let mut lines = vec![
        format!(
            "{:<36} | {:<20} | {:>5} | {:<25} | {:<28} | {:<6} | Latency",
            "ID", "Schedule", "Run", "Started", "Status", "Code"
        ),
        ruler(&[36, 20, 5, 25, 28, 6, 8]),
    ];
    for r in runs {
        lines.push(format!(
            "{:<36} | {:<20} | {:>5} | {:<25} | {:<28} | {:<6} | {}",
            r.id,
            schedule_label(r, schedules),
            r.run_number,
            r.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            badge(&r.status),
            or_na(r.status_code),
            latency(r.latency_ms)
        ));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Detail views
// ---------------------------------------------------------------------------

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| NA.to_string())
}

pub fn target_detail(t: &Target) -> String {
    let body = t
        .body
        .as_ref()
        .filter(|b| !b.is_null())
        .map(pretty)
        .unwrap_or_else(|| NA.to_string());
    [
        format!("=== Target {} ===", t.name),
        format!("ID:               {}", t.id),
        format!("URL:              {} {}", t.method, t.url),
        format!("Timeout:          {}s", t.timeout_seconds),
        format!("Retries:          {} (delay {}s)", t.retry_count, t.retry_delay_seconds),
        format!("Follow redirects: {}", t.follow_redirects),
        format!("Headers:          {}", pretty(&t.headers)),
        format!("Body:             {body}"),
        format!("Created:          {}", t.created_at.to_rfc3339()),
        format!("Updated:          {}", t.updated_at.to_rfc3339()),
    ]
    .join("\n")
}

pub fn schedule_detail(s: &Schedule, targets: &[Target]) -> String {
    let mut lines = vec![
        format!("=== Schedule {} ===", s.name),
        format!("ID:       {}", s.id),
        format!("Target:   {}", target_label(s, targets)),
        format!("URL:      {}", or_na(target_url(s, targets))),
        format!("Type:     {}", s.mode),
        format!("Interval: {}s", s.interval_seconds),
    ];
    if let Some(duration) = s.mode.duration_seconds() {
        lines.push(format!("Duration: {duration}s"));
    }
    lines.push(format!("Status:   {}", if s.paused { "Paused" } else { "Active" }));
    lines.push(format!("Workflow: {}", or_na(s.temporal_workflow_id.as_deref())));
    lines.push(format!("Created:  {}", s.created_at.to_rfc3339()));
    lines.join("\n")
}

pub fn run_detail(r: &Run, schedules: &[Schedule]) -> String {
    let mut lines = vec![
        format!("=== Run #{} ({}) ===", r.run_number, schedule_label(r, schedules)),
        format!("ID:        {}", r.id),
        format!("Started:   {}", r.started_at.to_rfc3339()),
        format!("Status:    {}", badge(&r.status)),
        format!("Code:      {}", or_na(r.status_code)),
        format!("Latency:   {}", latency(r.latency_ms)),
        format!(
            "Size:      {}",
            or_na(r.response_size_bytes.map(|b| format!("{b} bytes")))
        ),
    ];
    if let Some(error) = &r.error_message {
        lines.push(format!("Error:     {error}"));
    }
    if !r.redirect_history.is_empty() {
        lines.push(format!("Redirects: {}", or_na(r.redirect_count)));
        for hop in &r.redirect_history {
            lines.push(format!("  {} {}", hop.status_code, hop.url));
        }
    }
    if let Some(headers) = &r.response_headers {
        lines.push(format!("Response headers: {}", pretty(headers)));
    }
    if let Some(body) = r.response_body.as_ref().filter(|b| !b.is_null()) {
        lines.push(format!("Response body: {}", pretty(body)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ScheduleMode;
    use chrono::Utc;

    fn schedule(name: &str, target_id: Uuid) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            name: name.into(),
            target_id,
            interval_seconds: 60,
            mode: ScheduleMode::Interval,
            paused: false,
            temporal_workflow_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn run(schedule_id: Uuid, name: Option<&str>) -> Run {
        Run {
            id: Uuid::new_v4(),
            schedule_id,
            name: name.map(str::to_string),
            run_number: 3,
            started_at: Utc::now(),
            status: "http_5xx".into(),
            status_code: Some(503),
            latency_ms: Some(12.345),
            response_size_bytes: None,
            response_headers: None,
            response_body: None,
            error_message: None,
            redirected: None,
            redirect_count: None,
            redirect_history: Vec::new(),
        }
    }

    #[test]
    fn test_schedule_label_fallbacks() {
        let s = schedule("nightly", Uuid::new_v4());
        assert_eq!(schedule_label(&run(s.id, Some("own")), &[s.clone()]), "own");
        assert_eq!(schedule_label(&run(s.id, None), &[s.clone()]), "nightly");

        let orphan = run(s.id, None);
        let label = schedule_label(&orphan, &[]);
        assert_eq!(label, format!("Schedule {}...", short_id(s.id)));
        assert_eq!(short_id(s.id).len(), 8);
    }

    #[test]
    fn test_target_label_fallback() {
        let s = schedule("x", Uuid::new_v4());
        assert_eq!(target_label(&s, &[]), format!("{}...", short_id(s.target_id)));
    }

    #[test]
    fn test_missing_values_render_na() {
        assert_eq!(latency(None), "N/A");
        assert_eq!(latency(Some(12.345)), "12.35ms");
        assert_eq!(or_na(None::<u16>), "N/A");
        assert_eq!(badge(""), "N/A [default]");
        assert_eq!(badge("http_5xx_error"), "http_5xx_error [error]");
    }

    #[test]
    fn test_runs_table_rows() {
        let s = schedule("poller", Uuid::new_v4());
        let out = runs_table(&[run(s.id, None)], &[s]);
        assert!(out.contains("poller"));
        assert!(out.contains("http_5xx [warning]"));
        assert!(out.contains("12.35ms"));
        assert_eq!(runs_table(&[], &[]), "No runs found.");
    }

    #[test]
    fn test_filter_summary() {
        let filters = RunFilters {
            status: Some("http_5xx".into()),
            end_time: Some("2025-03-02T08:30".into()),
            ..RunFilters::default()
        };
        assert_eq!(
            filter_summary(&filters),
            "status=http_5xx, end_time=2025-03-02T08:30"
        );
    }

    #[test]
    fn test_schedule_detail_shows_mode() {
        let mut s = schedule("w", Uuid::new_v4());
        s.mode = ScheduleMode::Window {
            duration_seconds: 3600,
        };
        let out = schedule_detail(&s, &[]);
        assert!(out.contains("Type:     Window"));
        assert!(out.contains("Duration: 3600s"));
    }
}
