//! `HttpBackend` against an in-process server speaking the envelope contract.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use scheduler_console::api::{
    ApiError, Backend, HttpBackend, ScheduleMode, SchedulePayload,
};
use scheduler_console::config::ApiConfig;
use scheduler_console::filters::RunFilters;

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (
        StatusCode::OK,
        Json(json!({"success": true, "status_code": 200, "message": "OK", "data": data})),
    )
}

fn target_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "health",
        "url": "https://example.com/health",
        "method": "GET",
        "headers": {"Accept": "application/json"},
        "body": null,
        "timeout_seconds": 30,
        "retry_count": 0,
        "retry_delay_seconds": 1,
        "follow_redirects": true,
        "created_at": "2025-03-01T10:00:00",
        "updated_at": "2025-03-01T10:00:00.123456"
    })
}

async fn serve(app: Router) -> HttpBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    HttpBackend::new(&ApiConfig {
        base_url: format!("http://{addr}/"),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_list_targets_unwraps_envelope() {
    let id = Uuid::new_v4();
    let app = Router::new().route(
        "/targets",
        get(move || async move { ok(json!([target_json(&id.to_string())])) }),
    );
    let backend = serve(app).await;

    let targets = backend.list_targets().await.unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].id, id);
    assert_eq!(targets[0].headers.get("Accept").map(String::as_str), Some("application/json"));
    assert!(targets[0].body.is_none());
}

#[tokio::test]
async fn test_http_error_uses_detail_message() {
    let app = Router::new().route(
        "/targets/{id}",
        get(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"detail": "Target not found"})),
            )
        }),
    );
    let backend = serve(app).await;

    let err = backend.get_target(Uuid::new_v4()).await.unwrap_err();
    match err {
        ApiError::Backend { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Target not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_an_error() {
    let app = Router::new().route(
        "/schedules/{id}/pause",
        post(|| async {
            (
                StatusCode::OK,
                Json(json!({
                    "success": false,
                    "status_code": 409,
                    "message": "Schedule already paused",
                    "data": null
                })),
            )
        }),
    );
    let backend = serve(app).await;

    let err = backend.pause_schedule(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.banner("Failed to pause schedule"), "Schedule already paused");
    assert!(matches!(err, ApiError::Backend { status: 409, .. }));
}

#[tokio::test]
async fn test_missing_data_on_fetch_is_not_found() {
    let app = Router::new().route("/runs/{id}", get(|| async { ok(Value::Null) }));
    let backend = serve(app).await;

    let id = Uuid::new_v4();
    let err = backend.get_run(id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { kind: "run", .. }));
}

#[tokio::test]
async fn test_interval_schedule_is_sent_without_duration() {
    let bodies: Arc<Mutex<Vec<Value>>> = Arc::default();
    let seen = Arc::clone(&bodies);
    let app = Router::new().route(
        "/schedules",
        post(move |Json(body): Json<Value>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(body.clone());
                let mut schedule = body;
                schedule["id"] = json!(Uuid::new_v4());
                schedule["paused"] = json!(false);
                schedule["created_at"] = json!("2025-03-01T10:00:00Z");
                schedule["updated_at"] = json!("2025-03-01T10:00:00Z");
                ok(schedule)
            }
        }),
    );
    let backend = serve(app).await;

    let target_id = Uuid::new_v4();
    let interval = backend
        .create_schedule(&SchedulePayload {
            name: "poll".into(),
            target_id,
            interval_seconds: 60,
            mode: ScheduleMode::Interval,
        })
        .await
        .unwrap();
    assert_eq!(interval.mode, ScheduleMode::Interval);

    let window = backend
        .create_schedule(&SchedulePayload {
            name: "burst".into(),
            target_id,
            interval_seconds: 10,
            mode: ScheduleMode::Window {
                duration_seconds: 600,
            },
        })
        .await
        .unwrap();
    assert_eq!(window.mode.duration_seconds(), Some(600));

    let sent = bodies.lock().unwrap();
    assert!(sent[0].get("duration_seconds").is_none());
    assert_eq!(sent[1]["duration_seconds"], json!(600));
}

#[tokio::test]
async fn test_run_filters_become_query_parameters() {
    let queries: Arc<Mutex<Vec<(String, HashMap<String, String>)>>> = Arc::default();
    let runs_seen = Arc::clone(&queries);
    let schedule_runs_seen = Arc::clone(&queries);
    let app = Router::new()
        .route(
            "/runs",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let seen = Arc::clone(&runs_seen);
                async move {
                    seen.lock().unwrap().push(("/runs".into(), q));
                    ok(json!([]))
                }
            }),
        )
        .route(
            "/schedules/{id}/runs",
            get(
                move |Path(id): Path<String>, Query(q): Query<HashMap<String, String>>| {
                    let seen = Arc::clone(&schedule_runs_seen);
                    async move {
                        seen.lock().unwrap().push((id, q));
                        ok(json!([]))
                    }
                },
            ),
        );
    let backend = serve(app).await;

    let filters = RunFilters {
        schedule_id: Some("abc".into()),
        status: Some("http_5xx".into()),
        start_time: Some("2025-03-01T10:00".into()),
        end_time: None,
    };
    assert!(backend.list_runs(&filters).await.unwrap().is_empty());
    let schedule_id = Uuid::new_v4();
    backend.list_schedule_runs(schedule_id, &filters).await.unwrap();

    let seen = queries.lock().unwrap();
    let (_, runs_query) = &seen[0];
    assert_eq!(runs_query.len(), 3);
    assert_eq!(runs_query["status"], "http_5xx");
    assert_eq!(runs_query["start_time"], "2025-03-01T10:00");
    assert_eq!(runs_query["schedule_id"], "abc");
    assert!(!runs_query.contains_key("end_time"));

    let (path_id, schedule_query) = &seen[1];
    assert_eq!(path_id, &schedule_id.to_string());
    assert!(!schedule_query.contains_key("schedule_id"));
    assert_eq!(schedule_query["status"], "http_5xx");
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&ApiConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 2,
    })
    .unwrap();
    let err = backend.list_schedules().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.banner("Failed to load schedules"), "Failed to load schedules");
}
