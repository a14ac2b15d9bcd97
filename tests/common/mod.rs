//! In-memory scheduler backend for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use scheduler_console::api::{
    ApiError, Backend, Run, Schedule, SchedulePayload, Target, TargetPayload,
};
use scheduler_console::filters::RunFilters;

#[derive(Default)]
struct Data {
    targets: Vec<Target>,
    schedules: Vec<Schedule>,
    runs: Vec<Run>,
}

/// Records every call and serves from memory. Individual methods can be made
/// to fail, and `list_runs` responses can be delayed to reorder them.
#[derive(Default)]
pub struct MockBackend {
    data: Mutex<Data>,
    calls: Mutex<BTreeMap<&'static str, usize>>,
    run_filters: Mutex<Vec<RunFilters>>,
    run_list_delays: Mutex<VecDeque<Duration>>,
    failures: Mutex<BTreeMap<&'static str, String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, method: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        match self.failures.lock().unwrap().get(method) {
            Some(message) => Err(ApiError::Backend {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Filters of every `list_runs` call, in call order.
    pub fn run_filters(&self) -> Vec<RunFilters> {
        self.run_filters.lock().unwrap().clone()
    }

    pub fn delay_run_lists(&self, delays: impl IntoIterator<Item = Duration>) {
        self.run_list_delays.lock().unwrap().extend(delays);
    }

    /// Make `method` fail with a backend error. An empty message exercises
    /// the generic fallback text.
    pub fn fail(&self, method: &'static str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(method, message.to_string());
    }

    pub fn heal(&self, method: &'static str) {
        self.failures.lock().unwrap().remove(method);
    }

    pub fn seed_target(&self, name: &str) -> Target {
        let target = Target {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: format!("https://{name}.example.com"),
            method: "GET".into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_seconds: 30,
            retry_count: 0,
            retry_delay_seconds: 1,
            follow_redirects: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.data.lock().unwrap().targets.push(target.clone());
        target
    }

    pub fn seed_schedule(&self, name: &str, target_id: Uuid) -> Schedule {
        let schedule = Schedule {
            id: Uuid::new_v4(),
            name: name.to_string(),
            target_id,
            interval_seconds: 60,
            mode: scheduler_console::api::ScheduleMode::Interval,
            paused: false,
            temporal_workflow_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.data.lock().unwrap().schedules.push(schedule.clone());
        schedule
    }

    pub fn seed_run(&self, schedule_id: Uuid, status: &str) -> Run {
        let mut data = self.data.lock().unwrap();
        let run_number = data
            .runs
            .iter()
            .filter(|r| r.schedule_id == schedule_id)
            .count() as u64
            + 1;
        let run = Run {
            id: Uuid::new_v4(),
            schedule_id,
            name: None,
            run_number,
            started_at: Utc::now(),
            status: status.to_string(),
            status_code: None,
            latency_ms: None,
            response_size_bytes: None,
            response_headers: None,
            response_body: None,
            error_message: None,
            redirected: None,
            redirect_count: None,
            redirect_history: Vec::new(),
        };
        data.runs.push(run.clone());
        run
    }

    fn matching_runs(&self, filters: &RunFilters) -> Vec<Run> {
        self.data
            .lock()
            .unwrap()
            .runs
            .iter()
            .filter(|r| {
                filters
                    .schedule_id
                    .as_deref()
                    .map_or(true, |id| r.schedule_id.to_string() == id)
                    && filters.status.as_deref().map_or(true, |s| r.status == s)
            })
            .cloned()
            .collect()
    }

    fn set_paused(&self, id: Uuid, paused: bool) -> Result<Schedule, ApiError> {
        let mut data = self.data.lock().unwrap();
        let schedule = data
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("schedule", id))?;
        schedule.paused = paused;
        Ok(schedule.clone())
    }
}

fn not_found(kind: &'static str, id: Uuid) -> ApiError {
    ApiError::Backend {
        status: 404,
        message: format!("{kind} {id} not found"),
    }
}

fn target_from(id: Uuid, payload: &TargetPayload) -> Target {
    Target {
        id,
        name: payload.name.clone(),
        url: payload.url.clone(),
        method: payload.method.clone(),
        headers: payload.headers.clone(),
        body: payload.body.clone(),
        timeout_seconds: payload.timeout_seconds,
        retry_count: payload.retry_count,
        retry_delay_seconds: payload.retry_delay_seconds,
        follow_redirects: payload.follow_redirects,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn schedule_from(id: Uuid, payload: &SchedulePayload) -> Schedule {
    Schedule {
        id,
        name: payload.name.clone(),
        target_id: payload.target_id,
        interval_seconds: payload.interval_seconds,
        mode: payload.mode,
        paused: false,
        temporal_workflow_id: Some(format!("schedule-{id}")),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_targets(&self) -> Result<Vec<Target>, ApiError> {
        self.record("list_targets")?;
        Ok(self.data.lock().unwrap().targets.clone())
    }

    async fn get_target(&self, id: Uuid) -> Result<Target, ApiError> {
        self.record("get_target")?;
        let data = self.data.lock().unwrap();
        data.targets
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| not_found("target", id))
    }

    async fn create_target(&self, payload: &TargetPayload) -> Result<Target, ApiError> {
        self.record("create_target")?;
        let target = target_from(Uuid::new_v4(), payload);
        self.data.lock().unwrap().targets.push(target.clone());
        Ok(target)
    }

    async fn update_target(&self, id: Uuid, payload: &TargetPayload) -> Result<Target, ApiError> {
        self.record("update_target")?;
        let mut data = self.data.lock().unwrap();
        let slot = data
            .targets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("target", id))?;
        *slot = target_from(id, payload);
        Ok(slot.clone())
    }

    async fn delete_target(&self, id: Uuid) -> Result<(), ApiError> {
        self.record("delete_target")?;
        self.data.lock().unwrap().targets.retain(|t| t.id != id);
        Ok(())
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>, ApiError> {
        self.record("list_schedules")?;
        Ok(self.data.lock().unwrap().schedules.clone())
    }

    async fn get_schedule(&self, id: Uuid) -> Result<Schedule, ApiError> {
        self.record("get_schedule")?;
        let data = self.data.lock().unwrap();
        data.schedules
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| not_found("schedule", id))
    }

    async fn create_schedule(&self, payload: &SchedulePayload) -> Result<Schedule, ApiError> {
        self.record("create_schedule")?;
        let schedule = schedule_from(Uuid::new_v4(), payload);
        self.data.lock().unwrap().schedules.push(schedule.clone());
        Ok(schedule)
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        payload: &SchedulePayload,
    ) -> Result<Schedule, ApiError> {
        self.record("update_schedule")?;
        let mut data = self.data.lock().unwrap();
        let slot = data
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("schedule", id))?;
        let paused = slot.paused;
        *slot = schedule_from(id, payload);
        slot.paused = paused;
        Ok(slot.clone())
    }

    async fn delete_schedule(&self, id: Uuid) -> Result<(), ApiError> {
        self.record("delete_schedule")?;
        let mut data = self.data.lock().unwrap();
        data.schedules.retain(|s| s.id != id);
        data.runs.retain(|r| r.schedule_id != id);
        Ok(())
    }

    async fn pause_schedule(&self, id: Uuid) -> Result<Schedule, ApiError> {
        self.record("pause_schedule")?;
        self.set_paused(id, true)
    }

    async fn resume_schedule(&self, id: Uuid) -> Result<Schedule, ApiError> {
        self.record("resume_schedule")?;
        self.set_paused(id, false)
    }

    async fn list_schedule_runs(
        &self,
        id: Uuid,
        filters: &RunFilters,
    ) -> Result<Vec<Run>, ApiError> {
        self.record("list_schedule_runs")?;
        let filters = RunFilters {
            schedule_id: Some(id.to_string()),
            ..filters.clone()
        };
        Ok(self.matching_runs(&filters))
    }

    async fn list_runs(&self, filters: &RunFilters) -> Result<Vec<Run>, ApiError> {
        self.run_filters.lock().unwrap().push(filters.clone());
        let delay = self.run_list_delays.lock().unwrap().pop_front();
        self.record("list_runs")?;
        let runs = self.matching_runs(filters);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(runs)
    }

    async fn get_run(&self, id: Uuid) -> Result<Run, ApiError> {
        self.record("get_run")?;
        let data = self.data.lock().unwrap();
        data.runs
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found("run", id))
    }
}
