//! The three resources the console lists and inspects.

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::{ApiError, Backend, Run, Schedule, Target};
use crate::filters::{NoFilters, Projection, RunFilters, RUN_ID, SCHEDULE_ID, TARGET_ID};

/// Glue between a record type, its list endpoint and its query keys.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    type Record: Clone + Send + Sync + std::fmt::Debug + 'static;
    type Filters: Projection + std::fmt::Debug;

    /// Singular noun, used in messages.
    const NOUN: &'static str;
    /// Plural noun, used in messages.
    const PLURAL: &'static str;
    /// Query key naming the selected record on this resource's page.
    const SELECTION_KEY: &'static str;

    fn id(record: &Self::Record) -> Uuid;

    async fn fetch_all(
        backend: &dyn Backend,
        filters: &Self::Filters,
    ) -> Result<Vec<Self::Record>, ApiError>;

    async fn fetch_one(backend: &dyn Backend, id: Uuid) -> Result<Self::Record, ApiError>;
}

pub struct Targets;
pub struct Schedules;
pub struct Runs;

#[async_trait]
impl Resource for Targets {
    type Record = Target;
    type Filters = NoFilters;

    const NOUN: &'static str = "target";
    const PLURAL: &'static str = "targets";
    const SELECTION_KEY: &'static str = TARGET_ID;

    fn id(record: &Target) -> Uuid {
        record.id
    }

    async fn fetch_all(backend: &dyn Backend, _filters: &NoFilters) -> Result<Vec<Target>, ApiError> {
        backend.list_targets().await
    }

    async fn fetch_one(backend: &dyn Backend, id: Uuid) -> Result<Target, ApiError> {
        backend.get_target(id).await
    }
}

#[async_trait]
impl Resource for Schedules {
    type Record = Schedule;
    type Filters = NoFilters;

    const NOUN: &'static str = "schedule";
    const PLURAL: &'static str = "schedules";
    const SELECTION_KEY: &'static str = SCHEDULE_ID;

    fn id(record: &Schedule) -> Uuid {
        record.id
    }

    async fn fetch_all(backend: &dyn Backend, _filters: &NoFilters) -> Result<Vec<Schedule>, ApiError> {
        backend.list_schedules().await
    }

    async fn fetch_one(backend: &dyn Backend, id: Uuid) -> Result<Schedule, ApiError> {
        backend.get_schedule(id).await
    }
}

#[async_trait]
impl Resource for Runs {
    type Record = Run;
    type Filters = RunFilters;

    const NOUN: &'static str = "run";
    const PLURAL: &'static str = "runs";
    const SELECTION_KEY: &'static str = RUN_ID;

    fn id(record: &Run) -> Uuid {
        record.id
    }

    async fn fetch_all(backend: &dyn Backend, filters: &RunFilters) -> Result<Vec<Run>, ApiError> {
        backend.list_runs(filters).await
    }

    async fn fetch_one(backend: &dyn Backend, id: Uuid) -> Result<Run, ApiError> {
        backend.get_run(id).await
    }
}
