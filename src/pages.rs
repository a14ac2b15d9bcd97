//! Page composition.
//!
//! A page wires its list, detail panel and (where it has one) create/edit
//! form to one shared [`QueryStore`] and one [`ErrorBanner`]. Every page
//! follows the same lifecycle: `mount` reads the query string once and
//! issues the first fetches, then `handle_navigation` runs after each
//! location change and only does work for keys that actually changed.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::api::{ApiError, Backend, Run, Schedule, Target};
use crate::detail::DetailPanel;
use crate::filters::{FormVisibility, RunFilterKey, RunFilters, Tracked, CREATE, SCHEDULE_ID};
use crate::forms::{FormState, ScheduleDraft, TargetDraft};
use crate::list::{ErrorBanner, ListController};
use crate::query::{Location, Navigation, QueryParams, QueryPatch, QueryStore};
use crate::resource::{Runs, Schedules, Targets};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
pub trait Page: Send + Sync + 'static {
    /// Path this page is served under.
    const PATH: &'static str;

    fn store(&self) -> &Arc<QueryStore>;

    fn banner(&self) -> &ErrorBanner;

    async fn mount(&self);

    async fn handle_navigation(&self);
}

/// Run `handle_navigation` on every location change for as long as the
/// returned task is alive. Changes to other pages' paths are ignored.
pub fn follow_navigation<P: Page>(page: Arc<P>) -> JoinHandle<()> {
    let mut rx = page.store().subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let location = rx.borrow_and_update().clone();
            if !location.path.is_empty() && location.path != P::PATH {
                debug!(page = P::PATH, %location, "navigation for another page");
                continue;
            }
            page.handle_navigation().await;
        }
    })
}

// ---------------------------------------------------------------------------
// Form slot
// ---------------------------------------------------------------------------

/// A page form whose visibility follows the `create` query key. Local
/// open/close actions write the key and record it as applied, so the
/// navigation event they cause is not acted on a second time.
struct FormSlot<D> {
    state: Mutex<FormState<D>>,
    visibility: Mutex<Tracked<FormVisibility>>,
}

impl<D: Default + Clone> FormSlot<D> {
    fn new() -> Self {
        Self {
            state: Mutex::new(FormState::default()),
            visibility: Mutex::new(Tracked::new()),
        }
    }

    fn snapshot(&self) -> FormState<D> {
        lock(&self.state).clone()
    }

    fn sync(&self, query: &QueryParams) {
        let Some(visibility) = lock(&self.visibility).observe(query) else {
            return;
        };
        let mut form = lock(&self.state);
        if visibility.create {
            form.open();
        } else {
            form.reset();
        }
    }

    fn open(&self, store: &QueryStore) {
        {
            let mut form = lock(&self.state);
            form.reset();
            form.open();
        }
        store.set_state(&QueryPatch::new().set(CREATE, "true"), Navigation::Push);
        self.sync(&store.params());
    }

    fn edit(&self, store: &QueryStore, id: Uuid, draft: D) {
        lock(&self.state).edit(id, draft);
        store.set_state(&QueryPatch::new().set(CREATE, "true"), Navigation::Push);
        self.sync(&store.params());
    }

    fn close(&self, store: &QueryStore) {
        lock(&self.state).reset();
        store.set_state(&QueryPatch::new().remove(CREATE), Navigation::Push);
        self.sync(&store.params());
    }

    fn update(&self, f: impl FnOnce(&mut D)) {
        f(&mut lock(&self.state).draft);
    }

    fn pending(&self) -> (Option<Uuid>, D) {
        let form = lock(&self.state);
        (form.editing, form.draft.clone())
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

pub struct TargetsPage {
    store: Arc<QueryStore>,
    banner: ErrorBanner,
    pub list: ListController<Targets>,
    pub detail: DetailPanel<Targets>,
    form: FormSlot<TargetDraft>,
}

impl TargetsPage {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<QueryStore>) -> Self {
        let banner = ErrorBanner::new();
        Self {
            list: ListController::new(Arc::clone(&backend), Arc::clone(&store), banner.clone()),
            detail: DetailPanel::new(backend, Arc::clone(&store), banner.clone()),
            form: FormSlot::new(),
            store,
            banner,
        }
    }

    pub fn form(&self) -> FormState<TargetDraft> {
        self.form.snapshot()
    }

    pub fn open_create(&self) {
        self.form.open(&self.store);
    }

    /// Open the form pre-filled from `target`; submitting updates it.
    pub fn edit(&self, target: &Target) {
        self.form
            .edit(&self.store, target.id, TargetDraft::from_target(target));
    }

    pub fn cancel(&self) {
        self.form.close(&self.store);
    }

    pub fn toggle_form(&self) {
        if self.form.snapshot().visible {
            self.cancel();
        } else {
            self.open_create();
        }
    }

    pub fn update_draft(&self, f: impl FnOnce(&mut TargetDraft)) {
        self.form.update(f);
    }

    /// Validate and save the draft. On any failure the form stays open with
    /// its contents; invalid JSON or numbers fail before a request is made.
    pub async fn submit(&self) -> Result<Target, ApiError> {
        let (editing, draft) = self.form.pending();
        let payload = draft.to_payload().map_err(|e| {
            self.banner.report(&e, "Failed to save target");
            e
        })?;
        let saved = match editing {
            Some(id) => self.list.update(id, &payload).await?,
            None => self.list.create(&payload).await?,
        };
        self.form.close(&self.store);
        Ok(saved)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.list.delete(id).await?;
        self.detail.close_if(id).await;
        Ok(())
    }

    pub async fn select(&self, id: &str) -> Result<(), ApiError> {
        let items = self.list.items().await;
        self.detail.select_id(id, &items).await
    }
}

#[async_trait]
impl Page for TargetsPage {
    const PATH: &'static str = "/targets";

    fn store(&self) -> &Arc<QueryStore> {
        &self.store
    }

    fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    async fn mount(&self) {
        self.list.mount().await;
        self.form.sync(&self.store.params());
        let items = self.list.items().await;
        // Failures are already on the banner.
        let _ = self.detail.restore(&items).await;
    }

    async fn handle_navigation(&self) {
        self.list.sync().await;
        self.form.sync(&self.store.params());
        let items = self.list.items().await;
        let _ = self.detail.restore(&items).await;
    }
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

pub struct SchedulesPage {
    backend: Arc<dyn Backend>,
    store: Arc<QueryStore>,
    banner: ErrorBanner,
    pub list: ListController<Schedules>,
    /// Targets offered by the form and used for row labels.
    pub targets: ListController<Targets>,
    pub detail: DetailPanel<Schedules>,
    form: FormSlot<ScheduleDraft>,
}

impl SchedulesPage {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<QueryStore>) -> Self {
        let banner = ErrorBanner::new();
        Self {
            list: ListController::new(Arc::clone(&backend), Arc::clone(&store), banner.clone()),
            targets: ListController::new(Arc::clone(&backend), Arc::clone(&store), banner.clone()),
            detail: DetailPanel::new(Arc::clone(&backend), Arc::clone(&store), banner.clone()),
            form: FormSlot::new(),
            backend,
            store,
            banner,
        }
    }

    /// Reload schedules and targets together.
    pub async fn refresh(&self) {
        tokio::join!(self.list.load(), self.targets.load());
    }

    pub fn form(&self) -> FormState<ScheduleDraft> {
        self.form.snapshot()
    }

    pub fn open_create(&self) {
        self.form.open(&self.store);
    }

    pub fn edit(&self, schedule: &Schedule) {
        self.form
            .edit(&self.store, schedule.id, ScheduleDraft::from_schedule(schedule));
    }

    pub fn cancel(&self) {
        self.form.close(&self.store);
    }

    pub fn update_draft(&self, f: impl FnOnce(&mut ScheduleDraft)) {
        self.form.update(f);
    }

    pub async fn submit(&self) -> Result<Schedule, ApiError> {
        let (editing, draft) = self.form.pending();
        let payload = draft.to_payload().map_err(|e| {
            self.banner.report(&e, "Failed to save schedule");
            e
        })?;
        let saved = match editing {
            Some(id) => self.list.update(id, &payload).await?,
            None => self.list.create(&payload).await?,
        };
        self.form.close(&self.store);
        Ok(saved)
    }

    pub async fn pause(&self, id: Uuid) -> Result<Schedule, ApiError> {
        self.list.pause(id).await
    }

    pub async fn resume(&self, id: Uuid) -> Result<Schedule, ApiError> {
        self.list.resume(id).await
    }

    /// Delete and close the detail panel if it shows the deleted schedule.
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.list.delete(id).await?;
        self.detail.close_if(id).await;
        Ok(())
    }

    pub async fn select(&self, id: &str) -> Result<(), ApiError> {
        let items = self.list.items().await;
        self.detail.select_id(id, &items).await
    }

    /// Runs of one schedule, filtered like the runs page.
    pub async fn runs(&self, id: Uuid, filters: &RunFilters) -> Result<Vec<Run>, ApiError> {
        self.backend
            .list_schedule_runs(id, filters)
            .await
            .map_err(|e| {
                self.banner.report(&e, "Failed to load runs");
                e
            })
    }

    /// Navigate to the runs page filtered to this schedule (a new history entry).
    pub fn view_runs(&self, id: Uuid) -> Location {
        let query = QueryPatch::new()
            .set(SCHEDULE_ID, id.to_string())
            .apply(&QueryParams::new());
        let location = Location::new(RunsPage::PATH, query);
        self.store.navigate(location.clone());
        location
    }
}

#[async_trait]
impl Page for SchedulesPage {
    const PATH: &'static str = "/schedules";

    fn store(&self) -> &Arc<QueryStore> {
        &self.store
    }

    fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    async fn mount(&self) {
        tokio::join!(self.list.mount(), self.targets.mount());
        self.form.sync(&self.store.params());
        let items = self.list.items().await;
        let _ = self.detail.restore(&items).await;
    }

    async fn handle_navigation(&self) {
        self.list.sync().await;
        self.form.sync(&self.store.params());
        let items = self.list.items().await;
        let _ = self.detail.restore(&items).await;
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

pub struct RunsPage {
    store: Arc<QueryStore>,
    banner: ErrorBanner,
    pub list: ListController<Runs>,
    /// Loaded once, for the schedule filter and name lookup.
    pub schedules: ListController<Schedules>,
    pub detail: DetailPanel<Runs>,
}

impl RunsPage {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<QueryStore>) -> Self {
        let banner = ErrorBanner::new();
        Self {
            list: ListController::new(Arc::clone(&backend), Arc::clone(&store), banner.clone()),
            schedules: ListController::new(Arc::clone(&backend), Arc::clone(&store), banner.clone()),
            detail: DetailPanel::new(backend, Arc::clone(&store), banner.clone()),
            store,
            banner,
        }
    }

    pub async fn set_filter(&self, key: RunFilterKey, value: Option<&str>) -> bool {
        self.list.set_filter(key, value).await
    }

    pub async fn apply_filters(&self, filters: &RunFilters) -> bool {
        self.list.apply_filters(filters).await
    }

    pub async fn clear_filters(&self) -> bool {
        self.list.clear_filters().await
    }

    pub async fn select(&self, run: Run) {
        self.detail.select(run).await;
    }

    pub async fn select_id(&self, id: &str) -> Result<(), ApiError> {
        let items = self.list.items().await;
        self.detail.select_id(id, &items).await
    }

    pub async fn close_detail(&self) {
        self.detail.close().await;
    }
}

#[async_trait]
impl Page for RunsPage {
    const PATH: &'static str = "/runs";

    fn store(&self) -> &Arc<QueryStore> {
        &self.store
    }

    fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    async fn mount(&self) {
        tokio::join!(self.list.mount(), self.schedules.mount());
        let items = self.list.items().await;
        let _ = self.detail.restore(&items).await;
    }

    async fn handle_navigation(&self) {
        self.list.sync().await;
        let items = self.list.items().await;
        let _ = self.detail.restore(&items).await;
    }
}
