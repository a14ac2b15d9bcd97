//! Resource list controller.
//!
//! Owns one resource list's fetch lifecycle: the loaded records, the loading
//! flag and the page's error banner. Filters come from the [`QueryStore`];
//! edits are written back there and the list reloads only when its own
//! projection of the query string actually changed.
//!
//! Mutations never touch the local list. Each one issues its request and
//! then reloads the whole list from the backend.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiError, Backend, Schedule, SchedulePayload, Target, TargetPayload};
use crate::filters::{Projection, RunFilterKey, RunFilters, Tracked};
use crate::query::{Navigation, QueryPatch, QueryStore};
use crate::resource::{Resource, Runs, Schedules, Targets};

// ---------------------------------------------------------------------------
// ErrorBanner
// ---------------------------------------------------------------------------

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Entry {
    /// The list controller that raised the message, if any.
    owner: Option<u64>,
    message: String,
}

/// The single visible error message of a page. The most recent failure
/// overwrites any earlier one. Cloning shares the same slot.
///
/// Several list controllers can share one banner. A controller's successful
/// load only clears a message that controller raised itself.
#[derive(Debug, Clone, Default)]
pub struct ErrorBanner {
    slot: Arc<Mutex<Option<Entry>>>,
}

impl ErrorBanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Entry>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn put(&self, owner: Option<u64>, message: String) {
        warn!(%message, ?owner, "error surfaced");
        *self.lock() = Some(Entry { owner, message });
    }

    pub fn set(&self, message: impl Into<String>) {
        self.put(None, message.into());
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn get(&self) -> Option<String> {
        self.lock().as_ref().map(|entry| entry.message.clone())
    }

    /// Record `err` using the banner text rules of [`ApiError::banner`].
    pub fn report(&self, err: &ApiError, fallback: &str) {
        self.set(err.banner(fallback));
    }

    fn report_from(&self, owner: u64, err: &ApiError, fallback: &str) {
        self.put(Some(owner), err.banner(fallback));
    }

    /// Clear the banner only if `owner` raised the current message.
    fn clear_from(&self, owner: u64) {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|entry| entry.owner == Some(owner)) {
            *slot = None;
        }
    }
}

// ---------------------------------------------------------------------------
// ListController
// ---------------------------------------------------------------------------

/// Point-in-time copy of a list's visible state.
#[derive(Debug, Clone)]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

struct ListState<T> {
    items: Vec<T>,
    loading: bool,
    /// Sequence number of the newest response applied to `items`.
    applied_seq: u64,
}

pub struct ListController<R: Resource> {
    backend: Arc<dyn Backend>,
    store: Arc<QueryStore>,
    banner: ErrorBanner,
    /// Identifies this controller's messages on a shared banner.
    owner: u64,
    state: RwLock<ListState<R::Record>>,
    filters: Mutex<Tracked<R::Filters>>,
    /// Sequence number of the newest request issued.
    issued: AtomicU64,
}

impl<R: Resource> ListController<R> {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<QueryStore>, banner: ErrorBanner) -> Self {
        Self {
            backend,
            store,
            banner,
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(ListState {
                items: Vec::new(),
                loading: false,
                applied_seq: 0,
            }),
            filters: Mutex::new(Tracked::new()),
            issued: AtomicU64::new(0),
        }
    }

    fn tracked(&self) -> MutexGuard<'_, Tracked<R::Filters>> {
        self.filters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    pub fn store(&self) -> &Arc<QueryStore> {
        &self.store
    }

    /// Read this list's keys from the query string once and issue the first
    /// fetch with them, so a deep link reproduces the bookmarked view.
    pub async fn mount(&self) {
        let filters = {
            let mut tracked = self.tracked();
            match tracked.observe(&self.store.params()) {
                Some(filters) => filters,
                None => tracked
                    .applied()
                    .cloned()
                    .unwrap_or_else(|| R::Filters::project(&self.store.params())),
            }
        };
        self.fetch(filters).await;
    }

    /// React to a navigation event. Fetches only if this list's projection of
    /// the query string changed since it was last applied; returns whether a
    /// fetch was issued.
    pub async fn sync(&self) -> bool {
        let changed = self.tracked().observe(&self.store.params());
        match changed {
            Some(filters) => {
                self.fetch(filters).await;
                true
            }
            None => false,
        }
    }

    /// Reload with the currently applied filters.
    pub async fn load(&self) {
        let filters = self
            .tracked()
            .applied()
            .cloned()
            .unwrap_or_else(|| R::Filters::project(&self.store.params()));
        self.fetch(filters).await;
    }

    /// Filters the list was last loaded with.
    pub fn filters(&self) -> Option<R::Filters> {
        self.tracked().applied().cloned()
    }

    async fn fetch(&self, filters: R::Filters) {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().await.loading = true;
        debug!(resource = R::PLURAL, seq, ?filters, "list fetch started");

        let result = R::fetch_all(self.backend.as_ref(), &filters).await;

        let mut state = self.state.write().await;
        if seq < state.applied_seq {
            debug!(
                resource = R::PLURAL,
                seq,
                newest = state.applied_seq,
                "discarding stale list response"
            );
            return;
        }
        state.applied_seq = seq;
        state.loading = self.issued.load(Ordering::SeqCst) > seq;

        match result {
            Ok(items) => {
                debug!(resource = R::PLURAL, seq, count = items.len(), "list fetch finished");
                state.items = items;
                self.banner.clear_from(self.owner);
            }
            Err(e) => {
                self.banner
                    .report_from(self.owner, &e, &format!("Failed to load {}", R::PLURAL));
            }
        }
    }

    pub async fn items(&self) -> Vec<R::Record> {
        self.state.read().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn snapshot(&self) -> ListSnapshot<R::Record> {
        let state = self.state.read().await;
        ListSnapshot {
            items: state.items.clone(),
            loading: state.loading,
            error: self.banner.get(),
        }
    }

    pub async fn find(&self, id: Uuid) -> Option<R::Record> {
        self.state
            .read()
            .await
            .items
            .iter()
            .find(|r| R::id(r) == id)
            .cloned()
    }

    /// Run one mutating request, then reload regardless of the outcome's
    /// payload. Failures go to the banner and are returned to the caller; no
    /// reload happens after a failure.
    async fn mutate<T, F>(&self, action: &'static str, fallback: &str, request: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match request.await {
            Ok(value) => {
                info!(resource = R::PLURAL, action, "mutation applied");
                self.load().await;
                Ok(value)
            }
            Err(e) => {
                self.banner.report_from(self.owner, &e, fallback);
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resource-specific operations
// ---------------------------------------------------------------------------

impl ListController<Targets> {
    pub async fn create(&self, payload: &TargetPayload) -> Result<Target, ApiError> {
        self.mutate("create", "Failed to save target", self.backend.create_target(payload))
            .await
    }

    pub async fn update(&self, id: Uuid, payload: &TargetPayload) -> Result<Target, ApiError> {
        self.mutate("update", "Failed to save target", self.backend.update_target(id, payload))
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.mutate("delete", "Failed to delete target", self.backend.delete_target(id))
            .await
    }
}

impl ListController<Schedules> {
    pub async fn create(&self, payload: &SchedulePayload) -> Result<Schedule, ApiError> {
        self.mutate("create", "Failed to save schedule", self.backend.create_schedule(payload))
            .await
    }

    pub async fn update(&self, id: Uuid, payload: &SchedulePayload) -> Result<Schedule, ApiError> {
        self.mutate(
            "update",
            "Failed to save schedule",
            self.backend.update_schedule(id, payload),
        )
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.mutate("delete", "Failed to delete schedule", self.backend.delete_schedule(id))
            .await
    }

    pub async fn pause(&self, id: Uuid) -> Result<Schedule, ApiError> {
        self.mutate("pause", "Failed to pause schedule", self.backend.pause_schedule(id))
            .await
    }

    pub async fn resume(&self, id: Uuid) -> Result<Schedule, ApiError> {
        self.mutate("resume", "Failed to resume schedule", self.backend.resume_schedule(id))
            .await
    }
}

impl ListController<Runs> {
    /// Edit one filter dimension. The query string is updated in place
    /// (replace, not push) and the list re-syncs from it; returns whether a
    /// fetch was issued.
    pub async fn set_filter(&self, key: RunFilterKey, value: Option<&str>) -> bool {
        let patch = QueryPatch::new().set_opt(key.as_str(), value);
        self.store.set_state(&patch, Navigation::Replace);
        self.sync().await
    }

    /// Replace every filter dimension at once.
    pub async fn apply_filters(&self, filters: &RunFilters) -> bool {
        self.store.set_state(&filters.to_patch(), Navigation::Replace);
        self.sync().await
    }

    pub async fn clear_filters(&self) -> bool {
        self.apply_filters(&RunFilters::default()).await
    }
}
