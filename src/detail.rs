//! Detail panel controller.
//!
//! A single-slot state machine: `Closed` or `Open(record)`. The open record is
//! named by the page's selection key in the query string. Selecting a record
//! already in the loaded list costs no request; resolving an id that is not
//! resident (a deep link) costs exactly one fetch-by-id. Failures land on the
//! owning list's error banner.

use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::api::{ApiError, Backend};
use crate::filters::selected_id;
use crate::list::ErrorBanner;
use crate::query::{Navigation, QueryPatch, QueryStore};
use crate::resource::Resource;

#[derive(Debug, Clone, PartialEq)]
pub enum PanelState<T> {
    Closed,
    Open(T),
}

pub struct DetailPanel<R: Resource> {
    backend: Arc<dyn Backend>,
    store: Arc<QueryStore>,
    banner: ErrorBanner,
    state: RwLock<PanelState<R::Record>>,
    /// Last selection key value acted on. A navigation event that leaves the
    /// key unchanged is not resolved again, even after a failed fetch.
    attempted: Mutex<Option<String>>,
}

impl<R: Resource> DetailPanel<R> {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<QueryStore>, banner: ErrorBanner) -> Self {
        Self {
            backend,
            store,
            banner,
            state: RwLock::new(PanelState::Closed),
            attempted: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &'static str {
        R::SELECTION_KEY
    }

    pub async fn state(&self) -> PanelState<R::Record> {
        self.state.read().await.clone()
    }

    pub async fn current(&self) -> Option<R::Record> {
        match &*self.state.read().await {
            PanelState::Open(record) => Some(record.clone()),
            PanelState::Closed => None,
        }
    }

    pub async fn is_open(&self) -> bool {
        matches!(*self.state.read().await, PanelState::Open(_))
    }

    /// Remember `id` as acted on; returns false if it already was.
    fn attempt(&self, id: Option<&str>) -> bool {
        let mut attempted = self
            .attempted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if attempted.as_deref() == id {
            return false;
        }
        *attempted = id.map(str::to_string);
        true
    }

    async fn open_id(&self) -> Option<Uuid> {
        match &*self.state.read().await {
            PanelState::Open(record) => Some(R::id(record)),
            PanelState::Closed => None,
        }
    }

    /// Explicit selection of a resident record: opens it without a request
    /// and records the selection in the query string.
    pub async fn select(&self, record: R::Record) {
        let id = R::id(&record);
        *self.state.write().await = PanelState::Open(record);
        self.attempt(Some(id.to_string().as_str()));
        self.store.set_state(
            &QueryPatch::new().set(R::SELECTION_KEY, id.to_string()),
            Navigation::Push,
        );
    }

    /// Select by id: resident records open immediately, anything else is
    /// fetched. The query string is updated only once the record is open.
    pub async fn select_id(&self, id: &str, resident: &[R::Record]) -> Result<(), ApiError> {
        self.resolve(id, resident, false).await?;
        self.attempt(Some(id));
        self.store
            .set_state(&QueryPatch::new().set(R::SELECTION_KEY, id), Navigation::Push);
        Ok(())
    }

    /// Bring the panel in line with the query string: close when the key is
    /// gone, resolve when it names a different record, otherwise do nothing.
    /// Called on mount (deep-link restoration) and on every navigation event.
    /// A key value already acted on is not resolved again.
    pub async fn restore(&self, resident: &[R::Record]) -> Result<(), ApiError> {
        let key = selected_id(&self.store.params(), R::SELECTION_KEY);
        if !self.attempt(key.as_deref()) {
            return Ok(());
        }
        match key {
            None => {
                *self.state.write().await = PanelState::Closed;
                Ok(())
            }
            Some(id) => self.resolve(&id, resident, true).await,
        }
    }

    /// With `follow_query`, a fetched record is only shown if the query string
    /// still names it when the response arrives.
    async fn resolve(
        &self,
        id: &str,
        resident: &[R::Record],
        follow_query: bool,
    ) -> Result<(), ApiError> {
        let uuid = match Uuid::parse_str(id) {
            Ok(uuid) => uuid,
            Err(_) => {
                let err = ApiError::NotFound {
                    kind: R::NOUN,
                    id: id.to_string(),
                };
                self.banner.report(&err, "");
                return Err(err);
            }
        };

        if self.open_id().await == Some(uuid) {
            return Ok(());
        }

        if let Some(record) = resident.iter().find(|r| R::id(r) == uuid) {
            debug!(resource = R::NOUN, %uuid, "opening resident record");
            *self.state.write().await = PanelState::Open(record.clone());
            return Ok(());
        }

        debug!(resource = R::NOUN, %uuid, "fetching record for detail panel");
        match R::fetch_one(self.backend.as_ref(), uuid).await {
            Ok(record) => {
                let still_wanted = !follow_query
                    || selected_id(&self.store.params(), R::SELECTION_KEY).as_deref() == Some(id);
                if still_wanted {
                    *self.state.write().await = PanelState::Open(record);
                } else {
                    debug!(resource = R::NOUN, %uuid, "discarding stale detail response");
                }
                Ok(())
            }
            Err(e) => {
                self.banner
                    .report(&e, &format!("Failed to load {} details", R::NOUN));
                Err(e)
            }
        }
    }

    /// Close the panel and drop the selection key.
    pub async fn close(&self) {
        *self.state.write().await = PanelState::Closed;
        self.attempt(None);
        self.store
            .set_state(&QueryPatch::new().remove(R::SELECTION_KEY), Navigation::Push);
    }

    /// Close only if `id` is the record on display.
    pub async fn close_if(&self, id: Uuid) -> bool {
        if self.open_id().await == Some(id) {
            self.close().await;
            true
        } else {
            false
        }
    }
}
