//! Per-view list coordination: fetch, filter, paginate, mutate, refresh.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError},
};

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    backend::{ListBackend, ListMutation},
    error::{ListError, MutationKind},
    filter::{filter_collection, FilterState, ListItem},
    paginate::{clamp_page, page_controls, paginate, PageControls},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// How a successful mutation is reconciled with the cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Apply the change to the local collection without refetching.
    SpliceLocally,
    /// Bump the refresh token and refetch the whole collection.
    Reload,
}

/// Deletes are spliced out locally. Adds and updates reload, since the
/// backend enriches what it stores and the returned item can differ from
/// what was submitted.
pub const fn reconcile_policy(kind: MutationKind) -> ReconcilePolicy {
    match kind {
        MutationKind::Delete => ReconcilePolicy::SpliceLocally,
        MutationKind::Add | MutationKind::Update => ReconcilePolicy::Reload,
    }
}

/// Identifies one fetch attempt. Only the newest attempt under the current
/// refresh token may update the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    refresh_token: u64,
    dispatch: u64,
}

impl FetchTicket {
    pub fn refresh_token(&self) -> u64 {
        self.refresh_token
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { items: usize },
    /// The response was superseded or the controller was detached.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Spliced { removed: usize },
    Reloaded { refresh_token: u64, returned: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    Loaded {
        refresh_token: u64,
        items: usize,
    },
    LoadFailed {
        refresh_token: u64,
        error: ListError,
    },
    LoadDiscarded {
        refresh_token: u64,
    },
    MutationApplied {
        kind: MutationKind,
        outcome: MutationOutcome,
    },
    MutationFailed {
        kind: MutationKind,
        error: ListError,
    },
}

/// The slice of the filtered collection currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub page_number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbors<T> {
    pub previous: Option<T>,
    pub next: Option<T>,
}

struct ListState<T> {
    status: LoadStatus,
    collection: Vec<T>,
    filter: FilterState,
    page: usize,
    refresh_token: u64,
    latest_dispatch: u64,
    last_error: Option<ListError>,
    detached: bool,
}

impl<T: ListItem> ListState<T> {
    fn new() -> Self {
        Self {
            status: LoadStatus::Idle,
            collection: Vec::new(),
            filter: FilterState::default(),
            page: 1,
            refresh_token: 0,
            latest_dispatch: 0,
            last_error: None,
            detached: false,
        }
    }

    fn filtered(&self) -> Vec<T> {
        filter_collection(&self.collection, &self.filter)
    }

    fn clamp_page(&mut self, page_size: usize) {
        let total_pages = paginate(&self.filtered(), 1, page_size).total_pages;
        self.page = clamp_page(self.page, total_pages);
    }
}

/// RAII claim on a delete id; the id is released when the guard drops,
/// including when the mutation future is cancelled mid-request.
struct InflightDelete<'a> {
    ids: &'a StdMutex<HashSet<String>>,
    id: String,
}

impl<'a> InflightDelete<'a> {
    fn claim(ids: &'a StdMutex<HashSet<String>>, id: String) -> Option<Self> {
        if !lock_ids(ids).insert(id.clone()) {
            return None;
        }
        Some(Self { ids, id })
    }
}

impl Drop for InflightDelete<'_> {
    fn drop(&mut self) {
        lock_ids(self.ids).remove(&self.id);
    }
}

fn lock_ids(ids: &StdMutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    ids.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ListController<B: ListBackend> {
    backend: Arc<B>,
    page_size: usize,
    inner: Mutex<ListState<B::Item>>,
    inflight_deletes: StdMutex<HashSet<String>>,
    detached: watch::Sender<bool>,
    events: broadcast::Sender<ListEvent>,
}

impl<B: ListBackend> ListController<B> {
    pub fn new(backend: Arc<B>, page_size: usize) -> Self {
        let (events, _) = broadcast::channel(256);
        let (detached, _) = watch::channel(false);
        Self {
            backend,
            page_size: page_size.max(1),
            inner: Mutex::new(ListState::new()),
            inflight_deletes: StdMutex::new(HashSet::new()),
            detached,
            events,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ListEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_detached(&self) -> bool {
        *self.detached.borrow()
    }

    /// Tears the controller down: pending fetches are abandoned and no later
    /// call changes its state.
    pub async fn detach(&self) {
        let mut guard = self.inner.lock().await;
        guard.detached = true;
        lock_ids(&self.inflight_deletes).clear();
        self.detached.send_replace(true);
        debug!("list controller detached");
    }

    /// Enters `Loading` and tags the attempt with the current refresh token.
    pub async fn begin_fetch(&self) -> Result<FetchTicket, ListError> {
        let mut guard = self.inner.lock().await;
        if guard.detached {
            return Err(ListError::Detached);
        }
        guard.latest_dispatch += 1;
        guard.status = LoadStatus::Loading;
        let ticket = FetchTicket {
            refresh_token: guard.refresh_token,
            dispatch: guard.latest_dispatch,
        };
        debug!(
            refresh_token = ticket.refresh_token,
            dispatch = ticket.dispatch,
            "dispatching list fetch"
        );
        Ok(ticket)
    }

    /// Applies the result of the attempt identified by `ticket`, unless a
    /// newer attempt or a refresh has superseded it.
    pub async fn finish_fetch(
        &self,
        ticket: FetchTicket,
        result: anyhow::Result<Vec<B::Item>>,
    ) -> Result<LoadOutcome, ListError> {
        let mut guard = self.inner.lock().await;
        if guard.detached {
            return Ok(LoadOutcome::Discarded);
        }
        if ticket.refresh_token != guard.refresh_token || ticket.dispatch != guard.latest_dispatch
        {
            warn!(
                ticket_token = ticket.refresh_token,
                current_token = guard.refresh_token,
                "discarding stale list response"
            );
            drop(guard);
            self.emit(ListEvent::LoadDiscarded {
                refresh_token: ticket.refresh_token,
            });
            return Ok(LoadOutcome::Discarded);
        }

        match result {
            Ok(items) => {
                let count = items.len();
                guard.collection = items;
                guard.status = LoadStatus::Ready;
                guard.last_error = None;
                guard.clamp_page(self.page_size);
                drop(guard);
                info!(
                    refresh_token = ticket.refresh_token,
                    items = count,
                    "list loaded"
                );
                self.emit(ListEvent::Loaded {
                    refresh_token: ticket.refresh_token,
                    items: count,
                });
                Ok(LoadOutcome::Applied { items: count })
            }
            Err(err) => {
                let error = ListError::fetch(&err);
                guard.status = LoadStatus::Error;
                guard.last_error = Some(error.clone());
                drop(guard);
                warn!(refresh_token = ticket.refresh_token, %error, "list load failed");
                self.emit(ListEvent::LoadFailed {
                    refresh_token: ticket.refresh_token,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Fetches the collection under the current refresh token (mount).
    pub async fn load(&self) -> Result<LoadOutcome, ListError> {
        let ticket = self.begin_fetch().await?;
        let detached = self.detached.subscribe();
        let result = tokio::select! {
            result = self.backend.fetch() => result,
            _ = wait_for_detach(detached) => {
                debug!(refresh_token = ticket.refresh_token, "abandoning list fetch");
                return Ok(LoadOutcome::Discarded);
            }
        };
        self.finish_fetch(ticket, result).await
    }

    /// Bumps the refresh token and refetches.
    pub async fn refresh(&self) -> Result<LoadOutcome, ListError> {
        self.bump_refresh_token().await?;
        self.load().await
    }

    async fn bump_refresh_token(&self) -> Result<u64, ListError> {
        let mut guard = self.inner.lock().await;
        if guard.detached {
            return Err(ListError::Detached);
        }
        guard.refresh_token += 1;
        Ok(guard.refresh_token)
    }

    pub async fn set_filter(&self, next: FilterState) -> Result<(), ListError> {
        let mut guard = self.inner.lock().await;
        if guard.detached {
            return Err(ListError::Detached);
        }
        guard.filter = next.normalized();
        guard.page = 1;
        Ok(())
    }

    /// Moves to page `page`, clamped to the current filtered collection.
    /// Returns the page actually committed.
    pub async fn set_page(&self, page: usize) -> Result<usize, ListError> {
        let mut guard = self.inner.lock().await;
        if guard.detached {
            return Err(ListError::Detached);
        }
        let total_pages = paginate(&guard.filtered(), 1, self.page_size).total_pages;
        guard.page = clamp_page(page, total_pages);
        Ok(guard.page)
    }

    pub async fn request_mutation(
        &self,
        mutation: B::Mutation,
    ) -> Result<MutationOutcome, ListError> {
        if self.inner.lock().await.detached {
            return Err(ListError::Detached);
        }

        let kind = mutation.kind();
        if let Err(error) = mutation.validate() {
            self.emit(ListEvent::MutationFailed {
                kind,
                error: error.clone(),
            });
            return Err(error);
        }

        let target = mutation.target_id().map(str::to_string);
        let delete_target = target.clone().filter(|_| kind == MutationKind::Delete);
        let inflight = match delete_target {
            Some(id) => match InflightDelete::claim(&self.inflight_deletes, id.clone()) {
                Some(claim) => Some(claim),
                None => {
                    debug!(%id, "delete already in flight");
                    return Err(ListError::DeleteInFlight(id));
                }
            },
            None => None,
        };

        let result = self.backend.mutate(&mutation).await;
        drop(inflight);

        let mut guard = self.inner.lock().await;
        if guard.detached {
            return Err(ListError::Detached);
        }

        let ack = match result {
            Ok(ack) => ack,
            Err(err) => {
                drop(guard);
                let error = ListError::mutation(kind, &err);
                warn!(%kind, %error, "list mutation failed");
                self.emit(ListEvent::MutationFailed {
                    kind,
                    error: error.clone(),
                });
                return Err(error);
            }
        };

        match reconcile_policy(kind) {
            ReconcilePolicy::SpliceLocally => {
                let before = guard.collection.len();
                if let Some(id) = target.as_deref() {
                    guard.collection.retain(|item| item.item_id() != id);
                }
                let removed = before - guard.collection.len();
                guard.clamp_page(self.page_size);
                drop(guard);

                let outcome = MutationOutcome::Spliced { removed };
                info!(%kind, removed, "list mutation spliced locally");
                self.emit(ListEvent::MutationApplied {
                    kind,
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            ReconcilePolicy::Reload => {
                guard.refresh_token += 1;
                let refresh_token = guard.refresh_token;
                drop(guard);

                let outcome = MutationOutcome::Reloaded {
                    refresh_token,
                    returned: ack.returned.len(),
                };
                info!(%kind, refresh_token, "list mutation acknowledged, reloading");
                self.emit(ListEvent::MutationApplied {
                    kind,
                    outcome: outcome.clone(),
                });
                // Load failures are recorded in `last_error` and reported as
                // LoadFailed; the mutation itself already succeeded.
                if let Err(error) = self.load().await {
                    warn!(%error, "reload after mutation failed");
                }
                Ok(outcome)
            }
        }
    }

    pub async fn status(&self) -> LoadStatus {
        self.inner.lock().await.status
    }

    pub async fn is_loading(&self) -> bool {
        self.status().await == LoadStatus::Loading
    }

    /// Most recent load failure; cleared by the next successful load.
    pub async fn last_error(&self) -> Option<ListError> {
        self.inner.lock().await.last_error.clone()
    }

    pub async fn refresh_token(&self) -> u64 {
        self.inner.lock().await.refresh_token
    }

    pub async fn filter(&self) -> FilterState {
        self.inner.lock().await.filter.clone()
    }

    pub async fn current_page(&self) -> usize {
        self.inner.lock().await.page
    }

    pub async fn collection(&self) -> Vec<B::Item> {
        self.inner.lock().await.collection.clone()
    }

    pub async fn filtered(&self) -> Vec<B::Item> {
        self.inner.lock().await.filtered()
    }

    pub async fn page(&self) -> PageView<B::Item> {
        let guard = self.inner.lock().await;
        let filtered = guard.filtered();
        let paged = paginate(&filtered, guard.page, self.page_size);
        PageView {
            items: paged.items.to_vec(),
            page_number: guard.page,
            total_pages: paged.total_pages,
            total_items: filtered.len(),
        }
    }

    pub async fn current_page_items(&self) -> Vec<B::Item> {
        self.page().await.items
    }

    pub async fn total_pages(&self) -> usize {
        self.page().await.total_pages
    }

    pub async fn page_controls(&self) -> PageControls {
        let view = self.page().await;
        page_controls(view.page_number, view.total_pages)
    }

    /// Items before and after `id` in the filtered collection.
    pub async fn neighbors(&self, id: &str) -> Neighbors<B::Item> {
        let filtered = self.filtered().await;
        let Some(index) = filtered.iter().position(|item| item.item_id() == id) else {
            return Neighbors {
                previous: None,
                next: None,
            };
        };
        Neighbors {
            previous: index
                .checked_sub(1)
                .and_then(|prev| filtered.get(prev))
                .cloned(),
            next: filtered.get(index + 1).cloned(),
        }
    }
}

async fn wait_for_detach(mut detached: watch::Receiver<bool>) {
    while !*detached.borrow_and_update() {
        if detached.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
