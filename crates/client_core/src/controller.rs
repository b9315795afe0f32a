//! Paginated resource list controller.
//!
//! Owns the query state of one remote collection view, issues fetches through
//! an injected [`CollectionFetcher`], and exposes per-row mutations that
//! refresh the current page once they succeed. Collaborator failures never
//! escape: they are turned into [`ListStatus::Error`] or a per-row mutation
//! error.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError},
};

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{FetchError, MountError, MutationError},
    pagination::{self, ListPage},
    query::{FilterKey, FilterValue, ListRequest, PageSize, QueryState, ResourceKind},
    session::SessionProvider,
    CollectionFetcher,
};

const EVENT_CAPACITY: usize = 256;

/// An entity shown as one row of a list.
pub trait ListItem: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn item_id(&self) -> Self::Id;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Idle,
    Loading,
    Loaded,
    Error(String),
}

impl ListStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, ListStatus::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ListStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The action succeeded and the current page was refetched.
    Completed,
    /// The action failed; the message is kept as the row's mutation error.
    Failed(String),
    /// A mutation for the same id is already in flight; nothing was invoked.
    Busy,
    /// The id is not among the visible items; nothing was invoked.
    UnknownItem,
}

#[derive(Debug, Clone)]
pub enum ListEvent<K> {
    FetchStarted { seq: u64, request: ListRequest },
    Loaded { seq: u64, total_count: u64, total_pages: u32 },
    FetchFailed { seq: u64, message: String },
    StaleResponseDiscarded { seq: u64, latest: u64 },
    PageCorrected { from: u32, to: u32 },
    /// The fetch future was dropped before its response was applied.
    FetchCancelled { seq: u64 },
    MutationStarted { id: K },
    MutationFinished { id: K, error: Option<String> },
}

/// Render-ready copy of the controller state.
#[derive(Debug, Clone)]
pub struct ListSnapshot<T: ListItem> {
    pub kind: ResourceKind,
    pub query: QueryState,
    pub status: ListStatus,
    pub items: Vec<T>,
    pub total_count: u64,
    pub total_pages: u32,
    pub page_window: Vec<u32>,
    pub has_previous: bool,
    pub has_next: bool,
    pub mutating: HashSet<T::Id>,
    pub mutation_errors: HashMap<T::Id, String>,
}

impl<T: ListItem> ListSnapshot<T> {
    pub fn is_mutating(&self, id: &T::Id) -> bool {
        self.mutating.contains(id)
    }

    pub fn mutation_error(&self, id: &T::Id) -> Option<&str> {
        self.mutation_errors.get(id).map(String::as_str)
    }

    /// e.g. "Showing 10 of 25 bookings".
    pub fn summary(&self) -> String {
        format!(
            "Showing {} of {} {}",
            self.items.len(),
            self.total_count,
            self.kind.noun()
        )
    }
}

struct ListState<T: ListItem> {
    query: QueryState,
    status: ListStatus,
    items: Vec<T>,
    total_count: u64,
    /// Known only after a successful fetch.
    total_pages: Option<u32>,
    latest_seq: u64,
    mutation_errors: HashMap<T::Id, String>,
}

struct FetchTicket {
    seq: u64,
    request: ListRequest,
}

fn lock_ids<K>(ids: &StdMutex<HashSet<K>>) -> MutexGuard<'_, HashSet<K>> {
    ids.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases a row's in-flight mark when the mutation ends, including when the
/// `mutate` future is dropped mid-action.
struct MutationGuard<'a, K: Eq + Hash> {
    mutating: &'a StdMutex<HashSet<K>>,
    id: K,
}

impl<K: Eq + Hash> Drop for MutationGuard<'_, K> {
    fn drop(&mut self) {
        lock_ids(self.mutating).remove(&self.id);
    }
}

/// Tracks the fetch a `run_fetch` call is waiting on. Dropped while still
/// armed, it moves a list stuck in `Loading` back to `Idle`. When the state
/// lock is contended the reset is skipped, since the holder is about to
/// replace the status anyway.
struct PendingFetch<'a, T: ListItem> {
    controller: &'a ListController<T>,
    seq: Option<u64>,
}

impl<T: ListItem> Drop for PendingFetch<'_, T> {
    fn drop(&mut self) {
        let Some(seq) = self.seq else {
            return;
        };
        let Ok(mut state) = self.controller.inner.try_lock() else {
            return;
        };
        if state.latest_seq == seq && state.status.is_loading() {
            debug!(kind = %self.controller.kind, seq, "list fetch cancelled");
            state.status = ListStatus::Idle;
            let _ = self.controller.events.send(ListEvent::FetchCancelled { seq });
        }
    }
}

pub struct ListController<T: ListItem> {
    kind: ResourceKind,
    default_page_size: PageSize,
    fetcher: Arc<dyn CollectionFetcher<T>>,
    inner: Mutex<ListState<T>>,
    /// Ids with an action in flight. Kept out of `inner` so a dropped
    /// mutation can release its id without awaiting.
    mutating: StdMutex<HashSet<T::Id>>,
    events: broadcast::Sender<ListEvent<T::Id>>,
}

impl<T: ListItem> ListController<T> {
    pub fn new(
        kind: ResourceKind,
        fetcher: Arc<dyn CollectionFetcher<T>>,
        default_page_size: PageSize,
    ) -> Arc<Self> {
        Self::with_query(
            kind,
            fetcher,
            default_page_size,
            QueryState::with_page_size(default_page_size),
        )
    }

    /// Builds the initial query state from the page's location query string.
    pub fn from_location(
        kind: ResourceKind,
        fetcher: Arc<dyn CollectionFetcher<T>>,
        default_page_size: PageSize,
        location_query: &str,
    ) -> Arc<Self> {
        let query = QueryState::from_location_query(kind, location_query, default_page_size);
        Self::with_query(kind, fetcher, default_page_size, query)
    }

    pub fn with_query(
        kind: ResourceKind,
        fetcher: Arc<dyn CollectionFetcher<T>>,
        default_page_size: PageSize,
        mut query: QueryState,
    ) -> Arc<Self> {
        query.filters.retain(|key, _| kind.supports(*key));
        query.page = query.page.max(1);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            kind,
            default_page_size,
            fetcher,
            inner: Mutex::new(ListState {
                query,
                status: ListStatus::Idle,
                items: Vec::new(),
                total_count: 0,
                total_pages: None,
                latest_seq: 0,
                mutation_errors: HashMap::new(),
            }),
            mutating: StdMutex::new(HashSet::new()),
            events,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ListEvent<T::Id>> {
        self.events.subscribe()
    }

    pub async fn query(&self) -> QueryState {
        self.inner.lock().await.query.clone()
    }

    pub async fn status(&self) -> ListStatus {
        self.inner.lock().await.status.clone()
    }

    pub async fn location_query(&self) -> String {
        self.inner
            .lock()
            .await
            .query
            .to_location_query(self.default_page_size)
    }

    pub async fn item(&self, id: &T::Id) -> Option<T> {
        self.inner
            .lock()
            .await
            .items
            .iter()
            .find(|item| &item.item_id() == id)
            .cloned()
    }

    pub async fn snapshot(&self) -> ListSnapshot<T> {
        let state = self.inner.lock().await;
        let total_pages = state.total_pages.unwrap_or(1);
        ListSnapshot {
            kind: self.kind,
            query: state.query.clone(),
            status: state.status.clone(),
            items: state.items.clone(),
            total_count: state.total_count,
            total_pages,
            page_window: pagination::page_window(state.query.page, total_pages),
            has_previous: pagination::has_previous(state.query.page),
            has_next: pagination::has_next(state.query.page, total_pages),
            mutating: lock_ids(&self.mutating).clone(),
            mutation_errors: state.mutation_errors.clone(),
        }
    }

    /// Guard checked before the view is shown, then the initial fetch.
    pub async fn mount(
        &self,
        session: &dyn SessionProvider,
        login_path: &str,
    ) -> Result<(), MountError> {
        if self.kind.requires_auth() && !session.is_authenticated() {
            info!(kind = %self.kind, login_path, "list requires a signed-in user");
            return Err(MountError::Unauthenticated {
                login_path: login_path.to_string(),
            });
        }
        self.refresh().await;
        Ok(())
    }

    /// Sets or clears (`None`) one filter, resets to the first page and fetches.
    pub async fn set_filter(&self, key: FilterKey, value: Option<FilterValue>) {
        self.apply_filters([(key, value)]).await;
    }

    /// Applies several filter changes as a single user action: one page reset,
    /// one fetch.
    pub async fn apply_filters<I>(&self, changes: I)
    where
        I: IntoIterator<Item = (FilterKey, Option<FilterValue>)>,
    {
        let mut accepted = Vec::new();
        for (key, value) in changes {
            if self.kind.supports(key) {
                accepted.push((key, value.and_then(FilterValue::normalized)));
            } else {
                warn!(kind = %self.kind, ?key, "ignoring unsupported filter");
            }
        }
        if accepted.is_empty() {
            return;
        }

        let ticket = {
            let mut state = self.inner.lock().await;
            for (key, value) in accepted {
                match value {
                    Some(value) => {
                        state.query.filters.insert(key, value);
                    }
                    None => {
                        state.query.filters.remove(&key);
                    }
                }
            }
            state.query.page = 1;
            self.begin_fetch(&mut state)
        };
        self.run_fetch(ticket).await;
    }

    pub async fn clear_filters(&self) {
        let ticket = {
            let mut state = self.inner.lock().await;
            state.query.filters.clear();
            state.query.page = 1;
            self.begin_fetch(&mut state)
        };
        self.run_fetch(ticket).await;
    }

    /// Free-text search. Blank input removes the search filter entirely.
    pub async fn search(&self, query: &str) {
        self.set_filter(FilterKey::SearchQuery, Some(FilterValue::text(query)))
            .await;
    }

    pub async fn set_page_size(&self, page_size: PageSize) {
        let ticket = {
            let mut state = self.inner.lock().await;
            state.query.page_size = page_size;
            state.query.page = 1;
            self.begin_fetch(&mut state)
        };
        self.run_fetch(ticket).await;
    }

    /// Out-of-range pages are clamped silently, the same way the Previous and
    /// Next controls are disabled at the boundaries.
    pub async fn set_page(&self, page: u32) {
        let ticket = {
            let mut state = self.inner.lock().await;
            let target = pagination::clamp_page(page, state.total_pages);
            if target != page {
                debug!(kind = %self.kind, requested = page, clamped = target, "page clamped");
            }
            state.query.page = target;
            self.begin_fetch(&mut state)
        };
        self.run_fetch(ticket).await;
    }

    pub async fn next_page(&self) {
        let page = self.inner.lock().await.query.page.saturating_add(1);
        self.set_page(page).await;
    }

    pub async fn previous_page(&self) {
        let page = self.inner.lock().await.query.page.saturating_sub(1);
        self.set_page(page).await;
    }

    /// Re-issues the fetch for the current query. Also the manual retry after
    /// a fetch error; nothing is ever retried automatically.
    pub async fn refresh(&self) {
        let ticket = {
            let mut state = self.inner.lock().await;
            self.begin_fetch(&mut state)
        };
        self.run_fetch(ticket).await;
    }

    /// Runs a write action for one visible row.
    ///
    /// At most one action per id is in flight; a second call for the same id
    /// returns [`MutationOutcome::Busy`] without invoking `action`. Distinct ids
    /// proceed concurrently. Success refreshes the current page, failure keeps
    /// the list and records a message for that row only. Dropping the returned
    /// future releases the id, so the row can be retried.
    pub async fn mutate<F, Fut>(&self, id: T::Id, action: F) -> MutationOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), MutationError>>,
    {
        let guard = {
            let mut state = self.inner.lock().await;
            if !state.items.iter().any(|item| item.item_id() == id) {
                debug!(kind = %self.kind, %id, "mutation ignored: item not visible");
                return MutationOutcome::UnknownItem;
            }
            if !lock_ids(&self.mutating).insert(id.clone()) {
                debug!(kind = %self.kind, %id, "mutation ignored: already in flight");
                return MutationOutcome::Busy;
            }
            state.mutation_errors.remove(&id);
            MutationGuard {
                mutating: &self.mutating,
                id: id.clone(),
            }
        };
        let _ = self
            .events
            .send(ListEvent::MutationStarted { id: id.clone() });

        let result = action().await;

        let failure = {
            let mut state = self.inner.lock().await;
            let failure = match result {
                Ok(()) => None,
                Err(err) => {
                    let message = err.user_message();
                    warn!(kind = %self.kind, %id, error = %err, "mutation failed");
                    state.mutation_errors.insert(id.clone(), message.clone());
                    Some(message)
                }
            };
            drop(guard);
            failure
        };
        let _ = self.events.send(ListEvent::MutationFinished {
            id: id.clone(),
            error: failure.clone(),
        });

        match failure {
            None => {
                info!(kind = %self.kind, %id, "mutation completed; refreshing list");
                self.refresh().await;
                MutationOutcome::Completed
            }
            Some(message) => MutationOutcome::Failed(message),
        }
    }

    pub async fn is_mutating(&self, id: &T::Id) -> bool {
        lock_ids(&self.mutating).contains(id)
    }

    pub async fn mutation_error(&self, id: &T::Id) -> Option<String> {
        self.inner.lock().await.mutation_errors.get(id).cloned()
    }

    pub async fn dismiss_mutation_error(&self, id: &T::Id) {
        self.inner.lock().await.mutation_errors.remove(id);
    }

    fn begin_fetch(&self, state: &mut ListState<T>) -> FetchTicket {
        state.latest_seq += 1;
        state.status = ListStatus::Loading;
        state.items.clear();

        let seq = state.latest_seq;
        let request = state.query.request();
        debug!(
            kind = %self.kind,
            seq,
            page = request.page,
            page_size = request.page_size.get(),
            filters = request.filters.len(),
            "list fetch started"
        );
        let _ = self.events.send(ListEvent::FetchStarted {
            seq,
            request: request.clone(),
        });
        FetchTicket { seq, request }
    }

    /// Awaits the collaborator without holding the state lock. A page past the
    /// end is corrected with exactly one follow-up fetch. If this future is
    /// dropped first, a list still waiting on it goes back to `Idle`.
    async fn run_fetch(&self, ticket: FetchTicket) {
        let mut ticket = ticket;
        let mut corrected = false;
        let mut pending = PendingFetch {
            controller: self,
            seq: Some(ticket.seq),
        };
        loop {
            let result = self.fetcher.fetch(self.kind, ticket.request.clone()).await;
            let follow_up = {
                let mut state = self.inner.lock().await;
                self.apply_fetch_result(&mut state, &ticket, result, corrected)
            };
            match follow_up {
                Some(next) => {
                    pending.seq = Some(next.seq);
                    ticket = next;
                    corrected = true;
                }
                None => break,
            }
        }
        pending.seq = None;
    }

    fn apply_fetch_result(
        &self,
        state: &mut ListState<T>,
        ticket: &FetchTicket,
        result: Result<ListPage<T>, FetchError>,
        corrected: bool,
    ) -> Option<FetchTicket> {
        if ticket.seq != state.latest_seq {
            debug!(
                kind = %self.kind,
                seq = ticket.seq,
                latest = state.latest_seq,
                "discarding stale list response"
            );
            let _ = self.events.send(ListEvent::StaleResponseDiscarded {
                seq: ticket.seq,
                latest: state.latest_seq,
            });
            return None;
        }

        match result {
            Ok(page) => {
                let total_pages = pagination::total_pages(page.total_count, ticket.request.page_size);

                if ticket.request.page > total_pages && !corrected {
                    info!(
                        kind = %self.kind,
                        from = ticket.request.page,
                        to = total_pages,
                        "page past the end; refetching last page"
                    );
                    let _ = self.events.send(ListEvent::PageCorrected {
                        from: ticket.request.page,
                        to: total_pages,
                    });
                    state.query.page = total_pages;
                    state.total_pages = Some(total_pages);
                    state.total_count = page.total_count;
                    return Some(self.begin_fetch(state));
                }

                let mut items = page.items;
                let limit = ticket.request.page_size.get() as usize;
                if items.len() > limit {
                    warn!(
                        kind = %self.kind,
                        received = items.len(),
                        limit,
                        "collection returned more items than requested; truncating"
                    );
                    items.truncate(limit);
                }

                state.items = items;
                state.total_count = page.total_count;
                state.total_pages = Some(total_pages);
                state.status = ListStatus::Loaded;
                debug!(
                    kind = %self.kind,
                    seq = ticket.seq,
                    total_count = page.total_count,
                    total_pages,
                    "list loaded"
                );
                let _ = self.events.send(ListEvent::Loaded {
                    seq: ticket.seq,
                    total_count: page.total_count,
                    total_pages,
                });
                None
            }
            Err(err) => {
                let message = err.user_message();
                warn!(kind = %self.kind, seq = ticket.seq, error = %err, "list fetch failed");
                state.items.clear();
                state.total_count = 0;
                state.total_pages = None;
                state.status = ListStatus::Error(message.clone());
                let _ = self.events.send(ListEvent::FetchFailed {
                    seq: ticket.seq,
                    message,
                });
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
