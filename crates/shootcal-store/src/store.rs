//! The availability store: a per-widget cache of sessions keyed by date,
//! filled one month at a time from a [`RecordSource`].
//!
//! All mutation goes through [`AvailabilityStore::initial_load`] and
//! [`AvailabilityStore::ensure_month_loaded`]. Fetches are serialized per
//! store: a call that arrives while another fetch is pending waits for it,
//! then re-checks the cache before issuing its own request. State lives
//! behind a `std::sync::Mutex` that is never held across an `.await`.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate};
use shootcal_core::preview::mock_sessions;
use shootcal_core::views;
use shootcal_core::{LocationFilter, MonthKey, Session};
use shootcal_records::{normalize_batch, RecordsError, DEFAULT_PAGE_SIZE};
use tokio::sync::watch;

use crate::source::RecordSource;

/// Whether the store talks to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Interactive,
    /// Non-interactive design context: mock data, no requests.
    Preview,
}

/// Coarse state for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Error,
}

/// Why a load call returned without issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Preview,
    Exhausted,
    AlreadyLoaded,
    /// Sessions for the month are present although the month was never marked loaded.
    SessionsPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Skipped(SkipReason),
    /// A request completed and its records were merged.
    Loaded {
        fetched: usize,
        added: usize,
        exhausted: bool,
    },
    /// Preview data was merged in place of a request.
    Seeded { added: usize },
}

/// Summary published to subscribers after every state transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub revision: u64,
    pub sessions: usize,
    pub loaded_months: usize,
    pub pending: bool,
    pub exhausted: bool,
    pub last_error: Option<String>,
}

/// Which months a successful fetch marks as loaded.
#[derive(Debug, Clone, Copy)]
enum MarkMonths {
    Requested(MonthKey),
    Returned,
}

#[derive(Debug, Default)]
struct StoreState {
    sessions: BTreeMap<NaiveDate, Session>,
    loaded_months: BTreeSet<MonthKey>,
    exhausted: bool,
    /// Sequence number of the request currently in flight.
    in_flight: Option<u64>,
    last_error: Option<String>,
    next_request: u64,
    revision: u64,
}

impl StoreState {
    fn month_skip_reason(&self, month: MonthKey) -> Option<SkipReason> {
        if self.exhausted {
            Some(SkipReason::Exhausted)
        } else if self.loaded_months.contains(&month) {
            Some(SkipReason::AlreadyLoaded)
        } else if self.sessions.keys().any(|date| month.contains(*date)) {
            Some(SkipReason::SessionsPresent)
        } else {
            None
        }
    }

    fn begin_request(&mut self) -> u64 {
        self.next_request += 1;
        self.in_flight = Some(self.next_request);
        self.last_error = None;
        self.revision += 1;
        self.next_request
    }

    /// Inserts sessions whose date is not yet present. Existing entries and
    /// earlier entries in the same batch win.
    fn merge(&mut self, sessions: impl IntoIterator<Item = Session>) -> usize {
        let mut added = 0;
        for session in sessions {
            if let Entry::Vacant(slot) = self.sessions.entry(session.date) {
                slot.insert(session);
                added += 1;
            }
        }
        added
    }

    fn phase(&self) -> LoadPhase {
        if self.in_flight.is_some() {
            LoadPhase::Loading
        } else if self.last_error.is_some() {
            LoadPhase::Error
        } else {
            LoadPhase::Idle
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            revision: self.revision,
            sessions: self.sessions.len(),
            loaded_months: self.loaded_months.len(),
            pending: self.in_flight.is_some(),
            exhausted: self.exhausted,
            last_error: self.last_error.clone(),
        }
    }
}

/// Clears the in-flight marker if the request future is dropped before
/// it completes.
struct InFlightGuard<'a, S: RecordSource> {
    store: &'a AvailabilityStore<S>,
    request: u64,
}

impl<S: RecordSource> Drop for InFlightGuard<'_, S> {
    fn drop(&mut self) {
        let mut state = self.store.state();
        if state.in_flight == Some(self.request) {
            tracing::debug!(request = self.request, "request abandoned before completion");
            state.in_flight = None;
            state.revision += 1;
            self.store.publish(&state);
        }
    }
}

/// Per-widget availability cache.
pub struct AvailabilityStore<S> {
    source: S,
    mode: StoreMode,
    current_month: MonthKey,
    page_size: u32,
    state: Mutex<StoreState>,
    /// Held from the cache check until the request's result is merged.
    fetch_lock: tokio::sync::Mutex<()>,
    notify: watch::Sender<StoreSnapshot>,
}

impl<S: RecordSource> AvailabilityStore<S> {
    /// Creates an empty store seeded with `current_month`.
    pub fn new(source: S, mode: StoreMode, current_month: MonthKey) -> Self {
        let (notify, _) = watch::channel(StoreSnapshot::default());
        Self {
            source,
            mode,
            current_month,
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(StoreState::default()),
            fetch_lock: tokio::sync::Mutex::new(()),
            notify,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Loads availability from the first day of the current month forward.
    ///
    /// Every month present among the returned sessions is marked loaded. In
    /// preview mode the fixed mock dataset is merged instead.
    ///
    /// # Errors
    ///
    /// Returns the [`RecordsError`] that failed the request; it is also
    /// recorded as [`AvailabilityStore::last_error`].
    pub async fn initial_load(&self) -> Result<LoadOutcome, RecordsError> {
        if self.mode == StoreMode::Preview {
            return Ok(self.seed_preview());
        }

        let _serial = self.fetch_lock.lock().await;
        let request = {
            let mut state = self.state();
            if state.exhausted {
                tracing::debug!("initial load skipped: feed exhausted");
                return Ok(LoadOutcome::Skipped(SkipReason::Exhausted));
            }
            let request = state.begin_request();
            self.publish(&state);
            request
        };

        self.run_request(request, self.current_month, MarkMonths::Returned)
            .await
    }

    /// Makes sure `month` has been fetched, issuing at most one request.
    ///
    /// If another fetch is pending this waits for it to finish and then
    /// decides, so a month loaded by that fetch is not requested again.
    ///
    /// # Errors
    ///
    /// Returns the [`RecordsError`] that failed the request; it is also
    /// recorded as [`AvailabilityStore::last_error`]. Nothing is merged on
    /// failure and the month stays unloaded, so a later call retries.
    pub async fn ensure_month_loaded(&self, month: MonthKey) -> Result<LoadOutcome, RecordsError> {
        if self.mode == StoreMode::Preview {
            return Ok(LoadOutcome::Skipped(SkipReason::Preview));
        }

        let _serial = self.fetch_lock.lock().await;
        let request = {
            let mut state = self.state();
            if let Some(reason) = state.month_skip_reason(month) {
                tracing::debug!(%month, ?reason, "month load skipped");
                if state.last_error.take().is_some() {
                    state.revision += 1;
                    self.publish(&state);
                }
                return Ok(LoadOutcome::Skipped(reason));
            }
            let request = state.begin_request();
            self.publish(&state);
            request
        };

        self.run_request(request, month, MarkMonths::Requested(month))
            .await
    }

    async fn run_request(
        &self,
        request: u64,
        month: MonthKey,
        mark: MarkMonths,
    ) -> Result<LoadOutcome, RecordsError> {
        let _guard = InFlightGuard {
            store: self,
            request,
        };
        let from_date_ms = month.first_day_millis(&Local);
        tracing::debug!(request, %month, from_date_ms, "requesting records");

        let result = match self.source.fetch_from(from_date_ms, self.page_size).await {
            Ok(records) => normalize_batch(&records).map(|sessions| (records.len(), sessions)),
            Err(e) => Err(e),
        };

        let mut state = self.state();
        state.in_flight = None;
        state.revision += 1;

        let outcome = match result {
            Ok((fetched, sessions)) => {
                if fetched == 0 {
                    state.exhausted = true;
                }
                match mark {
                    MarkMonths::Requested(m) => {
                        state.loaded_months.insert(m);
                    }
                    MarkMonths::Returned => {
                        let months: BTreeSet<MonthKey> =
                            sessions.iter().map(|s| MonthKey::of(s.date)).collect();
                        state.loaded_months.extend(months);
                    }
                }
                let added = state.merge(sessions);
                tracing::info!(
                    request,
                    %month,
                    fetched,
                    added,
                    exhausted = state.exhausted,
                    "merged availability"
                );
                Ok(LoadOutcome::Loaded {
                    fetched,
                    added,
                    exhausted: state.exhausted,
                })
            }
            Err(e) => {
                tracing::warn!(
                    request,
                    %month,
                    kind = %e.kind(),
                    error = %e,
                    "availability load failed"
                );
                state.last_error = Some(e.to_string());
                Err(e)
            }
        };

        self.publish(&state);
        outcome
    }

    fn seed_preview(&self) -> LoadOutcome {
        let sessions = mock_sessions(self.current_month);
        let mut state = self.state();
        state
            .loaded_months
            .extend(sessions.iter().map(|s| MonthKey::of(s.date)));
        let added = state.merge(sessions);
        state.revision += 1;
        self.publish(&state);
        tracing::debug!(added, "seeded preview sessions");
        LoadOutcome::Seeded { added }
    }
}

impl<S> AvailabilityStore<S> {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &StoreState) {
        self.notify.send_replace(state.snapshot());
    }

    /// Receives a [`StoreSnapshot`] after every state transition.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.notify.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state().snapshot()
    }

    #[must_use]
    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    #[must_use]
    pub fn current_month(&self) -> MonthKey {
        self.current_month
    }

    /// All sessions, ordered by date.
    #[must_use]
    pub fn sessions(&self) -> Vec<Session> {
        self.state().sessions.values().cloned().collect()
    }

    #[must_use]
    pub fn session_on(&self, date: NaiveDate) -> Option<Session> {
        self.state().sessions.get(&date).cloned()
    }

    #[must_use]
    pub fn loaded_months(&self) -> BTreeSet<MonthKey> {
        self.state().loaded_months.clone()
    }

    #[must_use]
    pub fn is_month_loaded(&self, month: MonthKey) -> bool {
        self.state().loaded_months.contains(&month)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state().exhausted
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state().in_flight.is_some()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    #[must_use]
    pub fn phase(&self) -> LoadPhase {
        self.state().phase()
    }

    #[must_use]
    pub fn filtered_sessions(&self, filter: &LocationFilter) -> Vec<Session> {
        let state = self.state();
        views::filter_by_location(state.sessions.values(), filter)
            .into_iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn location_options(&self) -> Vec<LocationFilter> {
        views::location_options(self.state().sessions.values())
    }

    #[must_use]
    pub fn sessions_in_month(&self, month: MonthKey) -> Vec<Session> {
        let state = self.state();
        views::sessions_in_month(state.sessions.values(), month)
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
