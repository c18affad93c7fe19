use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;
use serde_json::json;
use shootcal_core::SessionStatus;
use shootcal_records::RawRecord;

use super::*;

/// Scripted record source. Replies are served in order; once the script
/// runs out every call returns an empty page.
#[derive(Default)]
struct FakeSource {
    replies: Mutex<VecDeque<Result<Vec<RawRecord>, RecordsError>>>,
    requests: Mutex<Vec<i64>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeSource {
    fn with_replies(replies: Vec<Result<Vec<RawRecord>, RecordsError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were running at the same time.
    fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_from(
        &self,
        from_date_ms: i64,
        _page_size: u32,
    ) -> Result<Vec<RawRecord>, RecordsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        self.requests.lock().unwrap().push(from_date_ms);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn month(year: i32, month0: u32) -> MonthKey {
    MonthKey::new(year, month0).unwrap()
}

fn local_noon_millis(y: i32, m: u32, d: u32) -> i64 {
    Local
        .with_ymd_and_hms(y, m, d, 12, 0, 0)
        .earliest()
        .unwrap()
        .timestamp_millis()
}

fn raw(y: i32, m: u32, d: u32, location: &str, model: &str) -> RawRecord {
    serde_json::from_value(json!({
        "fields": {
            "Date": local_noon_millis(y, m, d),
            "Location": [{ "type": "text", "text": location }],
            "Model": [{ "type": "text", "text": model }],
            "Status": "available",
            "Price": 100
        }
    }))
    .unwrap()
}

fn store_with(source: FakeSource) -> AvailabilityStore<FakeSource> {
    AvailabilityStore::new(source, StoreMode::Interactive, month(2025, 3))
}

fn application_error() -> RecordsError {
    RecordsError::Application {
        code: 1254,
        message: "table not found".to_string(),
    }
}

// -----------------------------------------------------------------------
// initial_load
// -----------------------------------------------------------------------

#[tokio::test]
async fn initial_load_merges_and_marks_returned_months() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![
        raw(2025, 4, 21, "Downtown Studio", "Ava"),
        raw(2025, 5, 2, "Rooftop", "Leo"),
    ])]));

    let outcome = store.initial_load().await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            fetched: 2,
            added: 2,
            exhausted: false
        }
    );
    let loaded: Vec<String> = store.loaded_months().iter().map(ToString::to_string).collect();
    assert_eq!(loaded, vec!["2025-3", "2025-4"]);
    assert_eq!(store.phase(), LoadPhase::Idle);
}

#[tokio::test]
async fn initial_load_requests_first_day_of_current_month() {
    let store = store_with(FakeSource::default());
    store.initial_load().await.unwrap();

    let requests = store.source.requests.lock().unwrap().clone();
    assert_eq!(requests, vec![month(2025, 3).first_day_millis(&Local)]);
}

#[tokio::test]
async fn end_to_end_single_april_session() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![raw(
        2025,
        4,
        21,
        "Downtown Studio",
        "Ava",
    )])]));

    store.initial_load().await.unwrap();

    assert!(store.loaded_months().iter().any(|m| m.to_string() == "2025-3"));
    let sessions = store.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].date_key(), "2025-04-21");
    assert_eq!(sessions[0].location, "Downtown Studio");

    let outcome = store.ensure_month_loaded(month(2025, 3)).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Skipped(SkipReason::AlreadyLoaded));
    assert_eq!(store.source.calls(), 1);
}

// -----------------------------------------------------------------------
// ensure_month_loaded
// -----------------------------------------------------------------------

#[tokio::test]
async fn ensure_month_loaded_twice_issues_one_request() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![raw(
        2025, 6, 10, "Rooftop", "Leo",
    )])]));

    let first = store.ensure_month_loaded(month(2025, 5)).await.unwrap();
    let second = store.ensure_month_loaded(month(2025, 5)).await.unwrap();

    assert!(matches!(first, LoadOutcome::Loaded { added: 1, .. }));
    assert_eq!(second, LoadOutcome::Skipped(SkipReason::AlreadyLoaded));
    assert_eq!(store.source.calls(), 1);
    assert!(store.is_month_loaded(month(2025, 5)));
}

#[tokio::test]
async fn ensure_month_loaded_requests_first_day_of_target() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![raw(
        2025, 7, 1, "Rooftop", "Leo",
    )])]));
    store.ensure_month_loaded(month(2025, 6)).await.unwrap();

    let requests = store.source.requests.lock().unwrap().clone();
    assert_eq!(requests, vec![month(2025, 6).first_day_millis(&Local)]);
}

#[tokio::test]
async fn merge_never_replaces_existing_session() {
    let store = store_with(FakeSource::with_replies(vec![
        Ok(vec![raw(2025, 4, 21, "Downtown Studio", "Ava")]),
        Ok(vec![
            raw(2025, 4, 21, "Somewhere Else", "Impostor"),
            raw(2025, 5, 3, "Rooftop", "Leo"),
        ]),
    ]));

    store.initial_load().await.unwrap();
    let outcome = store.ensure_month_loaded(month(2025, 4)).await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            fetched: 2,
            added: 1,
            exhausted: false
        }
    );
    let kept = store
        .session_on(chrono::NaiveDate::from_ymd_opt(2025, 4, 21).unwrap())
        .unwrap();
    assert_eq!(kept.model, "Ava");
    assert_eq!(kept.location, "Downtown Studio");
    assert_eq!(store.sessions().len(), 2);
}

#[tokio::test]
async fn duplicate_dates_within_one_batch_keep_first() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![
        raw(2025, 6, 10, "First", "A"),
        raw(2025, 6, 10, "Second", "B"),
    ])]));

    store.ensure_month_loaded(month(2025, 5)).await.unwrap();

    let sessions = store.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].location, "First");
}

#[tokio::test]
async fn month_with_sessions_is_skipped_without_marking() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![
        raw(2025, 4, 21, "A", "Ava"),
        raw(2025, 6, 2, "B", "Leo"),
    ])]));
    store.initial_load().await.unwrap();

    // June holds a session but is not marked loaded.
    {
        let mut state = store.state();
        state.loaded_months.remove(&month(2025, 5));
    }

    let outcome = store.ensure_month_loaded(month(2025, 5)).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Skipped(SkipReason::SessionsPresent));
    assert!(!store.is_month_loaded(month(2025, 5)));
    assert_eq!(store.source.calls(), 1);
}

// -----------------------------------------------------------------------
// exhaustion
// -----------------------------------------------------------------------

#[tokio::test]
async fn empty_page_exhausts_store_for_every_later_call() {
    let store = store_with(FakeSource::with_replies(vec![Ok(Vec::new())]));

    let outcome = store.ensure_month_loaded(month(2025, 8)).await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            fetched: 0,
            added: 0,
            exhausted: true
        }
    );
    assert!(store.is_exhausted());

    assert_eq!(
        store.ensure_month_loaded(month(2025, 9)).await.unwrap(),
        LoadOutcome::Skipped(SkipReason::Exhausted)
    );
    assert_eq!(
        store.initial_load().await.unwrap(),
        LoadOutcome::Skipped(SkipReason::Exhausted)
    );
    assert_eq!(store.source.calls(), 1);
    assert!(store.is_exhausted());
}

#[tokio::test]
async fn page_of_only_undated_records_does_not_exhaust() {
    let undated: RawRecord =
        serde_json::from_value(json!({ "fields": { "Model": [{ "text": "Ghost" }] } })).unwrap();
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![undated])]));

    let outcome = store.ensure_month_loaded(month(2025, 8)).await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            fetched: 1,
            added: 0,
            exhausted: false
        }
    );
    assert!(!store.is_exhausted());
    assert!(store.sessions().is_empty());
}

// -----------------------------------------------------------------------
// failures
// -----------------------------------------------------------------------

#[tokio::test]
async fn failure_sets_last_error_and_leaves_state_unchanged() {
    let store = store_with(FakeSource::with_replies(vec![
        Ok(vec![raw(2025, 4, 21, "A", "Ava")]),
        Err(application_error()),
    ]));
    store.initial_load().await.unwrap();
    let before_sessions = store.sessions();
    let before_months = store.loaded_months();

    let err = store.ensure_month_loaded(month(2025, 6)).await.unwrap_err();

    assert!(matches!(err, RecordsError::Application { .. }));
    assert_eq!(
        store.last_error().as_deref(),
        Some("records API error 1254: table not found")
    );
    assert_eq!(store.phase(), LoadPhase::Error);
    assert!(!store.is_pending());
    assert_eq!(store.sessions(), before_sessions);
    assert_eq!(store.loaded_months(), before_months);
}

#[tokio::test]
async fn malformed_record_aborts_whole_batch() {
    let bad: RawRecord =
        serde_json::from_value(json!({ "fields": { "Date": "not a date" } })).unwrap();
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![
        raw(2025, 6, 1, "A", "Ava"),
        bad,
    ])]));

    let err = store.ensure_month_loaded(month(2025, 5)).await.unwrap_err();

    assert!(matches!(err, RecordsError::MalformedRecord { index: 1, .. }));
    assert!(store.sessions().is_empty());
    assert!(!store.is_month_loaded(month(2025, 5)));
    assert!(store.last_error().is_some());
}

#[tokio::test]
async fn error_does_not_block_retry() {
    let store = store_with(FakeSource::with_replies(vec![
        Err(application_error()),
        Ok(vec![raw(2025, 6, 1, "A", "Ava")]),
    ]));

    assert!(store.ensure_month_loaded(month(2025, 5)).await.is_err());
    assert_eq!(store.phase(), LoadPhase::Error);

    let outcome = store.ensure_month_loaded(month(2025, 5)).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { added: 1, .. }));
    assert_eq!(store.phase(), LoadPhase::Idle);
    assert!(store.last_error().is_none());
    assert_eq!(store.source.calls(), 2);
}

// -----------------------------------------------------------------------
// single flight
// -----------------------------------------------------------------------

#[tokio::test]
async fn overlapping_navigation_loads_both_months_one_at_a_time() {
    let source = FakeSource::with_replies(vec![
        Ok(vec![raw(2025, 6, 1, "A", "Ava")]),
        Ok(vec![raw(2025, 7, 1, "B", "Bea")]),
    ])
    .slow(Duration::from_millis(50));
    let store = store_with(source);

    let (first, second) = tokio::join!(
        store.ensure_month_loaded(month(2025, 5)),
        store.ensure_month_loaded(month(2025, 6)),
    );

    assert!(matches!(first.unwrap(), LoadOutcome::Loaded { added: 1, .. }));
    assert!(matches!(second.unwrap(), LoadOutcome::Loaded { added: 1, .. }));
    assert_eq!(store.source.calls(), 2);
    assert_eq!(store.source.max_concurrent(), 1);
    assert_eq!(
        *store.source.requests.lock().unwrap(),
        vec![
            month(2025, 5).first_day_millis(&Local),
            month(2025, 6).first_day_millis(&Local),
        ]
    );
    assert!(store.is_month_loaded(month(2025, 6)));
    assert!(!store.is_pending());
    assert_eq!(store.phase(), LoadPhase::Idle);
}

#[tokio::test]
async fn overlapping_calls_for_one_month_issue_one_request() {
    let source = FakeSource::with_replies(vec![Ok(vec![raw(2025, 6, 1, "A", "Ava")])])
        .slow(Duration::from_millis(50));
    let store = store_with(source);

    let (first, second) = tokio::join!(
        store.ensure_month_loaded(month(2025, 5)),
        store.ensure_month_loaded(month(2025, 5)),
    );

    assert!(matches!(first.unwrap(), LoadOutcome::Loaded { .. }));
    assert_eq!(
        second.unwrap(),
        LoadOutcome::Skipped(SkipReason::AlreadyLoaded)
    );
    assert_eq!(store.source.calls(), 1);
}

#[tokio::test]
async fn waiting_call_does_not_mark_pending_twice() {
    let source = FakeSource::default().slow(Duration::from_millis(50));
    let store = store_with(source);

    let observed = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.snapshot()
    };
    let (_, _, snapshot) = tokio::join!(
        store.ensure_month_loaded(month(2025, 5)),
        store.ensure_month_loaded(month(2025, 6)),
        observed,
    );

    assert!(snapshot.pending);
    // The first reply is empty, so the waiting call sees an exhausted feed.
    assert_eq!(store.source.calls(), 1);
    assert!(store.is_exhausted());
    assert!(!store.is_pending());
}

#[tokio::test]
async fn pending_is_true_only_while_request_runs() {
    let source = FakeSource::default().slow(Duration::from_millis(50));
    let store = store_with(source);
    assert!(!store.is_pending());

    let observed = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        (store.is_pending(), store.phase())
    };
    let (_, (pending, phase)) =
        tokio::join!(store.ensure_month_loaded(month(2025, 5)), observed);

    assert!(pending);
    assert_eq!(phase, LoadPhase::Loading);
    assert!(!store.is_pending());
}

#[tokio::test]
async fn dropped_request_clears_pending() {
    let source = FakeSource::default().slow(Duration::from_secs(5));
    let store = store_with(source);

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        store.ensure_month_loaded(month(2025, 5)),
    )
    .await;

    assert!(result.is_err(), "request should have timed out");
    assert!(!store.is_pending());
    assert!(!store.is_month_loaded(month(2025, 5)));
}

// -----------------------------------------------------------------------
// preview mode
// -----------------------------------------------------------------------

#[tokio::test]
async fn preview_mode_seeds_mock_data_without_requests() {
    let store = AvailabilityStore::new(FakeSource::default(), StoreMode::Preview, month(2025, 3));

    let outcome = store.initial_load().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Seeded { added } if added > 0));
    assert!(store.is_month_loaded(month(2025, 3)));

    assert_eq!(
        store.ensure_month_loaded(month(2025, 4)).await.unwrap(),
        LoadOutcome::Skipped(SkipReason::Preview)
    );
    assert_eq!(store.source.calls(), 0);
    assert!(store
        .sessions()
        .iter()
        .any(|s| s.status == SessionStatus::Full));
}

// -----------------------------------------------------------------------
// views and notifications
// -----------------------------------------------------------------------

#[tokio::test]
async fn derived_views_project_store_sessions() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![
        raw(2025, 4, 1, "A", "One"),
        raw(2025, 4, 2, "B", "Two"),
        raw(2025, 5, 3, "A", "Three"),
    ])]));
    store.initial_load().await.unwrap();

    let only_b = store.filtered_sessions(&LocationFilter::Named("B".to_string()));
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].model, "Two");
    assert_eq!(store.filtered_sessions(&LocationFilter::All).len(), 3);

    let labels: Vec<String> = store
        .location_options()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(labels, vec!["all", "A", "B"]);

    assert_eq!(store.sessions_in_month(month(2025, 3)).len(), 2);
}

#[tokio::test]
async fn subscribers_see_each_transition() {
    let store = store_with(FakeSource::with_replies(vec![Ok(vec![raw(
        2025, 4, 21, "A", "Ava",
    )])]));
    let rx = store.subscribe();
    let before = rx.borrow().revision;

    store.initial_load().await.unwrap();

    let snapshot = rx.borrow().clone();
    assert!(snapshot.revision >= before + 2, "{snapshot:?}");
    assert_eq!(snapshot.sessions, 1);
    assert_eq!(snapshot.loaded_months, 1);
    assert!(!snapshot.pending);
    assert_eq!(snapshot, store.snapshot());
}
