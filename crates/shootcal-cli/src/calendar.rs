//! Availability command handlers for the CLI.
//!
//! Each handler drives one [`AvailabilityStore`] the way a calendar widget
//! would: load the current month on start, then ensure the month being
//! displayed is loaded, then render from the store's derived views.

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use shootcal_core::{booking_url, AppConfig, LocationFilter, MonthKey, Session, StatusCounts};
use shootcal_records::{RawRecord, RecordsClient, RecordsError};
use shootcal_store::{AvailabilityStore, LoadPhase, RecordSource, StoreMode};

/// Record source chosen from configuration.
pub(crate) enum CliSource {
    Remote(RecordsClient),
    /// Preview mode without an endpoint; preview stores never fetch.
    Unconfigured,
}

#[async_trait]
impl RecordSource for CliSource {
    async fn fetch_from(
        &self,
        from_date_ms: i64,
        page_size: u32,
    ) -> Result<Vec<RawRecord>, RecordsError> {
        match self {
            CliSource::Remote(client) => client.fetch_page(from_date_ms, page_size).await,
            CliSource::Unconfigured => Err(RecordsError::InvalidEndpoint(
                "(not configured)".to_string(),
            )),
        }
    }
}

/// Builds the store for this run.
///
/// # Errors
///
/// Returns an error if the records endpoint is missing outside preview mode
/// or the HTTP client cannot be built.
pub(crate) fn build_store(
    config: &AppConfig,
    current_month: MonthKey,
) -> anyhow::Result<AvailabilityStore<CliSource>> {
    let (source, mode) = match (&config.records_url, config.preview) {
        (_, true) => (CliSource::Unconfigured, StoreMode::Preview),
        (Some(url), false) => {
            let client = RecordsClient::new(url, config.request_timeout_secs, &config.user_agent)
                .context("failed to build records client")?;
            (CliSource::Remote(client), StoreMode::Interactive)
        }
        (None, false) => anyhow::bail!(
            "SHOOTCAL_RECORDS_URL is not set; set it or pass --preview to use mock data"
        ),
    };

    Ok(AvailabilityStore::new(source, mode, current_month).with_page_size(config.page_size))
}

/// Runs the initial load, turning a failure into a command error.
async fn load_initial(store: &AvailabilityStore<CliSource>) -> anyhow::Result<()> {
    store
        .initial_load()
        .await
        .context("failed to load availability")?;
    Ok(())
}

async fn load_month(store: &AvailabilityStore<CliSource>, month: MonthKey) -> anyhow::Result<()> {
    store
        .ensure_month_loaded(month)
        .await
        .with_context(|| format!("failed to load {}", month.calendar_label()))?;
    Ok(())
}

fn format_row(session: &Session) -> String {
    format!(
        "{}  {:<9}  {:<24}  {:<20}  {:>8.2}",
        session.date_key(),
        session.status.to_string(),
        session.location,
        session.model,
        session.price
    )
}

fn print_rows(sessions: &[&Session]) {
    if sessions.is_empty() {
        println!("(no sessions)");
        return;
    }
    for session in sessions {
        println!("{}", format_row(session));
    }
}

/// Shows one month, the compact calendar view.
pub(crate) async fn run_month(
    store: &AvailabilityStore<CliSource>,
    month: MonthKey,
    location: &LocationFilter,
) -> anyhow::Result<()> {
    load_initial(store).await?;
    load_month(store, month).await?;

    let in_month = store.sessions_in_month(month);
    let visible: Vec<&Session> = in_month.iter().filter(|s| location.matches(s)).collect();
    let counts = StatusCounts::tally(visible.iter().copied());

    println!("{} ({location})", month.calendar_label());
    print_rows(&visible);
    println!(
        "{} sessions: {} available, {} limited, {} full",
        counts.total(),
        counts.available,
        counts.limited,
        counts.full
    );
    Ok(())
}

pub(crate) async fn run_sessions(
    store: &AvailabilityStore<CliSource>,
    location: &LocationFilter,
) -> anyhow::Result<()> {
    load_initial(store).await?;
    let sessions = store.filtered_sessions(location);
    print_rows(&sessions.iter().collect::<Vec<_>>());
    Ok(())
}

pub(crate) async fn run_locations(store: &AvailabilityStore<CliSource>) -> anyhow::Result<()> {
    load_initial(store).await?;
    for option in store.location_options() {
        println!("{option}");
    }
    Ok(())
}

/// Prints the booking link for `date`.
///
/// # Errors
///
/// Returns an error if no session exists on `date`, the session is full, or
/// no booking phone number is configured.
pub(crate) async fn run_book(
    store: &AvailabilityStore<CliSource>,
    config: &AppConfig,
    date: NaiveDate,
) -> anyhow::Result<()> {
    load_initial(store).await?;
    load_month(store, MonthKey::of(date)).await?;

    let session = store
        .session_on(date)
        .with_context(|| format!("no session on {date}"))?;
    if !session.is_bookable() {
        anyhow::bail!("the session on {date} is fully booked");
    }
    let phone = config
        .booking_phone
        .as_deref()
        .context("SHOOTCAL_BOOKING_PHONE is not set; cannot build a booking link")?;
    let url = booking_url(&config.messaging_base_url, phone, &session)
        .context("SHOOTCAL_BOOKING_PHONE contains no digits")?;

    println!("{}", format_row(&session));
    println!("{url}");
    Ok(())
}

pub(crate) async fn run_status(store: &AvailabilityStore<CliSource>) -> anyhow::Result<()> {
    if let Err(e) = store.initial_load().await {
        tracing::debug!(error = %e, "initial load failed; reporting status anyway");
    }

    let months: Vec<String> = store
        .loaded_months()
        .iter()
        .map(MonthKey::calendar_label)
        .collect();
    let phase = match store.phase() {
        LoadPhase::Idle => "idle",
        LoadPhase::Loading => "loading",
        LoadPhase::Error => "error",
    };

    println!("mode:          {:?}", store.mode());
    println!("phase:         {phase}");
    println!("sessions:      {}", store.sessions().len());
    println!("loaded months: {}", months.join(", "));
    println!("exhausted:     {}", store.is_exhausted());
    if let Some(error) = store.last_error() {
        println!("last error:    {error}");
    }
    Ok(())
}
