//! Read-only projections over a session collection.
//!
//! Every function here is pure: the presentation layer recomputes them
//! whenever the collection or the selected filter changes.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::month::MonthKey;
use crate::sessions::{Session, SessionStatus};

/// Location filter selected by the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocationFilter {
    All,
    Named(String),
}

impl LocationFilter {
    #[must_use]
    pub fn matches(&self, session: &Session) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::Named(name) => session.location == *name,
        }
    }
}

impl std::fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationFilter::All => write!(f, "all"),
            LocationFilter::Named(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for LocationFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(LocationFilter::All)
        } else {
            Ok(LocationFilter::Named(s.to_string()))
        }
    }
}

/// Sessions matching `filter`, in input order.
pub fn filter_by_location<'a, I>(sessions: I, filter: &LocationFilter) -> Vec<&'a Session>
where
    I: IntoIterator<Item = &'a Session>,
{
    sessions.into_iter().filter(|s| filter.matches(s)).collect()
}

/// `All` followed by every distinct location, ascending.
pub fn location_options<'a, I>(sessions: I) -> Vec<LocationFilter>
where
    I: IntoIterator<Item = &'a Session>,
{
    let distinct: BTreeSet<&str> = sessions.into_iter().map(|s| s.location.as_str()).collect();
    std::iter::once(LocationFilter::All)
        .chain(
            distinct
                .into_iter()
                .map(|name| LocationFilter::Named(name.to_string())),
        )
        .collect()
}

/// Sessions whose date falls inside `month`, in input order.
pub fn sessions_in_month<'a, I>(sessions: I, month: MonthKey) -> Vec<&'a Session>
where
    I: IntoIterator<Item = &'a Session>,
{
    sessions
        .into_iter()
        .filter(|s| month.contains(s.date))
        .collect()
}

/// Per-status tally shown alongside the compact month view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub available: usize,
    pub limited: usize,
    pub full: usize,
}

impl StatusCounts {
    #[must_use]
    pub fn tally<'a, I>(sessions: I) -> Self
    where
        I: IntoIterator<Item = &'a Session>,
    {
        sessions
            .into_iter()
            .fold(Self::default(), |mut counts, s| {
                match s.status {
                    SessionStatus::Available => counts.available += 1,
                    SessionStatus::Limited => counts.limited += 1,
                    SessionStatus::Full => counts.full += 1,
                }
                counts
            })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.available + self.limited + self.full
    }
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;
