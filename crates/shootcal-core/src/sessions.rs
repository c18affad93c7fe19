use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::CoreError;

pub const DEFAULT_MODEL: &str = "Unknown Model";
pub const DEFAULT_LOCATION: &str = "Unknown Location";

/// Booking availability of a single session date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Available,
    Limited,
    Full,
}

impl SessionStatus {
    /// Maps loosely-typed source text onto a status.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Anything unrecognised, including an absent value, is `Available`.
    #[must_use]
    pub fn from_source(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().to_lowercase().parse().ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Available => write!(f, "available"),
            SessionStatus::Limited => write!(f, "limited"),
            SessionStatus::Full => write!(f, "full"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(SessionStatus::Available),
            "limited" => Ok(SessionStatus::Limited),
            "full" => Ok(SessionStatus::Full),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// One bookable photo-shoot slot. The date is the session's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub date: NaiveDate,
    pub location: String,
    pub model: String,
    pub model_details: String,
    pub model_sizing: String,
    pub thumbnail_url: Option<String>,
    pub model_image: Option<String>,
    pub location_image: Option<String>,
    pub status: SessionStatus,
    pub price: f64,
}

impl Session {
    /// A session on `date` with every other field at its default.
    #[must_use]
    pub fn placeholder(date: NaiveDate) -> Self {
        Self {
            date,
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_details: String::new(),
            model_sizing: String::new(),
            thumbnail_url: None,
            model_image: None,
            location_image: None,
            status: SessionStatus::Available,
            price: 0.0,
        }
    }

    #[must_use]
    pub fn is_bookable(&self) -> bool {
        self.status != SessionStatus::Full
    }

    /// `YYYY-MM-DD`, zero padded.
    #[must_use]
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}
