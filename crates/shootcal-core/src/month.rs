//! Calendar month keys.
//!
//! A [`MonthKey`] pairs a year with a zero-based month index (0 = January)
//! and identifies one fetched batch of availability. Its `Display` form is
//! the cache key, e.g. April 2025 is `2025-3`.

use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month0: u32,
}

impl MonthKey {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidMonth`] if `month0` is greater than 11 or
    /// the year is outside the range `chrono` can represent.
    pub fn new(year: i32, month0: u32) -> Result<Self, CoreError> {
        if month0 > 11 || NaiveDate::from_ymd_opt(year, month0 + 1, 1).is_none() {
            return Err(CoreError::InvalidMonth(format!("{year}-{month0}")));
        }
        Ok(Self { year, month0 })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    /// Parses the human calendar form `YYYY-MM` with a one-based month.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidMonth`] if the input is not `YYYY-MM` or
    /// the month is outside `01..=12`.
    pub fn parse_calendar(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Self::new(year, month - 1).map_err(|_| invalid())
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Zero-based month index.
    #[must_use]
    pub fn month0(&self) -> u32 {
        self.month0
    }

    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        // Constructors validate the year/month pair.
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Epoch milliseconds of local midnight on the first day of the month.
    ///
    /// When a DST gap swallows midnight in `tz`, the first instant after the
    /// gap (01:00 local) is used instead.
    #[must_use]
    pub fn first_day_millis<Tz: TimeZone>(&self, tz: &Tz) -> i64 {
        let day = self.first_day();
        [0, 1]
            .into_iter()
            .filter_map(|hour| day.and_hms_opt(hour, 0, 0))
            .find_map(|local| tz.from_local_datetime(&local).earliest())
            .map_or_else(
                || day.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
                |dt| dt.timestamp_millis(),
            )
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month0
    }

    #[must_use]
    pub fn next(&self) -> Self {
        if self.month0 == 11 {
            Self {
                year: self.year + 1,
                month0: 0,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 + 1,
            }
        }
    }

    #[must_use]
    pub fn prev(&self) -> Self {
        if self.month0 == 0 {
            Self {
                year: self.year - 1,
                month0: 11,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 - 1,
            }
        }
    }

    /// `YYYY-MM` with a one-based month, the inverse of [`MonthKey::parse_calendar`].
    #[must_use]
    pub fn calendar_label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month0 + 1)
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.year, self.month0)
    }
}
