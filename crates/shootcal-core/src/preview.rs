//! Fixed dataset shown in preview (non-interactive design) mode, where no
//! network requests are made.

use chrono::NaiveDate;

use crate::month::MonthKey;
use crate::sessions::{Session, SessionStatus};

struct MockRow {
    day: u32,
    location: &'static str,
    model: &'static str,
    details: &'static str,
    sizing: &'static str,
    status: SessionStatus,
    price: f64,
}

const MOCK_ROWS: &[MockRow] = &[
    MockRow {
        day: 5,
        location: "Downtown Studio",
        model: "Ava Chen",
        details: "Editorial and beauty, 6 years experience",
        sizing: "Height 175cm, dress 36",
        status: SessionStatus::Available,
        price: 150.0,
    },
    MockRow {
        day: 12,
        location: "Riverside Park",
        model: "Leo Martins",
        details: "Outdoor lifestyle",
        sizing: "Height 186cm, suit 50",
        status: SessionStatus::Limited,
        price: 180.0,
    },
    MockRow {
        day: 19,
        location: "Downtown Studio",
        model: "Mia Novak",
        details: "Fashion and portrait",
        sizing: "Height 172cm, dress 34",
        status: SessionStatus::Full,
        price: 200.0,
    },
    MockRow {
        day: 26,
        location: "Rooftop Loft",
        model: "Sam Okafor",
        details: "Streetwear",
        sizing: "Height 181cm, shirt M",
        status: SessionStatus::Available,
        price: 165.0,
    },
];

/// Mock sessions placed inside `month`.
#[must_use]
pub fn mock_sessions(month: MonthKey) -> Vec<Session> {
    MOCK_ROWS
        .iter()
        .filter_map(|row| {
            let date =
                NaiveDate::from_ymd_opt(month.year(), month.month0() + 1, row.day)?;
            Some(Session {
                date,
                location: row.location.to_string(),
                model: row.model.to_string(),
                model_details: row.details.to_string(),
                model_sizing: row.sizing.to_string(),
                thumbnail_url: None,
                model_image: None,
                location_image: None,
                status: row.status,
                price: row.price,
            })
        })
        .collect()
}
