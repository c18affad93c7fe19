//! Outbound messaging links that start a booking conversation.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::sessions::Session;

pub const DEFAULT_MESSAGING_BASE_URL: &str = "https://wa.me";

/// Characters left untouched by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The pre-filled booking message for `session`.
#[must_use]
pub fn booking_message(session: &Session) -> String {
    format!(
        "Hi! I'd like to book a photo shoot with {} at {} on {}.",
        session.model,
        session.location,
        session.date_key()
    )
}

/// Builds `{base}/{digits}?text={message}` for `session`.
///
/// Returns `None` when the session is full or `phone` contains no digits.
#[must_use]
pub fn booking_url(base: &str, phone: &str, session: &Session) -> Option<String> {
    if !session.is_bookable() {
        return None;
    }

    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let text = utf8_percent_encode(&booking_message(session), COMPONENT).to_string();
    Some(format!(
        "{}/{digits}?text={text}",
        base.trim_end_matches('/')
    ))
}
