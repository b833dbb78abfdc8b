//! Participant session cookie
//!
//! A participant is anonymous; the only link between requests is the
//! HttpOnly `te_pid` cookie holding the participant UUID.

use axum::http::header::InvalidHeaderValue;
use axum::http::{header, HeaderMap, HeaderValue};

use crate::settings::RuntimeSettings;

/// Cookie carrying the participant id
pub const PARTICIPANT_COOKIE: &str = "te_pid";

/// Participant id from the request's `Cookie` header(s), if any
pub fn participant_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PARTICIPANT_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value binding the browser to `participant_id`
pub fn participant_set_cookie(
    participant_id: &str,
    settings: &RuntimeSettings,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        PARTICIPANT_COOKIE,
        participant_id,
        settings.cookie_max_age.as_secs()
    );
    if settings.cookie_secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
}
