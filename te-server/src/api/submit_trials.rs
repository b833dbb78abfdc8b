//! Trial submission
//!
//! Accepts the whole session's judgments in one request. Individual
//! malformed trials are dropped rather than failing the submission; the
//! request only fails when nothing usable remains.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use te_common::db::{NewTrial, SourceType};
use tracing::{debug, info};

use crate::coerce;
use crate::db::{images, trials};
use crate::error::{ApiError, ApiResult};
use crate::participant::participant_from_cookies;
use crate::settings::RuntimeSettings;
use crate::AppState;

const MAX_CONFIDENCE: i64 = 5;

/// A trial that passed shape validation, before ground truth is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingTrial {
    pub image_id: String,
    pub user_choice: SourceType,
    pub response_time_ms: i64,
    pub confidence: i64,
}

/// Validate one raw trial entry
///
/// Requires a UUID-shaped `imageId`, a `userChoice` of `ai`/`human` and a
/// finite `responseTimeMs`. Response time and confidence are rounded and
/// clamped; a missing or non-numeric confidence becomes 0.
pub fn parse_trial(raw: &Value, settings: &RuntimeSettings) -> Option<IncomingTrial> {
    let image_id = raw.get("imageId")?;
    if !coerce::looks_like_uuid(image_id) {
        return None;
    }

    let user_choice = match raw.get("userChoice")?.as_str()? {
        "ai" => SourceType::Ai,
        "human" => SourceType::Human,
        _ => return None,
    };

    let response_time = coerce::finite_number(raw.get("responseTimeMs"))?;

    let confidence = match raw.get("confidence") {
        None | Some(Value::Null) => 0,
        Some(value) => coerce::finite_number(Some(value))
            .map(|n| coerce::round_clamped(n, 0, MAX_CONFIDENCE))
            .unwrap_or(0),
    };

    Some(IncomingTrial {
        image_id: image_id.as_str()?.to_string(),
        user_choice,
        response_time_ms: coerce::round_clamped(response_time, 0, settings.response_time_max_ms),
        confidence,
    })
}

/// POST /api/submit-trials
pub async fn submit_trials(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = super::parse_json_body(&body).unwrap_or(Value::Null);

    let participant_id = body.get("participantId").cloned().unwrap_or(Value::Null);
    if !coerce::looks_like_uuid(&participant_id) {
        return Err(ApiError::bad_request("invalid_participant_id"));
    }
    let participant_id = participant_id.as_str().unwrap_or_default().to_string();

    // The HttpOnly cookie must match the claimed id
    match participant_from_cookies(&headers) {
        Some(cookie) if cookie == participant_id => {}
        _ => return Err(ApiError::Unauthorized("unauthorized_participant")),
    }

    let raw_trials = match body.get("trials").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => list,
        _ => return Err(ApiError::bad_request("no_trials")),
    };
    if raw_trials.len() > state.settings.max_trials_per_submission {
        return Err(ApiError::bad_request("too_many_trials"));
    }

    let incoming: Vec<IncomingTrial> = raw_trials
        .iter()
        .filter_map(|raw| parse_trial(raw, &state.settings))
        .collect();
    if incoming.is_empty() {
        return Err(ApiError::bad_request("no_valid_trials"));
    }
    debug!(
        received = raw_trials.len(),
        valid = incoming.len(),
        "Validated trial submission"
    );

    let mut seen = HashSet::new();
    let image_ids: Vec<String> = incoming
        .iter()
        .filter(|t| seen.insert(t.image_id.as_str()))
        .map(|t| t.image_id.clone())
        .collect();

    let truth = images::source_types(&state.db, &image_ids)
        .await
        .map_err(|e| ApiError::internal("images_lookup_failed", "images.in select", e))?;

    // Trials on images missing from the catalog are ignored
    let rows: Vec<NewTrial> = incoming
        .into_iter()
        .filter_map(|t| {
            let source = truth.get(&t.image_id)?;
            Some(NewTrial {
                participant_id: participant_id.clone(),
                is_correct: t.user_choice == *source,
                image_id: t.image_id,
                user_choice: t.user_choice,
                confidence: t.confidence,
                response_time_ms: t.response_time_ms,
            })
        })
        .collect();
    if rows.is_empty() {
        return Err(ApiError::bad_request("no_known_images"));
    }

    trials::insert_trials(&state.db, &rows)
        .await
        .map_err(|e| ApiError::internal("insert_failed", "trials.insert", e))?;

    info!(
        participant = %participant_id,
        trials = rows.len(),
        correct = rows.iter().filter(|r| r.is_correct).count(),
        "Recorded trials"
    );

    Ok(Json(json!({ "ok": true })))
}

pub fn submit_trials_routes() -> Router<AppState> {
    Router::new().route("/api/submit-trials", post(submit_trials))
}
