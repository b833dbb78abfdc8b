//! Participant results
//!
//! Loads the caller's trials and the population aggregates, then hands
//! everything to `scoring::build_results`.

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use tracing::debug;

use crate::db::{participants, stats, trials};
use crate::error::{ApiError, ApiResult};
use crate::participant::participant_from_cookies;
use crate::scoring::{build_results, ResultsData};
use crate::AppState;

/// GET /api/results
pub async fn get_results(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ResultsData>> {
    let participant_id =
        participant_from_cookies(&headers).ok_or(ApiError::Unauthorized("no_participant"))?;

    let participant = participants::get_participant(&state.db, &participant_id)
        .await
        .map_err(|e| ApiError::internal("results_failed", "participants.select", e))?
        .ok_or(ApiError::NotFound("unknown_participant"))?;

    let my_trials = trials::trials_for_participant(&state.db, &participant_id)
        .await
        .map_err(|e| ApiError::internal("results_failed", "trials.select", e))?;
    if my_trials.is_empty() {
        return Err(ApiError::NotFound("no_results"));
    }

    let population = stats::participant_scores(&state.db)
        .await
        .map_err(|e| ApiError::internal("results_failed", "participant scores", e))?;
    let category_totals = stats::category_totals(&state.db)
        .await
        .map_err(|e| ApiError::internal("results_failed", "category totals", e))?;

    debug!(
        participant = %participant_id,
        trials = my_trials.len(),
        population = population.len(),
        "Computing results"
    );

    Ok(Json(build_results(
        &participant,
        &my_trials,
        &population,
        &category_totals,
    )))
}

pub fn results_routes() -> Router<AppState> {
    Router::new().route("/api/results", get(get_results))
}
