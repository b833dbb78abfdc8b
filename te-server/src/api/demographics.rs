//! Demographics form: option lists and submission

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use te_common::db::Demographics;
use tracing::info;

use crate::coerce::{round_half_up, sanitize_text};
use crate::db::participants;
use crate::error::{ApiError, ApiResult};
use crate::participant::participant_from_cookies;
use crate::AppState;

/// Free-text answers are cut to this many characters
pub const MAX_FIELD_CHARS: usize = 200;

pub const AGE_RANGES: &[&str] = &["Under 18", "18-24", "25-34", "35-44", "45-54", "55-64", "65+"];

pub const EDUCATION_LEVELS: &[&str] = &[
    "Primary education (up to grade 6)",
    "Lower secondary education (grades 7–9)",
    "Upper secondary education (high school diploma or equivalent)",
    "Post-secondary non-tertiary education (vocational/technical school)",
    "Bachelor’s degree or equivalent",
    "Master’s degree or equivalent",
    "Doctorate or equivalent",
    "Other (please specify)",
];

pub const GENDERS: &[&str] = &["male", "female", "non-binary", "prefer not to say"];

pub const OCCUPATION_FIELDS: &[&str] = &[
    "Agriculture, forestry, fishing",
    "Manufacturing, mining, construction",
    "Utilities (electricity, gas, water)",
    "Retail, wholesale, trade",
    "Transportation & logistics",
    "Information technology",
    "Finance, banking, insurance",
    "Education & training",
    "Healthcare & social services",
    "Public administration & government",
    "Arts, entertainment, media",
    "Hospitality & tourism",
    "Other (please specify)",
];

/// One income bracket relative to the reference median
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeBracket {
    pub value: &'static str,
    pub label: String,
    /// Inclusive lower bound, absent for the lowest bracket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Upper bound, absent for the highest bracket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicsOptions {
    pub age_ranges: &'static [&'static str],
    pub education_levels: &'static [&'static str],
    pub genders: &'static [&'static str],
    pub occupation_fields: &'static [&'static str],
    pub income_median: i64,
    pub income_currency: String,
    pub income_brackets: Vec<IncomeBracket>,
}

/// Brackets at half, one and two times the median
pub fn income_brackets(median: i64, currency: &str) -> Vec<IncomeBracket> {
    let half = round_half_up(median as f64 * 0.5);
    let twice = round_half_up(median as f64 * 2.0);

    vec![
        IncomeBracket {
            value: "low",
            label: format!("Low income: < {} {}", half, currency),
            min: None,
            max: Some(half),
        },
        IncomeBracket {
            value: "lower_middle",
            label: format!("Lower-middle income: {}–{} {}", half, median, currency),
            min: Some(half),
            max: Some(median),
        },
        IncomeBracket {
            value: "upper_middle",
            label: format!("Upper-middle income: {}–{} {}", median, twice, currency),
            min: Some(median),
            max: Some(twice),
        },
        IncomeBracket {
            value: "high",
            label: format!("High income: > {} {}", twice, currency),
            min: Some(twice),
            max: None,
        },
    ]
}

/// Sanitize the five optional demographic fields of a request body
pub fn parse_demographics(body: &Value) -> Demographics {
    let field = |name: &str| sanitize_text(body.get(name), MAX_FIELD_CHARS);
    Demographics {
        age_range: field("age_range"),
        education_level: field("education_level"),
        gender: field("gender"),
        occupation_field: field("occupation_field"),
        income_bucket: field("income_bucket"),
    }
}

/// GET /api/demographics/options
pub async fn demographics_options(State(state): State<AppState>) -> Json<DemographicsOptions> {
    let settings = &state.settings;
    Json(DemographicsOptions {
        age_ranges: AGE_RANGES,
        education_levels: EDUCATION_LEVELS,
        genders: GENDERS,
        occupation_fields: OCCUPATION_FIELDS,
        income_median: settings.income_median,
        income_currency: settings.income_currency.clone(),
        income_brackets: income_brackets(settings.income_median, &settings.income_currency),
    })
}

/// POST /api/save-demographics
pub async fn save_demographics(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = super::parse_json_body(&body).unwrap_or_else(|| json!({}));

    let participant_id =
        participant_from_cookies(&headers).ok_or(ApiError::Unauthorized("no_participant"))?;

    let demographics = parse_demographics(&body);
    let income = demographics
        .income_bucket
        .as_ref()
        .map(|_| (state.settings.income_median, state.settings.income_currency.as_str()));

    let updated =
        participants::update_demographics(&state.db, &participant_id, &demographics, income)
            .await
            .map_err(|e| {
                ApiError::internal("update_failed", "participants.update demographics", e)
            })?;
    if !updated {
        return Err(ApiError::NotFound("unknown_participant"));
    }

    info!(participant = %participant_id, "Saved demographics");
    Ok(Json(json!({ "ok": true })))
}

pub fn demographics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/save-demographics", post(save_demographics))
        .route("/api/demographics/options", get(demographics_options))
}
