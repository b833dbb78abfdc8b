//! Integration tests for te-server API endpoints
//!
//! Each test runs the full router against a fresh SQLite database in a
//! temporary directory, seeded with a small image catalog.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use te_common::db::Image;
use te_server::settings::RuntimeSettings;
use te_server::{build_router, db, AppState};
use tower::util::ServiceExt; // for `oneshot` method

const HUMAN_1: &str = "11111111-1111-4111-8111-111111111111";
const HUMAN_2: &str = "22222222-2222-4222-8222-222222222222";
const HUMAN_3: &str = "33333333-3333-4333-8333-333333333333";
const AI_1: &str = "aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa";
const AI_2: &str = "bbbbbbbb-bbbb-4bbb-8bbb-bbbbbbbbbbbb";
const UNKNOWN_IMAGE: &str = "99999999-9999-4999-8999-999999999999";

/// Test helper: fresh database with 3 human and 2 AI images
async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = db::init_database_pool(&dir.path().join("turingeyes.db"))
        .await
        .expect("Should initialize database");

    let catalog = [
        (HUMAN_1, "human", "Portraits"),
        (HUMAN_2, "human", "Landscapes"),
        (HUMAN_3, "human", "Portraits"),
        (AI_1, "ai", "Portraits"),
        (AI_2, "ai", "Landscapes"),
    ];
    for (id, source, category) in catalog {
        let image = Image {
            id: id.to_string(),
            source_type: source.to_string(),
            category: category.to_string(),
            image_url: format!("/images/{}.jpg", id),
            author: (source == "human").then(|| "Test Photographer".to_string()),
            model: (source == "ai").then(|| "Test Model".to_string()),
            created_at: Some("2024-12-08".to_string()),
        };
        db::images::upsert_image(&pool, &image)
            .await
            .expect("Should insert image");
    }

    (dir, pool)
}

/// Test helper: router with a 4-image test size
fn setup_app(pool: SqlitePool) -> Router {
    let settings = RuntimeSettings {
        test_image_count: 4,
        ..RuntimeSettings::default()
    };
    build_router(AppState::new(pool, settings))
}

fn json_request(method: &str, uri: &str, body: Value, participant: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = participant {
        builder = builder.header(header::COOKIE, format!("te_pid={}", id));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, participant: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(id) = participant {
        builder = builder.header(header::COOKIE, format!("te_pid={}", id));
    }
    builder.body(Body::empty()).unwrap()
}

fn raw_request(uri: &str, body: &'static str, participant: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = participant {
        builder = builder.header(header::COOKIE, format!("te_pid={}", id));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Start a session and return the participant id
async fn start_session(app: &Router, country: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/start-test",
            json!({ "selfRatedSkill": 4, "countryCode": country }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    body["participantId"].as_str().unwrap().to_string()
}

fn trial(image_id: &str, choice: &str) -> Value {
    json!({ "imageId": image_id, "userChoice": choice, "responseTimeMs": 1200, "confidence": 3 })
}

async fn submit(app: &Router, participant: &str, trials: Vec<Value>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/submit-trials",
            json!({ "participantId": participant, "trials": trials }),
            Some(participant),
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "te-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Start test
// =============================================================================

#[tokio::test]
async fn test_start_test_creates_participant_and_sets_cookie() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/start-test",
            json!({ "selfRatedSkill": "6", "countryCode": "de" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Should set participant cookie")
        .to_str()
        .unwrap()
        .to_string();
    let body = extract_json(response.into_body()).await;
    let participant_id = body["participantId"].as_str().unwrap();

    assert!(cookie.starts_with(&format!("te_pid={}", participant_id)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=7776000"));

    // 4 requested: 2 human + 2 ai, each with id/image_url/category only
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 4);
    for image in images {
        assert!(image["id"].is_string());
        assert!(image["image_url"].is_string());
        assert!(image["category"].is_string());
        assert!(image.get("source_type").is_none());
    }

    let ids: Vec<&str> = images.iter().map(|i| i["id"].as_str().unwrap()).collect();
    let ai_count = ids.iter().filter(|id| [AI_1, AI_2].contains(id)).count();
    assert_eq!(ai_count, 2);

    let participant = db::participants::get_participant(&pool, participant_id)
        .await
        .unwrap()
        .expect("Participant should be stored");
    assert_eq!(participant.self_rated_skill, 6);
    assert_eq!(participant.country_code, "DE");
}

#[tokio::test]
async fn test_start_test_rejects_invalid_input() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    for body in [
        json!({ "selfRatedSkill": 0, "countryCode": "US" }),
        json!({ "selfRatedSkill": 2.5, "countryCode": "US" }),
        json!({ "selfRatedSkill": 3, "countryCode": "USA" }),
        json!({ "selfRatedSkill": 3 }),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/start-test", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_start_test_with_empty_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::init_database_pool(&dir.path().join("empty.db"))
        .await
        .unwrap();
    let app = setup_app(pool);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/start-test",
            json!({ "selfRatedSkill": 1, "countryCode": "FR" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["images"], json!([]));
}

#[tokio::test]
async fn test_start_test_non_json_body() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    let response = app
        .oneshot(raw_request("/api/start-test", "selfRatedSkill=4", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(extract_json(response.into_body()).await["error"], "unexpected_error");

    let participants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(participants, 0);
}

// =============================================================================
// Submit trials
// =============================================================================

#[tokio::test]
async fn test_submit_trials_validation_codes() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);
    let participant = start_session(&app, "US").await;

    // Participant id not UUID-shaped
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/submit-trials",
            json!({ "participantId": "abc", "trials": [trial(AI_1, "ai")] }),
            Some(&participant),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(extract_json(response.into_body()).await["error"], "invalid_participant_id");

    // Cookie missing
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/submit-trials",
            json!({ "participantId": participant, "trials": [trial(AI_1, "ai")] }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(extract_json(response.into_body()).await["error"], "unauthorized_participant");

    let (status, body) = submit(&app, &participant, vec![]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_trials");

    let (status, body) = submit(&app, &participant, vec![trial(AI_1, "ai"); 101]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "too_many_trials");

    let (status, body) = submit(&app, &participant, vec![json!({ "imageId": "x" })]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_valid_trials");

    let (status, body) = submit(&app, &participant, vec![trial(UNKNOWN_IMAGE, "ai")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_known_images");
}

#[tokio::test]
async fn test_submit_trials_non_json_body() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);
    let participant = start_session(&app, "US").await;

    let response = app
        .oneshot(raw_request("/api/submit-trials", "{not json", Some(&participant)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(extract_json(response.into_body()).await["error"], "invalid_participant_id");
}

#[tokio::test]
async fn test_submit_trials_cookie_must_match_participant() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());
    let victim = start_session(&app, "US").await;
    let attacker = start_session(&app, "US").await;

    // Claims the victim's id while holding the attacker's cookie
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/submit-trials",
            json!({ "participantId": victim, "trials": [trial(AI_1, "ai")] }),
            Some(&attacker),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(extract_json(response.into_body()).await["error"], "unauthorized_participant");

    for id in [&victim, &attacker] {
        let stored = db::trials::trials_for_participant(&pool, id).await.unwrap();
        assert!(stored.is_empty());
    }
}

#[tokio::test]
async fn test_submit_trials_scores_against_catalog() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());
    let participant = start_session(&app, "US").await;

    let (status, body) = submit(
        &app,
        &participant,
        vec![
            trial(AI_1, "ai"),
            trial(HUMAN_1, "ai"),
            trial(UNKNOWN_IMAGE, "human"),
            json!({ "imageId": AI_2, "userChoice": "maybe", "responseTimeMs": 10 }),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let stored = db::trials::trials_for_participant(&pool, &participant)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].image_id, AI_1);
    assert!(stored[0].is_correct);
    assert_eq!(stored[1].image_id, HUMAN_1);
    assert!(!stored[1].is_correct);
}

// =============================================================================
// Demographics
// =============================================================================

#[tokio::test]
async fn test_save_demographics() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/save-demographics", json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(extract_json(response.into_body()).await["error"], "no_participant");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/save-demographics",
            json!({ "age_range": "25-34" }),
            Some(UNKNOWN_IMAGE),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response.into_body()).await["error"], "unknown_participant");

    let participant = start_session(&app, "US").await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/save-demographics",
            json!({
                "age_range": " 25-34 ",
                "education_level": "",
                "gender": "female",
                "income_bucket": "upper_middle",
            }),
            Some(&participant),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!({ "ok": true }));

    let stored = db::participants::get_participant(&pool, &participant)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.age_range.as_deref(), Some("25-34"));
    assert_eq!(stored.education_level, None);
    assert_eq!(stored.gender.as_deref(), Some("female"));
    assert_eq!(stored.income_bucket.as_deref(), Some("upper_middle"));
    assert_eq!(stored.income_median, Some(50_000));
    assert_eq!(stored.income_currency.as_deref(), Some("USD"));
    assert!(stored.demographics_updated_at.is_some());
}

#[tokio::test]
async fn test_save_demographics_non_json_body_clears_fields() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());
    let participant = start_session(&app, "US").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/save-demographics",
            json!({ "age_range": "25-34", "income_bucket": "low" }),
            Some(&participant),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same as posting {}: every field goes back to null
    let response = app
        .oneshot(raw_request("/api/save-demographics", "age_range=25-34", Some(&participant)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!({ "ok": true }));

    let stored = db::participants::get_participant(&pool, &participant)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.age_range, None);
    assert_eq!(stored.income_bucket, None);
    assert_eq!(stored.income_median, None);
    assert_eq!(stored.income_currency, None);
    assert!(stored.demographics_updated_at.is_some());
}

#[tokio::test]
async fn test_demographics_options() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app
        .oneshot(get_request("/api/demographics/options", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["incomeMedian"], 50_000);
    assert_eq!(body["incomeCurrency"], "USD");
    assert_eq!(body["ageRanges"].as_array().unwrap().len(), 7);
    let brackets = body["incomeBrackets"].as_array().unwrap();
    assert_eq!(brackets.len(), 4);
    assert_eq!(brackets[0]["value"], "low");
    assert_eq!(brackets[0]["max"], 25_000);
    assert!(brackets[0].get("min").is_none());
}

// =============================================================================
// Results
// =============================================================================

#[tokio::test]
async fn test_results_errors() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.clone().oneshot(get_request("/api/results", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(extract_json(response.into_body()).await["error"], "no_participant");

    let response = app
        .clone()
        .oneshot(get_request("/api/results", Some(UNKNOWN_IMAGE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response.into_body()).await["error"], "unknown_participant");

    let participant = start_session(&app, "US").await;
    let response = app
        .oneshot(get_request("/api/results", Some(&participant)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response.into_body()).await["error"], "no_results");
}

#[tokio::test]
async fn test_results_document() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    // Peer in the same country gets everything right
    let peer = start_session(&app, "US").await;
    let (status, _) = submit(
        &app,
        &peer,
        vec![
            trial(AI_1, "ai"),
            trial(HUMAN_1, "human"),
            trial(AI_2, "ai"),
            trial(HUMAN_2, "human"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Participant gets 3 of 4
    let participant = start_session(&app, "US").await;
    let (status, _) = submit(
        &app,
        &participant,
        vec![trial(AI_1, "ai"), trial(HUMAN_1, "ai"), trial(AI_2, "ai"), trial(HUMAN_2, "human")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/results", Some(&participant)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;

    let headline = &body["headline"];
    assert_eq!(headline["overallAccuracy"], 75);
    assert_eq!(headline["correctCount"], 3);
    assert_eq!(headline["totalCount"], 4);
    assert_eq!(headline["globalParticipants"], 2);
    assert_eq!(headline["countryParticipants"], 2);
    assert_eq!(headline["countryCode"], "US");
    // One participant ahead out of two: ceil(100 * 2 / 2)
    assert_eq!(headline["globalRankTopPercent"], 100);

    assert_eq!(body["peerComparison"]["headlinePercent"], 75);
    assert!(body["peerComparison"]["insight"].is_string());

    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    let portraits = categories
        .iter()
        .find(|c| c["category"] == "Portraits")
        .unwrap();
    assert_eq!(portraits["correct"], 1);
    assert_eq!(portraits["total"], 2);
    // Pooled across both participants: 3 of 4
    assert_eq!(portraits["peerAvg"], 75);

    let answers = body["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 4);
    assert_eq!(answers[1]["correctAnswer"], "Human");
    assert_eq!(answers[1]["userGuess"], "AI");
}
