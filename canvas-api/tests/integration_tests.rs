//! Integration tests for the placement gateway
//!
//! Drive the full router over an in-memory SQLite store.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use canvas_api::{build_app, AppState, AuthConfig};
use canvas_core::QuotaPolicy;
use canvas_store::{CanvasDatabase, StoreConfig};
use serde_json::{json, Value};

async fn create_test_state() -> AppState {
    let database = CanvasDatabase::open(&StoreConfig::memory(), QuotaPolicy::default()).unwrap();
    database.init_schema().await.unwrap();
    AppState::new(database)
}

async fn create_test_server() -> TestServer {
    TestServer::new(build_app(create_test_state().await)).unwrap()
}

async fn join(server: &TestServer, label: &str) -> String {
    let response = server
        .post("/api/v1/participants")
        .json(&json!({ "color_label": label }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

async fn place(server: &TestServer, id: &str, body: Value) -> axum_test::TestResponse {
    server
        .post(&format!("/api/v1/participants/{}/placements", id))
        .json(&body)
        .await
}

async fn place_n(server: &TestServer, id: &str, n: usize) {
    for i in 0..n {
        place(server, id, json!({ "x": 0.05 * (i % 20) as f64, "y": 0.5 }))
            .await
            .assert_status_ok();
    }
}

// ============ Health Endpoint Tests ============

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;

    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"][0]["name"], "database");

    server.get("/healthz").await.assert_status_ok();
}

#[tokio::test]
async fn test_colors_listing() {
    let server = create_test_server().await;
    join(&server, "green").await;

    let body: Value = server.get("/api/v1/colors").await.json();
    let colors = body["colors"].as_array().unwrap();
    assert_eq!(colors.len(), 8);
    let green = colors.iter().find(|c| c["label"] == "green").unwrap();
    assert_eq!(green["remaining"], 15);
}

// ============ Participant Tests ============

#[tokio::test]
async fn test_create_participant() {
    let server = create_test_server().await;

    let response = server
        .post("/api/v1/participants")
        .json(&json!({ "color_label": "Blue" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["color_label"], "blue");
    assert_eq!(body["free_quota_consumed"], 0);
    assert_eq!(body["revealed"], false);
    assert_eq!(body["credit_balance"], 0);
    assert!(body["color_value"].as_str().unwrap().starts_with('#'));

    let id = body["id"].as_str().unwrap();
    let fetched: Value = server
        .get(&format!("/api/v1/participants/{}", id))
        .await
        .json();
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn test_create_participant_unknown_label() {
    let server = create_test_server().await;
    let response = server
        .post("/api/v1/participants")
        .json(&json!({ "color_label": "teal" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_participant() {
    let server = create_test_server().await;
    let response = place(&server, "ghost", json!({ "x": 0.5, "y": 0.5 })).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

// ============ Placement Tests ============

#[tokio::test]
async fn test_free_quota_reveal_and_exhaustion() {
    let server = create_test_server().await;
    let id = join(&server, "red").await;

    for i in 1..=10 {
        let response = place(
            &server,
            &id,
            json!({ "x": 0.1, "y": 0.1 * i as f64 / 2.0, "phase": "free" }),
        )
        .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["outcome"], "accepted");
        assert_eq!(body["placement"]["phase"], "free");
        assert_eq!(body["snapshot"]["free_quota_consumed"], i);
        assert_eq!(body["snapshot"]["revealed"], i == 10);
    }

    let response = place(&server, &id, json!({ "x": 0.9, "y": 0.9, "phase": "free" })).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "QUOTA_EXHAUSTED");
    assert_eq!(body["details"]["snapshot"]["free_quota_consumed"], 10);
    assert_eq!(body["details"]["snapshot"]["revealed"], true);
}

#[tokio::test]
async fn test_revealed_without_credits() {
    let server = create_test_server().await;
    let id = join(&server, "orange").await;
    place_n(&server, &id, 10).await;

    let response = place(&server, &id, json!({ "x": 0.3, "y": 0.3 })).await;
    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
    assert_eq!(body["details"]["snapshot"]["credit_balance"], 0);
}

#[tokio::test]
async fn test_paid_placement_after_grant() {
    let server = create_test_server().await;
    let id = join(&server, "purple").await;
    place_n(&server, &id, 10).await;

    let response = server
        .post(&format!("/api/v1/internal/participants/{}/credits", id))
        .json(&json!({ "amount": 2 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["credit_balance"], 2);

    let response = place(&server, &id, json!({ "x": 0.3, "y": 0.3, "phase": "paid" })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["placement"]["phase"], "paid");
    assert_eq!(body["snapshot"]["credit_balance"], 1);
}

#[tokio::test]
async fn test_idempotent_replay() {
    let server = create_test_server().await;
    let id = join(&server, "yellow").await;
    let body = json!({ "x": 0.4, "y": 0.6, "idempotency_key": "mark-1" });

    let first: Value = place(&server, &id, body.clone()).await.json();
    let second: Value = place(&server, &id, body).await.json();

    assert_eq!(first["outcome"], "accepted");
    assert_eq!(second["outcome"], "replayed");
    assert_eq!(first["placement"]["id"], second["placement"]["id"]);
    assert_eq!(second["snapshot"]["free_quota_consumed"], 1);
}

#[tokio::test]
async fn test_out_of_range_coordinate() {
    let server = create_test_server().await;
    let id = join(&server, "pink").await;

    let response = place(&server, &id, json!({ "x": 1.5, "y": 0.5 })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let snapshot: Value = server
        .get(&format!("/api/v1/participants/{}", id))
        .await
        .json();
    assert_eq!(snapshot["free_quota_consumed"], 0);
}

#[tokio::test]
async fn test_batch_short_circuits_with_accepted_items() {
    let server = create_test_server().await;
    let id = join(&server, "brown").await;
    place_n(&server, &id, 7).await;

    let items: Vec<Value> = (0..15)
        .map(|i| json!({ "x": i as f64 / 20.0, "y": 0.2, "idempotency_key": format!("b-{}", i) }))
        .collect();
    let response = server
        .post(&format!("/api/v1/participants/{}/placements/batch", id))
        .json(&json!({ "items": items }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "QUOTA_EXHAUSTED");
    let accepted = body["details"]["accepted"].as_array().unwrap();
    assert_eq!(accepted.len(), 3);
    assert!(accepted.iter().all(|p| p["phase"] == "free"));
    assert_eq!(accepted[0]["idempotency_key"], "b-0");
    assert_eq!(body["details"]["snapshot"]["free_quota_consumed"], 10);
    assert_eq!(body["details"]["snapshot"]["revealed"], true);
}

#[tokio::test]
async fn test_batch_fully_applied() {
    let server = create_test_server().await;
    let id = join(&server, "blue").await;

    let response = server
        .post(&format!("/api/v1/participants/{}/placements/batch", id))
        .json(&json!({ "items": [{ "x": 0.1, "y": 0.1 }, { "x": 0.2, "y": 0.2 }] }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["accepted"].as_array().unwrap().len(), 2);
    assert_eq!(body["snapshot"]["free_quota_consumed"], 2);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let server = create_test_server().await;
    let id = join(&server, "blue").await;

    let response = server
        .post(&format!("/api/v1/participants/{}/placements/batch", id))
        .json(&json!({ "items": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// ============ Reveal & Canvas Tests ============

#[tokio::test]
async fn test_explicit_reveal() {
    let server = create_test_server().await;
    let id = join(&server, "green").await;
    place_n(&server, &id, 4).await;

    let response = server
        .post(&format!("/api/v1/participants/{}/reveal", id))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "QUOTA_NOT_MET");
    assert_eq!(body["details"]["consumed"], 4);

    place_n(&server, &id, 6).await;
    let response = server
        .post(&format!("/api/v1/participants/{}/reveal", id))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["snapshot"]["revealed"], true);
    // Already revealed by the tenth placement
    assert_eq!(body["revealed_now"], false);
}

#[tokio::test]
async fn test_canvas_is_gated_on_reveal() {
    let server = create_test_server().await;
    let blind = join(&server, "red").await;
    let revealed = join(&server, "blue").await;
    place_n(&server, &blind, 2).await;
    place_n(&server, &revealed, 10).await;

    let response = server
        .get(&format!("/api/v1/participants/{}/canvas", blind))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_REVEALED");

    let own: Value = server
        .get(&format!("/api/v1/participants/{}/placements", blind))
        .await
        .json();
    assert_eq!(own["total"], 2);

    let canvas: Value = server
        .get(&format!("/api/v1/participants/{}/canvas", revealed))
        .await
        .json();
    assert_eq!(canvas["total"], 12);
}

#[tokio::test]
async fn test_stats() {
    let server = create_test_server().await;
    let id = join(&server, "red").await;
    place_n(&server, &id, 3).await;

    let body: Value = server.get("/api/v1/stats").await.json();
    assert_eq!(body["participants"], 1);
    assert_eq!(body["placements"], 3);
    assert_eq!(body["free_placements"], 3);
    assert_eq!(body["free_quota_limit"], 10);
    assert_eq!(body["max_batch_size"], 50);
}

// ============ Internal Route Auth Tests ============

#[tokio::test]
async fn test_credit_grant_requires_key_when_enabled() {
    let state = create_test_state()
        .await
        .with_auth(AuthConfig::with_keys(["payments-key"]));
    let server = TestServer::new(build_app(state)).unwrap();
    let id = join(&server, "red").await;
    let uri = format!("/api/v1/internal/participants/{}/credits", id);

    server
        .post(&uri)
        .json(&json!({ "amount": 1 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .post(&uri)
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("payments-key"),
        )
        .json(&json!({ "amount": 1 }))
        .await
        .assert_status_ok();

    // Participant routes stay anonymous
    server
        .get(&format!("/api/v1/participants/{}", id))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_credit_grant_rejects_non_positive_amount() {
    let server = create_test_server().await;
    let id = join(&server, "red").await;

    let response = server
        .post(&format!("/api/v1/internal/participants/{}/credits", id))
        .json(&json!({ "amount": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
