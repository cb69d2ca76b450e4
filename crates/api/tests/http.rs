use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use scout_api::sessions::SessionLimits;
use scout_core::domain::chat::ChatMessage;
use scout_core::llm::{ChatCollaborator, Provider, TextStream};
use scout_core::store::RecordStore;

struct CannedCollaborator;

#[async_trait::async_trait]
impl ChatCollaborator for CannedCollaborator {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn stream_reply(
        &self,
        _history: &[ChatMessage],
        _text: &str,
    ) -> anyhow::Result<TextStream> {
        let chunks: Vec<anyhow::Result<String>> = ["The", " outlook", " is positive."]
            .into_iter()
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn deep_analysis(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok("Report body.".to_string())
    }
}

/// Opens streams that never yield, so a turn stays in flight.
struct StalledCollaborator;

#[async_trait::async_trait]
impl ChatCollaborator for StalledCollaborator {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn stream_reply(
        &self,
        _history: &[ChatMessage],
        _text: &str,
    ) -> anyhow::Result<TextStream> {
        Ok(futures::stream::pending().boxed())
    }

    async fn deep_analysis(&self, _prompt: &str) -> anyhow::Result<String> {
        futures::future::pending().await
    }
}

const LIMITS: SessionLimits = SessionLimits {
    idle_ttl: Duration::from_secs(3600),
    max_sessions: 100,
};

fn app_with(collaborator: Arc<dyn ChatCollaborator>, limits: SessionLimits) -> Router {
    let state = scout_api::AppState::new(RecordStore::builtin().unwrap(), collaborator, 10, limits);
    scout_api::router(state)
}

fn app() -> Router {
    app_with(Arc::new(CannedCollaborator), LIMITS)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn open_session(app: &Router) -> String {
    let (status, body) = send(app, json_request("POST", "/chat/sessions", json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    created["session_id"].as_str().unwrap().to_string()
}

async fn wait_idle(app: &Router, session_id: &str) -> Value {
    for _ in 0..100 {
        let (_, v) = get_json(app, &format!("/chat/sessions/{session_id}")).await;
        if v["in_flight"] == json!(false) {
            return v;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("turn never finished");
}

#[tokio::test]
async fn healthz_ok() {
    let app = app();
    let (status, body) = send(&app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn stocks_default_page() {
    let app = app();
    let (status, v) = get_json(&app, "/stocks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["rows"].as_array().unwrap().len(), 10);
    assert_eq!(v["total_pages"], 1);
    assert_eq!(v["rows"][0]["ticker"], "NVDA");
    assert_eq!(v["sectors"][0], "All");
}

#[tokio::test]
async fn stocks_filter_sort_paginate() {
    let app = app();
    let (status, v) = get_json(
        &app,
        "/stocks?sector=Technology&sort=predicted_multiplier&direction=desc&page=2&page_size=3",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["total_filtered"], 7);
    assert_eq!(v["total_pages"], 3);
    assert_eq!(v["page"], 2);
    let tickers: Vec<&str> = v["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["ticker"].as_str().unwrap())
        .collect();
    // Technology by multiplier desc: U 5.2, CRWD 4.1, NVDA 3.5, PLTR 3.2, SHOP 3.0, AMD 2.9, SNOW 2.5
    assert_eq!(tickers, vec!["PLTR", "SHOP", "AMD"]);
}

#[tokio::test]
async fn stocks_rejects_unknown_sort_key() {
    let app = app();
    let (status, _) = get_json(&app, "/stocks?sort=shoe_size").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_returns_filtered_csv() {
    let app = app();
    let res = app
        .clone()
        .oneshot(
            Request::get("/stocks/export.csv?search=tesla")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("\"2\",\"TSLA\",\"Tesla, Inc.\""));
}

#[tokio::test]
async fn detail_found_and_missing() {
    let app = app();
    let (status, v) = get_json(&app, "/stocks/NVDA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["stock"]["name"], "NVIDIA Corp");
    assert_eq!(v["backtests"].as_array().unwrap().len(), 2);
    assert_eq!(v["price_series"].as_array().unwrap().len(), 30);

    let (status, _) = get_json(&app, "/stocks/MSFT").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_streaming_turn_round_trip() {
    let app = app();
    let (status, body) = send(&app, json_request("POST", "/chat/sessions", json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    let id = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(created["transcript"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/chat/sessions/{id}/messages"),
            json!({"text": "NVDA outlook"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let receipt: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(receipt["reply_id"], 3);

    let v = wait_idle(&app, &id).await;
    let transcript = v["transcript"].as_array().unwrap();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[2]["role"], "model");
    assert_eq!(transcript[2]["text"], "The outlook is positive.");
}

#[tokio::test]
async fn chat_thinking_turn_and_blank_input() {
    let app = app();
    let (_, body) = send(&app, json_request("POST", "/chat/sessions", json!({}))).await;
    let created: Value = serde_json::from_slice(&body).unwrap();
    let id = created["session_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/chat/sessions/{id}/messages"),
            json!({"text": "   "}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/chat/sessions/{id}/thinking"),
            json!({"enabled": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/chat/sessions/{id}/messages"),
            json!({"text": "Tesla risk"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let v = wait_idle(&app, &id).await;
    assert_eq!(v["thinking_mode"], true);
    let transcript = v["transcript"].as_array().unwrap();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[2]["text"], "Report body.");
}

#[tokio::test]
async fn chat_unknown_and_closed_sessions() {
    let app = app();
    let missing = "00000000-0000-0000-0000-000000000000";
    let (status, _) = get_json(&app, &format!("/chat/sessions/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, json_request("POST", "/chat/sessions", json!({}))).await;
    let created: Value = serde_json::from_slice(&body).unwrap();
    let id = created["session_id"].as_str().unwrap().to_string();

    let delete = Request::delete(format!("/chat/sessions/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get_json(&app, &format!("/chat/sessions/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_while_in_flight_conflicts_without_side_effects() {
    let app = app_with(Arc::new(StalledCollaborator), LIMITS);
    let id = open_session(&app).await;
    let uri = format!("/chat/sessions/{id}/messages");

    let (status, _) = send(&app, json_request("POST", &uri, json!({"text": "first"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = send(
        &app,
        json_request("POST", &uri, json!({"text": "second", "thinking": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, v) = get_json(&app, &format!("/chat/sessions/{id}")).await;
    assert_eq!(v["in_flight"], true);
    assert_eq!(v["thinking_mode"], false);
    assert_eq!(v["transcript"].as_array().unwrap().len(), 3);

    let delete = Request::delete(format!("/chat/sessions/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn session_cap_closes_oldest_session() {
    let limits = SessionLimits {
        max_sessions: 2,
        ..LIMITS
    };
    let app = app_with(Arc::new(CannedCollaborator), limits);

    let first = open_session(&app).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = open_session(&app).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = open_session(&app).await;

    let (status, _) = get_json(&app, &format!("/chat/sessions/{first}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    for id in [second, third] {
        let (status, _) = get_json(&app, &format!("/chat/sessions/{id}")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
