//! HTTP surface: a thin transport over the core's operations.
//!
//! # 契約
//! - `GET /start?main_url=..&meme_url=..` → `{"task_id": "..", "status": "queued"}`
//! - `GET /status?task_id=..` → タスクレコード全体の JSON
//! - クライアント起因のエラーは HTTP 200 + `{"status":"error","msg":".."}`
//!   （status フィールドが意味を運ぶ）。ストア障害のみ 500。
//! - 生のスタックトレースや内部エラー文字列はクライアントに届かない。

use std::sync::Arc;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::error;

use courier_core::domain::{TaskId, TaskRecord};
use courier_core::ports::{Clock, IdGenerator, TaskStore};

/// Shared application state.
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/start", get(start))
        .route("/status", get(status))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct StartParams {
    #[serde(default)]
    main_url: Option<String>,
    #[serde(default)]
    meme_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    #[serde(default)]
    task_id: Option<String>,
}

/// Parse the raw query string ourselves instead of using the `Query`
/// extractor: axum's built-in rejection answers malformed queries
/// (duplicate keys, broken encoding) with a plain-text 400, and nothing
/// non-JSON may reach the client. A parse failure means the expected
/// parameters were not validly supplied, so callers map it to the same
/// shape as a missing parameter.
fn parse_params<T: DeserializeOwned>(raw: Option<&str>) -> Result<T, serde_urlencoded::de::Error> {
    serde_urlencoded::from_str(raw.unwrap_or(""))
}

/// Client-caused failure: HTTP 200, the `status` field carries the
/// semantics.
fn client_error(msg: &str) -> Response {
    Json(json!({ "status": "error", "msg": msg })).into_response()
}

/// Store failure: generic payload, nothing internal leaks.
fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "msg": "internal error" })),
    )
        .into_response()
}

/// `GET /start` — create a task and return its ID immediately; the worker
/// picks it up on a later tick.
async fn start(State(state): State<Arc<AppState>>, RawQuery(query): RawQuery) -> Response {
    let Ok(params) = parse_params::<StartParams>(query.as_deref()) else {
        return client_error("main_url & meme_url required");
    };
    let main_url = params.main_url.unwrap_or_default();
    let meme_url = params.meme_url.unwrap_or_default();

    let record = match TaskRecord::new(
        state.ids.generate(),
        main_url,
        meme_url,
        state.clock.now(),
    ) {
        Ok(record) => record,
        // No record is created for invalid input.
        Err(invalid) => return client_error(&invalid.to_string()),
    };

    match state.store.create(record).await {
        Ok(id) => Json(json!({ "task_id": id.to_string(), "status": "queued" })).into_response(),
        Err(err) => {
            error!(error = %err, "task creation failed");
            internal_error()
        }
    }
}

/// `GET /status` — current record, whatever state the worker last wrote.
async fn status(State(state): State<Arc<AppState>>, RawQuery(query): RawQuery) -> Response {
    let Ok(params) = parse_params::<StatusParams>(query.as_deref()) else {
        return client_error("task_id required");
    };
    let Some(raw) = params.task_id.filter(|raw| !raw.is_empty()) else {
        return client_error("task_id required");
    };

    // An unparseable ID cannot name any task; same answer as unknown.
    let Ok(id) = raw.parse::<TaskId>() else {
        return client_error("invalid task_id");
    };

    match state.store.get(id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => client_error("invalid task_id"),
        Err(err) => {
            error!(task = %id, error = %err, "status lookup failed");
            internal_error()
        }
    }
}
