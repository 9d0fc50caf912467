//! API route definitions.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::state::AppState;
use crate::chat::{ChatError, ChatRequest, APOLOGY};
use crate::ingest::{self, AnomalyInput, IngestError};
use crate::profile::{ProfileEditor, ProfileError, UserProfile};
use crate::storage::{Query as StoreQuery, Table};

/// Filename recorded for batches posted straight to the API.
const API_BATCH_FILENAME: &str = "api-batch";

/// Filename recorded for CSV uploads that do not name their file.
const CSV_UPLOAD_FILENAME: &str = "upload.csv";

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard/kpis", get(kpis))
        .route("/dashboard/chart", get(chart))
        .route("/dashboard/services", get(services))
        .route("/dashboard/changes", get(changes))
        .route("/chat", post(chat).options(preflight))
        .route("/profile/{email}", get(get_profile).put(put_profile))
        .route("/anomalies", post(create_anomaly))
        .route("/anomalies/batch", post(create_batch))
        .route("/anomalies/file/csv", post(upload_csv))
}

fn meta() -> Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

fn envelope(data: impl serde::Serialize) -> Json<Value> {
    Json(json!({ "data": data, "meta": meta() }))
}

fn error(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let store = match state.store.count(StoreQuery::table(Table::Anomalies)).await {
        Ok(_) => "ok",
        Err(e) => {
            warn!(error = %e, "health check could not reach the store");
            "unavailable"
        }
    };
    envelope(json!({
        "status": if store == "ok" { "ok" } else { "degraded" },
        "store": store,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

async fn kpis(State(state): State<AppState>) -> Json<Value> {
    envelope(state.dashboard.kpis().await)
}

#[derive(Debug, Deserialize)]
struct ChartParams {
    year: Option<i32>,
}

async fn chart(State(state): State<AppState>, Query(params): Query<ChartParams>) -> Json<Value> {
    envelope(state.dashboard.chart(params.year).await)
}

async fn services(State(state): State<AppState>) -> Json<Value> {
    envelope(state.dashboard.services().await)
}

async fn changes(State(state): State<AppState>) -> Json<Value> {
    let current = state.dashboard.kpis().await;
    envelope(state.dashboard.changes(&current).await)
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

async fn preflight() -> &'static str {
    "ok"
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let reply = match ChatRequest::from_json(&body) {
        Ok(request) => state.assistant.respond(request).await,
        Err(e) => Err(e),
    };
    match reply {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            if let ChatError::InvalidRequest(reason) = &e {
                warn!(%reason, "unreadable chat request");
            } else {
                warn!(error = %e, "chat request rejected");
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "response": APOLOGY })),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

async fn get_profile(State(state): State<AppState>, Path(email): Path<String>) -> Response {
    match state.profiles.get(&email).await {
        Ok(profile) => envelope(profile).into_response(),
        Err(ProfileError::NotFound(_)) => error(StatusCode::NOT_FOUND, "profile not found"),
        Err(e) => {
            warn!(%email, error = %e, "profile lookup failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn put_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(mut submitted): Json<UserProfile>,
) -> Response {
    submitted.email = email.clone();
    if let Err(e) = submitted.validate() {
        return error(StatusCode::BAD_REQUEST, e);
    }

    let current = match state.profiles.get(&email).await {
        Ok(profile) => profile,
        Err(ProfileError::NotFound(_)) => submitted.clone(),
        Err(e) => {
            warn!(%email, error = %e, "profile lookup failed");
            return error(StatusCode::INTERNAL_SERVER_ERROR, e);
        }
    };

    let mut editor = ProfileEditor::new(current);
    *editor.edit() = submitted;
    let notice = editor.save(&state.profiles).await;
    let status = if notice.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(json!({ "data": editor.profile(), "meta": { "notice": notice } })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

fn ingest_error(e: IngestError) -> Response {
    if e.is_invalid_input() {
        error(StatusCode::BAD_REQUEST, e)
    } else {
        warn!(error = %e, "anomaly intake failed");
        error(StatusCode::INTERNAL_SERVER_ERROR, e)
    }
}

async fn create_anomaly(State(state): State<AppState>, Json(input): Json<AnomalyInput>) -> Response {
    match ingest::store_single(state.store.as_ref(), input).await {
        Ok(stored) => (StatusCode::CREATED, envelope(stored)).into_response(),
        Err(e) => ingest_error(e),
    }
}

async fn create_batch(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<AnomalyInput>>,
) -> Response {
    match ingest::store_batch(state.store.as_ref(), API_BATCH_FILENAME, inputs).await {
        Ok(stored) => (StatusCode::CREATED, envelope(stored)).into_response(),
        Err(e) => ingest_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

/// Raw CSV body; the uploaded file name travels as `?filename=`.
async fn upload_csv(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let filename = params
        .filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| CSV_UPLOAD_FILENAME.to_string());
    if !filename.to_ascii_lowercase().ends_with(".csv") {
        return error(StatusCode::BAD_REQUEST, "file must be a CSV file");
    }

    let inputs = match ingest::parse_csv(&body) {
        Ok(inputs) => inputs,
        Err(e) => return ingest_error(e),
    };
    match ingest::store_batch(state.store.as_ref(), &filename, inputs).await {
        Ok(stored) => (StatusCode::CREATED, envelope(stored)).into_response(),
        Err(e) => ingest_error(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
