//! HTTP API for the Support Engine.
//!
//! This module exposes the assessment engine and the lead classifier as a
//! small REST API using the [`axum`](https://crates.io/crates/axum)
//! framework.  Every handler is a thin wrapper: requests deserialise
//! straight into the library's input types and responses serialise its
//! outputs unchanged.
//!
//! Invalid assessment input is answered with `422 Unprocessable Entity`.
//! A court-order refusal or a zero-care outcome is a successful `200`
//! response whose `status` field names the outcome.

use crate::config::AppConfig;
use crate::engine::Assessor;
use crate::jurisdiction::{resolve_jurisdiction, JurisdictionStatus};
use crate::models::{AssessmentInput, AssessmentOutcome};
use crate::scoring::{classify_lead, LeadScoringInput, ScoringConfig};
use crate::tables::TableRegistry;
use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Application state shared across requests.  Read-only once built.
pub struct AppState {
    pub tables: TableRegistry,
    pub scoring: ScoringConfig,
}

impl AppState {
    pub fn new(tables: TableRegistry, scoring: ScoringConfig) -> Self {
        Self { tables, scoring }
    }

    /// Embedded tables and default scoring weights.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(TableRegistry::embedded()?, ScoringConfig::default()))
    }

    /// State for the server: embedded tables plus any extra years and
    /// scoring weights named by the configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut tables = TableRegistry::embedded()?;
        if let Some(dir) = &config.tables_dir {
            let loaded = tables.load_dir(dir)?;
            info!(dir = %dir.display(), loaded, "loaded additional statutory years");
        }
        let scoring = match &config.scoring_config {
            Some(path) => ScoringConfig::from_json_file(path)?,
            None => ScoringConfig::default(),
        };
        Ok(Self::new(tables, scoring))
    }
}

/// Build the API router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/assess", post(assess_handler))
        .route("/api/assess/batch", post(assess_batch_handler))
        .route("/api/classify", post(classify_handler))
        .route("/api/jurisdictions/:country", get(jurisdiction_handler))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn unprocessable(message: String) -> Response {
    let body = Json(json!({ "error": message }));
    (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
}

/// Handler for POST /api/assess
async fn assess_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<AssessmentInput>,
) -> Response {
    match Assessor::new(&state.tables).assess(&input) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => unprocessable(err.to_string()),
    }
}

/// One entry of a batch response.
#[derive(Serialize)]
#[serde(untagged)]
enum BatchEntry {
    Outcome(AssessmentOutcome),
    Error { error: String },
}

/// Handler for POST /api/assess/batch
async fn assess_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(inputs): Json<Vec<AssessmentInput>>,
) -> Response {
    let task = tokio::task::spawn_blocking(move || {
        Assessor::new(&state.tables)
            .assess_batch(&inputs)
            .into_iter()
            .map(|result| match result {
                Ok(outcome) => BatchEntry::Outcome(outcome),
                Err(err) => BatchEntry::Error {
                    error: err.to_string(),
                },
            })
            .collect::<Vec<_>>()
    });
    match task.await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => {
            let body = Json(json!({ "error": err.to_string() }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

/// Handler for POST /api/classify
async fn classify_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LeadScoringInput>,
) -> Response {
    (StatusCode::OK, Json(classify_lead(&input, &state.scoring))).into_response()
}

#[derive(Serialize)]
struct JurisdictionResponse {
    country: String,
    status: JurisdictionStatus,
    explanation: &'static str,
    next_steps: &'static [&'static str],
}

/// Handler for GET /api/jurisdictions/:country
async fn jurisdiction_handler(Path(country): Path<String>) -> Json<JurisdictionResponse> {
    let status = resolve_jurisdiction(&country);
    Json(JurisdictionResponse {
        country,
        status,
        explanation: status.explanation(),
        next_steps: status.next_steps(),
    })
}

/// Launch the API server.  Blocks until the server terminates.
pub async fn serve(config: AppConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);
    let years: Vec<&str> = state.tables.years().collect();
    info!(?years, "statutory tables ready");
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "support engine listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn router() -> Router {
        build_router(Arc::new(AppState::builtin().unwrap()))
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn assess_route_returns_the_outcome() {
        let response = router()
            .oneshot(post_json(
                "/api/assess",
                json!({
                    "parent_a": {"adjusted_taxable_income": 80000},
                    "parent_b": {"adjusted_taxable_income": 50000},
                    "children": [{"age": 8, "care": {"period": "fortnight", "parent_a": 14, "parent_b": 0}}]
                }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["status"], json!("assessed"));
        assert_eq!(payload["payer"], json!("Parent B"));
        assert_eq!(payload["formula"], json!("formula_2"));
    }

    #[tokio::test]
    async fn invalid_assessment_is_unprocessable() {
        let response = router()
            .oneshot(post_json(
                "/api/assess",
                json!({
                    "parent_a": {"adjusted_taxable_income": -1},
                    "parent_b": {"adjusted_taxable_income": 50000},
                    "children": [{"age": 8, "care": {"period": "percent", "parent_a": 100, "parent_b": 0}}]
                }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let payload = read_json_body(response).await;
        assert!(payload["error"].as_str().unwrap().contains("Parent A"));
    }

    #[tokio::test]
    async fn jurisdiction_route_classifies_countries() {
        let response = router()
            .oneshot(
                Request::get("/api/jurisdictions/Israel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["status"], json!("excluded"));
    }

    #[tokio::test]
    async fn classify_route_scores_leads() {
        let response = router()
            .oneshot(post_json(
                "/api/classify",
                json!({
                    "as_of": "2025-03-01",
                    "liability": 20000,
                    "special_circumstances": ["property_settlement_pending"]
                }),
            ))
            .await
            .expect("route executes");
        let payload = read_json_body(response).await;
        assert_eq!(payload["score"], json!(18));
        assert_eq!(payload["category"], json!("Premium"));
    }

    #[tokio::test]
    async fn batch_route_reports_each_input() {
        let valid = json!({
            "parent_a": {"adjusted_taxable_income": 60000},
            "parent_b": {"adjusted_taxable_income": 60000},
            "children": [{"age": 3, "care": {"period": "week", "parent_a": 3.5, "parent_b": 3.5}}]
        });
        let invalid = json!({
            "parent_a": {"adjusted_taxable_income": 60000},
            "parent_b": {"adjusted_taxable_income": 60000},
            "children": []
        });
        let response = router()
            .oneshot(post_json("/api/assess/batch", json!([valid, invalid])))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload[0]["payer"], json!("Neither"));
        assert_eq!(payload[1]["error"], json!("at least one child is required"));
    }
}
