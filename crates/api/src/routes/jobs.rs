//! Job inspection and manual runs.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the job routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{name}/run", post(run_job))
}

/// GET `/jobs` - Schedules and run statistics.
async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.jobs.metrics();
    let jobs: Vec<_> = state
        .jobs
        .schedules()
        .into_iter()
        .map(|(name, schedule)| {
            json!({
                "name": name,
                "schedule": schedule,
                "next_run": schedule.next_after(chrono::Utc::now()),
                "stats": metrics.get(name).unwrap_or_default(),
            })
        })
        .collect();
    Json(json!({ "jobs": jobs }))
}

/// POST `/jobs/{name}/run` - Runs one job now, with retries.
async fn run_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!(job = %name, "Manual job run requested");
    let report = state.jobs.run_once(&name).await?;
    Ok(Json(json!({ "job": name, "report": report })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{date, test_app};

    #[tokio::test]
    async fn test_lists_standard_jobs() {
        let app = test_app(date(2024, 2, 1));
        let (status, body) = app.get("/api/v1/jobs").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body["jobs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|j| j["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "escrow_release",
                "payment_reminders",
                "overdue_escalation",
                "contract_expiry",
                "expiry_warnings"
            ]
        );
        assert_eq!(body["jobs"][4]["schedule"]["cadence"], "weekly");
    }

    #[tokio::test]
    async fn test_manual_run_records_metrics() {
        let app = test_app(date(2024, 2, 1));
        app.create_contract("monthly", date(2024, 1, 1)).await;

        let (status, body) = app
            .post("/api/v1/jobs/contract_expiry/run", &json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["report"]["processed"], 0);

        let (_, listing) = app.get("/api/v1/jobs").await;
        assert_eq!(listing["jobs"][3]["stats"]["runs"], 1);
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let app = test_app(date(2024, 2, 1));
        let (status, body) = app.post("/api/v1/jobs/nightly/run", &json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "UNKNOWN_JOB");
    }
}
