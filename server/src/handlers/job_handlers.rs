use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use timetable_client::api::{StartJobResponse, STATUS_FINISHED};

use crate::solver;
use crate::state::{AppState, JobStatus};

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_FAILED: &str = "failed";

/// POST /api/jobs
pub async fn start_job(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let Some(settings) = state.settings.read().await.clone() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Save settings before generating" })),
        );
    };

    let pruned = state.prune_finished(Utc::now());
    if pruned > 0 {
        tracing::debug!(pruned, "expired finished jobs");
    }

    let job_id = Uuid::new_v4();
    state.jobs.insert(
        job_id,
        JobStatus::Pending {
            started_at: Utc::now(),
        },
    );
    tracing::info!(%job_id, classes = settings.classes.len(), "generation job accepted");

    let state_clone = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(state_clone.solve_delay).await;

        let status = match tokio::task::spawn_blocking(move || solver::solve(&settings)).await {
            Ok(outcome) => {
                if let Err(e) = &outcome {
                    tracing::warn!(%job_id, error = %e, "no timetable found");
                }
                JobStatus::Finished {
                    result: solver::job_result(outcome),
                    finished_at: Utc::now(),
                }
            }
            Err(e) => {
                tracing::error!(%job_id, error = %e, "solver task panicked");
                JobStatus::Failed {
                    error: format!("Solver thread error: {e}"),
                    finished_at: Utc::now(),
                }
            }
        };
        state_clone.jobs.insert(job_id, status);
    });

    (
        StatusCode::ACCEPTED,
        Json(json!(StartJobResponse {
            job_id: job_id.to_string()
        })),
    )
}

/// GET /api/jobs/{id}
pub async fn poll_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(status) = state.jobs.get(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Job not found" })));
    };

    let body = match status.value() {
        JobStatus::Pending { started_at } => json!({
            "status": STATUS_RUNNING,
            "startedAt": started_at,
        }),
        JobStatus::Finished { result, .. } => json!({
            "status": STATUS_FINISHED,
            "result": result,
        }),
        JobStatus::Failed { error, .. } => json!({
            "status": STATUS_FAILED,
            "error": error,
        }),
    };
    (StatusCode::OK, Json(body))
}
