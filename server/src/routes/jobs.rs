use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::job_handlers::{poll_job, start_job};

pub fn job_routes() -> Router {
    Router::new()
        .route("/jobs", post(start_job))
        .route("/jobs/{id}", get(poll_job))
}
