//! Development backend for the timetable client: stores settings and runs
//! generation jobs in memory.

pub mod config;
pub mod handlers;
pub mod routes;
pub mod solver;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};

use routes::{jobs::job_routes, settings::settings_routes};
use state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", job_routes().merge(settings_routes()))
        .layer(Extension(state))
}

/// Credentialed CORS for `client_url`, or any origin without credentials.
pub fn cors_layer(client_url: Option<&str>) -> Result<CorsLayer, header::InvalidHeaderValue> {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE]);

    Ok(match client_url {
        Some(url) => cors
            .allow_origin(url.parse::<HeaderValue>()?)
            .allow_credentials(true),
        None => cors.allow_origin(Any),
    })
}
