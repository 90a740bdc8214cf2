use axum::{routing::post, Router};

use crate::handlers::settings_handlers::save_settings;

pub fn settings_routes() -> Router {
    Router::new().route("/settings", post(save_settings))
}
