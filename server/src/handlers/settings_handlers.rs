use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;

use timetable_client::settings::SettingsSnapshot;

use crate::state::AppState;

/// POST /api/settings
pub async fn save_settings(
    Extension(state): Extension<AppState>,
    Json(settings): Json<SettingsSnapshot>,
) -> impl IntoResponse {
    if let Err(e) = settings.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string() })),
        );
    }

    tracing::info!(
        classes = settings.classes.len(),
        teachers = settings.teachers.len(),
        "settings saved"
    );
    *state.settings.write().await = Some(settings);
    (StatusCode::OK, Json(json!({ "message": "Settings saved" })))
}
