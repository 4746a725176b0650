use crate::api::response::{CopyCompleted, json_error};
use crate::api::state::SharedState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pagecopy_core::{Overrides, Settings, run_copy_flow};
use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(serde::Serialize)]
pub struct Health {
    status: String,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "pagecopy is working!".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    pub project_name: Option<String>,
    pub target_environment: Option<String>,
}

/// Runs the copy-page flow once. Query parameters override the
/// project/environment selection from the process environment.
pub async fn run_copy(
    State(state): State<SharedState>,
    Query(query): Query<RunQuery>,
) -> Response {
    let overrides = Overrides {
        project: query.project_name,
        environment: query.target_environment,
        ..Overrides::default()
    };

    let settings = match Settings::resolve(|key| (state.lookup)(key), &overrides) {
        Ok(settings) => settings,
        Err(err) => {
            warn!("rejecting run request: {err}");
            return json_error(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    // One browser run at a time; later requests wait here.
    let _run = state.run_lock.lock().await;
    info!(url = %settings.target_url, "run requested");

    match run_copy_flow(&state.browser, &settings).await {
        Ok(page) => (
            StatusCode::OK,
            Json(CopyCompleted {
                new_url_published: page.url,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("copy-page run failed: {err:#}");
            json_error(StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}

pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not Found")
}
