pub mod copy;
pub mod response;
pub mod state;

use crate::auth;
use crate::config::ApiCredentials;
use axum::{
    Router, middleware,
    http::{Method, header},
    routing::get,
};
use crate::api::state::SharedState;
use tower_http::cors::CorsLayer;

pub fn app(state: SharedState, credentials: ApiCredentials) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(copy::health))
        .route("/run", get(copy::run_copy))
        .fallback(copy::not_found)
        .layer(middleware::from_fn_with_state(
            credentials,
            auth::require_basic_auth,
        ))
        .layer(cors)
        .with_state(state)
}
