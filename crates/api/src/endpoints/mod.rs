//! API endpoints.

mod analytics;
mod auth;
mod export;
mod health;
mod helpers;
mod profile;
mod reports;
mod uploads;

use axum::{Router, extract::DefaultBodyLimit, middleware};

use crate::middleware::{AppState, auth_middleware};

/// Request body cap. Base64 image uploads are the largest payloads.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/profile", profile::router())
        .nest("/uploads", uploads::router())
        .nest("/reports", reports::router())
        .nest("/helpers", helpers::router())
        .nest("/analytics", analytics::router())
        .nest("/export", export::router())
}

/// The API router with session verification applied and state attached.
pub fn app(state: AppState) -> Router {
    router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
