//! Export endpoints (admin downloads).

use axum::{Router, extract::State, routing::get};
use civic_common::AppResult;

use crate::{extractors::AuthUser, middleware::AppState, response::Attachment};

async fn reports_csv(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Attachment> {
    Ok(Attachment(state.export_service.reports_csv(&caller).await?))
}

async fn reports_json(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Attachment> {
    Ok(Attachment(state.export_service.reports_json(&caller).await?))
}

async fn map_geojson(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Attachment> {
    Ok(Attachment(state.export_service.map_geojson(&caller).await?))
}

async fn map_csv(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Attachment> {
    Ok(Attachment(state.export_service.map_csv(&caller).await?))
}

async fn analytics_csv(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Attachment> {
    Ok(Attachment(state.export_service.analytics_csv(&caller).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/csv", get(reports_csv))
        .route("/reports/json", get(reports_json))
        .route("/map/geojson", get(map_geojson))
        .route("/map/csv", get(map_csv))
        .route("/analytics/csv", get(analytics_csv))
}
