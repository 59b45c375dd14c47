//! Image upload endpoint.

use axum::{Router, extract::State, routing::post};
use civic_common::AppResult;
use civic_core::{UploadImageInput, UploadedImage};

use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
    response::ApiResponse,
};

/// Store a base64 data-URL image and return where it lives.
async fn image(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<UploadImageInput>,
) -> AppResult<ApiResponse<UploadedImage>> {
    let uploaded = state.upload_service.upload_image(&caller, input).await?;
    Ok(ApiResponse::created(uploaded))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/image", post(image))
}
