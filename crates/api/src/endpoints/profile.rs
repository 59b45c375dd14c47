//! Profile endpoint.

use axum::{Router, extract::State, routing::get};
use civic_common::AppResult;
use civic_db::entities::user;
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// The caller's own account.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: user::UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub organization: Option<String>,
    pub service_area: Option<String>,
}

impl From<user::Model> for ProfileResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            phone: u.phone,
            address: u.address,
            organization: u.organization,
            service_area: u.service_area,
        }
    }
}

async fn profile(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let user = state.auth_service.profile(&caller).await?;
    Ok(ApiResponse::ok(user.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(profile))
}
