//! Authentication endpoints.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use civic_common::AppResult;
use civic_core::{AuthSession, LoginInput, RegisterInput, UserWithReportCount};
use civic_db::entities::user;
use serde::Serialize;

use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
    response::{Ack, ApiResponse},
};

/// Account summary returned with a fresh token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: user::UserRole,
}

/// Register/login response.
#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: SessionUser,
}

impl From<AuthSession> for SessionResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: SessionUser {
                id: session.user.id,
                name: session.user.name,
                email: session.user.email,
                role: session.user.role,
            },
        }
    }
}

/// Row of the admin user listing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: user::UserRole,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub report_count: i64,
}

impl From<UserWithReportCount> for UserListEntry {
    fn from(entry: UserWithReportCount) -> Self {
        let u = entry.user;
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            phone: u.phone,
            organization: u.organization,
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
            report_count: entry.report_count,
        }
    }
}

/// Create a citizen or NGO account.
async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.auth_service.register(input).await?;
    Ok(ApiResponse::created(session.into()))
}

/// Exchange credentials for a token.
async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.auth_service.login(input).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Tokens are stateless; the client drops its copy.
async fn logout() -> ApiResponse<Ack> {
    ApiResponse::ok(Ack::success())
}

/// Every account with its report count.
async fn users(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserListEntry>>> {
    let users = state.auth_service.list_users(&caller).await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/users", get(users))
}
