//! Report endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use civic_common::AppResult;
use civic_core::{CreateReportInput, DashboardSnapshot, ReportWithHelpers};
use civic_db::entities::complaint::{self, ComplaintStatus, Priority};
use serde::{Deserialize, Serialize};

use super::helpers::HelperResponse;
use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
    response::ApiResponse,
};

// ==================== Request/Response Types ====================

/// Report response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub complaint_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub assigned_dept: Option<String>,
    pub reported_by_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<complaint::Model> for ReportResponse {
    fn from(r: complaint::Model) -> Self {
        Self {
            id: r.id,
            complaint_id: r.complaint_code,
            title: r.title,
            description: r.description,
            category: r.category,
            priority: r.priority,
            status: r.status,
            address: r.address,
            latitude: r.latitude,
            longitude: r.longitude,
            image_url: r.image_url,
            assigned_dept: r.assigned_dept,
            reported_by_id: r.reported_by_id,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

/// Report with its helpers (admin listing).
#[derive(Serialize)]
pub struct ReportWithHelpersResponse {
    #[serde(flatten)]
    pub report: ReportResponse,
    pub helpers: Vec<HelperResponse>,
}

impl From<ReportWithHelpers> for ReportWithHelpersResponse {
    fn from(entry: ReportWithHelpers) -> Self {
        Self {
            report: entry.report.into(),
            helpers: entry.helpers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Status change request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Department assignment request. `null` clears the assignment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssignDepartmentRequest {
    #[serde(alias = "assignedDept")]
    pub department: Option<String>,
}

// ==================== Handlers ====================

/// File a report.
async fn create(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateReportInput>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state.report_service.create(&caller, input).await?;
    Ok(ApiResponse::created(report.into()))
}

/// Reports filed by the caller.
async fn mine(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let reports = state.report_service.list_own(&caller).await?;
    Ok(ApiResponse::ok(reports.into_iter().map(Into::into).collect()))
}

/// Every report.
async fn all(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let reports = state.report_service.list_all(&caller).await?;
    Ok(ApiResponse::ok(reports.into_iter().map(Into::into).collect()))
}

/// Every report with helper details.
async fn all_with_helpers(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ReportWithHelpersResponse>>> {
    let reports = state.report_service.list_all_with_helpers(&caller).await?;
    Ok(ApiResponse::ok(reports.into_iter().map(Into::into).collect()))
}

/// Reports offered to NGOs.
async fn for_ngo(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let reports = state.report_service.list_for_ngo(&caller).await?;
    Ok(ApiResponse::ok(reports.into_iter().map(Into::into).collect()))
}

/// Admin dashboard numbers.
async fn analytics(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<DashboardSnapshot>> {
    let snapshot = state.analytics_service.dashboard(&caller).await?;
    Ok(ApiResponse::ok(snapshot))
}

async fn show(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state.report_service.get(&caller, &id).await?;
    Ok(ApiResponse::ok(report.into()))
}

async fn update_status(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .report_service
        .update_status(&caller, &id, &req.status)
        .await?;
    Ok(ApiResponse::ok(report.into()))
}

async fn assign_department(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AssignDepartmentRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .report_service
        .assign_department(&caller, &id, req.department)
        .await?;
    Ok(ApiResponse::ok(report.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(all_with_helpers).post(create))
        .route("/me", get(mine))
        .route("/all", get(all))
        .route("/for-ngo", get(for_ngo))
        .route("/analytics", get(analytics))
        .route("/{id}", get(show))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/department", patch(assign_department))
}
