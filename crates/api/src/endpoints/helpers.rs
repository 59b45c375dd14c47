//! NGO helper endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use civic_common::AppResult;
use civic_core::{HelpOutcome, HelperWithNgo, HelpingEntry};
use civic_db::entities::{
    complaint_helper::{self, HelperStatus},
    user,
};
use serde::{Deserialize, Serialize};

use super::reports::ReportResponse;
use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
    response::{Ack, ApiResponse},
};

/// NGO contact details shown to admins.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoContact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub service_area: Option<String>,
}

impl From<user::Model> for NgoContact {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            organization: u.organization,
            service_area: u.service_area,
        }
    }
}

/// Helper relation response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperResponse {
    pub id: String,
    pub complaint_id: String,
    pub ngo_id: String,
    pub status: HelperStatus,
    pub message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ngo: Option<NgoContact>,
}

impl From<complaint_helper::Model> for HelperResponse {
    fn from(h: complaint_helper::Model) -> Self {
        Self {
            id: h.id,
            complaint_id: h.complaint_id,
            ngo_id: h.ngo_id,
            status: h.status,
            message: h.message,
            created_at: h.created_at.to_rfc3339(),
            updated_at: h.updated_at.to_rfc3339(),
            ngo: None,
        }
    }
}

impl From<HelperWithNgo> for HelperResponse {
    fn from(entry: HelperWithNgo) -> Self {
        Self {
            ngo: entry.ngo.map(Into::into),
            ..Self::from(entry.helper)
        }
    }
}

/// One of the caller's helper relations with its report.
#[derive(Serialize)]
pub struct HelpingResponse {
    #[serde(flatten)]
    pub helper: HelperResponse,
    pub complaint: Option<ReportResponse>,
}

impl From<HelpingEntry> for HelpingResponse {
    fn from(entry: HelpingEntry) -> Self {
        Self {
            helper: entry.helper.into(),
            complaint: entry.report.map(Into::into),
        }
    }
}

/// `{"helper": ...}` payload of helper acknowledgements.
#[derive(Serialize)]
pub struct HelperPayload {
    pub helper: HelperResponse,
}

/// Help request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HelpRequest {
    pub action: String,
    pub message: Option<String>,
}

/// Helper status change body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateHelperStatusRequest {
    pub status: String,
}

/// Offer or withdraw help on a report.
async fn help(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    JsonBody(req): JsonBody<HelpRequest>,
) -> AppResult<ApiResponse<Ack<HelperPayload>>> {
    let ack = match state
        .helper_service
        .request_help(&caller, &report_id, &req.action, req.message)
        .await?
    {
        HelpOutcome::Added(helper) => Ack::with(
            "Successfully added as helper",
            Some(HelperPayload {
                helper: helper.into(),
            }),
        ),
        HelpOutcome::Removed => Ack::with("Successfully removed as helper", None),
    };

    Ok(ApiResponse::ok(ack))
}

/// Helpers on one report.
async fn for_report(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> AppResult<ApiResponse<Vec<HelperResponse>>> {
    let helpers = state
        .helper_service
        .list_for_report(&caller, &report_id)
        .await?;
    Ok(ApiResponse::ok(helpers.into_iter().map(Into::into).collect()))
}

/// Reports the calling NGO is helping with.
async fn my_helping(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<HelpingResponse>>> {
    let entries = state.helper_service.list_my_helping(&caller).await?;
    Ok(ApiResponse::ok(entries.into_iter().map(Into::into).collect()))
}

async fn update_status(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(helper_id): Path<String>,
    JsonBody(req): JsonBody<UpdateHelperStatusRequest>,
) -> AppResult<ApiResponse<Ack<HelperPayload>>> {
    let helper = state
        .helper_service
        .update_status(&caller, &helper_id, &req.status)
        .await?;

    Ok(ApiResponse::ok(Ack::with(
        "Helper status updated successfully",
        Some(HelperPayload {
            helper: helper.into(),
        }),
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ngo/my-helping", get(my_helping))
        .route("/{id}", get(for_report))
        .route("/{id}/help", post(help))
        .route("/{id}/status", patch(update_status))
}
