//! Report lifecycle service.

use std::collections::HashMap;

use civic_common::{AppError, AppResult, IdGenerator};
use civic_db::{
    entities::{
        complaint::{self, ComplaintStatus, Priority},
        complaint_helper, user,
    },
    repositories::{ComplaintHelperRepository, ComplaintRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::access::{Caller, Operation};

/// Input for filing a report.
///
/// There is no reporter field: the reporter is always the caller.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateReportInput {
    #[validate(length(min = 1, max = 256, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, max = 10000, message = "Description is required"))]
    pub description: String,

    #[validate(length(min = 1, max = 128, message = "Category is required"))]
    pub category: String,

    #[validate(length(min = 1, message = "Priority is required"))]
    pub priority: String,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    #[validate(length(max = 1024))]
    pub address: Option<String>,

    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

/// A helper relation joined with the NGO account.
#[derive(Debug, Clone)]
pub struct HelperWithNgo {
    pub helper: complaint_helper::Model,
    pub ngo: Option<user::Model>,
}

/// A report with its helper relations attached.
#[derive(Debug, Clone)]
pub struct ReportWithHelpers {
    pub report: complaint::Model,
    pub helpers: Vec<HelperWithNgo>,
}

/// Report service.
#[derive(Clone)]
pub struct ReportService {
    complaint_repo: ComplaintRepository,
    helper_repo: ComplaintHelperRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        complaint_repo: ComplaintRepository,
        helper_repo: ComplaintHelperRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            complaint_repo,
            helper_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a new report as the calling citizen.
    pub async fn create(
        &self,
        caller: &Caller,
        input: CreateReportInput,
    ) -> AppResult<complaint::Model> {
        caller.authorize(Operation::CreateReport)?;
        input.validate()?;

        let title = required(&input.title, "Title")?;
        let description = required(&input.description, "Description")?;
        let category = required(&input.category, "Category")?;
        let priority: Priority = input.priority.parse()?;
        let (latitude, longitude) = validate_location(input.latitude, input.longitude)?;

        let now = chrono::Utc::now();
        let model = complaint::ActiveModel {
            id: Set(self.id_gen.generate()),
            complaint_code: Set(self.id_gen.complaint_code()),
            title: Set(title),
            description: Set(description),
            category: Set(category),
            priority: Set(priority),
            status: Set(ComplaintStatus::Pending),
            address: Set(non_empty(input.address)),
            latitude: Set(latitude),
            longitude: Set(longitude),
            image_url: Set(non_empty(input.image_url)),
            assigned_dept: Set(None),
            reported_by_id: Set(caller.id.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let report = self.complaint_repo.create(model).await?;
        tracing::info!(
            report_id = %report.id,
            complaint_code = %report.complaint_code,
            reporter_id = %caller.id,
            "Report filed"
        );
        Ok(report)
    }

    /// Reports filed by the caller, newest first.
    pub async fn list_own(&self, caller: &Caller) -> AppResult<Vec<complaint::Model>> {
        caller.authorize(Operation::ListOwnReports)?;
        self.complaint_repo.find_by_reporter(&caller.id).await
    }

    /// Every report, newest first.
    pub async fn list_all(&self, caller: &Caller) -> AppResult<Vec<complaint::Model>> {
        caller.authorize(Operation::ListAllReports)?;
        self.complaint_repo.find_all().await
    }

    /// Every report with its helpers and their NGO contact details.
    pub async fn list_all_with_helpers(
        &self,
        caller: &Caller,
    ) -> AppResult<Vec<ReportWithHelpers>> {
        caller.authorize(Operation::ListAllReportsWithHelpers)?;

        let reports = self.complaint_repo.find_all().await?;
        let ids: Vec<String> = reports.iter().map(|r| r.id.clone()).collect();
        let rows = self.helper_repo.find_by_complaints_with_ngo(&ids).await?;

        let mut by_report: HashMap<String, Vec<HelperWithNgo>> = HashMap::new();
        for (helper, ngo) in rows {
            by_report
                .entry(helper.complaint_id.clone())
                .or_default()
                .push(HelperWithNgo { helper, ngo });
        }

        Ok(reports
            .into_iter()
            .map(|report| {
                let helpers = by_report.remove(&report.id).unwrap_or_default();
                ReportWithHelpers { report, helpers }
            })
            .collect())
    }

    /// Reports visible to an NGO.
    ///
    /// The NGO's service area is stored but not applied as a filter; every
    /// report is returned.
    pub async fn list_for_ngo(&self, caller: &Caller) -> AppResult<Vec<complaint::Model>> {
        caller.authorize(Operation::ListReportsForNgo)?;
        self.user_repo.get_by_id(&caller.id).await?;
        self.complaint_repo.find_all().await
    }

    /// Read one report.
    ///
    /// A citizen asking for someone else's report gets `NotFound`, the same
    /// answer as for an ID that does not exist.
    pub async fn get(&self, caller: &Caller, id: &str) -> AppResult<complaint::Model> {
        caller.authorize(Operation::GetReport)?;
        let report = self.complaint_repo.get_by_id(id).await?;

        match caller.role {
            user::UserRole::Admin | user::UserRole::Ngo => Ok(report),
            user::UserRole::Citizen if report.reported_by_id == caller.id => Ok(report),
            user::UserRole::Citizen => Err(AppError::NotFound(format!("Report {id} not found"))),
        }
    }

    /// Overwrite a report's status. Any status may follow any other.
    pub async fn update_status(
        &self,
        caller: &Caller,
        id: &str,
        status: &str,
    ) -> AppResult<complaint::Model> {
        caller.authorize(Operation::UpdateReportStatus)?;
        let status: ComplaintStatus = status.parse()?;

        let report = self.complaint_repo.get_by_id(id).await?;
        let previous = report.status;

        let mut model: complaint::ActiveModel = report.into();
        model.status = Set(status);
        model.updated_at = Set(chrono::Utc::now().into());

        let updated = self.complaint_repo.update(model).await?;
        tracing::info!(report_id = %id, from = %previous, to = %status, "Report status changed");
        Ok(updated)
    }

    /// Set or clear the department a report is assigned to.
    pub async fn assign_department(
        &self,
        caller: &Caller,
        id: &str,
        department: Option<String>,
    ) -> AppResult<complaint::Model> {
        caller.authorize(Operation::AssignDepartment)?;
        let department = non_empty(department);
        if department.as_ref().is_some_and(|d| d.len() > 128) {
            return Err(AppError::Validation("Department name too long".to_string()));
        }

        let report = self.complaint_repo.get_by_id(id).await?;

        let mut model: complaint::ActiveModel = report.into();
        model.assigned_dept = Set(department);
        model.updated_at = Set(chrono::Utc::now().into());

        self.complaint_repo.update(model).await
    }
}

/// Both coordinates or neither, each within its valid range.
fn validate_location(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> AppResult<(Option<f64>, Option<f64>)> {
    match (latitude, longitude) {
        (None, None) => Ok((None, None)),
        (Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(AppError::Validation(
                    "Latitude must be between -90 and 90".to_string(),
                ));
            }
            if !(-180.0..=180.0).contains(&lng) {
                return Err(AppError::Validation(
                    "Longitude must be between -180 and 180".to_string(),
                ));
            }
            Ok((Some(lat), Some(lng)))
        }
        _ => Err(AppError::Validation(
            "Latitude and longitude must be given together".to_string(),
        )),
    }
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
