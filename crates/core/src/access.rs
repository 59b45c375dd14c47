//! Role-based access policy.
//!
//! Each operation names the roles allowed to perform it. The table is a pair of
//! exhaustive matches, so adding a role or an operation fails to compile until
//! every decision has been made for it.

use civic_common::{AppError, AppResult};
use civic_db::entities::user::{self, UserRole};

/// The authenticated principal of a request.
///
/// Built only from verified session claims or from a freshly loaded user, never
/// from client-supplied identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// User ID (token subject).
    pub id: String,
    /// Role at the time the token was issued, or as freshly loaded.
    pub role: UserRole,
}

impl Caller {
    /// Create a caller.
    #[must_use]
    pub const fn new(id: String, role: UserRole) -> Self {
        Self { id, role }
    }

    /// Fail with `Forbidden` unless this caller's role may perform `op`.
    pub fn authorize(&self, op: Operation) -> AppResult<()> {
        if op.permits(self.role) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.id, role = %self.role, ?op, "Operation denied");
            Err(AppError::Forbidden(format!(
                "Role {} may not perform this operation",
                self.role
            )))
        }
    }
}

impl From<&user::Model> for Caller {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
        }
    }
}

/// Every authenticated operation the platform exposes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetProfile,
    ListUsers,
    UploadImage,
    CreateReport,
    ListOwnReports,
    ListAllReports,
    ListAllReportsWithHelpers,
    ListReportsForNgo,
    GetReport,
    UpdateReportStatus,
    AssignDepartment,
    RequestHelp,
    ListHelpersForReport,
    ListMyHelping,
    UpdateHelperStatus,
    ViewAnalytics,
    Export,
}

impl Operation {
    /// Whether `role` may perform this operation.
    ///
    /// Ownership rules (a citizen reading only their own report) are applied by
    /// the service on top of this check.
    #[must_use]
    pub const fn permits(self, role: UserRole) -> bool {
        match role {
            UserRole::Citizen => matches!(
                self,
                Self::GetProfile
                    | Self::UploadImage
                    | Self::CreateReport
                    | Self::ListOwnReports
                    | Self::ListAllReports
                    | Self::GetReport
            ),
            UserRole::Ngo => matches!(
                self,
                Self::GetProfile
                    | Self::UploadImage
                    | Self::ListAllReports
                    | Self::ListReportsForNgo
                    | Self::GetReport
                    | Self::RequestHelp
                    | Self::ListMyHelping
            ),
            UserRole::Admin => matches!(
                self,
                Self::GetProfile
                    | Self::ListUsers
                    | Self::UploadImage
                    | Self::ListAllReports
                    | Self::ListAllReportsWithHelpers
                    | Self::GetReport
                    | Self::UpdateReportStatus
                    | Self::AssignDepartment
                    | Self::ListHelpersForReport
                    | Self::UpdateHelperStatus
                    | Self::ViewAnalytics
                    | Self::Export
            ),
        }
    }
}
