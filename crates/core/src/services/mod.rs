//! Business logic services.

#![allow(missing_docs)]

pub mod analytics;
pub mod auth;
pub mod export;
pub mod helper;
pub mod report;
pub mod upload;

pub use analytics::{
    AnalyticsService, Bucket, CategoryShare, DashboardSnapshot, DepartmentPerformance,
    DetailedAnalytics, MonthlyTrend, Overview, PerformanceLabel, StatusShare, TimeRange,
};
pub use auth::{
    AuthService, AuthSession, LoginInput, RegisterInput, UserWithReportCount, hash_password,
    verify_password,
};
pub use export::{ExportFile, ExportService};
pub use helper::{HelpAction, HelpOutcome, HelperService, HelpingEntry};
pub use report::{CreateReportInput, HelperWithNgo, ReportService, ReportWithHelpers};
pub use upload::{UploadImageInput, UploadService, UploadedImage};
