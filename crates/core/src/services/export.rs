//! Report, map and analytics exports.
//!
//! Read-only projections of the report store, rendered as CSV, JSON or GeoJSON
//! attachments.

use std::{borrow::Cow, collections::HashMap};

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use civic_common::AppResult;
use civic_db::{
    entities::{
        complaint::{self, ComplaintStatus},
        user,
    },
    repositories::{ComplaintHelperRepository, ComplaintRepository, UserRepository},
};
use serde_json::{Value, json};

use crate::{
    access::{Caller, Operation},
    services::{
        analytics::{count_by, percentage},
        report::HelperWithNgo,
    },
};

const REPORT_HEADERS: [&str; 18] = [
    "Complaint ID",
    "Title",
    "Description",
    "Category",
    "Priority",
    "Status",
    "Address",
    "Latitude",
    "Longitude",
    "Image URL",
    "Assigned Department",
    "Reporter Name",
    "Reporter Email",
    "Reporter Phone",
    "Created At",
    "Updated At",
    "Helpers Count",
    "Helper Organizations",
];

const MAP_HEADERS: [&str; 14] = [
    "Complaint ID",
    "Title",
    "Category",
    "Priority",
    "Status",
    "Address",
    "Latitude",
    "Longitude",
    "Image URL",
    "Assigned Department",
    "Reporter Name",
    "Reporter Email",
    "Created At",
    "Updated At",
];

/// A rendered export attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// A report joined with everything the exports print.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub report: complaint::Model,
    pub reporter: Option<user::Model>,
    pub helpers: Vec<HelperWithNgo>,
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
#[must_use]
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn csv_line<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn timestamp(at: &DateTime<FixedOffset>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn coordinate(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn dated_filename(stem: &str, extension: &str, now: DateTime<Utc>) -> String {
    format!("{stem}_{}.{extension}", now.format("%Y-%m-%d"))
}

/// Every report with reporter contact and helper organizations.
#[must_use]
pub fn reports_csv(rows: &[ExportRow]) -> String {
    let mut lines = vec![csv_line(&REPORT_HEADERS)];

    for row in rows {
        let r = &row.report;
        let reporter = row.reporter.as_ref();
        let organizations = row
            .helpers
            .iter()
            .filter_map(|h| {
                h.ngo
                    .as_ref()
                    .map(|ngo| ngo.organization.clone().unwrap_or_else(|| ngo.name.clone()))
            })
            .collect::<Vec<_>>()
            .join("; ");

        lines.push(csv_line(&[
            r.complaint_code.clone(),
            r.title.clone(),
            r.description.clone(),
            r.category.clone(),
            r.priority.to_string(),
            r.status.to_string(),
            r.address.clone().unwrap_or_default(),
            coordinate(r.latitude),
            coordinate(r.longitude),
            r.image_url.clone().unwrap_or_default(),
            r.assigned_dept.clone().unwrap_or_default(),
            reporter.map(|u| u.name.clone()).unwrap_or_default(),
            reporter.map(|u| u.email.clone()).unwrap_or_default(),
            reporter.and_then(|u| u.phone.clone()).unwrap_or_default(),
            timestamp(&r.created_at),
            timestamp(&r.updated_at),
            row.helpers.len().to_string(),
            organizations,
        ]));
    }

    lines.join("\n")
}

/// Every report as a JSON document.
#[must_use]
pub fn reports_json(rows: &[ExportRow], now: DateTime<Utc>) -> Value {
    let reports: Vec<Value> = rows
        .iter()
        .map(|row| {
            let r = &row.report;
            json!({
                "complaintId": r.complaint_code,
                "title": r.title,
                "description": r.description,
                "category": r.category,
                "priority": r.priority,
                "status": r.status,
                "address": r.address,
                "location": {
                    "latitude": r.latitude,
                    "longitude": r.longitude,
                },
                "imageUrl": r.image_url,
                "assignedDept": r.assigned_dept,
                "reporter": row.reporter.as_ref().map(|u| json!({
                    "name": u.name,
                    "email": u.email,
                    "phone": u.phone,
                })),
                "helpers": row.helpers.iter().map(|h| json!({
                    "name": h.ngo.as_ref().map(|n| n.name.clone()),
                    "organization": h.ngo.as_ref().and_then(|n| n.organization.clone()),
                    "status": h.helper.status,
                    "message": h.helper.message,
                })).collect::<Vec<_>>(),
                "timestamps": {
                    "createdAt": timestamp(&r.created_at),
                    "updatedAt": timestamp(&r.updated_at),
                },
            })
        })
        .collect();

    json!({
        "exportDate": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        "totalReports": rows.len(),
        "reports": reports,
    })
}

/// Located reports as a GeoJSON `FeatureCollection`. Coordinates are `[lng, lat]`.
#[must_use]
pub fn map_geojson(rows: &[ExportRow]) -> Value {
    let features: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            let r = &row.report;
            let (lat, lng) = r.location()?;
            Some(json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [lng, lat],
                },
                "properties": {
                    "complaintId": r.complaint_code,
                    "title": r.title,
                    "description": r.description,
                    "category": r.category,
                    "priority": r.priority,
                    "status": r.status,
                    "address": r.address,
                    "imageUrl": r.image_url,
                    "assignedDept": r.assigned_dept,
                    "reporter": row.reporter.as_ref().map(|u| json!({
                        "name": u.name,
                        "email": u.email,
                    })),
                    "createdAt": timestamp(&r.created_at),
                    "updatedAt": timestamp(&r.updated_at),
                },
            }))
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Located reports as CSV.
#[must_use]
pub fn map_csv(rows: &[ExportRow]) -> String {
    let mut lines = vec![csv_line(&MAP_HEADERS)];

    for row in rows.iter().filter(|row| row.report.location().is_some()) {
        let r = &row.report;
        let reporter = row.reporter.as_ref();
        lines.push(csv_line(&[
            r.complaint_code.clone(),
            r.title.clone(),
            r.category.clone(),
            r.priority.to_string(),
            r.status.to_string(),
            r.address.clone().unwrap_or_default(),
            coordinate(r.latitude),
            coordinate(r.longitude),
            r.image_url.clone().unwrap_or_default(),
            r.assigned_dept.clone().unwrap_or_default(),
            reporter.map(|u| u.name.clone()).unwrap_or_default(),
            reporter.map(|u| u.email.clone()).unwrap_or_default(),
            timestamp(&r.created_at),
            timestamp(&r.updated_at),
        ]));
    }

    lines.join("\n")
}

/// Summary plus category, status and department breakdowns.
#[must_use]
pub fn analytics_csv(reports: &[complaint::Model], now: DateTime<Utc>) -> String {
    let total = reports.len() as u64;
    let resolved = reports
        .iter()
        .filter(|r| r.status == ComplaintStatus::Resolved)
        .count() as u64;

    let mut lines = vec![
        "Analytics Report".to_string(),
        csv_line(&[
            "Generated on".to_string(),
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
        ]),
        String::new(),
        "Summary".to_string(),
        format!("Total Reports,{total}"),
        format!("Resolved Reports,{resolved}"),
        format!("Resolution Rate,{:.2}%", percentage(resolved, total)),
    ];

    let sections = [
        (
            "Reports by Category",
            "Category",
            count_by(reports.iter().map(|r| r.category.as_str())),
        ),
        (
            "Reports by Status",
            "Status",
            count_by(reports.iter().map(|r| r.status.as_str())),
        ),
        (
            "Reports by Department",
            "Department",
            count_by(reports.iter().filter_map(|r| r.assigned_dept.as_deref())),
        ),
    ];

    for (title, label, buckets) in sections {
        lines.push(String::new());
        lines.push(title.to_string());
        lines.push(format!("{label},Count,Percentage"));
        for bucket in buckets {
            lines.push(csv_line(&[
                bucket.name,
                bucket.count.to_string(),
                format!("{:.2}%", percentage(bucket.count, total)),
            ]));
        }
    }

    lines.join("\n")
}

/// Export service.
#[derive(Clone)]
pub struct ExportService {
    complaint_repo: ComplaintRepository,
    user_repo: UserRepository,
    helper_repo: ComplaintHelperRepository,
}

impl ExportService {
    /// Create a new export service.
    #[must_use]
    pub const fn new(
        complaint_repo: ComplaintRepository,
        user_repo: UserRepository,
        helper_repo: ComplaintHelperRepository,
    ) -> Self {
        Self {
            complaint_repo,
            user_repo,
            helper_repo,
        }
    }

    /// All reports as CSV.
    pub async fn reports_csv(&self, caller: &Caller) -> AppResult<ExportFile> {
        caller.authorize(Operation::Export)?;
        let rows = self.load_rows(false).await?;
        Ok(ExportFile {
            filename: dated_filename("civic_reports", "csv", Utc::now()),
            content_type: "text/csv",
            body: reports_csv(&rows),
        })
    }

    /// All reports as JSON.
    pub async fn reports_json(&self, caller: &Caller) -> AppResult<ExportFile> {
        caller.authorize(Operation::Export)?;
        let rows = self.load_rows(false).await?;
        let now = Utc::now();
        Ok(ExportFile {
            filename: dated_filename("civic_reports", "json", now),
            content_type: "application/json",
            body: reports_json(&rows, now).to_string(),
        })
    }

    /// Located reports as GeoJSON.
    pub async fn map_geojson(&self, caller: &Caller) -> AppResult<ExportFile> {
        caller.authorize(Operation::Export)?;
        let rows = self.load_rows(true).await?;
        Ok(ExportFile {
            filename: dated_filename("civic_map_data", "geojson", Utc::now()),
            content_type: "application/geo+json",
            body: map_geojson(&rows).to_string(),
        })
    }

    /// Located reports as CSV.
    pub async fn map_csv(&self, caller: &Caller) -> AppResult<ExportFile> {
        caller.authorize(Operation::Export)?;
        let rows = self.load_rows(true).await?;
        Ok(ExportFile {
            filename: dated_filename("civic_map_data", "csv", Utc::now()),
            content_type: "text/csv",
            body: map_csv(&rows),
        })
    }

    /// Analytics summary as CSV.
    pub async fn analytics_csv(&self, caller: &Caller) -> AppResult<ExportFile> {
        caller.authorize(Operation::Export)?;
        let reports = self.complaint_repo.find_all().await?;
        let now = Utc::now();
        Ok(ExportFile {
            filename: dated_filename("civic_analytics", "csv", now),
            content_type: "text/csv",
            body: analytics_csv(&reports, now),
        })
    }

    async fn load_rows(&self, located_only: bool) -> AppResult<Vec<ExportRow>> {
        let reports = if located_only {
            self.complaint_repo.find_located().await?
        } else {
            self.complaint_repo.find_all().await?
        };

        let mut reporter_ids: Vec<String> =
            reports.iter().map(|r| r.reported_by_id.clone()).collect();
        reporter_ids.sort();
        reporter_ids.dedup();
        let reporters: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&reporter_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let report_ids: Vec<String> = reports.iter().map(|r| r.id.clone()).collect();
        let mut helpers: HashMap<String, Vec<HelperWithNgo>> = HashMap::new();
        if !located_only {
            for (helper, ngo) in self.helper_repo.find_by_complaints_with_ngo(&report_ids).await? {
                helpers
                    .entry(helper.complaint_id.clone())
                    .or_default()
                    .push(HelperWithNgo { helper, ngo });
            }
        }

        Ok(reports
            .into_iter()
            .map(|report| ExportRow {
                reporter: reporters.get(&report.reported_by_id).cloned(),
                helpers: helpers.remove(&report.id).unwrap_or_default(),
                report,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use civic_db::entities::{complaint::Priority, user::UserRole};

    fn row(id: &str, location: Option<(f64, f64)>) -> ExportRow {
        let created = Utc.with_ymd_and_hms(2025, 3, 10, 8, 30, 0).unwrap();
        ExportRow {
            report: complaint::Model {
                id: id.to_string(),
                complaint_code: format!("CR2025031000000{id}"),
                title: "Pothole, \"deep\"".to_string(),
                description: "Near the\nbus stop".to_string(),
                category: "Pothole".to_string(),
                priority: Priority::High,
                status: ComplaintStatus::Pending,
                address: None,
                latitude: location.map(|l| l.0),
                longitude: location.map(|l| l.1),
                image_url: None,
                assigned_dept: Some("Roads".to_string()),
                reported_by_id: "citizen".to_string(),
                created_at: created.into(),
                updated_at: created.into(),
            },
            reporter: Some(user::Model {
                id: "citizen".to_string(),
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                password_hash: String::new(),
                phone: None,
                address: None,
                role: UserRole::Citizen,
                organization: None,
                service_area: None,
                created_at: created.into(),
                updated_at: created.into(),
            }),
            helpers: vec![],
        }
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_reports_csv_layout() {
        let csv = reports_csv(&[row("1", Some((28.61, 77.2)))]);
        let header = csv.lines().next().unwrap();

        assert_eq!(header.split(',').count(), REPORT_HEADERS.len());
        assert!(csv.contains("\"Pothole, \"\"deep\"\"\""));
        assert!(csv.contains("2025-03-10T08:30:00.000Z"));
        assert!(csv.contains("28.61,77.2"));
    }

    #[test]
    fn test_geojson_only_located_and_lng_first() {
        let rows = [row("1", Some((28.61, 77.2))), row("2", None)];

        let geo = map_geojson(&rows);

        let features = geo["features"].as_array().unwrap();
        assert_eq!(geo["type"], "FeatureCollection");
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([77.2, 28.61]));
        assert_eq!(features[0]["properties"]["priority"], "high");
    }

    #[test]
    fn test_map_csv_skips_unlocated() {
        let rows = [row("1", Some((28.61, 77.2))), row("2", None)];

        assert_eq!(map_csv(&rows).lines().count(), 2);
    }

    #[test]
    fn test_analytics_csv_sections() {
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
        let reports = vec![row("1", None).report, row("2", None).report];

        let csv = analytics_csv(&reports, now);

        assert!(csv.contains("Total Reports,2"));
        assert!(csv.contains("Resolution Rate,0.00%"));
        assert!(csv.contains("Pothole,2,100.00%"));
        assert!(csv.contains("PENDING,2,100.00%"));
        assert!(csv.contains("Roads,2,100.00%"));
    }

    #[test]
    fn test_filename_is_dated() {
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
        assert_eq!(
            dated_filename("civic_reports", "csv", now),
            "civic_reports_2025-03-11.csv"
        );
    }

    #[test]
    fn test_reports_json_counts() {
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
        let doc = reports_json(&[row("1", None)], now);

        assert_eq!(doc["totalReports"], 1);
        assert_eq!(doc["reports"][0]["reporter"]["name"], "Asha");
        assert_eq!(doc["reports"][0]["location"]["latitude"], Value::Null);
    }
}
