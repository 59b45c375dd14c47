//! Report analytics.
//!
//! Every figure is recomputed from the full report set on each call. The pure
//! functions here take the rows and the clock so they can be tested without a
//! store; [`AnalyticsService`] only loads data and checks access.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, Local, Months, NaiveTime, Utc};
use civic_common::AppResult;
use civic_db::{
    entities::{
        complaint::{self, ComplaintStatus},
        user,
    },
    repositories::{ComplaintHelperRepository, ComplaintRepository, UserRepository},
};
use serde::Serialize;

use crate::access::{Caller, Operation};

const SECONDS_PER_DAY: f64 = 86_400.0;
const TREND_MONTHS: u32 = 6;
const TOP_REPORTERS: usize = 10;

/// A label and how many reports carry it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    pub count: u64,
}

/// Reports in one status and their share of all reports, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: String,
    pub count: u64,
    pub percentage: f64,
}

/// Reports in one category and their share of all reports, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    pub percentage: f64,
}

/// Admin dashboard figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub total_reports: u64,
    pub pending_reports: u64,
    pub in_progress_reports: u64,
    /// Resolved reports created since local midnight.
    pub resolved_today: u64,
    pub resolved_reports: u64,
    pub resolution_rate: f64,
    /// Mean days from creation to last update over resolved reports.
    pub avg_resolution_time: f64,
    pub category_stats: Vec<Bucket>,
    pub priority_stats: Vec<Bucket>,
    pub status_stats: Vec<Bucket>,
}

/// Qualitative department rating derived from its resolution rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceLabel {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl PerformanceLabel {
    /// Label for a resolution rate in percent.
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 80.0 {
            Self::Excellent
        } else if rate >= 70.0 {
            Self::Good
        } else if rate >= 60.0 {
            Self::Average
        } else {
            Self::NeedsImprovement
        }
    }

    /// Display text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

/// Resolution figures for one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPerformance {
    pub department: String,
    pub total_reports: u64,
    pub resolution_rate: f64,
    pub avg_response_time: f64,
    pub performance: PerformanceLabel,
}

/// Submitted and resolved counts for one calendar month (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    pub submitted: u64,
    pub resolved: u64,
}

/// Headline numbers of the overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewTotals {
    pub total_reports: u64,
    pub resolved_reports: u64,
    pub resolution_rate: f64,
    pub avg_resolution_time: f64,
    /// Non-admin accounts.
    pub total_users: u64,
}

/// Full analytics overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub overview: OverviewTotals,
    pub reports_by_status: Vec<StatusShare>,
    pub reports_by_category: Vec<CategoryShare>,
    pub department_performance: Vec<DepartmentPerformance>,
    pub monthly_trends: Vec<MonthlyTrend>,
}

/// Requested window of the detailed view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
}

/// Counts over the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedSummary {
    pub total_reports: u64,
    pub resolved_reports: u64,
    pub pending_reports: u64,
    pub in_progress_reports: u64,
    pub resolution_rate: f64,
}

/// Priority and category histograms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distributions {
    pub priority: BTreeMap<String, u64>,
    pub category: BTreeMap<String, u64>,
}

/// Reporter identity shown in analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReporterContact {
    pub name: String,
    pub email: String,
}

/// A reporter and how many reports they filed in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopReporter {
    pub name: String,
    pub email: String,
    pub count: u64,
}

/// One report row of the detailed view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedReport {
    pub id: String,
    pub complaint_id: String,
    pub title: String,
    pub category: String,
    pub priority: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub reporter: Option<ReporterContact>,
    pub helpers_count: u64,
    pub assigned_dept: Option<String>,
}

/// Detailed analytics over an optional creation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalytics {
    pub time_range: TimeRange,
    pub summary: DetailedSummary,
    pub distributions: Distributions,
    pub top_reporters: Vec<TopReporter>,
    pub reports: Vec<DetailedReport>,
}

/// Round to a fixed number of decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / total` in percent, 0 when `total` is 0.
#[must_use]
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Mean days between creation and last update over resolved reports, 0 if none.
#[must_use]
pub fn average_resolution_days<'a>(reports: impl IntoIterator<Item = &'a complaint::Model>) -> f64 {
    let (count, seconds) = reports
        .into_iter()
        .filter(|r| r.status == ComplaintStatus::Resolved)
        .fold((0u64, 0i64), |(count, seconds), r| {
            (count + 1, seconds + (r.updated_at - r.created_at).num_seconds())
        });

    if count == 0 {
        0.0
    } else {
        seconds as f64 / count as f64 / SECONDS_PER_DAY
    }
}

/// Count occurrences of each key, largest first, ties by name.
pub(crate) fn count_by<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<Bucket> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(name, count)| Bucket {
            name: name.to_string(),
            count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    buckets
}

/// Attach rounded percentages of `total` to each bucket.
fn shares<T>(buckets: Vec<Bucket>, total: u64, share: impl Fn(String, u64, f64) -> T) -> Vec<T> {
    buckets
        .into_iter()
        .map(|b| share(b.name, b.count, round_to(percentage(b.count, total), 2)))
        .collect()
}

fn count_status(reports: &[complaint::Model], status: ComplaintStatus) -> u64 {
    reports.iter().filter(|r| r.status == status).count() as u64
}

/// Start of the current local calendar day.
#[must_use]
pub fn local_day_start(now: DateTime<Local>) -> DateTime<Utc> {
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .map_or_else(|| now.with_timezone(&Utc), |start| start.with_timezone(&Utc))
}

/// Dashboard snapshot. `day_start` bounds the "resolved today" count.
#[must_use]
pub fn dashboard(reports: &[complaint::Model], day_start: DateTime<Utc>) -> DashboardSnapshot {
    let total = reports.len() as u64;
    let resolved = count_status(reports, ComplaintStatus::Resolved);
    let resolved_today = reports
        .iter()
        .filter(|r| r.status == ComplaintStatus::Resolved && r.created_at >= day_start)
        .count() as u64;

    DashboardSnapshot {
        total_reports: total,
        pending_reports: count_status(reports, ComplaintStatus::Pending),
        in_progress_reports: count_status(reports, ComplaintStatus::InProgress),
        resolved_today,
        resolved_reports: resolved,
        resolution_rate: round_to(percentage(resolved, total), 2),
        avg_resolution_time: round_to(average_resolution_days(reports), 1),
        category_stats: count_by(reports.iter().map(|r| r.category.as_str())),
        priority_stats: count_by(reports.iter().map(|r| r.priority.as_str())),
        status_stats: count_by(reports.iter().map(|r| r.status.as_str())),
    }
}

/// Per-department resolution figures, busiest department first.
#[must_use]
pub fn department_performance(reports: &[complaint::Model]) -> Vec<DepartmentPerformance> {
    let mut by_dept: HashMap<&str, Vec<&complaint::Model>> = HashMap::new();
    for report in reports {
        if let Some(dept) = report.assigned_dept.as_deref() {
            by_dept.entry(dept).or_default().push(report);
        }
    }

    let mut rows: Vec<DepartmentPerformance> = by_dept
        .into_iter()
        .map(|(dept, rows)| {
            let total = rows.len() as u64;
            let resolved = rows
                .iter()
                .filter(|r| r.status == ComplaintStatus::Resolved)
                .count() as u64;
            let rate = percentage(resolved, total);

            DepartmentPerformance {
                department: dept.to_string(),
                total_reports: total,
                resolution_rate: round_to(rate, 2),
                avg_response_time: round_to(average_resolution_days(rows.iter().copied()), 1),
                performance: PerformanceLabel::from_rate(rate),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_reports
            .cmp(&a.total_reports)
            .then_with(|| a.department.cmp(&b.department))
    });
    rows
}

/// Submitted and resolved counts per UTC month over the trailing window.
///
/// A report counts as submitted in the month of its creation and as resolved
/// in the month of its last update. Months with either count appear, oldest first.
#[must_use]
pub fn monthly_trends(reports: &[complaint::Model], now: DateTime<Utc>) -> Vec<MonthlyTrend> {
    let since = now
        .checked_sub_months(Months::new(TREND_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut months: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for report in reports {
        let created = report.created_at.with_timezone(&Utc);
        if created >= since {
            months.entry(created.format("%Y-%m").to_string()).or_default().0 += 1;
        }

        let updated = report.updated_at.with_timezone(&Utc);
        if report.status == ComplaintStatus::Resolved && updated >= since {
            months.entry(updated.format("%Y-%m").to_string()).or_default().1 += 1;
        }
    }

    months
        .into_iter()
        .map(|(month, (submitted, resolved))| MonthlyTrend {
            month,
            submitted,
            resolved,
        })
        .collect()
}

/// Analytics overview. `total_users` counts non-admin accounts.
#[must_use]
pub fn overview(reports: &[complaint::Model], total_users: u64, now: DateTime<Utc>) -> Overview {
    let total = reports.len() as u64;
    let resolved = count_status(reports, ComplaintStatus::Resolved);

    Overview {
        overview: OverviewTotals {
            total_reports: total,
            resolved_reports: resolved,
            resolution_rate: round_to(percentage(resolved, total), 2),
            avg_resolution_time: round_to(average_resolution_days(reports), 1),
            total_users,
        },
        reports_by_status: shares(
            count_by(reports.iter().map(|r| r.status.as_str())),
            total,
            |status, count, percentage| StatusShare {
                status,
                count,
                percentage,
            },
        ),
        reports_by_category: shares(
            count_by(reports.iter().map(|r| r.category.as_str())),
            total,
            |category, count, percentage| CategoryShare {
                category,
                count,
                percentage,
            },
        ),
        department_performance: department_performance(reports),
        monthly_trends: monthly_trends(reports, now),
    }
}

/// Detailed analytics for reports already filtered to `range`.
#[must_use]
pub fn detailed(
    reports: &[complaint::Model],
    reporters: &HashMap<String, user::Model>,
    helper_counts: &HashMap<String, u64>,
    range: TimeRange,
) -> DetailedAnalytics {
    let total = reports.len() as u64;
    let resolved = count_status(reports, ComplaintStatus::Resolved);

    let mut priority: BTreeMap<String, u64> = BTreeMap::new();
    let mut category: BTreeMap<String, u64> = BTreeMap::new();
    let mut per_reporter: HashMap<&str, u64> = HashMap::new();
    for report in reports {
        *priority.entry(report.priority.as_str().to_string()).or_default() += 1;
        *category.entry(report.category.clone()).or_default() += 1;
        *per_reporter.entry(report.reported_by_id.as_str()).or_default() += 1;
    }

    let mut top_reporters: Vec<TopReporter> = per_reporter
        .into_iter()
        .filter_map(|(id, count)| {
            reporters.get(id).map(|u| TopReporter {
                name: u.name.clone(),
                email: u.email.clone(),
                count,
            })
        })
        .collect();
    top_reporters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.email.cmp(&b.email)));
    top_reporters.truncate(TOP_REPORTERS);

    let rows = reports
        .iter()
        .map(|r| DetailedReport {
            id: r.id.clone(),
            complaint_id: r.complaint_code.clone(),
            title: r.title.clone(),
            category: r.category.clone(),
            priority: r.priority.as_str().to_string(),
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            reporter: reporters.get(&r.reported_by_id).map(|u| ReporterContact {
                name: u.name.clone(),
                email: u.email.clone(),
            }),
            helpers_count: helper_counts.get(&r.id).copied().unwrap_or(0),
            assigned_dept: r.assigned_dept.clone(),
        })
        .collect();

    DetailedAnalytics {
        time_range: range,
        summary: DetailedSummary {
            total_reports: total,
            resolved_reports: resolved,
            pending_reports: count_status(reports, ComplaintStatus::Pending),
            in_progress_reports: count_status(reports, ComplaintStatus::InProgress),
            resolution_rate: round_to(percentage(resolved, total), 2),
        },
        distributions: Distributions { priority, category },
        top_reporters,
        reports: rows,
    }
}

/// Analytics service.
#[derive(Clone)]
pub struct AnalyticsService {
    complaint_repo: ComplaintRepository,
    user_repo: UserRepository,
    helper_repo: ComplaintHelperRepository,
}

impl AnalyticsService {
    /// Create a new analytics service.
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

    /// Dashboard snapshot as of now.
    pub async fn dashboard(&self, caller: &Caller) -> AppResult<DashboardSnapshot> {
        caller.authorize(Operation::ViewAnalytics)?;
        let reports = self.complaint_repo.find_all().await?;
        Ok(dashboard(&reports, local_day_start(Local::now())))
    }

    /// Overview as of now.
    pub async fn overview(&self, caller: &Caller) -> AppResult<Overview> {
        caller.authorize(Operation::ViewAnalytics)?;
        let reports = self.complaint_repo.find_all().await?;
        let total_users = self.user_repo.count_non_admin().await?;
        Ok(overview(&reports, total_users, Utc::now()))
    }

    /// Detailed view over reports created within `range`.
    pub async fn detailed(&self, caller: &Caller, range: TimeRange) -> AppResult<DetailedAnalytics> {
        caller.authorize(Operation::ViewAnalytics)?;

        let reports = self
            .complaint_repo
            .find_created_between(range.start_date, range.end_date)
            .await?;

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
        let mut helper_counts: HashMap<String, u64> = HashMap::new();
        for helper in self.helper_repo.find_by_complaints(&report_ids).await? {
            *helper_counts.entry(helper.complaint_id).or_default() += 1;
        }

        Ok(detailed(&reports, &reporters, &helper_counts, range))
    }
}
