//! Analytics endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use civic_common::{AppError, AppResult};
use civic_core::{DetailedAnalytics, Overview, TimeRange};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Optional window for the detailed view.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetailedQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DetailedQuery {
    fn into_range(self) -> AppResult<TimeRange> {
        Ok(TimeRange {
            start_date: self.start_date.as_deref().map(parse_bound).transpose()?,
            end_date: self.end_date.as_deref().map(parse_bound).transpose()?,
        })
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` read as UTC midnight.
fn parse_bound(value: &str) -> AppResult<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
        .map_err(|_| AppError::Validation(format!("Invalid date: {value}")))
}

async fn overview(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Overview>> {
    let overview = state.analytics_service.overview(&caller).await?;
    Ok(ApiResponse::ok(overview))
}

async fn detailed(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DetailedQuery>,
) -> AppResult<ApiResponse<DetailedAnalytics>> {
    let range = query.into_range()?;
    let report = state.analytics_service.detailed(&caller, range).await?;
    Ok(ApiResponse::ok(report))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/detailed", get(detailed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_bound_accepts_dates_and_timestamps() {
        assert_eq!(
            parse_bound("2025-01-31").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_bound("2025-01-31T10:00:00+05:30").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 4, 30, 0).unwrap()
        );
        assert!(matches!(
            parse_bound("last tuesday"),
            Err(AppError::Validation(_))
        ));
    }
}
