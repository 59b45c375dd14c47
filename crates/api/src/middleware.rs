//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use civic_core::{
    AnalyticsService, AuthService, ExportService, HelperService, ReportService, UploadService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub report_service: ReportService,
    pub helper_service: HelperService,
    pub analytics_service: AnalyticsService,
    pub export_service: ExportService,
    pub upload_service: UploadService,
}

/// Authentication middleware.
///
/// Attaches the verified [`civic_core::Caller`] to the request. Requests without a
/// usable token pass through untouched; handlers that need a caller reject them.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.auth_service.keys().verify(token.trim()) {
            Ok(caller) => {
                req.extensions_mut().insert(caller);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
            }
        }
    }

    next.run(req).await
}
