//! API response types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use civic_core::ExportFile;
use serde::Serialize;

/// JSON success response with an explicit status.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK.
    pub const fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    /// 201 Created.
    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.data)).into_response()
    }
}

/// `{"success": true, ...}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct Ack<T: Serialize = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(flatten)]
    pub extra: Option<T>,
}

impl Ack {
    /// Bare success.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            message: None,
            extra: None,
        }
    }
}

impl<T: Serialize> Ack<T> {
    /// Success with a message and extra fields.
    pub const fn with(message: &'static str, extra: Option<T>) -> Self {
        Self {
            success: true,
            message: Some(message),
            extra,
        }
    }
}

/// File download.
#[derive(Debug)]
pub struct Attachment(pub ExportFile);

impl IntoResponse for Attachment {
    fn into_response(self) -> Response {
        let file = self.0;
        let disposition = format!("attachment; filename=\"{}\"", file.filename);

        let mut response = file.body.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(file.content_type),
        );
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        response
    }
}
