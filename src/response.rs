use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::models::Strongest;

/// ApiResponse
///
/// The JSON envelope shared by every endpoint:
///
/// ```json
/// { "success": true, "message": "...", "data": { ... }, "total": 42, "page": 1 }
/// ```
///
/// Members that do not apply to a response are omitted rather than sent as `null`.
/// `T` is the type of the `data` payload; message-only responses use `ApiResponse<()>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strongest: Option<Strongest>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            total: None,
            page: None,
            count: None,
            strongest: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches listing metadata: the unpaginated match count and the page served.
    pub fn with_page(mut self, total: i64, page: u32) -> Self {
        self.total = Some(total);
        self.page = Some(page);
        self
    }

    pub fn with_comparison(mut self, count: usize, strongest: Strongest) -> Self {
        self.count = Some(count);
        self.strongest = Some(strongest);
        self
    }

    /// Pairs the envelope with a status code for handler return values.
    pub fn with_status(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

impl ApiResponse<()> {
    /// A successful response with a message and no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            total: None,
            page: None,
            count: None,
            strongest: None,
        }
    }

    /// A failure envelope. Used by `AppError`'s `IntoResponse`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::message(message)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
