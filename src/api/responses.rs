use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::core::fallback::{default_recommendations, StyleGroup};
use crate::models::analysis::AnalysisResponse;

#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub(crate) success: bool,
    pub(crate) data: Option<T>,
    pub(crate) error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

// Implement IntoResponse for ApiResponse
impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };

        (status, Json(self)).into_response()
    }
}

/// Body of the analyze endpoints: the pipeline response plus, on failure,
/// optional static suggestions.
#[derive(Serialize)]
pub(crate) struct AnalyzeReply {
    #[serde(flatten)]
    pub(crate) response: AnalysisResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fallback: Option<Vec<StyleGroup>>,
}

impl AnalyzeReply {
    pub(crate) fn new(response: AnalysisResponse, fallback_on_error: bool) -> Self {
        let fallback = (!response.success && fallback_on_error).then(default_recommendations);
        Self { response, fallback }
    }
}

impl IntoResponse for AnalyzeReply {
    fn into_response(self) -> Response {
        let status = match self.response.error_kind {
            Some(kind) => kind.status_code(),
            None if self.response.success => StatusCode::OK,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}
