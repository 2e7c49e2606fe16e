//! API error types with `{ error, details? }` JSON bodies.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::analysis::AnalysisError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::processor::PipelineError;
use crate::store::StoreError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API-level errors with HTTP status mapping.
///
/// `details` is already gated: constructors that take `dev_mode` leave it
/// empty outside development, except for input validation messages.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{message}")]
    Unprocessable {
        message: String,
        details: Option<String>,
    },
    #[error("{message}")]
    BadGateway {
        message: String,
        details: Option<String>,
    },
    #[error("{0}")]
    GatewayTimeout(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn from_pipeline(err: PipelineError, dev_mode: bool) -> Self {
        let gate = |d: String| dev_mode.then_some(d);
        match err {
            PipelineError::NoFile => ApiError::bad_request("No file provided"),
            PipelineError::InvalidRequest(message) => ApiError::bad_request(message),
            PipelineError::UnsupportedType(_) => {
                ApiError::UnsupportedMediaType("Only PDF files are supported".into())
            }
            PipelineError::TooLarge { max, .. } => ApiError::PayloadTooLarge(format!(
                "File too large (max {}MB)",
                max / (1024 * 1024)
            )),
            PipelineError::DocumentTextEmpty { length } => ApiError::Unprocessable {
                message: "Could not extract readable text from the PDF".into(),
                details: gate(format!("extracted {length} characters")),
            },
            PipelineError::Document(e @ ExtractionError::PdfEncrypted) => ApiError::Unprocessable {
                message: "The PDF is password-protected".into(),
                details: gate(e.to_string()),
            },
            PipelineError::Document(e @ ExtractionError::PdfParsing(_)) => ApiError::Unprocessable {
                message: "The PDF could not be read".into(),
                details: gate(e.to_string()),
            },
            PipelineError::Document(other) => ApiError::Internal(other.to_string()),
            PipelineError::BackendUnavailable(cause) => ApiError::BadGateway {
                message: "Extraction service unavailable. Please try again.".into(),
                details: gate(cause),
            },
            PipelineError::ModelEmptyResponse { details } => ApiError::BadGateway {
                message: "No valid response from the extraction model".into(),
                details: details.and_then(gate),
            },
            PipelineError::Timeout(secs) => {
                ApiError::GatewayTimeout(format!("Extraction timed out after {secs}s"))
            }
        }
    }

    pub fn from_analysis(err: AnalysisError, dev_mode: bool) -> Self {
        match err {
            AnalysisError::Invalid(errors) => ApiError::BadRequest {
                message: "Invalid input data".into(),
                details: Some(errors.join("; ")),
            },
            AnalysisError::Model(e) => ApiError::BadGateway {
                message: "Analysis failed. Please try again.".into(),
                details: dev_mode.then(|| e.to_string()),
            },
            AnalysisError::Timeout(secs) => {
                ApiError::GatewayTimeout(format!("Analysis timed out after {secs}s"))
            }
            AnalysisError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                ErrorBody {
                    error: "Internal server error".into(),
                    details: None,
                }
            }
            ApiError::BadRequest { message, details }
            | ApiError::Unprocessable { message, details }
            | ApiError::BadGateway { message, details } => ErrorBody {
                error: message,
                details,
            },
            ApiError::UnsupportedMediaType(message)
            | ApiError::PayloadTooLarge(message)
            | ApiError::GatewayTimeout(message)
            | ApiError::NotFound(message) => ErrorBody {
                error: message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            message: "Invalid input data".into(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge("File too large".into());
        }
        ApiError::BadRequest {
            message: "Invalid multipart body".into(),
            details: Some(err.body_text()),
        }
    }
}
