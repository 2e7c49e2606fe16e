use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, TextExtractRequest, TextExtractResponse};
use crate::models::ExtractionOutcome;

/// Multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// `POST /api/extract`: multipart PDF upload → normalized analytes.
pub async fn extract(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionOutcome>, ApiError> {
    let mut file: Option<(Option<String>, Bytes)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            file = Some((content_type, bytes));
            break;
        }
    }

    let (content_type, bytes) = file.unzip();
    ctx.pipeline
        .validate_upload(content_type.flatten().as_deref(), bytes.as_deref())
        .map_err(|e| ApiError::from_pipeline(e, ctx.dev_mode))?;
    let Some(bytes) = bytes else {
        return Err(ApiError::bad_request("No file provided"));
    };

    tracing::info!(bytes = bytes.len(), "PDF upload accepted");
    let outcome = ctx
        .pipeline
        .process_pdf(Arc::from(&bytes[..]))
        .await
        .map_err(|e| ApiError::from_pipeline(e, ctx.dev_mode))?;
    Ok(Json(outcome))
}

/// `POST /api/test-extract`: run extraction on plain report text.
pub async fn extract_text(
    State(ctx): State<ApiContext>,
    payload: Result<Json<TextExtractRequest>, JsonRejection>,
) -> Result<Json<TextExtractResponse>, ApiError> {
    let Json(request) = payload?;
    let text = request.text.unwrap_or_default();
    let outcome = ctx
        .pipeline
        .process_text(&text)
        .await
        .map_err(|e| ApiError::from_pipeline(e, ctx.dev_mode))?;

    Ok(Json(TextExtractResponse {
        success: true,
        text_length: outcome.extraction_meta.text_length,
        extracted_data: outcome,
    }))
}
