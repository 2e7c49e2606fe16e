use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{AnalyzeResponse, ApiContext};
use crate::models::UploadRequest;

/// `POST /api/analyze`: validate reviewed entries, run the educational
/// analysis and store upload + report.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload?;
    let report = ctx
        .analyzer
        .analyze(request)
        .await
        .map_err(|e| ApiError::from_analysis(e, ctx.dev_mode))?;

    Ok(Json(AnalyzeResponse {
        success: true,
        upload_id: report.upload_id,
        report_id: report.id,
    }))
}
