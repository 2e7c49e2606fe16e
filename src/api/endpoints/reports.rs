use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::Report;
use crate::store::run_blocking;

/// `GET /api/report/:id`: a stored report. Malformed ids are simply not found.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let not_found = || ApiError::NotFound("Report not found".into());
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let report = run_blocking(&ctx.store, move |repo| repo.find_report(&id))
        .await?
        .ok_or_else(not_found)?;
    tracing::debug!(report_id = %report.id, "Report retrieved");
    Ok(Json(report))
}
