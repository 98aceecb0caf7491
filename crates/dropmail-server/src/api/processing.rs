use axum::{
    extract::{Path, State},
    Extension, Json,
};
use dropmail_catalog::{ProcessSummary, ReconcileReport};

use crate::middleware::RequestId;

use super::{load_campaign, map_catalog_error, ApiError, ApiResponse, AppState};

/// POST /api/campaigns/{id}/process: runs the catalog pipeline and fans the
/// campaign out into recipient records and batches.
pub(super) async fn process_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<ProcessSummary>>, ApiError> {
    let summary = dropmail_catalog::process_campaign(
        &*state.store,
        &*state.blobs,
        &campaign_id,
        &state.process,
    )
    .await
    .map_err(|e| map_catalog_error(&req_id.0, &e))?;
    Ok(Json(ApiResponse::new(req_id.0, summary)))
}

/// POST /api/campaigns/{id}/reconcile
pub(super) async fn reconcile_batches(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<ReconcileReport>>, ApiError> {
    load_campaign(&state, &req_id.0, &campaign_id).await?;
    let report = dropmail_catalog::reconcile_batches(&*state.store, &campaign_id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;
    tracing::info!(
        campaign_id = %campaign_id,
        created = report.created.len(),
        existing = report.existing.len(),
        "batches reconciled"
    );
    Ok(Json(ApiResponse::new(req_id.0, report)))
}
