//! Template instance handlers: get, reset, version history, restore, and the
//! per-recipient preview.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use dropmail_core::{TemplateConfig, TemplateInstance, VersionEntry};
use dropmail_sender::{preview_email, EmailPreview};
use dropmail_template::{default_config, STANDARD_TEMPLATE};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    load_campaign, load_template, map_dispatch_error, save_template, ApiError, ApiResponse,
    AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct VersionsResponse {
    current_config: TemplateConfig,
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RestoreVersionRequest {
    pub version_index: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct PreviewQuery {
    pub email: Option<String>,
}

pub(super) async fn get_template_instance(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<TemplateInstance>>, ApiError> {
    let rid = &req_id.0;
    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    let instance = load_template(&state, rid, &campaign).await?;
    Ok(Json(ApiResponse::new(req_id.0, instance)))
}

/// POST /api/campaigns/{id}/template-instance: starts over from the standard
/// skeleton and default values. History is discarded.
pub(super) async fn reset_template_instance(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<TemplateInstance>>, ApiError> {
    let rid = &req_id.0;
    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    let instance = TemplateInstance::new(&campaign_id, STANDARD_TEMPLATE, default_config());
    save_template(&state, rid, campaign, &instance).await?;
    tracing::info!(campaign_id = %campaign_id, "template instance reset");
    Ok(Json(ApiResponse::new(req_id.0, instance)))
}

pub(super) async fn list_versions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<VersionsResponse>>, ApiError> {
    let rid = &req_id.0;
    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    let instance = load_template(&state, rid, &campaign).await?;
    Ok(Json(ApiResponse::new(
        req_id.0,
        VersionsResponse {
            current_config: instance.template_config,
            versions: instance.version_history,
        },
    )))
}

pub(super) async fn restore_version(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Json(body): Json<RestoreVersionRequest>,
) -> Result<Json<ApiResponse<TemplateInstance>>, ApiError> {
    let rid = &req_id.0;
    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    let mut instance = load_template(&state, rid, &campaign).await?;

    instance
        .restore_version(body.version_index)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    save_template(&state, rid, campaign, &instance).await?;

    tracing::info!(campaign_id = %campaign_id, version = body.version_index, "template version restored");
    Ok(Json(ApiResponse::new(req_id.0, instance)))
}

/// GET /api/campaigns/{id}/preview-customer?email=
pub(super) async fn preview_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<ApiResponse<EmailPreview>>, ApiError> {
    let rid = &req_id.0;
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::new(rid, "validation_error", "email query parameter is required"))?;

    let preview = preview_email(&*state.store, &campaign_id, email)
        .await
        .map_err(|e| map_dispatch_error(rid, &e))?
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "not_found",
                format!("no recipient {email} in campaign {campaign_id}"),
            )
        })?;
    Ok(Json(ApiResponse::new(req_id.0, preview)))
}
