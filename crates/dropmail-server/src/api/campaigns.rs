//! Campaign lifecycle handlers: list, create, get, update, delete.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use dropmail_core::{Campaign, CampaignStatus, TemplateConfig, TemplateInstance};
use dropmail_template::{default_config_with, STANDARD_TEMPLATE};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{load_campaign, map_store_error, ApiError, ApiResponse, AppState};

const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub(super) struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub template_config: TemplateConfig,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Merged over the current config.
    pub template_config: Option<TemplateConfig>,
    pub status: Option<CampaignStatus>,
}

fn validate_name(req_id: &str, raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("name must be 1-{MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_owned())
}

pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<Campaign>>>, ApiError> {
    let campaigns = state
        .store
        .list_campaigns()
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;
    Ok(Json(ApiResponse::new(req_id.0, campaigns)))
}

/// POST /api/campaigns: the new campaign starts as a draft with the default
/// template values, overridden by any supplied ones.
pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Campaign>>), ApiError> {
    let rid = &req_id.0;
    let name = validate_name(rid, &body.name)?;

    let campaign_id = Uuid::new_v4().to_string();
    let config = default_config_with(&body.template_config);
    let campaign = Campaign::new(&campaign_id, name, body.description.trim(), config.clone());

    state
        .store
        .create_campaign(&campaign)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    state
        .store
        .put_template(&TemplateInstance::new(&campaign_id, STANDARD_TEMPLATE, config))
        .await
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(campaign_id = %campaign_id, name = %campaign.name, "campaign created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, campaign)),
    ))
}

pub(super) async fn get_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<Campaign>>, ApiError> {
    let campaign = load_campaign(&state, &req_id.0, &campaign_id).await?;
    Ok(Json(ApiResponse::new(req_id.0, campaign)))
}

pub(super) async fn update_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Json(body): Json<UpdateCampaignRequest>,
) -> Result<Json<ApiResponse<Campaign>>, ApiError> {
    let rid = &req_id.0;
    let mut campaign = load_campaign(&state, rid, &campaign_id).await?;

    if let Some(name) = body.name.as_deref() {
        campaign.name = validate_name(rid, name)?;
    }
    if let Some(description) = body.description {
        campaign.description = description.trim().to_owned();
    }
    if let Some(status) = body.status {
        campaign.status = status;
    }
    if let Some(changes) = body.template_config.as_ref() {
        campaign.template_config.apply(changes);

        // Keep the instance the emails are rendered from in step.
        let template = state
            .store
            .get_template(&campaign_id)
            .await
            .map_err(|e| map_store_error(rid, &e))?;
        if let Some(mut instance) = template {
            instance.template_config.apply(changes);
            instance.last_modified = Utc::now();
            state
                .store
                .put_template(&instance)
                .await
                .map_err(|e| map_store_error(rid, &e))?;
        }
    }
    campaign.updated_at = Utc::now();

    state
        .store
        .update_campaign(&campaign)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    tracing::info!(campaign_id = %campaign_id, status = %campaign.status, "campaign updated");
    Ok(Json(ApiResponse::new(req_id.0, campaign)))
}

/// DELETE /api/campaigns/{id}: removes the campaign with its records,
/// batches, template instance and uploaded catalog. Refused while sending.
pub(super) async fn delete_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    if campaign.status == CampaignStatus::Sending {
        return Err(ApiError::new(
            rid,
            "conflict",
            "campaign is sending and cannot be deleted",
        ));
    }

    let records = state
        .store
        .delete_campaign_records(&campaign_id)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    let batches = state
        .store
        .delete_campaign_batches(&campaign_id)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    state
        .store
        .delete_template(&campaign_id)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    state
        .store
        .delete_campaign(&campaign_id)
        .await
        .map_err(|e| map_store_error(rid, &e))?;

    if let Some(key) = campaign.file_s3_key.as_deref() {
        if let Err(e) = state.blobs.delete_object(key).await {
            tracing::warn!(campaign_id = %campaign_id, key, error = %e, "failed to delete uploaded catalog");
        }
    }

    tracing::info!(campaign_id = %campaign_id, records, batches, "campaign deleted");
    Ok(StatusCode::NO_CONTENT)
}
