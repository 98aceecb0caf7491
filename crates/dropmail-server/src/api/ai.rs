//! LLM-backed handlers: content generation, template edits and chat.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use dropmail_ai::{generate_content, AiError, GeneratedContent};
use dropmail_catalog::read_catalog;
use dropmail_core::{EditKind, TemplateConfig};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    load_campaign, load_template, map_ai_error, map_blob_error, map_catalog_error,
    save_template, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Deserialize)]
pub(super) struct EditRequest {
    pub request: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(super) struct GenerateResponse {
    content: GeneratedContent,
    template_config: TemplateConfig,
}

#[derive(Debug, Serialize)]
pub(super) struct EditResponse {
    processing_type: EditKind,
    changes: TemplateConfig,
    explanation: String,
    template_config: TemplateConfig,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatResponse {
    response: String,
    template_updated: bool,
    changes: Option<TemplateConfig>,
    template_config: TemplateConfig,
}

fn require_text<'a>(req_id: &str, field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must not be empty"),
        ));
    }
    Ok(value)
}

/// POST /api/campaigns/{id}/ai-generate: drafts campaign copy from the
/// uploaded catalog and applies it to the template.
pub(super) async fn generate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<GenerateResponse>>, ApiError> {
    let rid = &req_id.0;
    let client = state
        .llm
        .as_deref()
        .ok_or_else(|| map_ai_error(rid, &AiError::NotConfigured))?;

    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    let key = campaign.file_s3_key.clone().ok_or_else(|| {
        ApiError::new(
            rid,
            "bad_request",
            "upload a catalog before generating content",
        )
    })?;
    let bytes = state
        .blobs
        .get_object(&key)
        .await
        .map_err(|e| map_blob_error(rid, &e))?;
    let rows = read_catalog(&bytes).map_err(|e| map_catalog_error(rid, &e))?;

    let content = generate_content(client, &rows)
        .await
        .map_err(|e| map_ai_error(rid, &e))?;

    let mut instance = load_template(&state, rid, &campaign).await?;
    instance.apply_changes(
        "generate campaign content",
        content.template_changes(),
        EditKind::Generated,
    );
    save_template(&state, rid, campaign, &instance).await?;

    tracing::info!(
        campaign_id = %campaign_id,
        product_type = %content.product_type,
        "campaign content generated"
    );
    Ok(Json(ApiResponse::new(
        req_id.0,
        GenerateResponse {
            content,
            template_config: instance.template_config,
        },
    )))
}

/// POST /api/campaigns/{id}/ai-edit
pub(super) async fn edit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Json(body): Json<EditRequest>,
) -> Result<Json<ApiResponse<EditResponse>>, ApiError> {
    let rid = &req_id.0;
    let request = require_text(rid, "request", &body.request)?;
    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    let mut instance = load_template(&state, rid, &campaign).await?;

    let outcome = dropmail_ai::edit_template(state.llm.as_deref(), &mut instance, request)
        .await
        .map_err(|e| map_ai_error(rid, &e))?;
    save_template(&state, rid, campaign, &instance).await?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        EditResponse {
            processing_type: outcome.kind,
            changes: outcome.changes,
            explanation: outcome.explanation,
            template_config: instance.template_config,
        },
    )))
}

/// POST /api/campaigns/{id}/ai-chat: model failures become a reply, so this
/// only errors on lookups and persistence.
pub(super) async fn chat(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatResponse>>, ApiError> {
    let rid = &req_id.0;
    let message = require_text(rid, "message", &body.message)?;
    let campaign = load_campaign(&state, rid, &campaign_id).await?;
    let mut instance = load_template(&state, rid, &campaign).await?;

    let reply = dropmail_ai::chat(state.llm.as_deref(), &mut instance, message).await;
    save_template(&state, rid, campaign, &instance).await?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        ChatResponse {
            response: reply.response,
            template_updated: reply.edit.is_some(),
            changes: reply.edit.map(|e| e.changes),
            template_config: instance.template_config,
        },
    )))
}
