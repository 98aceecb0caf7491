//! Catalog and image uploads. Files arrive base64-encoded in a JSON body.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use dropmail_catalog::validate_catalog;
use dropmail_core::{catalog_key, image_key, CampaignStatus};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    load_campaign, map_blob_error, map_catalog_error, map_store_error, ApiError, ApiResponse,
    AppState,
};

#[derive(Debug, Deserialize)]
pub(super) struct UploadCatalogRequest {
    pub file_content: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadImageRequest {
    pub image_content: String,
    pub content_type: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct UploadCatalogResponse {
    file_s3_key: String,
    file_name: String,
    row_count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct UploadImageResponse {
    key: String,
    url: String,
}

/// Last path segment of a client-supplied file name.
fn sanitize_file_name(req_id: &str, raw: &str) -> Result<String, ApiError> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "file_name must name a file",
        ));
    }
    Ok(name.to_owned())
}

fn decode_base64(req_id: &str, field: &str, raw: &str) -> Result<Vec<u8>, ApiError> {
    // Data URLs carry a "data:<type>;base64," prefix.
    let payload = raw.split_once("base64,").map_or(raw, |(_, rest)| rest);
    STANDARD.decode(payload.trim()).map_err(|e| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("{field} is not valid base64: {e}"),
        )
    })
}

/// POST /api/campaigns/{id}/upload
pub(super) async fn upload_catalog(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Json(body): Json<UploadCatalogRequest>,
) -> Result<Json<ApiResponse<UploadCatalogResponse>>, ApiError> {
    let rid = &req_id.0;
    let mut campaign = load_campaign(&state, rid, &campaign_id).await?;
    if campaign.status == CampaignStatus::Sending {
        return Err(ApiError::new(
            rid,
            "conflict",
            "campaign is sending; upload a new catalog after it finishes",
        ));
    }

    let file_name = sanitize_file_name(rid, &body.file_name)?;
    let bytes = decode_base64(rid, "file_content", &body.file_content)?;
    let row_count = validate_catalog(&bytes).map_err(|e| map_catalog_error(rid, &e))?;

    let key = catalog_key(&campaign_id, &file_name);
    state
        .blobs
        .put_object(&key, bytes, "text/csv")
        .await
        .map_err(|e| map_blob_error(rid, &e))?;

    campaign.file_s3_key = Some(key.clone());
    campaign.file_name = Some(file_name.clone());
    campaign.updated_at = Utc::now();
    state
        .store
        .update_campaign(&campaign)
        .await
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(campaign_id = %campaign_id, key = %key, row_count, "catalog uploaded");
    Ok(Json(ApiResponse::new(
        req_id.0,
        UploadCatalogResponse {
            file_s3_key: key,
            file_name,
            row_count,
        },
    )))
}

/// POST /api/campaigns/{id}/upload-image
pub(super) async fn upload_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Json(body): Json<UploadImageRequest>,
) -> Result<Json<ApiResponse<UploadImageResponse>>, ApiError> {
    let rid = &req_id.0;
    load_campaign(&state, rid, &campaign_id).await?;

    if !body.content_type.starts_with("image/") {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("content_type must be an image type, got '{}'", body.content_type),
        ));
    }
    let file_name = sanitize_file_name(rid, &body.file_name)?;
    let bytes = decode_base64(rid, "image_content", &body.image_content)?;

    let key = image_key(&campaign_id, &file_name);
    state
        .blobs
        .put_object(&key, bytes, &body.content_type)
        .await
        .map_err(|e| map_blob_error(rid, &e))?;

    let url = state.blobs.public_url(&key);
    tracing::info!(campaign_id = %campaign_id, key = %key, "image uploaded");
    Ok(Json(ApiResponse::new(req_id.0, UploadImageResponse { key, url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_keeps_last_segment() {
        assert_eq!(
            sanitize_file_name("r", "../../etc/catalog.csv").unwrap(),
            "catalog.csv"
        );
        assert_eq!(sanitize_file_name("r", r"C:\exports\fall.csv").unwrap(), "fall.csv");
        assert!(sanitize_file_name("r", "uploads/").is_err());
        assert!(sanitize_file_name("r", "..").is_err());
    }

    #[test]
    fn base64_accepts_data_url_prefix() {
        let raw = format!("data:text/csv;base64,{}", STANDARD.encode("a,b\n"));
        assert_eq!(decode_base64("r", "file_content", &raw).unwrap(), b"a,b\n");
        assert!(decode_base64("r", "file_content", "***").is_err());
    }
}
