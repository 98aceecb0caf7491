mod ai;
mod batches;
mod campaigns;
mod directory;
mod processing;
mod templates;
mod uploads;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use dropmail_ai::{AiError, Completion};
use dropmail_catalog::{CatalogError, ProcessOptions};
use dropmail_core::{BlobError, BlobStore, Campaign, Store, StoreError, TemplateInstance};
use dropmail_sender::{DispatchConfig, DispatchError, EmailProvider};
use dropmail_template::{validate_template, STANDARD_TEMPLATE};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

/// Base64 catalogs and images arrive in the JSON body.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    /// `None` when no LLM key is configured.
    pub llm: Option<Arc<dyn Completion>>,
    pub email: Arc<dyn EmailProvider>,
    pub dispatch: Arc<DispatchConfig>,
    pub process: Arc<ProcessOptions>,
    /// Only used by the health check.
    pub pool: Option<PgPool>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>, max: i64) -> usize {
    usize::try_from(limit.unwrap_or(50).clamp(1, max)).unwrap_or(1)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub(super) fn map_store_error(request_id: &str, error: &StoreError) -> ApiError {
    match error {
        StoreError::NotFound { .. } => ApiError::new(request_id, "not_found", error.to_string()),
        StoreError::Conflict(message) => ApiError::new(request_id, "conflict", message.clone()),
        StoreError::Invalid(_) | StoreError::Backend(_) => {
            tracing::error!(error = %error, "store operation failed");
            ApiError::new(request_id, "internal_error", "store operation failed")
        }
    }
}

pub(super) fn map_blob_error(request_id: &str, error: &BlobError) -> ApiError {
    match error {
        BlobError::NotFound(key) => ApiError::new(
            request_id,
            "bad_request",
            format!("uploaded file {key} no longer exists"),
        ),
        BlobError::Backend(_) => {
            tracing::error!(error = %error, "blob operation failed");
            ApiError::new(request_id, "internal_error", "file storage failed")
        }
    }
}

pub(super) fn map_catalog_error(request_id: &str, error: &CatalogError) -> ApiError {
    match error {
        CatalogError::CampaignNotFound(_) => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        CatalogError::CampaignBusy(_) => ApiError::new(request_id, "conflict", error.to_string()),
        CatalogError::NoCatalog(_) => ApiError::new(request_id, "bad_request", error.to_string()),
        CatalogError::Csv(_) | CatalogError::NotUtf8 | CatalogError::MissingColumns(_) => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        CatalogError::Store(e) => map_store_error(request_id, e),
        CatalogError::Blob(e) => map_blob_error(request_id, e),
    }
}

pub(super) fn map_ai_error(request_id: &str, error: &AiError) -> ApiError {
    match error {
        AiError::NotConfigured => {
            ApiError::new(request_id, "service_unavailable", error.to_string())
        }
        AiError::Rejected(message) => ApiError::new(request_id, "bad_request", message.clone()),
        AiError::Http(_)
        | AiError::Api { .. }
        | AiError::Deserialize { .. }
        | AiError::EmptyResponse
        | AiError::NoJson => {
            tracing::warn!(error = %error, "LLM request failed");
            ApiError::new(request_id, "upstream_error", "LLM request failed")
        }
    }
}

pub(super) fn map_dispatch_error(request_id: &str, error: &DispatchError) -> ApiError {
    match error {
        DispatchError::CampaignNotFound(_) => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        DispatchError::Template(_) => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        DispatchError::Store(e) => map_store_error(request_id, e),
    }
}

// ---------------------------------------------------------------------------
// Shared lookups
// ---------------------------------------------------------------------------

pub(super) async fn load_campaign(
    state: &AppState,
    request_id: &str,
    campaign_id: &str,
) -> Result<Campaign, ApiError> {
    state
        .store
        .get_campaign(campaign_id)
        .await
        .map_err(|e| map_store_error(request_id, &e))?
        .ok_or_else(|| {
            ApiError::new(
                request_id,
                "not_found",
                format!("campaign not found: {campaign_id}"),
            )
        })
}

/// The campaign's template instance, created from the campaign's config and
/// persisted if it does not exist yet.
pub(super) async fn load_template(
    state: &AppState,
    request_id: &str,
    campaign: &Campaign,
) -> Result<TemplateInstance, ApiError> {
    let existing = state
        .store
        .get_template(&campaign.campaign_id)
        .await
        .map_err(|e| map_store_error(request_id, &e))?;
    if let Some(instance) = existing {
        return Ok(instance);
    }

    let instance = TemplateInstance::new(
        &campaign.campaign_id,
        STANDARD_TEMPLATE,
        campaign.template_config.clone(),
    );
    state
        .store
        .put_template(&instance)
        .await
        .map_err(|e| map_store_error(request_id, &e))?;
    tracing::info!(campaign_id = %campaign.campaign_id, "created template instance");
    Ok(instance)
}

/// Persists the instance and mirrors its config onto the campaign.
pub(super) async fn save_template(
    state: &AppState,
    request_id: &str,
    mut campaign: Campaign,
    instance: &TemplateInstance,
) -> Result<(), ApiError> {
    validate_template(&instance.template_html_raw)
        .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))?;
    state
        .store
        .put_template(instance)
        .await
        .map_err(|e| map_store_error(request_id, &e))?;

    if campaign.template_config != instance.template_config {
        campaign.template_config = instance.template_config.clone();
        campaign.updated_at = Utc::now();
        state
            .store
            .update_campaign(&campaign)
            .await
            .map_err(|e| map_store_error(request_id, &e))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/api/campaigns/{id}",
            get(campaigns::get_campaign)
                .put(campaigns::update_campaign)
                .delete(campaigns::delete_campaign),
        )
        .route("/api/campaigns/{id}/upload", post(uploads::upload_catalog))
        .route(
            "/api/campaigns/{id}/upload-image",
            post(uploads::upload_image),
        )
        .route(
            "/api/campaigns/{id}/process",
            post(processing::process_campaign),
        )
        .route(
            "/api/campaigns/{id}/reconcile",
            post(processing::reconcile_batches),
        )
        .route("/api/campaigns/{id}/ai-generate", post(ai::generate))
        .route("/api/campaigns/{id}/ai-edit", post(ai::edit))
        .route("/api/campaigns/{id}/ai-chat", post(ai::chat))
        .route(
            "/api/campaigns/{id}/template-instance",
            get(templates::get_template_instance).post(templates::reset_template_instance),
        )
        .route("/api/campaigns/{id}/versions", get(templates::list_versions))
        .route(
            "/api/campaigns/{id}/restore-version",
            post(templates::restore_version),
        )
        .route(
            "/api/campaigns/{id}/preview-customer",
            get(templates::preview_customer),
        )
        .route("/api/campaigns/{id}/batches", get(batches::list_batches))
        .route(
            "/api/campaigns/{id}/batches/{batch_number}/emails",
            get(batches::list_batch_emails),
        )
        .route("/api/campaigns/{id}/send-batch", post(batches::send_batch))
        .route("/api/campaigns/{id}/send-test", post(batches::send_test))
        .route("/api/colleges", get(directory::list_colleges))
        .route("/api/recipients", get(directory::list_recipients))
        .route(
            "/api/test-users",
            get(directory::list_test_users).post(directory::upsert_test_user),
        )
        .route(
            "/api/test-users/{email}",
            delete(directory::delete_test_user),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                ))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "not_configured",
                },
                meta,
            }),
        );
    };

    match dropmail_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

async fn not_found(Extension(req_id): Extension<RequestId>) -> ApiError {
    ApiError::new(req_id.0, "not_found", "no such route")
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
