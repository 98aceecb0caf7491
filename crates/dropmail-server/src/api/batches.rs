//! Batch listing and dispatch handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use dropmail_core::{Batch, RecipientRecord};
use dropmail_sender::{DispatchOutcome, TestSendResult};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    load_campaign, map_dispatch_error, map_store_error, normalize_limit, ApiError, ApiResponse,
    AppState,
};

const MAX_BATCH_PAGE: i64 = 100;

#[derive(Debug, Deserialize)]
pub(super) struct BatchEmailsQuery {
    pub limit: Option<i64>,
    pub last_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct BatchEmailsPage {
    emails: Vec<RecipientRecord>,
    next_key: Option<String>,
    has_more: bool,
    count: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct SendBatchRequest {
    pub batch_number: u32,
    #[serde(default)]
    pub is_test: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct SendTestResponse {
    results: Vec<TestSendResult>,
    sent: usize,
}

pub(super) async fn list_batches(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Batch>>>, ApiError> {
    let rid = &req_id.0;
    load_campaign(&state, rid, &campaign_id).await?;
    let batches = state
        .store
        .list_batches(&campaign_id)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    Ok(Json(ApiResponse::new(req_id.0, batches)))
}

/// GET /api/campaigns/{id}/batches/{n}/emails?limit=&last_key=
pub(super) async fn list_batch_emails(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((campaign_id, batch_number)): Path<(String, u32)>,
    Query(query): Query<BatchEmailsQuery>,
) -> Result<Json<ApiResponse<BatchEmailsPage>>, ApiError> {
    let rid = &req_id.0;
    let limit = normalize_limit(query.limit, MAX_BATCH_PAGE);

    // One extra row tells us whether another page exists.
    let mut emails = state
        .store
        .list_batch_records(
            &campaign_id,
            batch_number,
            query.last_key.as_deref().filter(|k| !k.is_empty()),
            limit + 1,
        )
        .await
        .map_err(|e| map_store_error(rid, &e))?;

    let has_more = emails.len() > limit;
    emails.truncate(limit);
    let next_key = if has_more {
        emails.last().map(|r| r.record_id.clone())
    } else {
        None
    };

    Ok(Json(ApiResponse::new(
        req_id.0,
        BatchEmailsPage {
            count: emails.len(),
            emails,
            next_key,
            has_more,
        },
    )))
}

/// POST /api/campaigns/{id}/send-batch: runs the dispatch loop for one batch
/// and answers when it stops (done, or at the batch timeout).
pub(super) async fn send_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
    Json(body): Json<SendBatchRequest>,
) -> Result<Json<ApiResponse<DispatchOutcome>>, ApiError> {
    let rid = &req_id.0;
    if body.batch_number == 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "batch_number starts at 1",
        ));
    }

    let outcome = dropmail_sender::send_batch(
        &*state.store,
        &*state.email,
        &state.dispatch,
        &campaign_id,
        body.batch_number,
        body.is_test,
    )
    .await
    .map_err(|e| map_dispatch_error(rid, &e))?;
    Ok(Json(ApiResponse::new(req_id.0, outcome)))
}

/// POST /api/campaigns/{id}/send-test
pub(super) async fn send_test(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<SendTestResponse>>, ApiError> {
    let rid = &req_id.0;
    let results =
        dropmail_sender::send_test(&*state.store, &*state.email, &state.dispatch, &campaign_id)
            .await
            .map_err(|e| map_dispatch_error(rid, &e))?;
    let sent = results.iter().filter(|r| r.sent).count();
    Ok(Json(ApiResponse::new(
        req_id.0,
        SendTestResponse { results, sent },
    )))
}
