//! Institution directory, recipient list and test-account handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use dropmail_core::{is_valid_code, InstitutionInfo, Recipient, TestAccount};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState};

const MAX_RECIPIENT_PAGE: i64 = 200;

#[derive(Debug, Deserialize)]
pub(super) struct RecipientsQuery {
    pub limit: Option<i64>,
    pub last_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RecipientsPage {
    recipients: Vec<Recipient>,
    next_key: Option<String>,
    count: usize,
    source_counts: BTreeMap<String, u64>,
}

pub(super) async fn list_colleges(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<InstitutionInfo>>>, ApiError> {
    let institutions = state
        .store
        .list_institutions()
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;
    Ok(Json(ApiResponse::new(req_id.0, institutions)))
}

pub(super) async fn list_recipients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RecipientsQuery>,
) -> Result<Json<ApiResponse<RecipientsPage>>, ApiError> {
    let page = state
        .store
        .list_recipients(
            query.last_key.as_deref().filter(|k| !k.is_empty()),
            normalize_limit(query.limit, MAX_RECIPIENT_PAGE),
        )
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        RecipientsPage {
            count: page.recipients.len(),
            recipients: page.recipients,
            next_key: page.next_key,
            source_counts: page.source_counts,
        },
    )))
}

pub(super) async fn list_test_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<TestAccount>>>, ApiError> {
    let accounts = state
        .store
        .list_test_accounts()
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;
    Ok(Json(ApiResponse::new(req_id.0, accounts)))
}

/// POST /api/test-users: creates or replaces the account with this email.
pub(super) async fn upsert_test_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(mut account): Json<TestAccount>,
) -> Result<Json<ApiResponse<TestAccount>>, ApiError> {
    let rid = &req_id.0;
    account.email = account.email.trim().to_owned();
    account.school_code = account.school_code.trim().to_ascii_uppercase();

    if !account.email.contains('@') {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("'{}' is not an email address", account.email),
        ));
    }
    if !is_valid_code(&account.school_code) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("school_code must be letters only, got '{}'", account.school_code),
        ));
    }

    state
        .store
        .upsert_test_account(&account)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    tracing::info!(email = %account.email, active = account.active, "test account saved");
    Ok(Json(ApiResponse::new(req_id.0, account)))
}

pub(super) async fn delete_test_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let removed = state
        .store
        .delete_test_account(&email)
        .await
        .map_err(|e| map_store_error(rid, &e))?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            rid,
            "not_found",
            format!("test account not found: {email}"),
        ))
    }
}
