// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Topup payment intent endpoints.
//!
//! Creation and listing require the account header; status lookup and the
//! payment QR are public so the payment page can be shared with the payer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Caller,
    directory::{EmployeeDirectory, EmployeeProfile},
    error::ApiError,
    models::{AccountId, Topup, TopupStatus},
    state::AppState,
    topup::{BulkMode, CreateTopupRequest, ListScope, PaymentQr, TopupError},
};

/// Query parameters for the topup listing endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// `owner` lists intents the caller must pay; anything else lists
    /// intents the caller issued
    pub scope: Option<String>,
    /// 1-based page number
    #[param(default = 1)]
    pub page: Option<usize>,
    /// Page size, capped at 100
    #[param(default = 20)]
    pub size: Option<usize>,
}

/// One topup as served to the frontend, with the owner resolved against the
/// employee directory.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopupView {
    /// Unique identifier for this topup
    pub topup_id: String,
    /// Unique payment code embedded in the bank transfer description
    pub code: String,
    /// Requested amount, or the bank-reported amount once settled
    pub amount: i64,
    /// Destination bank account for the transfer
    pub bank_account_no: String,
    /// Optional free-text note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current lifecycle state
    pub status: TopupStatus,
    /// Reference id of the bank transaction that settled this intent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_ref_id: Option<String>,
    /// When the intent was settled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the intent was created
    pub created_at: DateTime<Utc>,
    /// Resolved owner profile; carries only the account id when the
    /// directory does not know the account
    pub owner: EmployeeProfile,
    /// Account that created this intent
    pub created_by: AccountId,
}

impl TopupView {
    fn render(topup: Topup, directory: &dyn EmployeeDirectory) -> Self {
        let owner = directory
            .find(&topup.owner)
            .unwrap_or_else(|| EmployeeProfile::unresolved(topup.owner.clone()));
        Self {
            topup_id: topup.topup_id,
            code: topup.code,
            amount: topup.amount,
            bank_account_no: topup.bank_account_no,
            description: topup.description,
            status: topup.status,
            matched_ref_id: topup.matched_ref_id,
            completed_at: topup.completed_at,
            created_at: topup.created_at,
            owner,
            created_by: topup.created_by,
        }
    }
}

/// A committed bulk creation.
#[derive(Debug, Serialize, ToSchema)]
pub struct TopupBulkResponse {
    /// Which creation mode the request resolved to
    pub mode: BulkMode,
    /// Number of intents created
    pub count: usize,
    /// The created intents
    pub items: Vec<TopupView>,
}

/// One page of topups, most recent first.
#[derive(Debug, Serialize, ToSchema)]
pub struct TopupListResponse {
    /// Topups on this page
    pub items: Vec<TopupView>,
    /// 1-based page number
    pub page: usize,
    /// Requested page size
    pub size: usize,
    /// Total topups in the scope
    pub total: u64,
}

/// Create a batch of pending topups.
///
/// Per-employee mode issues one intent per employee (the whole roster when
/// no ids are given); copies mode issues N intents for a single owner. The
/// batch commits atomically.
#[utoipa::path(
    post,
    path = "/payments/topups/bulk",
    tag = "Payments",
    request_body = CreateTopupRequest,
    responses(
        (status = 201, description = "Batch created", body = TopupBulkResponse),
        (status = 401, description = "Missing or invalid account header"),
        (status = 404, description = "An employee id is not in the directory"),
        (status = 422, description = "Non-positive amount or empty roster"),
        (status = 503, description = "Code generation exhausted its retry budget")
    )
)]
pub async fn create_topups_bulk(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<CreateTopupRequest>,
) -> Result<(StatusCode, Json<TopupBulkResponse>), ApiError> {
    let batch = state
        .topups
        .create_bulk(&caller, &req)
        .map_err(map_topup_error)?;

    tracing::info!(
        mode = ?batch.mode,
        count = batch.topups.len(),
        created_by = %caller,
        "created topup batch"
    );

    let items: Vec<TopupView> = batch
        .topups
        .into_iter()
        .map(|t| TopupView::render(t, state.directory.as_ref()))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(TopupBulkResponse {
            mode: batch.mode,
            count: items.len(),
            items,
        }),
    ))
}

/// List topups the caller issued, or owns with `scope=owner`.
#[utoipa::path(
    get,
    path = "/payments/topups",
    tag = "Payments",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of topups", body = TopupListResponse),
        (status = 401, description = "Missing or invalid account header")
    )
)]
pub async fn list_topups(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TopupListResponse>, ApiError> {
    let scope = ListScope::parse(query.scope.as_deref());
    let page = query.page.unwrap_or(1);
    let size = query.size.unwrap_or(20);

    let result = state
        .topups
        .list(&caller, scope, page, size)
        .map_err(map_topup_error)?;

    Ok(Json(TopupListResponse {
        items: result
            .items
            .into_iter()
            .map(|t| TopupView::render(t, state.directory.as_ref()))
            .collect(),
        page: result.page,
        size: result.size,
        total: result.total,
    }))
}

/// Look up the latest topup carrying a code, case-insensitively.
#[utoipa::path(
    get,
    path = "/payments/topups/status/{code}",
    tag = "Payments",
    params(("code" = String, Path, description = "Topup code")),
    responses(
        (status = 200, description = "Latest topup carrying the code", body = TopupView),
        (status = 400, description = "Blank code"),
        (status = 404, description = "No topup carries the code")
    )
)]
pub async fn topup_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<TopupView>, ApiError> {
    let topup = state
        .topups
        .status_by_code(&code)
        .map_err(map_topup_error)?;
    Ok(Json(TopupView::render(topup, state.directory.as_ref())))
}

/// Render the payment-QR payload for a pending topup.
#[utoipa::path(
    get,
    path = "/payments/topups/{code}/qr",
    tag = "Payments",
    params(("code" = String, Path, description = "Topup code")),
    responses(
        (status = 200, description = "Payment QR payload", body = PaymentQr),
        (status = 400, description = "Blank code"),
        (status = 404, description = "No topup carries the code"),
        (status = 409, description = "The topup is no longer payable")
    )
)]
pub async fn topup_payment_qr(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PaymentQr>, ApiError> {
    let qr = state.topups.payment_qr(&code).map_err(map_topup_error)?;
    Ok(Json(qr))
}

fn map_topup_error(e: TopupError) -> ApiError {
    match e {
        TopupError::InvalidAmount(_) => ApiError::unprocessable("amount must be positive"),
        TopupError::InvalidCode => ApiError::bad_request("topup code must not be blank"),
        TopupError::UnknownEmployee(id) => {
            ApiError::not_found(format!("employee not found: {id}"))
        }
        TopupError::EmptyRoster => ApiError::unprocessable("employee roster is empty"),
        TopupError::UnknownCode(code) => {
            ApiError::not_found(format!("no topup found for code {code}"))
        }
        TopupError::NotPayable { code, .. } => {
            ApiError::conflict(format!("topup {code} is no longer payable"))
        }
        TopupError::GenerationExhausted => {
            ApiError::service_unavailable("could not allocate a unique topup code")
        }
        TopupError::Storage(e) => ApiError::internal(format!("failed to access topup store: {e}")),
    }
}
