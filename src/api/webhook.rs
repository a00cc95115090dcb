// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bank webhook ingestion endpoint.
//!
//! The bank gateway POSTs one JSON event per transaction. Deliveries are
//! at-least-once, so the handler answers replays with the same success shape
//! it gave the first delivery.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::MalformedPolicy,
    error::ApiError,
    reconcile::{IngestError, IngestOutcome},
    state::AppState,
};

/// Acknowledgement returned to the bank gateway.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Whether the delivery was fully processed
    pub success: bool,
    /// `recorded`, `already-processed`, or `quarantined`
    pub status: String,
    /// Bank reference id resolved from the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Topup code this credit settled, when one matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_code: Option<String>,
    /// Quarantine sequence assigned to an unprocessable payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_seq: Option<u64>,
}

impl WebhookAck {
    fn recorded(ref_id: String, matched_code: Option<String>) -> Self {
        Self {
            success: true,
            status: "recorded".to_string(),
            ref_id: Some(ref_id),
            matched_code,
            quarantine_seq: None,
        }
    }

    fn already_processed(ref_id: String) -> Self {
        Self {
            success: true,
            status: "already-processed".to_string(),
            ref_id: Some(ref_id),
            matched_code: None,
            quarantine_seq: None,
        }
    }

    fn quarantined(seq: u64) -> Self {
        Self {
            success: false,
            status: "quarantined".to_string(),
            ref_id: None,
            matched_code: None,
            quarantine_seq: Some(seq),
        }
    }
}

#[utoipa::path(
    post,
    path = "/webhooks/bank",
    tag = "Webhooks",
    request_body(content = String, description = "Raw bank gateway event JSON"),
    responses(
        (status = 201, description = "Transaction recorded", body = WebhookAck),
        (status = 200, description = "Replay of an already-recorded delivery", body = WebhookAck),
        (status = 202, description = "Malformed payload quarantined for review", body = WebhookAck),
        (status = 400, description = "Malformed payload rejected")
    )
)]
pub async fn receive_bank_event(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    match state.engine.ingest(&body) {
        Ok(IngestOutcome::Recorded {
            ref_id,
            matched_code,
        }) => Ok((
            StatusCode::CREATED,
            Json(WebhookAck::recorded(ref_id, matched_code)),
        )),
        Ok(IngestOutcome::AlreadyProcessed { ref_id }) => Ok((
            StatusCode::OK,
            Json(WebhookAck::already_processed(ref_id)),
        )),
        Err(IngestError::Malformed { reason, seq }) => {
            match state.config.webhook_malformed_policy {
                MalformedPolicy::Reject => Err(ApiError::bad_request(reason)),
                MalformedPolicy::Review => {
                    Ok((StatusCode::ACCEPTED, Json(WebhookAck::quarantined(seq))))
                }
            }
        }
        Err(IngestError::Storage(e)) => Err(ApiError::internal(format!(
            "failed to record bank transaction: {e}"
        ))),
    }
}
