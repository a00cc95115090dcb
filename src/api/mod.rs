// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    directory::EmployeeProfile,
    models::{AccountId, BalanceSnapshot, TopupStatus, TxDirection},
    state::AppState,
    topup::{BulkMode, CreateTopupRequest, PaymentQr},
};

pub mod bank;
pub mod health;
pub mod topups;
pub mod webhook;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/webhooks/bank", post(webhook::receive_bank_event))
        .route("/accountant/bank/snapshot", get(bank::get_snapshot))
        .route("/accountant/bank/resync", post(bank::resync_snapshot))
        .route("/accountant/bank/history", get(bank::get_history))
        .route("/payments/topups/bulk", post(topups::create_topups_bulk))
        .route("/payments/topups", get(topups::list_topups))
        .route("/payments/topups/status/{code}", get(topups::topup_status))
        .route("/payments/topups/{code}/qr", get(topups::topup_payment_qr))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        webhook::receive_bank_event,
        bank::get_snapshot,
        bank::resync_snapshot,
        bank::get_history,
        topups::create_topups_bulk,
        topups::list_topups,
        topups::topup_status,
        topups::topup_payment_qr
    ),
    components(
        schemas(
            AccountId,
            BalanceSnapshot,
            TopupStatus,
            TxDirection,
            BulkMode,
            CreateTopupRequest,
            PaymentQr,
            EmployeeProfile,
            webhook::WebhookAck,
            bank::BankTransactionView,
            bank::HistoryPageView,
            topups::TopupView,
            topups::TopupBulkResponse,
            topups::TopupListResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Probes and store health"),
        (name = "Webhooks", description = "Bank gateway event ingestion"),
        (name = "Accounting", description = "Balance snapshot and ledger history"),
        (name = "Payments", description = "Topup intents, status and payment QR")
    )
)]
struct ApiDoc;
