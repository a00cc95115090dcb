// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Accounting views over the bank ledger: balance snapshot and history.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Caller,
    error::ApiError,
    models::{BalanceSnapshot, BankTransaction, TxDirection},
    state::AppState,
};

/// Hard ceiling on the history page size.
pub const MAX_HISTORY_PAGE_SIZE: usize = 200;

const DEFAULT_HISTORY_PAGE_SIZE: usize = 20;

/// Query parameters for the ledger history endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Start of the time window (RFC 3339). Defaults to seven days ago.
    pub from: Option<DateTime<Utc>>,
    /// End of the time window (RFC 3339). Defaults to one day ahead.
    pub to: Option<DateTime<Utc>>,
    /// Filter by direction: `credit` or `debit`
    pub direction: Option<String>,
    /// 1-based page number
    #[param(default = 1)]
    pub page: Option<usize>,
    /// Page size, capped at 200
    #[param(default = 20)]
    pub size: Option<usize>,
}

/// One ledger entry as served to the accounting frontend.
///
/// The verbatim webhook payload and the ingestion timestamp stay internal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BankTransactionView {
    /// Bank-assigned reference id
    pub ref_id: String,
    /// Monitored account the transaction belongs to
    pub account_no: String,
    /// Counterparty account number, when the bank reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_account_no: Option<String>,
    /// Counterparty display name, when the bank reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_name: Option<String>,
    /// Credit or debit relative to the monitored account
    pub direction: TxDirection,
    /// Transferred amount, integral currency units
    pub amount: i64,
    /// Bank-reported running balance after this transaction
    pub balance: i64,
    /// Transfer description as it appears on the statement
    pub description: String,
    /// Transaction timestamp as reported by the bank
    pub tx_time: DateTime<Utc>,
}

impl From<BankTransaction> for BankTransactionView {
    fn from(tx: BankTransaction) -> Self {
        Self {
            ref_id: tx.ref_id,
            account_no: tx.account_no,
            counter_account_no: tx.counter_account_no,
            counter_name: tx.counter_name,
            direction: tx.direction,
            amount: tx.amount,
            balance: tx.balance,
            description: tx.description,
            tx_time: tx.tx_time,
        }
    }
}

/// One page of ledger history, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPageView {
    /// Entries on this page
    pub items: Vec<BankTransactionView>,
    /// 1-based page number
    pub page: usize,
    /// Requested page size
    pub size: usize,
    /// Total entries matching the window and filter
    pub total: u64,
}

/// Get the cached balance snapshot for the monitored bank account.
///
/// Serves from the snapshot cache when fresh; otherwise recomputes from the
/// latest ledger entry and refills the cache.
#[utoipa::path(
    get,
    path = "/accountant/bank/snapshot",
    tag = "Accounting",
    responses(
        (status = 200, description = "Current balance snapshot", body = BalanceSnapshot),
        (status = 401, description = "Missing or invalid account header")
    )
)]
pub async fn get_snapshot(
    Caller(_account): Caller,
    State(state): State<AppState>,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    if let Some(snapshot) = state.cache.get(&state.config.bank_account_no) {
        return Ok(Json(snapshot));
    }
    let snapshot = compute_snapshot(&state)?;
    state.cache.put(snapshot.clone());
    Ok(Json(snapshot))
}

/// Recompute the balance snapshot, bypassing the cache.
#[utoipa::path(
    post,
    path = "/accountant/bank/resync",
    tag = "Accounting",
    responses(
        (status = 200, description = "Freshly recomputed snapshot", body = BalanceSnapshot),
        (status = 401, description = "Missing or invalid account header")
    )
)]
pub async fn resync_snapshot(
    Caller(_account): Caller,
    State(state): State<AppState>,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    let snapshot = compute_snapshot(&state)?;
    state.cache.put(snapshot.clone());
    Ok(Json(snapshot))
}

/// Query paginated ledger history within a time window.
#[utoipa::path(
    get,
    path = "/accountant/bank/history",
    tag = "Accounting",
    params(HistoryQuery),
    responses(
        (status = 200, description = "One page of ledger history", body = HistoryPageView),
        (status = 400, description = "Invalid window or direction filter"),
        (status = 401, description = "Missing or invalid account header")
    )
)]
pub async fn get_history(
    Caller(_account): Caller,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPageView>, ApiError> {
    let now = Utc::now();
    let from = query.from.unwrap_or(now - Duration::days(7));
    let to = query.to.unwrap_or(now + Duration::days(1));
    if from > to {
        return Err(ApiError::bad_request("`from` must not be after `to`"));
    }

    let direction = match query.direction.as_deref() {
        None => None,
        Some(raw) => Some(TxDirection::parse_filter(raw).ok_or_else(|| {
            ApiError::bad_request(format!("unknown direction filter: {raw}"))
        })?),
    };

    let page = query.page.unwrap_or(1).max(1);
    let size = query
        .size
        .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE)
        .clamp(1, MAX_HISTORY_PAGE_SIZE);

    let history = state
        .db
        .history(from, to, direction, page, size)
        .map_err(|e| ApiError::internal(format!("failed to read bank ledger: {e}")))?;

    Ok(Json(HistoryPageView {
        items: history.items.into_iter().map(Into::into).collect(),
        page: history.page,
        size: history.size,
        total: history.total,
    }))
}

fn compute_snapshot(state: &AppState) -> Result<BalanceSnapshot, ApiError> {
    let account = &state.config.bank_account_no;
    let latest = state
        .db
        .latest_for_account(account)
        .map_err(|e| ApiError::internal(format!("failed to read bank ledger: {e}")))?;

    Ok(match latest {
        Some(tx) => BalanceSnapshot {
            account_no: account.clone(),
            balance: tx.balance,
            as_of: Some(tx.tx_time),
        },
        None => BalanceSnapshot::empty(account.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, MalformedPolicy};
    use crate::directory::StaticDirectory;
    use crate::models::AccountId;
    use crate::storage::BankDatabase;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            bank_account_no: "65609062003".to_string(),
            bank_name: "TPBank".to_string(),
            bank_short_code: "tpbank".to_string(),
            qr_account_name: "HR PAYROLL".to_string(),
            topup_code_prefix: "TOPUP".to_string(),
            topup_code_retry_budget: 5,
            webhook_malformed_policy: MalformedPolicy::Reject,
            snapshot_ttl: StdDuration::from_secs(30),
            employee_roster_file: None,
        };
        let db = BankDatabase::open(&config.database_path()).unwrap();
        let state = AppState::new(config, db, Arc::new(StaticDirectory::empty()));
        (state, dir)
    }

    fn caller() -> Caller {
        Caller(AccountId::from("accountant-1"))
    }

    fn ingest_event(
        state: &AppState,
        ref_id: &str,
        transfer_type: &str,
        amount: i64,
        accumulated: i64,
        at: DateTime<Utc>,
    ) {
        let body = serde_json::to_vec(&serde_json::json!({
            "id": ref_id,
            "gateway": "TPBank",
            "transactionDate": at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "accountNumber": "65609062003",
            "content": "salary transfer",
            "transferType": transfer_type,
            "transferAmount": amount,
            "accumulated": accumulated,
        }))
        .unwrap();
        state.engine.ingest(&body).unwrap();
    }

    #[tokio::test]
    async fn snapshot_for_an_unseen_account_is_zero() {
        let (state, _dir) = test_state();

        let Json(snapshot) = get_snapshot(caller(), State(state)).await.unwrap();

        assert_eq!(snapshot.account_no, "65609062003");
        assert_eq!(snapshot.balance, 0);
        assert!(snapshot.as_of.is_none());
    }

    #[tokio::test]
    async fn snapshot_tracks_ingested_transactions() {
        let (state, _dir) = test_state();
        let now = Utc::now();

        // Prime the cache with the empty snapshot, then ingest. The engine
        // invalidates the cache, so the next read must see the new balance.
        get_snapshot(caller(), State(state.clone())).await.unwrap();
        ingest_event(&state, "R1", "in", 500_000, 1_500_000, now);

        let Json(snapshot) = get_snapshot(caller(), State(state)).await.unwrap();
        assert_eq!(snapshot.balance, 1_500_000);
        assert!(snapshot.as_of.is_some());
    }

    #[tokio::test]
    async fn resync_replaces_a_stale_cache_entry() {
        let (state, _dir) = test_state();
        state.cache.put(BalanceSnapshot {
            account_no: "65609062003".to_string(),
            balance: 999,
            as_of: None,
        });

        let Json(snapshot) = resync_snapshot(caller(), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(snapshot.balance, 0);

        // The recomputed snapshot replaced the stale entry.
        let cached = state.cache.get("65609062003").unwrap();
        assert_eq!(cached.balance, 0);
    }

    #[tokio::test]
    async fn history_defaults_to_the_trailing_week() {
        let (state, _dir) = test_state();
        let now = Utc::now();
        ingest_event(&state, "R1", "in", 100, 100, now - Duration::hours(2));
        ingest_event(&state, "R2", "in", 200, 300, now - Duration::hours(1));
        ingest_event(&state, "R3", "in", 300, 600, now - Duration::days(30));

        let Json(page) = get_history(
            caller(),
            State(state),
            Query(HistoryQuery {
                from: None,
                to: None,
                direction: None,
                page: None,
                size: None,
            }),
        )
        .await
        .unwrap();

        // R3 falls outside the default window; newest entry comes first.
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].ref_id, "R2");
        assert_eq!(page.items[1].ref_id, "R1");
        assert_eq!(page.page, 1);
        assert_eq!(page.size, 20);
    }

    #[tokio::test]
    async fn history_filters_by_direction() {
        let (state, _dir) = test_state();
        let now = Utc::now();
        ingest_event(&state, "R1", "in", 100, 100, now - Duration::hours(2));
        ingest_event(&state, "R2", "out", 40, 60, now - Duration::hours(1));

        let Json(page) = get_history(
            caller(),
            State(state),
            Query(HistoryQuery {
                from: None,
                to: None,
                direction: Some("debit".to_string()),
                page: None,
                size: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].ref_id, "R2");
        assert_eq!(page.items[0].direction, TxDirection::Debit);
    }

    #[tokio::test]
    async fn history_rejects_an_unknown_direction() {
        let (state, _dir) = test_state();

        let err = get_history(
            caller(),
            State(state),
            Query(HistoryQuery {
                from: None,
                to: None,
                direction: Some("sideways".to_string()),
                page: None,
                size: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_rejects_an_inverted_window() {
        let (state, _dir) = test_state();
        let now = Utc::now();

        let err = get_history(
            caller(),
            State(state),
            Query(HistoryQuery {
                from: Some(now),
                to: Some(now - Duration::days(1)),
                direction: None,
                page: None,
                size: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_clamps_page_and_size() {
        let (state, _dir) = test_state();
        let now = Utc::now();
        ingest_event(&state, "R1", "in", 100, 100, now - Duration::hours(1));

        let Json(page) = get_history(
            caller(),
            State(state),
            Query(HistoryQuery {
                from: None,
                to: None,
                direction: None,
                page: Some(0),
                size: Some(5_000),
            }),
        )
        .await
        .unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.size, MAX_HISTORY_PAGE_SIZE);

        // Excess raw is never exposed through the view.
        let rendered = serde_json::to_value(&page.items[0]).unwrap();
        assert!(rendered.get("raw").is_none());
        assert!(rendered.get("ingested_at").is_none());
    }

    #[tokio::test]
    async fn history_paginates_newest_first() {
        let (state, _dir) = test_state();
        let now = Utc::now();
        for i in 0..5 {
            ingest_event(
                &state,
                &format!("R{i}"),
                "in",
                100,
                100 * (i + 1),
                now - Duration::minutes(10 - i),
            );
        }

        let Json(second_page) = get_history(
            caller(),
            State(state),
            Query(HistoryQuery {
                from: None,
                to: None,
                direction: None,
                page: Some(2),
                size: Some(2),
            }),
        )
        .await
        .unwrap();

        assert_eq!(second_page.total, 5);
        assert_eq!(second_page.items.len(), 2);
        // Newest first overall: page 1 held R4, R3.
        assert_eq!(second_page.items[0].ref_id, "R2");
        assert_eq!(second_page.items[1].ref_id, "R1");
    }
}
