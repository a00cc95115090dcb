// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for the bank ledger and topup intents, backed by a
//! single embedded redb database, plus the in-process balance snapshot
//! cache.
//!
//! ## Consistency Model
//!
//! - redb serializes write transactions, so the check-then-write primitives
//!   (`insert_transaction_if_absent`, `mark_success_if_pending`,
//!   `create_topups`) are atomic with respect to concurrent callers
//! - ledger entries are immutable once written; topups are only rewritten by
//!   the conditional PENDING transition
//! - the snapshot cache is derived state and is safe to drop at any time
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/bank.redb
//!   bank_transactions      # ref_id -> BankTransaction
//!   bank_tx_time_index     # newest-first scan order
//!   bank_tx_account_index  # newest-first per account
//!   topups                 # topup_id -> Topup
//!   topup_code_index       # code lookups, creation order
//!   topup_owner_index      # owner listings, newest first
//!   topup_creator_index    # creator listings, newest first
//!   webhook_quarantine     # unparseable payloads, kept verbatim
//!   bank_meta              # sequence counters
//! ```

pub mod bank_database;
pub mod snapshot_cache;

pub use bank_database::{
    BankDatabase, BankDbError, BankDbResult, HistoryPage, InsertOutcome, QuarantinedPayload,
    TopupPage,
};
pub use snapshot_cache::SnapshotCache;
