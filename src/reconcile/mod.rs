// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Reconciliation Engine
//!
//! Turns raw bank webhook deliveries into immutable ledger entries and
//! settles pending topups whose payment code appears in the transfer.
//!
//! ## Pipeline
//!
//! 1. **Parse + normalize** (`payload`): decode the gateway JSON, resolve the
//!    bank reference id, direction, and timestamp. Payloads that cannot be
//!    normalized are written to the quarantine table before the error is
//!    returned, so no delivery is ever lost.
//! 2. **Record**: insert the entry keyed by reference id inside one write
//!    transaction; replays of the same delivery become no-op successes.
//! 3. **Match** (`code`): for credits, resolve a topup code (the
//!    gateway-detected field first, then a description scan) and settle the
//!    oldest pending topup carrying it through a conditional update that
//!    reports rows changed.
//!
//! ## Concurrency
//!
//! Both the record and the settle steps run as single redb write
//! transactions. The single-writer property makes exactly one concurrent
//! inserter win per reference id and exactly one credit settle a given
//! topup; losers observe the duplicate or the already-settled row.

pub mod code;
pub mod payload;

use std::sync::Arc;

use crate::models::{BankTransaction, TxDirection};
use crate::storage::{BankDatabase, BankDbError, InsertOutcome, SnapshotCache};

use payload::{BankEventPayload, PayloadError};

/// Reconciliation engine shared across webhook handlers.
pub struct ReconcileEngine {
    db: Arc<BankDatabase>,
    cache: Arc<SnapshotCache>,
    code_prefix: String,
}

/// Result of ingesting one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new ledger entry was recorded. `matched_code` carries the topup
    /// code this credit settled, when one matched.
    Recorded {
        ref_id: String,
        matched_code: Option<String>,
    },
    /// An entry with the same bank reference id already exists.
    AlreadyProcessed { ref_id: String },
}

impl ReconcileEngine {
    /// Create an engine over the shared store and snapshot cache.
    ///
    /// `code_prefix` is the configured topup code prefix scanned for in
    /// transfer descriptions.
    pub fn new(
        db: Arc<BankDatabase>,
        cache: Arc<SnapshotCache>,
        code_prefix: impl Into<String>,
    ) -> Self {
        Self {
            db,
            cache,
            code_prefix: code_prefix.into(),
        }
    }

    /// Ingest one raw webhook delivery.
    ///
    /// Replays of an already-recorded reference id return
    /// [`IngestOutcome::AlreadyProcessed`] without touching the ledger.
    /// Malformed payloads are quarantined and reported as
    /// [`IngestError::Malformed`].
    pub fn ingest(&self, raw: &[u8]) -> Result<IngestOutcome, IngestError> {
        let payload = match BankEventPayload::parse(raw) {
            Ok(payload) => payload,
            Err(err) => return self.quarantine(raw, err),
        };

        let tx = match payload.normalize(&String::from_utf8_lossy(raw)) {
            Ok(tx) => tx,
            Err(err) => return self.quarantine(raw, err),
        };

        if let InsertOutcome::Duplicate = self.db.insert_transaction_if_absent(&tx)? {
            tracing::debug!(ref_id = %tx.ref_id, "Bank webhook replay, ledger entry exists");
            return Ok(IngestOutcome::AlreadyProcessed { ref_id: tx.ref_id });
        }

        self.cache.invalidate(&tx.account_no);

        // Only incoming money can settle a topup.
        let matched_code = if tx.direction == TxDirection::Credit {
            self.settle_matching_topup(&tx, payload.detected_code())?
        } else {
            None
        };

        tracing::info!(
            ref_id = %tx.ref_id,
            account = %tx.account_no,
            amount = tx.amount,
            direction = tx.direction.as_str(),
            matched = matched_code.is_some(),
            "Bank transaction recorded"
        );

        Ok(IngestOutcome::Recorded {
            ref_id: tx.ref_id,
            matched_code,
        })
    }

    /// Resolve a code for the credit and settle the oldest pending topup
    /// carrying it. Returns the settled code, or `None` when nothing
    /// matched.
    fn settle_matching_topup(
        &self,
        tx: &BankTransaction,
        detected: Option<&str>,
    ) -> Result<Option<String>, IngestError> {
        let code = match detected {
            Some(code) => code.to_ascii_uppercase(),
            None => match code::extract_code(&tx.description, &self.code_prefix) {
                Some(code) => code,
                None => return Ok(None),
            },
        };

        let topup = match self.db.oldest_pending_by_code(&code)? {
            Some(topup) => topup,
            None => {
                tracing::debug!(ref_id = %tx.ref_id, code = %code, "No pending topup for code");
                return Ok(None);
            }
        };

        // The bank-reported amount is authoritative when it is positive.
        let amount = (tx.amount > 0).then_some(tx.amount);

        let affected =
            self.db
                .mark_success_if_pending(&topup.topup_id, &tx.ref_id, tx.tx_time, amount)?;
        if affected == 0 {
            // A concurrent credit settled it, or an accountant closed it first.
            tracing::debug!(
                topup_id = %topup.topup_id,
                code = %code,
                "Topup no longer pending, credit recorded without match"
            );
            return Ok(None);
        }

        tracing::info!(
            topup_id = %topup.topup_id,
            code = %code,
            ref_id = %tx.ref_id,
            amount = tx.amount,
            "Topup settled by bank credit"
        );
        Ok(Some(code))
    }

    /// Retain an unprocessable payload in the quarantine table, then report
    /// it as malformed.
    fn quarantine(&self, raw: &[u8], err: PayloadError) -> Result<IngestOutcome, IngestError> {
        let reason = err.to_string();
        let seq = self.db.quarantine_payload(raw, &reason)?;
        tracing::warn!(seq, reason = %reason, "Quarantined malformed bank payload");
        Err(IngestError::Malformed { reason, seq })
    }
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The payload could not be normalized. The raw bytes were retained in
    /// the quarantine table under `seq` before this error was raised.
    #[error("malformed bank payload: {reason}")]
    Malformed { reason: String, seq: u64 },

    #[error("storage error: {0}")]
    Storage(#[from] BankDbError),
}
