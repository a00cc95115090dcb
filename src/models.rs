// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! This module defines the records persisted by the bank ledger together
//! with the shared value types used across the API. All types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON handling
//! and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Bank transactions**: immutable ledger entries recorded from bank
//!   webhook deliveries, keyed by the bank-assigned reference id
//! - **Topups**: payment intents waiting to be matched by an incoming
//!   credit that carries the topup code
//! - **Balance snapshot**: the cached view of the latest bank-reported
//!   balance for an account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Account Id Type
// =============================================================================

/// Identifier of an account in the employee directory.
///
/// Topups reference accounts twice: the `owner` expected to pay the intent
/// and the `created_by` accountant who issued it. The directory service that
/// resolves these ids to people is a separate system; here the id is an
/// opaque string.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        AccountId(value)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        AccountId(value.to_string())
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

// =============================================================================
// Bank Transaction Models
// =============================================================================

/// Direction of a bank transaction relative to the monitored account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxDirection {
    /// Money arrived on the account
    Credit,
    /// Money left the account
    Debit,
}

impl TxDirection {
    /// Stable string form used in index values and query filters.
    pub fn as_str(self) -> &'static str {
        match self {
            TxDirection::Credit => "credit",
            TxDirection::Debit => "debit",
        }
    }

    /// Parse a query filter value, case-insensitively.
    pub fn parse_filter(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "credit" => Some(TxDirection::Credit),
            "debit" => Some(TxDirection::Debit),
            _ => None,
        }
    }
}

/// An immutable ledger entry recorded from a bank webhook delivery.
///
/// Entries are written exactly once, keyed by the bank-assigned reference
/// id. Amounts are integral units of the account currency; `balance` is the
/// running balance the bank reported together with the transaction, never a
/// locally computed sum.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BankTransaction {
    /// Bank-assigned reference id (idempotency key)
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
    /// Free-text transfer description (topup codes are embedded here)
    pub description: String,
    /// Transaction timestamp as reported by the bank
    pub tx_time: DateTime<Utc>,
    /// Verbatim webhook payload this entry was normalized from
    pub raw: String,
    /// When this service recorded the entry
    pub ingested_at: DateTime<Utc>,
}

// =============================================================================
// Topup Models
// =============================================================================

/// Lifecycle state of a topup payment intent.
///
/// The reconciliation engine performs exactly one transition,
/// `Pending` -> `Success`. `Expired` and `Canceled` are set by accounting
/// maintenance and are terminal like `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TopupStatus {
    /// Waiting for a matching bank credit
    Pending,
    /// Matched by a bank credit carrying the topup code
    Success,
    /// Lapsed without payment
    Expired,
    /// Withdrawn by an accountant
    Canceled,
}

impl Default for TopupStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TopupStatus {
    /// Terminal states never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TopupStatus::Pending)
    }
}

/// A topup payment intent.
///
/// Carries a unique uppercase code of the form `PREFIX-SUFFIX`; an incoming
/// bank credit whose description contains the code settles the intent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Topup {
    /// Unique identifier for this topup
    pub topup_id: String,
    /// Unique payment code embedded in the bank transfer description
    pub code: String,
    /// Account expected to pay this intent
    pub owner: AccountId,
    /// Account that created this intent
    pub created_by: AccountId,
    /// Requested amount, integral currency units
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
    /// Store-assigned monotonic sequence, used for most-recent-first ordering
    pub seq: u64,
}

impl Topup {
    /// Create a new pending topup. The store assigns `seq` when persisting.
    pub fn new_pending(
        code: String,
        owner: AccountId,
        created_by: AccountId,
        amount: i64,
        bank_account_no: String,
        description: Option<String>,
    ) -> Self {
        Self {
            topup_id: uuid::Uuid::new_v4().to_string(),
            code,
            owner,
            created_by,
            amount,
            bank_account_no,
            description,
            status: TopupStatus::Pending,
            matched_ref_id: None,
            completed_at: None,
            created_at: Utc::now(),
            seq: 0,
        }
    }

    /// Settle the intent with the matching bank transaction.
    ///
    /// The bank-reported amount overrides the requested amount when present;
    /// `None` keeps what was requested.
    pub fn mark_success(
        &mut self,
        ref_id: String,
        completed_at: DateTime<Utc>,
        amount: Option<i64>,
    ) {
        self.status = TopupStatus::Success;
        self.matched_ref_id = Some(ref_id);
        self.completed_at = Some(completed_at);
        if let Some(amount) = amount {
            self.amount = amount;
        }
    }
}

// =============================================================================
// Balance Snapshot
// =============================================================================

/// Cached view of the latest bank-reported balance for an account.
///
/// Derived from the most recent ledger entry; `as_of` is that entry's
/// transaction time. An account with no ledger entries yet reports a zero
/// balance with no timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Monitored bank account number
    pub account_no: String,
    /// Bank-reported running balance, integral currency units
    pub balance: i64,
    /// Transaction time of the ledger entry the balance was taken from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl BalanceSnapshot {
    /// Snapshot for an account the ledger has never seen.
    pub fn empty(account_no: impl Into<String>) -> Self {
        Self {
            account_no: account_no.into(),
            balance: 0,
            as_of: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_from_and_into_string() {
        let from_str: AccountId = "acc-1".into();
        assert_eq!(from_str.0, "acc-1");

        let from_string: AccountId = String::from("acc-2").into();
        assert_eq!(from_string.0, "acc-2");

        let to_string: String = AccountId("acc-3".into()).into();
        assert_eq!(to_string, "acc-3");
    }

    #[test]
    fn direction_filter_parsing() {
        assert_eq!(TxDirection::parse_filter("credit"), Some(TxDirection::Credit));
        assert_eq!(TxDirection::parse_filter("DEBIT"), Some(TxDirection::Debit));
        assert_eq!(TxDirection::parse_filter("sideways"), None);
        assert_eq!(TxDirection::Credit.as_str(), "credit");
    }

    #[test]
    fn new_pending_topup_defaults() {
        let topup = Topup::new_pending(
            "TOPUP-AB12CD".to_string(),
            "owner-1".into(),
            "accountant-1".into(),
            500_000,
            "65609062003".to_string(),
            None,
        );

        assert_eq!(topup.status, TopupStatus::Pending);
        assert!(topup.matched_ref_id.is_none());
        assert!(topup.completed_at.is_none());
        assert_eq!(topup.seq, 0);
        assert!(!topup.topup_id.is_empty());
    }

    #[test]
    fn mark_success_keeps_requested_amount_without_bank_amount() {
        let mut topup = Topup::new_pending(
            "TOPUP-XY34ZT".to_string(),
            "owner-1".into(),
            "accountant-1".into(),
            250_000,
            "65609062003".to_string(),
            None,
        );

        let now = Utc::now();
        topup.mark_success("R9".to_string(), now, None);
        assert_eq!(topup.status, TopupStatus::Success);
        assert_eq!(topup.matched_ref_id.as_deref(), Some("R9"));
        assert_eq!(topup.completed_at, Some(now));
        assert_eq!(topup.amount, 250_000);

        let mut overridden = topup.clone();
        overridden.status = TopupStatus::Pending;
        overridden.mark_success("R10".to_string(), now, Some(300_000));
        assert_eq!(overridden.amount, 300_000);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TopupStatus::Pending.is_terminal());
        assert!(TopupStatus::Success.is_terminal());
        assert!(TopupStatus::Expired.is_terminal());
        assert!(TopupStatus::Canceled.is_terminal());
    }
}
