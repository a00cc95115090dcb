// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bank webhook payload normalization.
//!
//! The payment gateway delivers one JSON document per bank event. Field
//! coverage varies between banks, so every field is optional at the wire
//! level; normalization decides what is fatal (no reference id) and what
//! degrades gracefully (unparseable timestamp).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::models::{BankTransaction, TxDirection};

/// Timestamp formats observed across gateway deliveries.
const BANK_TIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%H:%M:%S %d-%m-%Y",
    "%d/%m/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload carries no reference id")]
    MissingRefId,
}

/// One bank event as delivered by the gateway webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankEventPayload {
    /// Gateway-assigned event id; preferred source of the reference id.
    #[serde(default)]
    pub id: String,
    /// Bank name as reported by the gateway.
    #[serde(default)]
    pub gateway: String,
    /// Transaction timestamp in one of several bank-dependent formats.
    #[serde(default)]
    pub transaction_date: String,
    /// Monitored account the event belongs to.
    #[serde(default)]
    pub account_number: String,
    /// Transfer description as it appears on the statement.
    #[serde(default)]
    pub content: String,
    /// "in" or "out"; anything else is treated as an incoming transfer.
    #[serde(default = "default_transfer_type")]
    pub transfer_type: String,
    /// Transferred amount, integral currency units.
    #[serde(default)]
    pub transfer_amount: i64,
    /// Running balance after the transfer, as reported by the bank.
    #[serde(default)]
    pub accumulated: i64,
    /// Bank reference code; fallback source of the reference id.
    #[serde(default)]
    pub reference_code: String,
    /// Alternate description field some gateways use instead of `content`.
    #[serde(default)]
    pub description: String,
    /// Topup code the gateway pre-detected in the description, if any.
    #[serde(default)]
    pub code: String,
}

fn default_transfer_type() -> String {
    "in".to_string()
}

impl BankEventPayload {
    /// Parse the raw webhook body.
    pub fn parse(raw: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// The idempotency key: the gateway event id, or the bank reference code
    /// when the gateway did not assign one.
    pub fn ref_id(&self) -> Option<&str> {
        non_blank(&self.id).or_else(|| non_blank(&self.reference_code))
    }

    /// Transfer direction relative to the monitored account.
    pub fn direction(&self) -> TxDirection {
        if self.transfer_type.eq_ignore_ascii_case("out") {
            TxDirection::Debit
        } else {
            TxDirection::Credit
        }
    }

    /// The statement description, preferring `content` over `description`.
    pub fn normalized_description(&self) -> &str {
        if non_blank(&self.content).is_some() {
            &self.content
        } else {
            &self.description
        }
    }

    /// Topup code pre-detected by the gateway, if present.
    pub fn detected_code(&self) -> Option<&str> {
        non_blank(&self.code)
    }

    /// Build the ledger entry candidate from this payload.
    ///
    /// Fails only when no reference id can be resolved. An unparseable
    /// timestamp falls back to the ingestion time with a warning; money
    /// fields are taken as delivered.
    pub fn normalize(&self, raw: &str) -> Result<BankTransaction, PayloadError> {
        let ref_id = self.ref_id().ok_or(PayloadError::MissingRefId)?.to_string();

        let tx_time = match parse_bank_time(&self.transaction_date) {
            Some(t) => t,
            None => {
                tracing::warn!(
                    ref_id = %ref_id,
                    transaction_date = %self.transaction_date,
                    "unparseable bank timestamp, falling back to ingestion time"
                );
                Utc::now()
            }
        };

        Ok(BankTransaction {
            ref_id,
            account_no: self.account_number.clone(),
            counter_account_no: None,
            counter_name: None,
            direction: self.direction(),
            amount: self.transfer_amount,
            balance: self.accumulated,
            description: self.normalized_description().to_string(),
            tx_time,
            raw: raw.to_string(),
            ingested_at: Utc::now(),
        })
    }
}

/// Try every known bank timestamp format, treating the result as UTC.
pub fn parse_bank_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in BANK_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
