// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded bank ledger and topup database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `bank_transactions`: ref_id → serialized BankTransaction
//! - `bank_tx_time_index`: composite key (!timestamp|ref_id) → direction
//! - `bank_tx_account_index`: composite key (account|!timestamp|ref_id) → direction
//! - `topups`: topup_id → serialized Topup
//! - `topup_code_index`: composite key (CODE|seq) → topup_id
//! - `topup_owner_index`: composite key (account|!seq) → topup_id
//! - `topup_creator_index`: composite key (account|!seq) → topup_id
//! - `webhook_quarantine`: seq → serialized QuarantinedPayload
//! - `bank_meta`: key → value bytes (sequence counters)
//!
//! redb serializes write transactions, so the check-then-insert primitives in
//! this module are the serialization points for concurrent webhook delivery:
//! `insert_transaction_if_absent` admits exactly one writer per reference id
//! and `mark_success_if_pending` admits exactly one transition per topup.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::models::{BankTransaction, Topup, TopupStatus, TxDirection};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary ledger table: ref_id → serialized BankTransaction (JSON bytes).
const BANK_TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("bank_transactions");

/// Global time index: `!timestamp_be|ref_id` → direction ("credit"|"debit").
/// The inverted timestamp yields newest-first ordering on forward scans.
const TX_TIME_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("bank_tx_time_index");

/// Per-account time index: `account|!timestamp_be|ref_id` → direction.
const TX_ACCOUNT_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("bank_tx_account_index");

/// Primary topup table: topup_id → serialized Topup (JSON bytes).
const TOPUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("topups");

/// Code index: `CODE|seq_be` → topup_id. Ascending seq preserves creation
/// order, so the first entry under a code prefix is the oldest record.
const TOPUP_CODE_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("topup_code_index");

/// Owner index: `account|!seq_be` → topup_id (newest first).
const TOPUP_OWNER_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("topup_owner_index");

/// Creator index: `account|!seq_be` → topup_id (newest first).
const TOPUP_CREATOR_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("topup_creator_index");

/// Quarantined webhook payloads: `seq_be` → serialized QuarantinedPayload.
const WEBHOOK_QUARANTINE: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("webhook_quarantine");

/// Meta state: key → value bytes (e.g., "topup_seq" → u64 big-endian).
const BANK_META: TableDefinition<&str, &[u8]> = TableDefinition::new("bank_meta");

const TOPUP_SEQ_KEY: &str = "topup_seq";
const QUARANTINE_SEQ_KEY: &str = "quarantine_seq";
const TX_COUNT_KEY: &str = "tx_count";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BankDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("topup code already in use: {0}")]
    CodeCollision(String),
}

pub type BankDbResult<T> = Result<T, BankDbError>;

// =============================================================================
// Result Types
// =============================================================================

/// Outcome of an idempotent ledger insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// This call wrote the entry.
    Inserted,
    /// An entry with the same reference id already existed.
    Duplicate,
}

/// One page of ledger history, newest first.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub items: Vec<BankTransaction>,
    pub page: usize,
    pub size: usize,
    /// Total entries matching the range and direction filter.
    pub total: u64,
}

/// One page of topups, newest first.
#[derive(Debug, Clone)]
pub struct TopupPage {
    pub items: Vec<Topup>,
    pub page: usize,
    pub size: usize,
    pub total: u64,
}

/// A webhook payload that failed normalization, kept verbatim for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantinedPayload {
    pub seq: u64,
    pub received_at: DateTime<Utc>,
    pub error: String,
    pub raw: String,
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the global time index.
///
/// Format: `inverted_timestamp_be_bytes | ref_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_time_key(timestamp: i64, ref_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 1 + ref_id.len());
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(ref_id.as_bytes());
    key
}

/// Scan start covering every entry with tx_time at or before `timestamp`.
fn time_scan_start(timestamp: i64) -> Vec<u8> {
    (!timestamp as u64).to_be_bytes().to_vec()
}

/// Scan end past every entry with tx_time at or after `timestamp`.
fn time_scan_end(timestamp: i64) -> Vec<u8> {
    let mut end = (!timestamp as u64).to_be_bytes().to_vec();
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the ref_id from a global time index key (8 ts bytes + separator).
fn ref_id_from_time_key(key: &[u8]) -> Option<String> {
    if key.len() <= 9 {
        return None;
    }
    String::from_utf8(key[9..].to_vec()).ok()
}

/// Build a composite key for the per-account time index.
///
/// Format: `account | inverted_timestamp_be_bytes | ref_id`
fn make_account_time_key(account: &str, timestamp: i64, ref_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(account.len() + 1 + 8 + 1 + ref_id.len());
    key.extend_from_slice(account.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(ref_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all entries of one account.
fn make_account_prefix(account: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(account.len() + 1);
    prefix.extend_from_slice(account.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for an account range scan.
fn make_account_prefix_end(account: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(account.len() + 1 + 20);
    end.extend_from_slice(account.as_bytes());
    end.push(b'|');
    // Append enough 0xFF bytes to be past any valid key with this prefix
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Build a composite key for the code index. Codes are compared uppercase.
///
/// Format: `CODE | seq_be_bytes` (ascending seq, oldest record first)
fn make_code_key(code: &str, seq: u64) -> Vec<u8> {
    let code = code.to_uppercase();
    let mut key = Vec::with_capacity(code.len() + 1 + 8);
    key.extend_from_slice(code.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// Build a composite key for the owner/creator indexes.
///
/// Format: `account | inverted_seq_be_bytes` (newest record first)
fn make_party_key(account: &str, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(account.len() + 1 + 8);
    key.extend_from_slice(account.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!seq).to_be_bytes());
    key
}

// =============================================================================
// BankDatabase
// =============================================================================

/// Embedded ACID database for the bank ledger and topup intents.
pub struct BankDatabase {
    db: Database,
}

impl BankDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> BankDbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BANK_TRANSACTIONS)?;
            let _ = write_txn.open_table(TX_TIME_INDEX)?;
            let _ = write_txn.open_table(TX_ACCOUNT_INDEX)?;
            let _ = write_txn.open_table(TOPUPS)?;
            let _ = write_txn.open_table(TOPUP_CODE_INDEX)?;
            let _ = write_txn.open_table(TOPUP_OWNER_INDEX)?;
            let _ = write_txn.open_table(TOPUP_CREATOR_INDEX)?;
            let _ = write_txn.open_table(WEBHOOK_QUARANTINE)?;
            let _ = write_txn.open_table(BANK_META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Ledger operations
    // =========================================================================

    /// Insert a ledger entry unless one with the same reference id exists.
    ///
    /// The existence check and the insert run in one write transaction, so
    /// under concurrent delivery of the same reference id exactly one caller
    /// observes [`InsertOutcome::Inserted`].
    pub fn insert_transaction_if_absent(
        &self,
        tx: &BankTransaction,
    ) -> BankDbResult<InsertOutcome> {
        let json = serde_json::to_vec(tx)?;
        let timestamp = tx.tx_time.timestamp();

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut tx_table = write_txn.open_table(BANK_TRANSACTIONS)?;
            let exists = tx_table.get(tx.ref_id.as_str())?.is_some();
            if exists {
                InsertOutcome::Duplicate
            } else {
                tx_table.insert(tx.ref_id.as_str(), json.as_slice())?;

                let mut time_idx = write_txn.open_table(TX_TIME_INDEX)?;
                let time_key = make_time_key(timestamp, &tx.ref_id);
                time_idx.insert(time_key.as_slice(), tx.direction.as_str())?;

                let mut acct_idx = write_txn.open_table(TX_ACCOUNT_INDEX)?;
                let acct_key = make_account_time_key(&tx.account_no, timestamp, &tx.ref_id);
                acct_idx.insert(acct_key.as_slice(), tx.direction.as_str())?;

                let mut meta = write_txn.open_table(BANK_META)?;
                next_seq(&mut meta, TX_COUNT_KEY)?;

                InsertOutcome::Inserted
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Look up a single ledger entry by reference id.
    pub fn transaction_by_ref(&self, ref_id: &str) -> BankDbResult<Option<BankTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BANK_TRANSACTIONS)?;
        match table.get(ref_id)? {
            Some(value) => {
                let tx: BankTransaction = serde_json::from_slice(value.value())?;
                Ok(Some(tx))
            }
            None => Ok(None),
        }
    }

    /// Number of ledger entries ever recorded.
    pub fn ledger_count(&self) -> BankDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BANK_META)?;
        read_counter(&table, TX_COUNT_KEY)
    }

    /// The most recent ledger entry across all accounts.
    pub fn latest_transaction(&self) -> BankDbResult<Option<BankTransaction>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(TX_TIME_INDEX)?;
        let tx_table = read_txn.open_table(BANK_TRANSACTIONS)?;

        let first = idx.first()?;
        match first {
            Some((key, _direction)) => {
                self.fetch_by_index_ref(&tx_table, ref_id_from_time_key(key.value()))
            }
            None => Ok(None),
        }
    }

    /// The most recent ledger entry for one account.
    pub fn latest_for_account(&self, account: &str) -> BankDbResult<Option<BankTransaction>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(TX_ACCOUNT_INDEX)?;
        let tx_table = read_txn.open_table(BANK_TRANSACTIONS)?;

        let prefix = make_account_prefix(account);
        let prefix_end = make_account_prefix_end(account);
        let mut range = idx.range(prefix.as_slice()..prefix_end.as_slice())?;

        match range.next().transpose()? {
            Some((key, _direction)) => {
                self.fetch_by_index_ref(&tx_table, ref_id_from_account_key(key.value()))
            }
            None => Ok(None),
        }
    }

    /// Paginated, newest-first ledger history within a time range.
    ///
    /// `page` is 1-based; `total` counts every entry matching the range and
    /// direction filter, not just the returned page.
    pub fn history(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        direction: Option<TxDirection>,
        page: usize,
        size: usize,
    ) -> BankDbResult<HistoryPage> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(TX_TIME_INDEX)?;
        let tx_table = read_txn.open_table(BANK_TRANSACTIONS)?;

        let lower = time_scan_start(to.timestamp());
        let upper = time_scan_end(from.timestamp());

        let skip = page.saturating_sub(1).saturating_mul(size);
        let mut total = 0u64;
        let mut items = Vec::new();

        for entry in idx.range(lower.as_slice()..upper.as_slice())? {
            let entry = entry?;
            if let Some(want) = direction {
                if entry.1.value() != want.as_str() {
                    continue;
                }
            }
            let position = total as usize;
            total += 1;

            if position < skip || items.len() >= size {
                continue;
            }
            if let Some(ref_id) = ref_id_from_time_key(entry.0.value()) {
                if let Some(value) = tx_table.get(ref_id.as_str())? {
                    let tx: BankTransaction = serde_json::from_slice(value.value())?;
                    items.push(tx);
                }
            }
        }

        Ok(HistoryPage {
            items,
            page,
            size,
            total,
        })
    }

    fn fetch_by_index_ref(
        &self,
        tx_table: &impl ReadableTable<&'static str, &'static [u8]>,
        ref_id: Option<String>,
    ) -> BankDbResult<Option<BankTransaction>> {
        if let Some(ref_id) = ref_id {
            if let Some(value) = tx_table.get(ref_id.as_str())? {
                let tx: BankTransaction = serde_json::from_slice(value.value())?;
                return Ok(Some(tx));
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Topup operations
    // =========================================================================

    /// Persist a batch of topups in one write transaction.
    ///
    /// Codes are checked for uniqueness (case-insensitive, including within
    /// the batch) before each insert; a collision aborts the whole batch with
    /// [`BankDbError::CodeCollision`] so no partial batch is ever committed.
    /// Store-assigned sequence numbers are filled into the returned records.
    pub fn create_topups(&self, mut topups: Vec<Topup>) -> BankDbResult<Vec<Topup>> {
        let write_txn = self.db.begin_write()?;
        {
            let mut topup_table = write_txn.open_table(TOPUPS)?;
            let mut code_idx = write_txn.open_table(TOPUP_CODE_INDEX)?;
            let mut owner_idx = write_txn.open_table(TOPUP_OWNER_INDEX)?;
            let mut creator_idx = write_txn.open_table(TOPUP_CREATOR_INDEX)?;
            let mut meta = write_txn.open_table(BANK_META)?;

            for topup in topups.iter_mut() {
                let prefix = make_code_prefix(&topup.code);
                let prefix_end = make_code_prefix_end(&topup.code);
                let in_use = {
                    let mut range = code_idx.range(prefix.as_slice()..prefix_end.as_slice())?;
                    range.next().transpose()?.is_some()
                };
                if in_use {
                    return Err(BankDbError::CodeCollision(topup.code.clone()));
                }

                let seq = next_seq(&mut meta, TOPUP_SEQ_KEY)?;
                topup.seq = seq;

                let json = serde_json::to_vec(topup)?;
                topup_table.insert(topup.topup_id.as_str(), json.as_slice())?;

                let code_key = make_code_key(&topup.code, seq);
                code_idx.insert(code_key.as_slice(), topup.topup_id.as_str())?;

                let owner_key = make_party_key(&topup.owner.0, seq);
                owner_idx.insert(owner_key.as_slice(), topup.topup_id.as_str())?;

                let creator_key = make_party_key(&topup.created_by.0, seq);
                creator_idx.insert(creator_key.as_slice(), topup.topup_id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(topups)
    }

    /// Look up one topup by id.
    pub fn topup_by_id(&self, topup_id: &str) -> BankDbResult<Option<Topup>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOPUPS)?;
        match table.get(topup_id)? {
            Some(value) => {
                let topup: Topup = serde_json::from_slice(value.value())?;
                Ok(Some(topup))
            }
            None => Ok(None),
        }
    }

    /// Conditionally settle a topup: succeeds only while the record is still
    /// PENDING, and reports the number of records changed (0 or 1).
    ///
    /// A result of 0 is a normal outcome: the record is unknown, already
    /// terminal, or a concurrent delivery won the race. `amount` overrides the
    /// requested amount when present (the bank-reported figure wins).
    pub fn mark_success_if_pending(
        &self,
        topup_id: &str,
        ref_id: &str,
        completed_at: DateTime<Utc>,
        amount: Option<i64>,
    ) -> BankDbResult<usize> {
        let write_txn = self.db.begin_write()?;
        let affected = {
            let mut table = write_txn.open_table(TOPUPS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = match table.get(topup_id)? {
                Some(value) => Some(value.value().to_vec()),
                None => None,
            };

            match existing_bytes {
                None => 0,
                Some(bytes) => {
                    let mut topup: Topup = serde_json::from_slice(&bytes)?;
                    if topup.status != TopupStatus::Pending {
                        0
                    } else {
                        topup.mark_success(ref_id.to_string(), completed_at, amount);
                        let json = serde_json::to_vec(&topup)?;
                        table.insert(topup_id, json.as_slice())?;
                        1
                    }
                }
            }
        };
        write_txn.commit()?;
        Ok(affected)
    }

    /// Look up the most recently created topup carrying a code,
    /// case-insensitively. Newest wins when historical duplicates exist.
    pub fn topup_by_code_latest(&self, code: &str) -> BankDbResult<Option<Topup>> {
        let read_txn = self.db.begin_read()?;
        let code_idx = read_txn.open_table(TOPUP_CODE_INDEX)?;
        let topup_table = read_txn.open_table(TOPUPS)?;

        let prefix = make_code_prefix(code);
        let prefix_end = make_code_prefix_end(code);

        let mut newest: Option<String> = None;
        for entry in code_idx.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            newest = Some(entry.1.value().to_string());
        }

        match newest {
            Some(topup_id) => match topup_table.get(topup_id.as_str())? {
                Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Look up the oldest still-PENDING topup carrying a code,
    /// case-insensitively. This is the record the reconciliation engine
    /// attempts to settle.
    pub fn oldest_pending_by_code(&self, code: &str) -> BankDbResult<Option<Topup>> {
        let read_txn = self.db.begin_read()?;
        let code_idx = read_txn.open_table(TOPUP_CODE_INDEX)?;
        let topup_table = read_txn.open_table(TOPUPS)?;

        let prefix = make_code_prefix(code);
        let prefix_end = make_code_prefix_end(code);

        for entry in code_idx.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let topup_id = entry.1.value();
            if let Some(value) = topup_table.get(topup_id)? {
                let topup: Topup = serde_json::from_slice(value.value())?;
                if topup.status == TopupStatus::Pending {
                    return Ok(Some(topup));
                }
            }
        }
        Ok(None)
    }

    /// Paginated, newest-first topups owed by an account.
    pub fn topups_by_owner(
        &self,
        account: &str,
        page: usize,
        size: usize,
    ) -> BankDbResult<TopupPage> {
        self.list_topups_indexed(TOPUP_OWNER_INDEX, account, page, size)
    }

    /// Paginated, newest-first topups created by an account.
    pub fn topups_by_creator(
        &self,
        account: &str,
        page: usize,
        size: usize,
    ) -> BankDbResult<TopupPage> {
        self.list_topups_indexed(TOPUP_CREATOR_INDEX, account, page, size)
    }

    fn list_topups_indexed(
        &self,
        index: TableDefinition<&[u8], &str>,
        account: &str,
        page: usize,
        size: usize,
    ) -> BankDbResult<TopupPage> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(index)?;
        let topup_table = read_txn.open_table(TOPUPS)?;

        let prefix = make_account_prefix(account);
        let prefix_end = make_account_prefix_end(account);

        let skip = page.saturating_sub(1).saturating_mul(size);
        let mut total = 0u64;
        let mut items = Vec::new();

        for entry in idx.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let position = total as usize;
            total += 1;

            if position < skip || items.len() >= size {
                continue;
            }
            if let Some(value) = topup_table.get(entry.1.value())? {
                let topup: Topup = serde_json::from_slice(value.value())?;
                items.push(topup);
            }
        }

        Ok(TopupPage {
            items,
            page,
            size,
            total,
        })
    }

    // =========================================================================
    // Webhook quarantine
    // =========================================================================

    /// Keep a payload that failed normalization, verbatim, for manual review.
    pub fn quarantine_payload(&self, raw: &[u8], error: &str) -> BankDbResult<u64> {
        let write_txn = self.db.begin_write()?;
        let seq = {
            let mut meta = write_txn.open_table(BANK_META)?;
            let seq = next_seq(&mut meta, QUARANTINE_SEQ_KEY)?;

            let record = QuarantinedPayload {
                seq,
                received_at: Utc::now(),
                error: error.to_string(),
                raw: String::from_utf8_lossy(raw).into_owned(),
            };
            let json = serde_json::to_vec(&record)?;

            let mut table = write_txn.open_table(WEBHOOK_QUARANTINE)?;
            let key = seq.to_be_bytes();
            table.insert(key.as_slice(), json.as_slice())?;
            seq
        };
        write_txn.commit()?;
        Ok(seq)
    }

    /// Number of payloads ever quarantined.
    pub fn quarantined_count(&self) -> BankDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BANK_META)?;
        read_counter(&table, QUARANTINE_SEQ_KEY)
    }
}

/// Extract the ref_id from a per-account index key (the tail after the
/// account separator and the 8 timestamp bytes).
fn ref_id_from_account_key(key: &[u8]) -> Option<String> {
    let sep = key.iter().position(|&b| b == b'|')?;
    let start = sep + 1 + 8 + 1;
    if key.len() <= start {
        return None;
    }
    String::from_utf8(key[start..].to_vec()).ok()
}

/// Build a prefix key for range scanning all index entries of a code.
fn make_code_prefix(code: &str) -> Vec<u8> {
    let code = code.to_uppercase();
    let mut prefix = Vec::with_capacity(code.len() + 1);
    prefix.extend_from_slice(code.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a code range scan.
fn make_code_prefix_end(code: &str) -> Vec<u8> {
    let code = code.to_uppercase();
    let mut end = Vec::with_capacity(code.len() + 1 + 9);
    end.extend_from_slice(code.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 9]);
    end
}

/// Increment and persist a big-endian u64 counter, returning the new value.
fn next_seq(meta: &mut redb::Table<'_, &'static str, &'static [u8]>, key: &str) -> BankDbResult<u64> {
    let current = read_counter_value(meta.get(key)?);
    let next = current + 1;
    let bytes = next.to_be_bytes();
    meta.insert(key, bytes.as_slice())?;
    Ok(next)
}

fn read_counter(
    meta: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> BankDbResult<u64> {
    Ok(read_counter_value(meta.get(key)?))
}

fn read_counter_value(value: Option<redb::AccessGuard<'_, &'static [u8]>>) -> u64 {
    match value {
        Some(v) => {
            let bytes = v.value();
            if bytes.len() >= 8 {
                u64::from_be_bytes(bytes[..8].try_into().unwrap())
            } else {
                0
            }
        }
        None => 0,
    }
}

// =============================================================================
// Tests
// =============================================================================
