// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Topup Intent Manager
//!
//! Issues pending topup payment intents, each carrying a unique uppercase
//! code that an employee puts in their bank transfer description. The
//! reconciliation engine settles an intent when a credit carrying its code
//! arrives.
//!
//! ## Creation modes
//!
//! One bulk request covers both shapes:
//!
//! - **Per-employee**: one intent per distinct employee id, falling back to
//!   the whole directory roster when none are named. Codes embed an employee
//!   fragment ahead of the random tail.
//! - **Copies-for-one**: N intents for a single owner, the named employee or
//!   the caller.
//!
//! A code collision regenerates the whole candidate batch under a bounded
//! retry budget; the store writes a batch in one transaction, so no partial
//! batch is ever visible.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::directory::EmployeeDirectory;
use crate::models::{AccountId, Topup, TopupStatus};
use crate::storage::{BankDatabase, BankDbError, TopupPage};

/// Hard cap on topup listing page size.
pub const MAX_PAGE_SIZE: usize = 100;

// =============================================================================
// Settings
// =============================================================================

/// Knobs for code generation and payment-QR rendering.
#[derive(Debug, Clone)]
pub struct TopupSettings {
    /// Uppercase prefix carried by every issued code.
    pub code_prefix: String,
    /// Fresh-candidate attempts before code generation gives up.
    pub retry_budget: u32,
    /// Bank short code used in the rendered QR image URL.
    pub bank_short_code: String,
    /// Account holder name displayed on the payment QR.
    pub qr_account_name: String,
}

impl Default for TopupSettings {
    fn default() -> Self {
        Self {
            code_prefix: "TOPUP".to_string(),
            retry_budget: 5,
            bank_short_code: "tpbank".to_string(),
            qr_account_name: "HR PAYROLL".to_string(),
        }
    }
}

// =============================================================================
// Request / Result Shapes
// =============================================================================

/// One request shape for both bulk creation modes.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTopupRequest {
    /// Requested amount, integral currency units, must be positive
    pub amount: i64,
    /// Destination bank account for the transfer
    pub bank_account_no: String,
    /// Optional note copied onto every created intent
    #[serde(default)]
    pub description: Option<String>,
    /// One intent per employee (true) or N copies for one owner (false)
    #[serde(default = "default_per_employee")]
    pub per_employee: bool,
    /// Explicit employee account ids for per-employee mode
    #[serde(default)]
    pub employee_ids: Vec<String>,
    /// Target owner for copies mode, defaults to the caller
    #[serde(default)]
    pub employee_id: Option<String>,
    /// Copy count for copies mode, minimum 1
    #[serde(default = "default_copies")]
    pub copies: u32,
}

fn default_per_employee() -> bool {
    true
}

fn default_copies() -> u32 {
    1
}

/// Which creation mode a bulk request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkMode {
    PerEmployee,
    CopiesForOne,
}

/// A committed bulk creation.
#[derive(Debug)]
pub struct CreatedBatch {
    pub mode: BulkMode,
    pub topups: Vec<Topup>,
}

/// Listing scope relative to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    /// Topups the caller is expected to pay
    Owner,
    /// Topups the caller issued
    #[default]
    Created,
}

impl ListScope {
    /// Parse a query value; anything unrecognized falls back to `Created`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("owner") => ListScope::Owner,
            _ => ListScope::Created,
        }
    }
}

/// Structured payment-QR payload for a pending topup.
///
/// `image_url` points at the external vietqr.io renderer; everything needed
/// to redraw the QR locally is carried alongside it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentQr {
    /// Topup code the transfer must carry
    pub code: String,
    /// Amount the QR pre-fills, integral currency units
    pub amount: i64,
    /// Receiving bank's short code
    pub bank_short_code: String,
    /// Receiving account number
    pub bank_account_no: String,
    /// Transfer description pre-filled into the QR (the code itself)
    pub add_info: String,
    /// Receiving account holder name
    pub account_name: String,
    /// Rendered QR image URL
    pub image_url: String,
}

// =============================================================================
// Manager
// =============================================================================

/// Topup intent manager shared across payment handlers.
pub struct TopupManager {
    db: Arc<BankDatabase>,
    directory: Arc<dyn EmployeeDirectory>,
    settings: TopupSettings,
}

impl TopupManager {
    pub fn new(
        db: Arc<BankDatabase>,
        directory: Arc<dyn EmployeeDirectory>,
        settings: TopupSettings,
    ) -> Self {
        Self {
            db,
            directory,
            settings,
        }
    }

    /// Create a batch of pending topups in one of the two modes.
    ///
    /// Nothing is committed unless the whole batch persists; see
    /// [`BankDatabase::create_topups`].
    pub fn create_bulk(
        &self,
        caller: &AccountId,
        req: &CreateTopupRequest,
    ) -> Result<CreatedBatch, TopupError> {
        if req.amount <= 0 {
            return Err(TopupError::InvalidAmount(req.amount));
        }

        if req.per_employee {
            self.create_per_employee(caller, req)
        } else {
            self.create_copies(caller, req)
        }
    }

    fn create_per_employee(
        &self,
        caller: &AccountId,
        req: &CreateTopupRequest,
    ) -> Result<CreatedBatch, TopupError> {
        let owners: Vec<AccountId> = if req.employee_ids.is_empty() {
            let roster = self.directory.roster();
            if roster.is_empty() {
                return Err(TopupError::EmptyRoster);
            }
            roster.into_iter().map(|profile| profile.account_id).collect()
        } else {
            let mut owners = Vec::new();
            for id in &req.employee_ids {
                let account: AccountId = id.as_str().into();
                if owners.contains(&account) {
                    continue;
                }
                if self.directory.find(&account).is_none() {
                    return Err(TopupError::UnknownEmployee(id.clone()));
                }
                owners.push(account);
            }
            owners
        };

        let topups = self.persist_with_retry(|| {
            owners
                .iter()
                .map(|owner| {
                    Topup::new_pending(
                        self.employee_code(owner),
                        owner.clone(),
                        caller.clone(),
                        req.amount,
                        req.bank_account_no.clone(),
                        req.description.clone(),
                    )
                })
                .collect()
        })?;

        tracing::info!(
            caller = %caller,
            count = topups.len(),
            "Created per-employee topup batch"
        );

        Ok(CreatedBatch {
            mode: BulkMode::PerEmployee,
            topups,
        })
    }

    fn create_copies(
        &self,
        caller: &AccountId,
        req: &CreateTopupRequest,
    ) -> Result<CreatedBatch, TopupError> {
        let owner: AccountId = match &req.employee_id {
            Some(id) => {
                let account: AccountId = id.as_str().into();
                if self.directory.find(&account).is_none() {
                    return Err(TopupError::UnknownEmployee(id.clone()));
                }
                account
            }
            None => caller.clone(),
        };

        let copies = req.copies.max(1) as usize;
        let topups = self.persist_with_retry(|| {
            (0..copies)
                .map(|_| {
                    Topup::new_pending(
                        self.random_code(),
                        owner.clone(),
                        caller.clone(),
                        req.amount,
                        req.bank_account_no.clone(),
                        req.description.clone(),
                    )
                })
                .collect()
        })?;

        tracing::info!(
            caller = %caller,
            owner = %owner,
            count = topups.len(),
            "Created topup copies"
        );

        Ok(CreatedBatch {
            mode: BulkMode::CopiesForOne,
            topups,
        })
    }

    /// Persist a candidate batch, regenerating codes on collision until the
    /// retry budget runs out.
    fn persist_with_retry(
        &self,
        build: impl Fn() -> Vec<Topup>,
    ) -> Result<Vec<Topup>, TopupError> {
        for _ in 0..self.settings.retry_budget.max(1) {
            match self.db.create_topups(build()) {
                Ok(created) => return Ok(created),
                Err(BankDbError::CodeCollision(code)) => {
                    tracing::debug!(code = %code, "Topup code collision, regenerating batch");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(TopupError::GenerationExhausted)
    }

    /// `PREFIX-XXXXXX`, six uppercase hex chars from a v4 uuid.
    fn random_code(&self) -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        format!("{}-{}", self.settings.code_prefix, &hex[..6])
    }

    /// Per-employee codes carry up to four alphanumerics of the owner id
    /// ahead of the random tail.
    fn employee_code(&self, owner: &AccountId) -> String {
        let fragment: String = owner
            .0
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(4)
            .collect::<String>()
            .to_ascii_uppercase();
        let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        format!("{}-{}{}", self.settings.code_prefix, fragment, &hex[..4])
    }

    /// Page through topups the caller owns or issued, most recent first.
    pub fn list(
        &self,
        caller: &AccountId,
        scope: ListScope,
        page: usize,
        size: usize,
    ) -> Result<TopupPage, TopupError> {
        let page = page.max(1);
        let size = size.clamp(1, MAX_PAGE_SIZE);

        let result = match scope {
            ListScope::Owner => self.db.topups_by_owner(&caller.0, page, size)?,
            ListScope::Created => self.db.topups_by_creator(&caller.0, page, size)?,
        };
        Ok(result)
    }

    /// Look up the most recently created topup carrying `code`,
    /// case-insensitively.
    pub fn status_by_code(&self, code: &str) -> Result<Topup, TopupError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(TopupError::InvalidCode);
        }
        self.db
            .topup_by_code_latest(code)?
            .ok_or_else(|| TopupError::UnknownCode(code.to_string()))
    }

    /// Build the payment-QR payload for a still-pending topup.
    pub fn payment_qr(&self, code: &str) -> Result<PaymentQr, TopupError> {
        let topup = self.status_by_code(code)?;
        if topup.status != TopupStatus::Pending {
            return Err(TopupError::NotPayable {
                code: topup.code,
                status: topup.status,
            });
        }

        let base = format!(
            "https://img.vietqr.io/image/{}-{}-compact.png",
            self.settings.bank_short_code, topup.bank_account_no
        );

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if topup.amount > 0 {
            query.append_pair("amount", &topup.amount.to_string());
        }
        query.append_pair("addInfo", &topup.code);
        query.append_pair("accountName", &self.settings.qr_account_name);
        let image_url = format!("{base}?{}", query.finish());

        Ok(PaymentQr {
            add_info: topup.code.clone(),
            code: topup.code,
            amount: topup.amount,
            bank_short_code: self.settings.bank_short_code.clone(),
            bank_account_no: topup.bank_account_no,
            account_name: self.settings.qr_account_name.clone(),
            image_url,
        })
    }
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TopupError {
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("invalid topup code")]
    InvalidCode,

    #[error("employee not found: {0}")]
    UnknownEmployee(String),

    #[error("employee roster is empty")]
    EmptyRoster,

    #[error("no topup found for code {0}")]
    UnknownCode(String),

    #[error("topup {code} is {status:?}, not payable")]
    NotPayable { code: String, status: TopupStatus },

    #[error("could not generate a unique topup code")]
    GenerationExhausted,

    #[error("storage error: {0}")]
    Storage(#[from] BankDbError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{EmployeeProfile, StaticDirectory};
    use chrono::Utc;

    const BANK_ACCOUNT: &str = "65609062003";

    fn profile(id: &str) -> EmployeeProfile {
        EmployeeProfile {
            account_id: id.into(),
            first_name: Some("An".to_string()),
            last_name: Some("Nguyen".to_string()),
            email: Some(format!("{id}@example.com")),
        }
    }

    fn test_manager() -> (TopupManager, Arc<BankDatabase>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(BankDatabase::open(&dir.path().join("bank.redb")).unwrap());
        let directory = Arc::new(StaticDirectory::from_profiles(vec![
            profile("acc-1"),
            profile("acc-2"),
            profile("acc-3"),
        ]));
        let manager = TopupManager::new(db.clone(), directory, TopupSettings::default());
        (manager, db, dir)
    }

    fn request(per_employee: bool) -> CreateTopupRequest {
        CreateTopupRequest {
            amount: 150_000,
            bank_account_no: BANK_ACCOUNT.to_string(),
            description: None,
            per_employee,
            employee_ids: Vec::new(),
            employee_id: None,
            copies: 1,
        }
    }

    #[test]
    fn per_employee_creates_one_intent_per_distinct_id() {
        let (manager, _db, _dir) = test_manager();
        let caller: AccountId = "accountant-1".into();

        let mut req = request(true);
        req.employee_ids = vec!["acc-1".to_string(), "acc-2".to_string(), "acc-1".to_string()];

        let batch = manager.create_bulk(&caller, &req).unwrap();
        assert_eq!(batch.mode, BulkMode::PerEmployee);
        assert_eq!(batch.topups.len(), 2);

        for topup in &batch.topups {
            assert_eq!(topup.status, TopupStatus::Pending);
            assert_eq!(topup.created_by, caller);
            assert_eq!(topup.amount, 150_000);
        }
        assert_eq!(batch.topups[0].owner, "acc-1".into());
        assert_eq!(batch.topups[1].owner, "acc-2".into());

        // Codes embed the owner fragment and stay distinct.
        assert!(batch.topups[0].code.starts_with("TOPUP-ACC1"));
        assert!(batch.topups[1].code.starts_with("TOPUP-ACC2"));
        assert_ne!(batch.topups[0].code, batch.topups[1].code);
    }

    #[test]
    fn per_employee_falls_back_to_roster() {
        let (manager, _db, _dir) = test_manager();

        let batch = manager
            .create_bulk(&"accountant-1".into(), &request(true))
            .unwrap();

        assert_eq!(batch.topups.len(), 3);
        let owners: Vec<&str> = batch.topups.iter().map(|t| t.owner.0.as_str()).collect();
        assert_eq!(owners, vec!["acc-1", "acc-2", "acc-3"]);
    }

    #[test]
    fn per_employee_rejects_unknown_id_without_creating_anything() {
        let (manager, _db, _dir) = test_manager();
        let caller: AccountId = "accountant-1".into();

        let mut req = request(true);
        req.employee_ids = vec!["acc-1".to_string(), "ghost".to_string()];

        let err = manager.create_bulk(&caller, &req).unwrap_err();
        assert!(matches!(err, TopupError::UnknownEmployee(id) if id == "ghost"));

        let created = manager.list(&caller, ListScope::Created, 1, 10).unwrap();
        assert_eq!(created.total, 0);
    }

    #[test]
    fn empty_roster_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(BankDatabase::open(&dir.path().join("bank.redb")).unwrap());
        let manager = TopupManager::new(
            db,
            Arc::new(StaticDirectory::empty()),
            TopupSettings::default(),
        );

        let err = manager
            .create_bulk(&"accountant-1".into(), &request(true))
            .unwrap_err();
        assert!(matches!(err, TopupError::EmptyRoster));
    }

    #[test]
    fn retry_budget_exhaustion_surfaces_after_persistent_collisions() {
        let (manager, db, _dir) = test_manager();
        let taken = Topup::new_pending(
            "TOPUP-FIXED1".to_string(),
            "acc-1".into(),
            "accountant-1".into(),
            1_000,
            BANK_ACCOUNT.to_string(),
            None,
        );
        db.create_topups(vec![taken]).unwrap();

        // A builder that always re-emits the taken code collides on every
        // attempt, so the budget runs out.
        let err = manager
            .persist_with_retry(|| {
                vec![Topup::new_pending(
                    "TOPUP-FIXED1".to_string(),
                    "acc-2".into(),
                    "accountant-1".into(),
                    1_000,
                    BANK_ACCOUNT.to_string(),
                    None,
                )]
            })
            .unwrap_err();

        assert!(matches!(err, TopupError::GenerationExhausted));
        let survivors = manager.list(&"accountant-1".into(), ListScope::Created, 1, 10).unwrap();
        assert_eq!(survivors.total, 1);
    }

    #[test]
    fn copies_mode_defaults_to_the_caller() {
        let (manager, _db, _dir) = test_manager();
        let caller: AccountId = "accountant-1".into();

        let mut req = request(false);
        req.copies = 3;

        let batch = manager.create_bulk(&caller, &req).unwrap();
        assert_eq!(batch.mode, BulkMode::CopiesForOne);
        assert_eq!(batch.topups.len(), 3);

        let mut codes: Vec<&str> = batch.topups.iter().map(|t| t.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 3);
        assert!(batch.topups.iter().all(|t| t.owner == caller));
    }

    #[test]
    fn copies_mode_targets_the_named_employee() {
        let (manager, _db, _dir) = test_manager();

        let mut req = request(false);
        req.employee_id = Some("acc-2".to_string());
        req.copies = 0;

        let batch = manager.create_bulk(&"accountant-1".into(), &req).unwrap();
        assert_eq!(batch.topups.len(), 1);
        assert_eq!(batch.topups[0].owner, "acc-2".into());
    }

    #[test]
    fn rejects_non_positive_amount() {
        let (manager, _db, _dir) = test_manager();

        let mut req = request(false);
        req.amount = 0;

        let err = manager.create_bulk(&"accountant-1".into(), &req).unwrap_err();
        assert!(matches!(err, TopupError::InvalidAmount(0)));
    }

    #[test]
    fn list_separates_owner_and_creator_scopes() {
        let (manager, _db, _dir) = test_manager();
        let caller: AccountId = "accountant-1".into();

        let mut req = request(true);
        req.employee_ids = vec!["acc-1".to_string()];
        manager.create_bulk(&caller, &req).unwrap();

        let created = manager.list(&caller, ListScope::Created, 1, 10).unwrap();
        assert_eq!(created.total, 1);

        let owned = manager.list(&"acc-1".into(), ListScope::Owner, 1, 10).unwrap();
        assert_eq!(owned.total, 1);

        let not_owned = manager.list(&caller, ListScope::Owner, 1, 10).unwrap();
        assert_eq!(not_owned.total, 0);

        // Degenerate paging values clamp instead of erroring.
        let clamped = manager.list(&caller, ListScope::Created, 0, 0).unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.items.len(), 1);
    }

    #[test]
    fn scope_parsing_defaults_to_created() {
        assert_eq!(ListScope::parse(Some("owner")), ListScope::Owner);
        assert_eq!(ListScope::parse(Some("OWNER")), ListScope::Owner);
        assert_eq!(ListScope::parse(Some("created")), ListScope::Created);
        assert_eq!(ListScope::parse(Some("anything")), ListScope::Created);
        assert_eq!(ListScope::parse(None), ListScope::Created);
    }

    #[test]
    fn status_by_code_is_case_insensitive() {
        let (manager, _db, _dir) = test_manager();

        let batch = manager
            .create_bulk(&"accountant-1".into(), &request(false))
            .unwrap();
        let code = batch.topups[0].code.clone();

        let found = manager.status_by_code(&code.to_lowercase()).unwrap();
        assert_eq!(found.code, code);
        assert_eq!(found.status, TopupStatus::Pending);

        assert!(matches!(
            manager.status_by_code("TOPUP-MISSING"),
            Err(TopupError::UnknownCode(_))
        ));
        assert!(matches!(
            manager.status_by_code("   "),
            Err(TopupError::InvalidCode)
        ));
    }

    #[test]
    fn payment_qr_renders_the_vietqr_url() {
        let (manager, _db, _dir) = test_manager();

        let batch = manager
            .create_bulk(&"accountant-1".into(), &request(false))
            .unwrap();
        let code = batch.topups[0].code.clone();

        let qr = manager.payment_qr(&code).unwrap();
        assert_eq!(qr.code, code);
        assert_eq!(qr.add_info, code);
        assert_eq!(qr.amount, 150_000);
        assert_eq!(qr.bank_account_no, BANK_ACCOUNT);
        assert_eq!(
            qr.image_url,
            format!(
                "https://img.vietqr.io/image/tpbank-{BANK_ACCOUNT}-compact.png?amount=150000&addInfo={code}&accountName=HR+PAYROLL"
            )
        );
    }

    #[test]
    fn payment_qr_rejects_settled_topups() {
        let (manager, db, _dir) = test_manager();

        let batch = manager
            .create_bulk(&"accountant-1".into(), &request(false))
            .unwrap();
        let topup = &batch.topups[0];

        let affected = db
            .mark_success_if_pending(&topup.topup_id, "R1", Utc::now(), None)
            .unwrap();
        assert_eq!(affected, 1);

        let err = manager.payment_qr(&topup.code).unwrap_err();
        assert!(matches!(
            err,
            TopupError::NotPayable {
                status: TopupStatus::Success,
                ..
            }
        ));
    }

    #[test]
    fn payment_qr_unknown_code_is_not_found() {
        let (manager, _db, _dir) = test_manager();

        assert!(matches!(
            manager.payment_qr("TOPUP-NOBODY"),
            Err(TopupError::UnknownCode(_))
        ));
    }
}
