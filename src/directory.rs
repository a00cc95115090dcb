// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Employee directory lookups.
//!
//! The HR directory that owns employee records lives in a separate system.
//! This module defines the narrow view of it the payment flows need: who an
//! account id belongs to, and the organization-wide roster used when a bulk
//! topup request names nobody.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::AccountId;

/// Directory record for one employee.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EmployeeProfile {
    /// Account id the employee pays from
    pub account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl EmployeeProfile {
    /// Profile for an account the directory has no record of.
    pub fn unresolved(account_id: AccountId) -> Self {
        Self {
            account_id,
            first_name: None,
            last_name: None,
            email: None,
        }
    }
}

/// Read access to the employee directory.
pub trait EmployeeDirectory: Send + Sync {
    /// Look up one employee by account id.
    fn find(&self, account_id: &AccountId) -> Option<EmployeeProfile>;

    /// Every employee the directory knows about.
    fn roster(&self) -> Vec<EmployeeProfile>;
}

/// Directory backed by a JSON roster file loaded once at startup.
pub struct StaticDirectory {
    profiles: BTreeMap<String, EmployeeProfile>,
}

impl StaticDirectory {
    /// Load the roster from a JSON array of profiles.
    pub fn from_file(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read(path)?;
        let profiles: Vec<EmployeeProfile> = serde_json::from_slice(&raw)?;
        Ok(Self::from_profiles(profiles))
    }

    /// Build a directory from in-memory profiles.
    pub fn from_profiles(profiles: Vec<EmployeeProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (profile.account_id.0.clone(), profile))
            .collect();
        Self { profiles }
    }

    /// A directory with nobody in it.
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }
}

impl EmployeeDirectory for StaticDirectory {
    fn find(&self, account_id: &AccountId) -> Option<EmployeeProfile> {
        self.profiles.get(&account_id.0).cloned()
    }

    fn roster(&self) -> Vec<EmployeeProfile> {
        self.profiles.values().cloned().collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read roster file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid roster file: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn profile(id: &str, first: &str) -> EmployeeProfile {
        EmployeeProfile {
            account_id: id.into(),
            first_name: Some(first.to_string()),
            last_name: None,
            email: Some(format!("{id}@example.com")),
        }
    }

    #[test]
    fn find_resolves_known_accounts() {
        let dir = StaticDirectory::from_profiles(vec![profile("acc-1", "An"), profile("acc-2", "Binh")]);

        let found = dir.find(&"acc-1".into()).unwrap();
        assert_eq!(found.first_name.as_deref(), Some("An"));
        assert!(dir.find(&"acc-9".into()).is_none());
    }

    #[test]
    fn roster_is_sorted_by_account_id() {
        let dir = StaticDirectory::from_profiles(vec![profile("acc-2", "Binh"), profile("acc-1", "An")]);

        let ids: Vec<String> = dir.roster().iter().map(|p| p.account_id.0.clone()).collect();
        assert_eq!(ids, vec!["acc-1", "acc-2"]);
    }

    #[test]
    fn loads_roster_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"[{"account_id":"acc-1","first_name":"An","email":"an@example.com"},{"account_id":"acc-2"}]"#,
        )
        .unwrap();

        let loaded = StaticDirectory::from_file(&path).unwrap();
        assert_eq!(loaded.roster().len(), 2);
        assert_eq!(
            loaded.find(&"acc-2".into()),
            Some(EmployeeProfile::unresolved("acc-2".into()))
        );
    }

    #[test]
    fn rejects_malformed_roster_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            StaticDirectory::from_file(&path),
            Err(DirectoryError::Json(_))
        ));
    }
}
