// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `BANK_ACCOUNT_NO` | Monitored bank account number | Required |
//! | `BANK_NAME` | Display name of the monitored bank | `TPBank` |
//! | `BANK_SHORT_CODE` | Bank short code used in QR image URLs | `tpbank` |
//! | `QR_ACCOUNT_NAME` | Account holder name shown on payment QRs | `HR PAYROLL` |
//! | `TOPUP_CODE_PREFIX` | Prefix carried by issued topup codes | `TOPUP` |
//! | `TOPUP_CODE_RETRY_BUDGET` | Code-generation attempts before giving up | `5` |
//! | `WEBHOOK_MALFORMED_POLICY` | `reject` (400) or `review` (202 + quarantine) | `reject` |
//! | `SNAPSHOT_TTL_SECS` | Balance snapshot cache lifetime | `30` |
//! | `EMPLOYEE_ROSTER_FILE` | JSON roster for the employee directory | Unset (empty directory) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use crate::topup::TopupSettings;

/// Entries the balance snapshot cache holds before evicting.
pub const SNAPSHOT_CACHE_CAPACITY: usize = 64;

/// What to do with webhook payloads that fail normalization.
///
/// The raw bytes land in the quarantine table either way; the policy only
/// decides the HTTP answer the gateway sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Answer 400 so the gateway surfaces the failure.
    Reject,
    /// Answer 202 and leave the payload for manual review.
    Review,
}

impl MalformedPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "reject" => Some(MalformedPolicy::Reject),
            "review" => Some(MalformedPolicy::Review),
            _ => None,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory for the embedded database file.
    pub data_dir: PathBuf,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// The bank account this service monitors.
    pub bank_account_no: String,
    /// Display name of the monitored bank.
    pub bank_name: String,
    /// Bank short code used in rendered QR image URLs.
    pub bank_short_code: String,
    /// Account holder name shown on payment QRs.
    pub qr_account_name: String,
    /// Uppercase prefix carried by issued topup codes.
    pub topup_code_prefix: String,
    /// Code-generation attempts before a bulk create gives up.
    pub topup_code_retry_budget: u32,
    /// Answer for webhook payloads that fail normalization.
    pub webhook_malformed_policy: MalformedPolicy,
    /// Balance snapshot cache lifetime.
    pub snapshot_ttl: Duration,
    /// JSON roster file backing the employee directory, when present.
    pub employee_roster_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_env("PORT", 8080)?;
        let retry_budget = parse_env("TOPUP_CODE_RETRY_BUDGET", 5)?;
        let snapshot_ttl_secs: u64 = parse_env("SNAPSHOT_TTL_SECS", 30)?;

        let policy_raw = env_or_default("WEBHOOK_MALFORMED_POLICY", "reject");
        let webhook_malformed_policy =
            MalformedPolicy::parse(&policy_raw).ok_or(ConfigError::Invalid {
                name: "WEBHOOK_MALFORMED_POLICY",
                value: policy_raw,
            })?;

        Ok(Self {
            data_dir: PathBuf::from(env_or_default("DATA_DIR", "/data")),
            host: env_or_default("HOST", "0.0.0.0"),
            port,
            bank_account_no: env_required("BANK_ACCOUNT_NO")?,
            bank_name: env_or_default("BANK_NAME", "TPBank"),
            bank_short_code: env_or_default("BANK_SHORT_CODE", "tpbank"),
            qr_account_name: env_or_default("QR_ACCOUNT_NAME", "HR PAYROLL"),
            topup_code_prefix: env_or_default("TOPUP_CODE_PREFIX", "TOPUP").to_ascii_uppercase(),
            topup_code_retry_budget: retry_budget,
            webhook_malformed_policy,
            snapshot_ttl: Duration::from_secs(snapshot_ttl_secs),
            employee_roster_file: env_optional("EMPLOYEE_ROSTER_FILE").map(PathBuf::from),
        })
    }

    /// Address the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path of the embedded database file under `data_dir`.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bank.redb")
    }

    /// Settings slice handed to the topup manager.
    pub fn topup_settings(&self) -> TopupSettings {
        TopupSettings {
            code_prefix: self.topup_code_prefix.clone(),
            retry_budget: self.topup_code_retry_budget,
            bank_short_code: self.bank_short_code.clone(),
            qr_account_name: self.qr_account_name.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid {
        name: &'static str,
        value: String,
    },
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_policy_parsing() {
        assert_eq!(MalformedPolicy::parse("reject"), Some(MalformedPolicy::Reject));
        assert_eq!(MalformedPolicy::parse("REVIEW"), Some(MalformedPolicy::Review));
        assert_eq!(MalformedPolicy::parse("quarantine"), None);
    }

    #[test]
    fn bind_addr_and_database_path() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/topup"),
            host: "127.0.0.1".to_string(),
            port: 9090,
            bank_account_no: "65609062003".to_string(),
            bank_name: "TPBank".to_string(),
            bank_short_code: "tpbank".to_string(),
            qr_account_name: "HR PAYROLL".to_string(),
            topup_code_prefix: "TOPUP".to_string(),
            topup_code_retry_budget: 5,
            webhook_malformed_policy: MalformedPolicy::Reject,
            snapshot_ttl: Duration::from_secs(30),
            employee_roster_file: None,
        };

        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/topup/bank.redb"));

        let settings = config.topup_settings();
        assert_eq!(settings.code_prefix, "TOPUP");
        assert_eq!(settings.retry_budget, 5);
    }
}
