// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Topup Bank Server - Bank Ledger & Payment Reconciliation Service
//!
//! This crate records webhook-delivered bank transactions into a durable
//! embedded ledger, matches incoming credits against pending topup payment
//! intents, and serves balance snapshots and history to the accounting
//! frontend.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Caller identification from the gateway-set account header
//! - `directory` - Employee directory lookups for topup ownership
//! - `reconcile` - Webhook payload normalization and credit matching
//! - `storage` - Embedded ledger store (redb) and snapshot cache
//! - `topup` - Topup intent creation, listing and payment QR

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod state;
pub mod storage;
pub mod topup;
