// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::{AppConfig, SNAPSHOT_CACHE_CAPACITY};
use crate::directory::EmployeeDirectory;
use crate::reconcile::ReconcileEngine;
use crate::storage::{BankDatabase, SnapshotCache};
use crate::topup::TopupManager;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<BankDatabase>,
    pub cache: Arc<SnapshotCache>,
    pub engine: Arc<ReconcileEngine>,
    pub topups: Arc<TopupManager>,
    pub directory: Arc<dyn EmployeeDirectory>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the engine, manager, and cache over one opened database.
    pub fn new(config: AppConfig, db: BankDatabase, directory: Arc<dyn EmployeeDirectory>) -> Self {
        let db = Arc::new(db);
        let cache = Arc::new(SnapshotCache::new(
            SNAPSHOT_CACHE_CAPACITY,
            config.snapshot_ttl,
        ));
        let engine = Arc::new(ReconcileEngine::new(
            db.clone(),
            cache.clone(),
            config.topup_code_prefix.clone(),
        ));
        let topups = Arc::new(TopupManager::new(
            db.clone(),
            directory.clone(),
            config.topup_settings(),
        ));

        Self {
            db,
            cache,
            engine,
            topups,
            directory,
            config: Arc::new(config),
        }
    }
}
