// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use topup_bank_server::{
    api,
    config::AppConfig,
    directory::{EmployeeDirectory, StaticDirectory},
    state::AppState,
    storage::BankDatabase,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AppConfig::from_env().expect("invalid configuration");

    std::fs::create_dir_all(&config.data_dir).expect("failed to create data directory");

    let directory: Arc<dyn EmployeeDirectory> = match &config.employee_roster_file {
        Some(path) => {
            let roster = StaticDirectory::from_file(path).expect("failed to load employee roster");
            tracing::info!(path = %path.display(), employees = roster.roster().len(), "loaded employee roster");
            Arc::new(roster)
        }
        None => Arc::new(StaticDirectory::empty()),
    };

    let db = BankDatabase::open(&config.database_path()).expect("failed to open bank ledger");

    let addr = config.bind_addr();
    let state = AppState::new(config, db, directory);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listen address");

    tracing::info!("topup bank server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}
