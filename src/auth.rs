// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the calling account.
//!
//! Authentication happens upstream: an API gateway verifies the session and
//! forwards the account id in the `x-account-id` header. Handlers require it
//! with the `Caller` extractor:
//!
//! ```rust,ignore
//! async fn my_handler(Caller(account): Caller) -> impl IntoResponse {
//!     // account is the authenticated AccountId
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::models::AccountId;

/// Header the upstream gateway injects after authenticating the request.
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Extractor for the authenticated account id.
///
/// Rejects with `401 Unauthorized` when the header is missing or blank.
#[derive(Debug)]
pub struct Caller(pub AccountId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACCOUNT_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("missing x-account-id header"))?
            .to_str()
            .map_err(|_| ApiError::unauthorized("invalid x-account-id header"))?
            .trim();

        if value.is_empty() {
            return Err(ApiError::unauthorized("missing x-account-id header"));
        }

        Ok(Caller(AccountId::from(value)))
    }
}
