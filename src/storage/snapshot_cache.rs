// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for per-account balance snapshots.
//!
//! The snapshot is a derived view, never authoritative: it is recomputed from
//! the latest ledger entry on a miss and invalidated after every ledger
//! write. The lock is only held for the cache operation itself, never across
//! a storage call.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::models::BalanceSnapshot;

/// Cached entry: snapshot + insertion timestamp.
struct CacheEntry {
    snapshot: BalanceSnapshot,
    inserted_at: Instant,
}

/// In-process LRU cache for balance snapshot lookups.
pub struct SnapshotCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl SnapshotCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of accounts to cache.
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Get the cached snapshot for an account.
    ///
    /// Returns `None` if not cached or expired.
    pub fn get(&self, account_no: &str) -> Option<BalanceSnapshot> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(account_no) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.snapshot.clone());
            }
            // Expired, drop the stale entry.
            cache.pop(account_no);
        }
        None
    }

    /// Store a freshly computed snapshot.
    pub fn put(&self, snapshot: BalanceSnapshot) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                snapshot.account_no.clone(),
                CacheEntry {
                    snapshot,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Invalidate the cached snapshot for a specific account.
    pub fn invalidate(&self, account_no: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(account_no);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_snapshot(account_no: &str, balance: i64) -> BalanceSnapshot {
        BalanceSnapshot {
            account_no: account_no.to_string(),
            balance,
            as_of: Some(Utc::now()),
        }
    }

    #[test]
    fn cache_put_and_get() {
        let cache = SnapshotCache::new(10, Duration::from_secs(300));

        assert!(cache.get("65609062003").is_none());

        cache.put(sample_snapshot("65609062003", 1_500_000));

        let result = cache.get("65609062003").unwrap();
        assert_eq!(result.balance, 1_500_000);
    }

    #[test]
    fn cache_invalidate() {
        let cache = SnapshotCache::new(10, Duration::from_secs(300));
        cache.put(sample_snapshot("65609062003", 1_500_000));
        assert!(cache.get("65609062003").is_some());

        cache.invalidate("65609062003");
        assert!(cache.get("65609062003").is_none());
    }

    #[test]
    fn cache_ttl_expiry() {
        let cache = SnapshotCache::new(10, Duration::from_millis(1));
        cache.put(sample_snapshot("65609062003", 1_500_000));

        // Wait for TTL to expire
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("65609062003").is_none());
    }

    #[test]
    fn cache_keeps_accounts_apart() {
        let cache = SnapshotCache::new(10, Duration::from_secs(300));
        cache.put(sample_snapshot("65609062003", 1_500_000));
        cache.put(sample_snapshot("99900011122", 42));

        assert_eq!(cache.get("65609062003").unwrap().balance, 1_500_000);
        assert_eq!(cache.get("99900011122").unwrap().balance, 42);

        cache.invalidate("65609062003");
        assert!(cache.get("65609062003").is_none());
        assert!(cache.get("99900011122").is_some());
    }
}
