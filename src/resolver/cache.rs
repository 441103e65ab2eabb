//! Keyed TTL cache with a single-flight registry.
//!
//! The cache is a pure optimization for respecting upstream rate limits:
//! a miss is never an error, and there is no blanket invalidate-all. Each
//! key carries its own expiry, with current-price entries aging out faster
//! than history series. The single-flight registry guarantees at most one
//! in-flight fetch per key; concurrent callers for the same key wait on the
//! flight guard and then read the freshly cached result.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::{PriceQuery, PriceResult, QueryMode, Symbol};

/// Cache key: one entry per (symbol, mode, lookback) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: Symbol,
    pub mode: QueryMode,
    pub lookback_days: u32,
}

impl CacheKey {
    pub fn from_query(query: &PriceQuery) -> Self {
        CacheKey {
            symbol: query.symbol.clone(),
            mode: query.mode,
            lookback_days: match query.mode {
                QueryMode::Current => 0,
                QueryMode::History => query.lookback_days,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: PriceResult,
    expires_at: Instant,
}

/// TTL cache plus single-flight registry for resolved prices.
#[derive(Debug)]
pub struct PriceCache {
    entries: DashMap<CacheKey, CacheEntry>,
    inflight: DashMap<CacheKey, Arc<Mutex<()>>>,
    current_ttl: Duration,
    history_ttl: Duration,
}

impl PriceCache {
    pub fn new(current_ttl: Duration, history_ttl: Duration) -> Self {
        PriceCache {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            current_ttl,
            history_ttl,
        }
    }

    /// Look up a fresh entry. Expired entries are evicted on read.
    pub fn get(&self, key: &CacheKey) -> Option<PriceResult> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.result.clone());
            }
        }
        self.entries.remove_if(key, |_, e| e.expires_at <= Instant::now());
        None
    }

    /// Store a result under the mode-appropriate TTL.
    pub fn insert(&self, key: CacheKey, result: PriceResult) {
        let ttl = match key.mode {
            QueryMode::Current => self.current_ttl,
            QueryMode::History => self.history_ttl,
        };
        self.entries.insert(
            key,
            CacheEntry {
                result,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Obtain the flight guard for a key. Callers lock the guard, re-check
    /// the cache, and fetch only on a confirmed miss.
    pub fn flight_guard(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the flight guard entry once a fetch has completed and its result
    /// is cached. Late arrivals holding the old Arc still serialize on it.
    pub fn finish_flight(&self, key: &CacheKey) {
        self.inflight.remove(key);
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
