//! Price resolver: an ordered fallback chain over the configured providers,
//! terminating in synthetic generation so resolution is total.
//!
//! Every provider attempt emits a structured log event {provider, symbol,
//! mode, outcome}; the winning tier is stamped onto the result as its
//! `source` so the rendering layer can show a trust indicator.

pub mod cache;

pub use cache::{CacheKey, PriceCache};

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::domain::{Decimal, PriceQuery, PriceResult, QueryMode, Symbol, TimeMs};
use crate::providers::{PriceProvider, SyntheticSource};

/// Tuning knobs for the resolver, derived from `Config`.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// TTL for current-price cache entries.
    pub current_ttl: Duration,
    /// TTL for history-series cache entries.
    pub history_ttl: Duration,
    /// Hard deadline per provider attempt.
    pub provider_timeout: Duration,
    /// Concurrency bound for multi-symbol resolution.
    pub max_concurrent: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            current_ttl: Duration::from_secs(60),
            history_ttl: Duration::from_secs(3600),
            provider_timeout: Duration::from_secs(10),
            max_concurrent: 4,
        }
    }
}

/// Multi-provider price resolver with caching and a synthetic terminal
/// stage. `resolve` never fails.
pub struct PriceResolver {
    providers: Vec<Arc<dyn PriceProvider>>,
    synthetic: SyntheticSource,
    cache: PriceCache,
    last_known: DashMap<Symbol, Decimal>,
    options: ResolverOptions,
}

impl PriceResolver {
    /// Build a resolver over an ordered provider chain. Order is priority:
    /// earlier providers win when they succeed.
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>, options: ResolverOptions) -> Self {
        PriceResolver {
            providers,
            synthetic: SyntheticSource::new(),
            cache: PriceCache::new(options.current_ttl, options.history_ttl),
            last_known: DashMap::new(),
            options,
        }
    }

    /// Resolve a price query. Total: degrades through the chain and falls
    /// back to synthetic data rather than returning an error.
    pub async fn resolve(&self, query: &PriceQuery) -> PriceResult {
        let key = CacheKey::from_query(query);
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        // Single-flight: serialize concurrent misses on the same key, then
        // re-check so late arrivals reuse the winner's result.
        let guard = self.cache.flight_guard(&key);
        let _held = guard.lock().await;
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let result = self.resolve_uncached(query).await;
        self.cache.insert(key.clone(), result.clone());
        self.cache.finish_flight(&key);
        result
    }

    /// Resolve several queries concurrently under the configured bound.
    /// Each symbol's resolution is independent; results arrive in
    /// completion order.
    pub async fn resolve_many(&self, queries: Vec<PriceQuery>) -> Vec<PriceResult> {
        stream::iter(queries)
            .map(|query| async move { self.resolve(&query).await })
            .buffer_unordered(self.options.max_concurrent.max(1))
            .collect()
            .await
    }

    async fn resolve_uncached(&self, query: &PriceQuery) -> PriceResult {
        for provider in &self.providers {
            let source = provider.source();
            if !provider.supports(query.mode) {
                info!(
                    provider = %source,
                    symbol = %query.symbol,
                    mode = %query.mode,
                    outcome = "skipped_unsupported_mode",
                    "Provider skipped"
                );
                continue;
            }

            match timeout(self.options.provider_timeout, provider.fetch(query)).await {
                Ok(Ok(data)) => {
                    info!(
                        provider = %source,
                        symbol = %query.symbol,
                        mode = %query.mode,
                        outcome = "success",
                        "Provider attempt succeeded"
                    );
                    if let Some(latest) = data.latest() {
                        self.last_known.insert(query.symbol.clone(), latest.price);
                    }
                    return PriceResult {
                        symbol: query.symbol.clone(),
                        source,
                        data,
                        as_of: TimeMs::now(),
                    };
                }
                Ok(Err(err)) => {
                    warn!(
                        provider = %source,
                        symbol = %query.symbol,
                        mode = %query.mode,
                        outcome = %err,
                        "Provider attempt failed, falling through"
                    );
                }
                Err(_) => {
                    warn!(
                        provider = %source,
                        symbol = %query.symbol,
                        mode = %query.mode,
                        outcome = "timeout",
                        "Provider attempt timed out, falling through"
                    );
                }
            }
        }

        let anchor = self.last_known.get(&query.symbol).map(|e| *e.value());
        let as_of = TimeMs::now();
        warn!(
            provider = %self.synthetic.source(),
            symbol = %query.symbol,
            mode = %query.mode,
            outcome = "synthetic_fallback",
            "All providers exhausted, generating synthetic data"
        );
        PriceResult {
            symbol: query.symbol.clone(),
            source: self.synthetic.source(),
            data: self.synthetic.generate(query, anchor, as_of),
            as_of,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceSource;
    use crate::providers::{MockProvider, ProviderError};

    fn resolver_with(providers: Vec<Arc<dyn PriceProvider>>) -> PriceResolver {
        PriceResolver::new(providers, ResolverOptions::default())
    }

    #[tokio::test]
    async fn test_primary_wins_when_available() {
        let resolver = resolver_with(vec![
            Arc::new(MockProvider::succeeding(
                PriceSource::Primary,
                Decimal::from_i64(50_000),
            )),
            Arc::new(MockProvider::succeeding(
                PriceSource::Secondary,
                Decimal::from_i64(49_000),
            )),
        ]);

        let result = resolver
            .resolve(&PriceQuery::current(Symbol::new("BTC")))
            .await;
        assert_eq!(result.source, PriceSource::Primary);
    }

    #[tokio::test]
    async fn test_unavailable_primary_never_wins() {
        let resolver = resolver_with(vec![
            Arc::new(MockProvider::failing(
                PriceSource::Primary,
                ProviderError::Unavailable("credentials not configured".to_string()),
            )),
            Arc::new(MockProvider::succeeding(
                PriceSource::Secondary,
                Decimal::from_i64(49_000),
            )),
        ]);

        for symbol in ["BTC", "ETH", "SOL"] {
            let result = resolver
                .resolve(&PriceQuery::current(Symbol::new(symbol)))
                .await;
            assert_ne!(result.source, PriceSource::Primary);
            assert_eq!(result.source, PriceSource::Secondary);
        }
    }

    #[tokio::test]
    async fn test_rate_limited_secondary_falls_to_tertiary() {
        let resolver = resolver_with(vec![
            Arc::new(MockProvider::failing(
                PriceSource::Primary,
                ProviderError::Unavailable("credentials not configured".to_string()),
            )),
            Arc::new(MockProvider::failing(
                PriceSource::Secondary,
                ProviderError::RateLimited,
            )),
            Arc::new(
                MockProvider::succeeding(PriceSource::Tertiary, Decimal::from_i64(48_500))
                    .without_history(),
            ),
        ]);

        let result = resolver
            .resolve(&PriceQuery::current(Symbol::new("BTC")))
            .await;
        assert_eq!(result.source, PriceSource::Tertiary);
    }

    #[tokio::test]
    async fn test_history_skips_tertiary_and_goes_synthetic() {
        let tertiary = MockProvider::succeeding(PriceSource::Tertiary, Decimal::from_i64(48_500))
            .without_history();
        let tertiary_calls = tertiary.calls_handle();

        let resolver = resolver_with(vec![
            Arc::new(MockProvider::failing(
                PriceSource::Primary,
                ProviderError::Unavailable("credentials not configured".to_string()),
            )),
            Arc::new(MockProvider::failing(
                PriceSource::Secondary,
                ProviderError::RateLimited,
            )),
            Arc::new(tertiary),
        ]);

        let result = resolver
            .resolve(&PriceQuery::history(Symbol::new("BTC"), 30))
            .await;
        assert_eq!(result.source, PriceSource::Synthetic);
        assert_eq!(result.data.len(), 30);
        // The tertiary provider cannot serve history and must not be probed.
        assert_eq!(tertiary_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolution_is_total_when_all_fail() {
        let resolver = resolver_with(vec![
            Arc::new(MockProvider::failing(
                PriceSource::Primary,
                ProviderError::NetworkError("unreachable".to_string()),
            )),
            Arc::new(MockProvider::failing(
                PriceSource::Secondary,
                ProviderError::UnknownSymbol("WAGMI".to_string()),
            )),
            Arc::new(MockProvider::failing(
                PriceSource::Tertiary,
                ProviderError::HttpError {
                    status: 503,
                    message: "down".to_string(),
                },
            )),
        ]);

        let result = resolver
            .resolve(&PriceQuery::current(Symbol::new("WAGMI")))
            .await;
        assert_eq!(result.source, PriceSource::Synthetic);
        assert!(result.data.latest().is_some());
    }

    #[tokio::test]
    async fn test_empty_chain_is_still_total() {
        let resolver = resolver_with(vec![]);
        let result = resolver
            .resolve(&PriceQuery::history(Symbol::new("BTC"), 7))
            .await;
        assert_eq!(result.source, PriceSource::Synthetic);
        assert_eq!(result.data.len(), 7);
    }

    #[tokio::test]
    async fn test_cache_prevents_repeat_fetches() {
        let primary = MockProvider::succeeding(PriceSource::Primary, Decimal::from_i64(50_000));
        let calls = primary.calls_handle();
        let resolver = resolver_with(vec![Arc::new(primary)]);

        let query = PriceQuery::current(Symbol::new("BTC"));
        resolver.resolve(&query).await;
        resolver.resolve(&query).await;
        resolver.resolve(&query).await;
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_flight_coalesces_concurrent_misses() {
        let primary = MockProvider::succeeding(PriceSource::Primary, Decimal::from_i64(50_000))
            .with_delay(Duration::from_millis(50));
        let calls = primary.calls_handle();
        let resolver = Arc::new(resolver_with(vec![Arc::new(primary)]));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver
                    .resolve(&PriceQuery::current(Symbol::new("BTC")))
                    .await
            }));
        }
        for handle in handles {
            let result = handle.await.unwrap();
            assert_eq!(result.source, PriceSource::Primary);
        }

        // Eight concurrent misses, exactly one upstream fetch.
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_many_returns_all_symbols() {
        let resolver = resolver_with(vec![Arc::new(MockProvider::succeeding(
            PriceSource::Secondary,
            Decimal::from_i64(100),
        ))]);

        let queries = vec![
            PriceQuery::current(Symbol::new("BTC")),
            PriceQuery::current(Symbol::new("ETH")),
            PriceQuery::current(Symbol::new("SOL")),
        ];
        let results = resolver.resolve_many(queries).await;
        assert_eq!(results.len(), 3);

        let mut symbols: Vec<String> = results.iter().map(|r| r.symbol.to_string()).collect();
        symbols.sort();
        assert_eq!(symbols, vec!["BTC", "ETH", "SOL"]);
    }

    #[tokio::test]
    async fn test_synthetic_anchored_at_last_known_price() {
        // First resolve succeeds and records a last-known price; after the
        // cache entry expires and the provider starts failing, the synthetic
        // stage anchors at that price instead of the symbol default.
        let options = ResolverOptions {
            current_ttl: Duration::ZERO,
            ..ResolverOptions::default()
        };
        let flaky = MockProvider::succeeding(PriceSource::Primary, Decimal::from_i64(42_000));
        let resolver = PriceResolver::new(vec![Arc::new(flaky)], options);

        let query = PriceQuery::current(Symbol::new("BTC"));
        let first = resolver.resolve(&query).await;
        assert_eq!(first.source, PriceSource::Primary);

        // Swap in a failing chain while keeping resolver state.
        let mut resolver = resolver;
        resolver.providers = vec![Arc::new(MockProvider::failing(
            PriceSource::Primary,
            ProviderError::NetworkError("down".to_string()),
        ))];

        let second = resolver.resolve(&query).await;
        assert_eq!(second.source, PriceSource::Synthetic);
        assert_eq!(
            second.data.latest().unwrap().price,
            Decimal::from_i64(42_000)
        );
    }
}
