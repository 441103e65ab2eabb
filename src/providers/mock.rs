//! Mock price provider for exercising the fallback chain without network
//! calls.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{PriceProvider, ProviderError};
use crate::domain::{Decimal, PriceData, PricePoint, PriceQuery, PriceSource, QueryMode, TimeMs};

/// Scripted behavior for a mock fetch.
#[derive(Debug, Clone)]
enum MockOutcome {
    Price(Decimal),
    Fail(ProviderError),
}

/// Mock provider with a fixed outcome, call counting, and an optional
/// artificial delay (used to prove the single-flight discipline).
#[derive(Debug, Clone)]
pub struct MockProvider {
    source: PriceSource,
    supports_history: bool,
    outcome: MockOutcome,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a mock occupying the given tier that always succeeds with a
    /// flat price.
    pub fn succeeding(source: PriceSource, price: Decimal) -> Self {
        Self {
            source,
            supports_history: true,
            outcome: MockOutcome::Price(price),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock occupying the given tier that always fails.
    pub fn failing(source: PriceSource, error: ProviderError) -> Self {
        Self {
            source,
            supports_history: true,
            outcome: MockOutcome::Fail(error),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Restrict the mock to current-price queries (tertiary-style).
    pub fn without_history(mut self) -> Self {
        self.supports_history = false;
        self
    }

    /// Add an artificial delay to every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetch attempts made against this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared handle to the call counter, usable after the provider has been
    /// moved into a resolver.
    pub fn calls_handle(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl PriceProvider for MockProvider {
    fn source(&self) -> PriceSource {
        self.source
    }

    fn supports(&self, mode: QueryMode) -> bool {
        match mode {
            QueryMode::Current => true,
            QueryMode::History => self.supports_history,
        }
    }

    async fn fetch(&self, query: &PriceQuery) -> Result<PriceData, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.outcome {
            MockOutcome::Fail(err) => Err(err.clone()),
            MockOutcome::Price(price) => match query.mode {
                QueryMode::Current => Ok(PriceData::Point(PricePoint {
                    time_ms: TimeMs::now(),
                    price: *price,
                })),
                QueryMode::History => {
                    let days = query.lookback_days.max(1);
                    let as_of = TimeMs::now();
                    let series = (0..days)
                        .map(|i| PricePoint {
                            time_ms: TimeMs::new(
                                as_of.as_i64() - (days - 1 - i) as i64 * 86_400_000,
                            ),
                            price: *price,
                        })
                        .collect();
                    Ok(PriceData::Series(series))
                }
            },
        }
    }
}
