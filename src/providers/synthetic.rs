//! Synthetic terminal stage: deterministic offline price generation.
//!
//! Used only when every real provider has failed, so `resolve` stays total.
//! The output is a flat series with a small deterministic perturbation,
//! anchored at the last-known live price when the resolver has seen one, or
//! a per-symbol default otherwise. The same query always yields the same
//! shape for a given anchor.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::symbols;
use crate::domain::{Decimal, PriceData, PricePoint, PriceQuery, PriceSource, QueryMode, TimeMs};

const DAY_MS: i64 = 86_400_000;

/// Terminal fallback generator. Infallible by construction, which is why it
/// sits outside the `PriceProvider` chain rather than at the end of it.
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource;

impl SyntheticSource {
    pub fn new() -> Self {
        SyntheticSource
    }

    pub fn source(&self) -> PriceSource {
        PriceSource::Synthetic
    }

    /// Generate placeholder data for a query.
    ///
    /// `anchor` is the last live price the resolver observed for the symbol,
    /// if any; otherwise a per-symbol default is used.
    pub fn generate(
        &self,
        query: &PriceQuery,
        anchor: Option<Decimal>,
        as_of: TimeMs,
    ) -> PriceData {
        let anchor = anchor.unwrap_or_else(|| symbols::default_anchor_price(&query.symbol));

        match query.mode {
            QueryMode::Current => PriceData::Point(PricePoint {
                time_ms: as_of,
                price: anchor,
            }),
            QueryMode::History => {
                let days = query.lookback_days.max(1);
                let mut series = Vec::with_capacity(days as usize);
                for i in 0..days {
                    let age_days = (days - 1 - i) as i64;
                    let time_ms = TimeMs::new(as_of.as_i64() - age_days * DAY_MS);
                    series.push(PricePoint {
                        time_ms,
                        price: perturb(anchor, &query.symbol.to_string(), i),
                    });
                }
                PriceData::Series(series)
            }
        }
    }
}

/// Deterministic perturbation of up to ±0.5%, keyed on (symbol, day index).
fn perturb(anchor: Decimal, symbol: &str, day_index: u32) -> Decimal {
    let mut hasher = DefaultHasher::new();
    symbol.hash(&mut hasher);
    day_index.hash(&mut hasher);
    let bps = (hasher.finish() % 101) as i64 - 50;

    let scale = Decimal::from_i64(10_000 + bps) / Decimal::from_i64(10_000);
    anchor * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Symbol;

    #[test]
    fn test_generate_is_deterministic() {
        let source = SyntheticSource::new();
        let query = PriceQuery::history(Symbol::new("BTC"), 30);
        let as_of = TimeMs::new(1_700_000_000_000);

        let a = source.generate(&query, None, as_of);
        let b = source.generate(&query, None, as_of);
        assert_eq!(a, b);
    }

    #[test]
    fn test_history_length_matches_lookback() {
        let source = SyntheticSource::new();
        let query = PriceQuery::history(Symbol::new("ETH"), 14);
        let data = source.generate(&query, None, TimeMs::new(DAY_MS * 100));
        assert_eq!(data.len(), 14);
    }

    #[test]
    fn test_series_ends_at_as_of() {
        let source = SyntheticSource::new();
        let query = PriceQuery::history(Symbol::new("ETH"), 7);
        let as_of = TimeMs::new(DAY_MS * 100);
        match source.generate(&query, None, as_of) {
            PriceData::Series(points) => {
                assert_eq!(points.last().unwrap().time_ms, as_of);
                assert_eq!(points.first().unwrap().time_ms, TimeMs::new(DAY_MS * 94));
            }
            PriceData::Point(_) => panic!("expected a series"),
        }
    }

    #[test]
    fn test_anchor_overrides_default() {
        let source = SyntheticSource::new();
        let query = PriceQuery::current(Symbol::new("BTC"));
        let anchor = Decimal::from_i64(42_000);
        match source.generate(&query, Some(anchor), TimeMs::new(0)) {
            PriceData::Point(p) => assert_eq!(p.price, anchor),
            PriceData::Series(_) => panic!("expected a point"),
        }
    }

    #[test]
    fn test_perturbation_stays_within_half_percent() {
        let anchor = Decimal::from_i64(10_000);
        for i in 0..100 {
            let p = perturb(anchor, "BTC", i);
            assert!(p >= Decimal::from_i64(9_950), "too low: {}", p);
            assert!(p <= Decimal::from_i64(10_050), "too high: {}", p);
        }
    }
}
