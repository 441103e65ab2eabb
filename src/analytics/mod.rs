//! Risk statistics over daily price series.
//!
//! These are ratio-valued metrics, so the math runs in f64 rather than the
//! ledger's decimal type. Conversion happens once at the series boundary.
//! All statistics need at least two points to produce daily returns; with
//! fewer, they return None rather than a fabricated number.

use serde::Serialize;

use crate::domain::{Decimal, PricePoint};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DEFAULT_RISK_FREE_RATE: f64 = 0.01;
const VAR_CONFIDENCE: f64 = 0.95;

/// Risk metrics for one asset over a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    /// Deepest peak-to-trough decline, as a negative fraction.
    pub max_drawdown: Option<f64>,
    /// Annualized Sharpe ratio against a 1% risk-free rate.
    pub sharpe_ratio: Option<f64>,
    /// One-day 95% value at risk: the 5th percentile of daily returns.
    pub value_at_risk: Option<f64>,
    /// Annualized volatility of daily returns.
    pub volatility: Option<f64>,
    /// Number of price points the metrics were computed from.
    pub sample_size: usize,
}

/// Compute the full risk summary for a daily price series.
pub fn risk_summary(series: &[PricePoint]) -> RiskSummary {
    let prices = to_f64_series(series);
    RiskSummary {
        max_drawdown: max_drawdown(&prices),
        sharpe_ratio: sharpe_ratio(&prices, DEFAULT_RISK_FREE_RATE),
        value_at_risk: value_at_risk(&prices, VAR_CONFIDENCE),
        volatility: annualized_volatility(&prices),
        sample_size: prices.len(),
    }
}

fn to_f64_series(series: &[PricePoint]) -> Vec<f64> {
    series
        .iter()
        .map(|p| Decimal::to_f64(&p.price))
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect()
}

/// Deepest decline from a running peak, as a fraction of that peak. Always
/// <= 0; exactly 0 for a series that never falls.
pub fn max_drawdown(prices: &[f64]) -> Option<f64> {
    if prices.len() < 2 {
        return None;
    }
    let mut peak = prices[0];
    let mut worst = 0.0f64;
    for &price in prices {
        if price > peak {
            peak = price;
        }
        let drawdown = (price - peak) / peak;
        if drawdown < worst {
            worst = drawdown;
        }
    }
    Some(worst)
}

/// Annualized Sharpe ratio over daily excess returns. None when returns are
/// flat (zero variance) or the series is too short.
pub fn sharpe_ratio(prices: &[f64], risk_free_rate: f64) -> Option<f64> {
    let returns = daily_returns(prices)?;
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();

    let mean = mean(&excess);
    let sd = sample_std_dev(&excess)?;
    if sd == 0.0 {
        return None;
    }
    Some(mean / sd * TRADING_DAYS_PER_YEAR.sqrt())
}

/// One-day value at risk at the given confidence: the (1 - confidence)
/// quantile of daily returns, linearly interpolated. A loss reads as a
/// negative return.
pub fn value_at_risk(prices: &[f64], confidence: f64) -> Option<f64> {
    let mut returns = daily_returns(prices)?;
    returns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(percentile_sorted(&returns, (1.0 - confidence) * 100.0))
}

/// Annualized standard deviation of daily returns.
pub fn annualized_volatility(prices: &[f64]) -> Option<f64> {
    let returns = daily_returns(prices)?;
    let sd = sample_std_dev(&returns)?;
    Some(sd * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Day-over-day fractional returns. None when fewer than two prices exist.
fn daily_returns(prices: &[f64]) -> Option<Vec<f64>> {
    if prices.len() < 2 {
        return None;
    }
    Some(
        prices
            .windows(2)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect(),
    )
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). None for fewer than two
/// observations.
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Linearly interpolated percentile of a pre-sorted slice, 0..=100.
fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = pct / 100.0 * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeMs;

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint {
                time_ms: TimeMs::new(i as i64 * 86_400_000),
                price: Decimal::from_f64(p).unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_max_drawdown_peak_to_trough() {
        // Peak 120, trough 60 afterwards: drawdown -0.5.
        let prices = [100.0, 120.0, 90.0, 60.0, 80.0];
        let dd = max_drawdown(&prices).unwrap();
        assert!((dd - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_max_drawdown_monotonic_rise_is_zero() {
        let prices = [100.0, 110.0, 125.0];
        assert_eq!(max_drawdown(&prices), Some(0.0));
    }

    #[test]
    fn test_sharpe_flat_series_undefined() {
        let prices = [100.0, 100.0, 100.0, 100.0];
        assert_eq!(sharpe_ratio(&prices, 0.01), None);
    }

    #[test]
    fn test_sharpe_positive_for_steady_growth() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        // Constant 1% daily growth has near-zero return variance; use a
        // mildly noisy series instead.
        let noisy: Vec<f64> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| p * if i % 2 == 0 { 1.002 } else { 0.998 })
            .collect();
        let sharpe = sharpe_ratio(&noisy, 0.01).unwrap();
        assert!(sharpe > 0.0);
    }

    #[test]
    fn test_value_at_risk_is_low_percentile() {
        // Returns: +0.10, -0.20, +0.05, -0.10. Sorted: -0.20, -0.10, 0.05,
        // 0.10. The 5th percentile sits between the two worst returns.
        let prices = [100.0, 110.0, 88.0, 92.4, 83.16];
        let var = value_at_risk(&prices, 0.95).unwrap();
        assert!(var < -0.10 && var > -0.20, "var = {}", var);
    }

    #[test]
    fn test_volatility_scales_with_dispersion() {
        let calm = [100.0, 100.5, 100.2, 100.7, 100.4];
        let wild = [100.0, 115.0, 92.0, 120.0, 85.0];
        let calm_vol = annualized_volatility(&calm).unwrap();
        let wild_vol = annualized_volatility(&wild).unwrap();
        assert!(wild_vol > calm_vol);
    }

    #[test]
    fn test_short_series_yields_no_metrics() {
        let summary = risk_summary(&series(&[100.0]));
        assert_eq!(summary.max_drawdown, None);
        assert_eq!(summary.sharpe_ratio, None);
        assert_eq!(summary.value_at_risk, None);
        assert_eq!(summary.volatility, None);
        assert_eq!(summary.sample_size, 1);
    }

    #[test]
    fn test_summary_skips_non_positive_prices() {
        let mut pts = series(&[100.0, 110.0, 105.0]);
        pts.push(PricePoint {
            time_ms: TimeMs::new(3 * 86_400_000),
            price: Decimal::zero(),
        });
        let summary = risk_summary(&pts);
        assert_eq!(summary.sample_size, 3);
    }
}
