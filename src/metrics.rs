//! Derived price metrics. Pure functions over an ordered chart series;
//! authoritative over any precomputed fields carried by the raw documents.

use chrono::Months;

use crate::model::ChartPoint;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    pub performance_1y: f64,
    pub performance_2y: f64,
    pub performance_5y: f64,
    pub volatility: f64,
    pub price_52w_high: f64,
    pub price_52w_low: f64,
    pub current_price: f64,
}

/// Window of trailing points used for the volatility estimate (~1 trading year).
const VOLATILITY_WINDOW: usize = 252;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pct_change(old: f64, new: f64) -> f64 {
    if old <= 0.0 {
        0.0
    } else {
        (new - old) / old * 100.0
    }
}

/// First price at or after `target`; series start when nothing qualifies.
fn price_on_or_after(series: &[ChartPoint], target: chrono::NaiveDate) -> f64 {
    series
        .iter()
        .find(|p| p.date >= target)
        .map(|p| p.price)
        .unwrap_or(series[0].price)
}

/// Computes performance, 52-week range and volatility from a series with
/// at least 2 points, ascending by date.
pub fn derive_metrics(series: &[ChartPoint]) -> DerivedMetrics {
    if series.len() < 2 {
        return DerivedMetrics::default();
    }
    let last = series[series.len() - 1];

    let years_back = |n: u32| {
        last.date
            .checked_sub_months(Months::new(12 * n))
            .unwrap_or(series[0].date)
    };

    let one_year_ago = years_back(1);
    let in_trailing_year: Vec<f64> = series
        .iter()
        .filter(|p| p.date >= one_year_ago)
        .map(|p| p.price)
        .collect();
    // The last point always falls within its own trailing year.
    let high = in_trailing_year.iter().cloned().fold(f64::MIN, f64::max);
    let low = in_trailing_year.iter().cloned().fold(f64::MAX, f64::min);

    DerivedMetrics {
        performance_1y: round2(pct_change(price_on_or_after(series, one_year_ago), last.price)),
        performance_2y: round2(pct_change(price_on_or_after(series, years_back(2)), last.price)),
        performance_5y: round2(pct_change(price_on_or_after(series, years_back(5)), last.price)),
        volatility: round2(annualized_volatility(series)),
        price_52w_high: round2(high),
        price_52w_low: round2(low),
        current_price: round2(last.price),
    }
}

/// Annualized volatility in percent from daily returns over the trailing
/// window.
fn annualized_volatility(series: &[ChartPoint]) -> f64 {
    let start = series.len().saturating_sub(VOLATILITY_WINDOW);
    let sample = &series[start..];
    let mut returns = Vec::with_capacity(sample.len());
    for w in sample.windows(2) {
        if w[0].price > 0.0 {
            returns.push((w[1].price - w[0].price) / w[0].price);
        }
    }
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    variance.sqrt() * (252.0_f64).sqrt() * 100.0
}
