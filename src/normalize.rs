//! Ingestion of the static game documents. The daily answer arrives in one
//! of two historical shapes and the roster in one of three; both are
//! resolved here, exactly once, into the canonical records in `model`.
//! Downstream code never re-sniffs JSON.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::metrics::{derive_metrics, round2};
use crate::model::{base_ticker, format_market_cap, ChartPoint, Difficulty, RosterEntry, StockRecord};

/// Raw daily-answer record as published by the data generator. Field names
/// follow the wire format; everything optional except the ticker.
#[derive(Debug, Deserialize)]
struct RawStock {
    ticker: String,
    #[serde(alias = "name")]
    company_name: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    employees: Option<u64>,
    #[serde(default)]
    headquarters: Option<String>,
    #[serde(default)]
    description: Option<String>,
    /// Raw number or pre-formatted label, depending on generator vintage.
    #[serde(default)]
    market_cap: Option<Value>,
    #[serde(default)]
    market_cap_formatted: Option<String>,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    price_52w_high: Option<f64>,
    #[serde(default)]
    price_52w_low: Option<f64>,
    #[serde(default)]
    performance_1y: Option<f64>,
    #[serde(default)]
    performance_2y: Option<f64>,
    #[serde(default)]
    performance_5y: Option<f64>,
    #[serde(default)]
    volatility: Option<f64>,
    #[serde(default)]
    chart_data: Vec<ChartPoint>,
}

/// The two daily-document shapes, resolved by flat-shape markers.
enum DailyShape<'a> {
    Flat(&'a Value),
    Nested(&'a Value),
}

fn resolve_daily_shape(raw: &Value) -> Result<DailyShape<'_>> {
    let object = raw.as_object().context("daily document is not a JSON object")?;
    if ["ticker", "company_name", "chart_data"].iter().any(|k| object.contains_key(*k)) {
        return Ok(DailyShape::Flat(raw));
    }
    if let Some(info) = raw.pointer("/stock/info") {
        return Ok(DailyShape::Nested(info));
    }
    bail!("unrecognized daily document shape")
}

/// Normalizes a daily-answer document into a `StockRecord`.
///
/// With at least 2 chart points the derived metrics overwrite any
/// author-supplied performance and price-range fields; precomputed values
/// are treated as stale.
pub fn normalize_daily(raw: &Value) -> Result<StockRecord> {
    let inner = match resolve_daily_shape(raw)? {
        DailyShape::Flat(v) | DailyShape::Nested(v) => v,
    };
    let stock: RawStock =
        serde_json::from_value(inner.clone()).context("malformed daily stock record")?;
    if stock.ticker.trim().is_empty() {
        bail!("daily stock record has an empty ticker");
    }

    let display_ticker = stock.ticker.trim().to_uppercase();
    let ticker = base_ticker(&display_ticker);
    let name = stock
        .company_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| ticker.clone());

    let mut series = stock.chart_data;
    series.sort_by_key(|p| p.date);
    let series = smooth_price_anomalies(series);

    let market_cap_raw = stock
        .market_cap
        .as_ref()
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let market_cap = match (stock.market_cap_formatted, stock.market_cap) {
        (Some(label), _) => label,
        (None, Some(Value::String(label))) => label,
        (None, Some(v)) => v.as_f64().map(format_market_cap).unwrap_or_default(),
        (None, None) => String::new(),
    };

    let mut record = StockRecord {
        name,
        ticker,
        display_ticker,
        sector: stock.sector.unwrap_or_default(),
        industry: stock.industry.unwrap_or_default(),
        employees: stock.employees.unwrap_or(0),
        headquarters: stock.headquarters.unwrap_or_default(),
        description: stock.description.unwrap_or_default(),
        market_cap,
        price_52w_high: stock.price_52w_high.unwrap_or(0.0),
        price_52w_low: stock.price_52w_low.unwrap_or(0.0),
        current_price: stock.current_price.unwrap_or(0.0),
        performance_1y: stock.performance_1y.unwrap_or(0.0),
        performance_2y: stock.performance_2y.unwrap_or(0.0),
        performance_5y: stock.performance_5y.unwrap_or(0.0),
        volatility: stock.volatility.unwrap_or(0.0),
        difficulty: Difficulty::Easy,
        chart_series: series,
    };

    if record.chart_series.len() >= 2 {
        let derived = derive_metrics(&record.chart_series);
        record.performance_1y = derived.performance_1y;
        record.performance_2y = derived.performance_2y;
        record.performance_5y = derived.performance_5y;
        record.volatility = derived.volatility;
        record.price_52w_high = derived.price_52w_high;
        record.price_52w_low = derived.price_52w_low;
        record.current_price = derived.current_price;
    }
    record.difficulty = Difficulty::rate(
        market_cap_raw,
        record.volatility,
        record.performance_1y,
        record.performance_5y,
        &record.sector,
    );

    log(
        Level::Info,
        Domain::Data,
        "daily_normalized",
        obj(&[
            ("ticker", v_str(&record.ticker)),
            ("points", json!(record.chart_series.len())),
        ]),
    );
    Ok(record)
}

/// Normalizes a roster document. Accepts a bare array, `{stocks: [...]}` or
/// a ticker-keyed object; entries missing a usable name or ticker are
/// dropped.
pub fn normalize_roster(raw: &Value) -> Result<Vec<RosterEntry>> {
    let items: Vec<(Option<String>, Value)> = if let Some(list) = raw.as_array() {
        list.iter().map(|v| (None, v.clone())).collect()
    } else if let Some(list) = raw.get("stocks").and_then(Value::as_array) {
        list.iter().map(|v| (None, v.clone())).collect()
    } else if let Some(map) = raw.as_object() {
        map.iter().map(|(k, v)| (Some(k.clone()), v.clone())).collect()
    } else {
        bail!("unsupported roster document shape; expected array, stocks wrapper or keyed object");
    };

    let mut entries = Vec::new();
    for (key, item) in items {
        let get = |field: &str| {
            item.get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let ticker_raw = get("ticker").or_else(|| get("symbol")).or(key);
        let name = get("name")
            .or_else(|| get("company_name"))
            .or_else(|| ticker_raw.clone());
        let (Some(name), Some(ticker_raw)) = (name, ticker_raw) else {
            continue;
        };
        let display_ticker = ticker_raw.to_uppercase();
        entries.push(RosterEntry {
            name,
            ticker: base_ticker(&display_ticker),
            display_ticker,
            sector: get("sector").unwrap_or_default(),
        });
    }

    if entries.is_empty() {
        bail!("roster document contains no usable entries");
    }
    Ok(entries)
}

/// Window parameters for anomaly smoothing, matched to the data generator.
const SMOOTH_MIN_POINTS: usize = 10;
const SMOOTH_THRESHOLD: f64 = 3.0;

/// Replaces single-point price spikes with the neighbor average (rolling
/// median detection). Bad exchange prints otherwise dominate the y-axis.
pub fn smooth_price_anomalies(series: Vec<ChartPoint>) -> Vec<ChartPoint> {
    if series.len() < SMOOTH_MIN_POINTS {
        return series;
    }
    let window = (series.len() / 4).min(10);
    let mut out = series.clone();

    for i in 0..out.len() {
        let start = i.saturating_sub(window / 2);
        let end = (i + window / 2 + 1).min(out.len());
        let mut prices: Vec<f64> = out[start..end].iter().map(|p| p.price).collect();
        prices.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = prices.len();
        let median = if n % 2 == 1 {
            prices[n / 2]
        } else {
            (prices[n / 2 - 1] + prices[n / 2]) / 2.0
        };
        if median <= 0.0 {
            continue;
        }

        let price = out[i].price;
        if price > median * SMOOTH_THRESHOLD || price < median / SMOOTH_THRESHOLD {
            let replacement = if i == 0 || i == out.len() - 1 {
                median
            } else {
                (out[i - 1].price + out[i + 1].price) / 2.0
            };
            log(
                Level::Warn,
                Domain::Data,
                "price_anomaly_smoothed",
                obj(&[
                    ("date", v_str(&out[i].date.to_string())),
                    ("from", json!(price)),
                    ("to", json!(round2(replacement))),
                ]),
            );
            out[i].price = round2(replacement);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_doc() -> Value {
        json!({
            "company_name": "Equinor ASA",
            "ticker": "EQNR.OL",
            "sector": "Energy",
            "industry": "Oil & Gas Integrated",
            "employees": 23000,
            "headquarters": "Stavanger, Norway",
            "description": "Integrated energy company.",
            "market_cap": 700.0e9,
            "current_price": 1.0,
            "price_52w_high": 1.0,
            "price_52w_low": 1.0,
            "performance_5y": -99.0,
            "chart_data": [
                {"date": "2020-01-01", "price": 100.0},
                {"date": "2025-01-01", "price": 150.0}
            ]
        })
    }

    // ==========================================================================
    // Daily document shapes
    // ==========================================================================

    #[test]
    fn test_flat_shape_normalizes() {
        let record = normalize_daily(&flat_doc()).unwrap();
        assert_eq!(record.name, "Equinor ASA");
        assert_eq!(record.ticker, "EQNR");
        assert_eq!(record.display_ticker, "EQNR.OL");
        assert_eq!(record.sector, "Energy");
        assert_eq!(record.chart_series.len(), 2);
    }

    #[test]
    fn test_nested_shape_normalizes() {
        let nested = json!({"stock": {"info": flat_doc()}});
        let record = normalize_daily(&nested).unwrap();
        assert_eq!(record.ticker, "EQNR");
    }

    #[test]
    fn test_unrecognized_shape_rejected() {
        assert!(normalize_daily(&json!({"foo": "bar"})).is_err());
        assert!(normalize_daily(&json!([1, 2, 3])).is_err());
        assert!(normalize_daily(&json!({"ticker": ""})).is_err());
    }

    #[test]
    fn test_derived_metrics_overwrite_stale_fields() {
        let record = normalize_daily(&flat_doc()).unwrap();
        // Author-supplied performance_5y=-99 and price range 1.0 are stale.
        assert_eq!(record.performance_5y, 50.0);
        assert_eq!(record.price_52w_high, 150.0);
        assert_eq!(record.price_52w_low, 150.0);
        assert_eq!(record.current_price, 150.0);
    }

    #[test]
    fn test_short_series_keeps_supplied_fields() {
        let mut doc = flat_doc();
        doc["chart_data"] = json!([{"date": "2025-01-01", "price": 150.0}]);
        let record = normalize_daily(&doc).unwrap();
        assert_eq!(record.performance_5y, -99.0);
        assert_eq!(record.current_price, 1.0);
    }

    #[test]
    fn test_numeric_market_cap_bucketed() {
        let record = normalize_daily(&flat_doc()).unwrap();
        assert_eq!(record.market_cap, "700.0 mrd NOK");
    }

    #[test]
    fn test_preformatted_market_cap_passes_through() {
        let mut doc = flat_doc();
        doc["market_cap"] = json!("ca. 700 mrd NOK");
        let record = normalize_daily(&doc).unwrap();
        assert_eq!(record.market_cap, "ca. 700 mrd NOK");
    }

    #[test]
    fn test_unsorted_chart_data_sorted_ascending() {
        let mut doc = flat_doc();
        doc["chart_data"] = json!([
            {"date": "2025-01-01", "price": 150.0},
            {"date": "2020-01-01", "price": 100.0}
        ]);
        let record = normalize_daily(&doc).unwrap();
        assert!(record.chart_series[0].date < record.chart_series[1].date);
        assert_eq!(record.performance_5y, 50.0);
    }

    // ==========================================================================
    // Roster shapes
    // ==========================================================================

    #[test]
    fn test_roster_array_shape() {
        let raw = json!([
            {"name": "Equinor", "ticker": "EQNR.OL", "sector": "Energy"},
            {"name": "DNB Bank", "symbol": "DNB.OL"},
            {"name": "No Ticker Corp"}
        ]);
        let entries = normalize_roster(&raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ticker, "EQNR");
        assert_eq!(entries[0].display_ticker, "EQNR.OL");
        assert_eq!(entries[1].ticker, "DNB");
        assert_eq!(entries[1].sector, "");
    }

    #[test]
    fn test_roster_stocks_wrapper_shape() {
        let raw = json!({"stocks": [{"name": "Mowi", "ticker": "MOWI.OL"}]});
        let entries = normalize_roster(&raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ticker, "MOWI");
    }

    #[test]
    fn test_roster_keyed_object_shape() {
        let raw = json!({
            "TEL.OL": {"name": "Telenor", "sector": "Communication Services"},
            "NHY.OL": {"name": "Norsk Hydro"}
        });
        let mut entries = normalize_roster(&raw).unwrap();
        entries.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ticker, "NHY");
        assert_eq!(entries[1].name, "Telenor");
        assert_eq!(entries[1].display_ticker, "TEL.OL");
    }

    #[test]
    fn test_roster_empty_rejected() {
        assert!(normalize_roster(&json!([])).is_err());
        assert!(normalize_roster(&json!("nope")).is_err());
    }

    // ==========================================================================
    // Anomaly smoothing
    // ==========================================================================

    fn pt(day: u32, price: f64) -> ChartPoint {
        ChartPoint {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            price,
        }
    }

    #[test]
    fn test_spike_replaced_by_neighbor_average() {
        let mut series: Vec<ChartPoint> = (1..=12).map(|d| pt(d, 100.0)).collect();
        series[6].price = 1000.0; // bad print
        let smoothed = smooth_price_anomalies(series);
        assert_eq!(smoothed[6].price, 100.0);
    }

    #[test]
    fn test_short_series_untouched() {
        let series = vec![pt(1, 100.0), pt(2, 1000.0)];
        let smoothed = smooth_price_anomalies(series.clone());
        assert_eq!(smoothed, series);
    }

    #[test]
    fn test_normal_series_unchanged() {
        let series: Vec<ChartPoint> = (1..=20).map(|d| pt(d, 100.0 + d as f64)).collect();
        let smoothed = smooth_price_anomalies(series.clone());
        assert_eq!(smoothed, series);
    }
}
