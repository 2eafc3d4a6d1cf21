use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point of the daily price series. Series are kept ascending by date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Canonical daily-answer record. Immutable once loaded for the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub name: String,
    /// Base ticker used for matching, market suffix stripped ("EQNR").
    pub ticker: String,
    /// Ticker as published, suffix preserved ("EQNR.OL").
    pub display_ticker: String,
    pub sector: String,
    pub industry: String,
    pub employees: u64,
    pub headquarters: String,
    pub description: String,
    /// Human-scale label ("24.1 mrd NOK"), never a raw number.
    pub market_cap: String,
    pub price_52w_high: f64,
    pub price_52w_low: f64,
    pub current_price: f64,
    pub performance_1y: f64,
    pub performance_2y: f64,
    pub performance_5y: f64,
    /// Annualized volatility in percent, from trailing daily returns.
    pub volatility: f64,
    pub difficulty: Difficulty,
    pub chart_series: Vec<ChartPoint>,
}

/// Guessable-universe entry, one per listed company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub ticker: String,
    pub display_ticker: String,
    pub sector: String,
}

/// Optional per-ticker financial metrics document, keyed by base ticker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub net_income: Option<f64>,
    pub target_price: Option<f64>,
    pub revenue_formatted: Option<String>,
    pub ebitda_formatted: Option<String>,
    pub net_income_formatted: Option<String>,
    pub target_price_formatted: Option<String>,
}

/// Optional sector/industry lookup entry, keyed by base ticker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorInfo {
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub industry: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Rates how hard a company is to guess. Smaller, more volatile and
    /// less familiar companies score higher.
    pub fn rate(
        market_cap_raw: f64,
        volatility: f64,
        performance_1y: f64,
        performance_5y: f64,
        sector: &str,
    ) -> Self {
        let mut score = 0u32;

        score += if market_cap_raw < 1e9 {
            3
        } else if market_cap_raw < 10e9 {
            2
        } else {
            1
        };

        score += if volatility > 50.0 {
            3
        } else if volatility > 30.0 {
            2
        } else {
            1
        };

        if performance_1y.abs() > 100.0 || performance_5y.abs() > 500.0 {
            score += 2;
        }

        let sector = sector.to_lowercase();
        if ["technology", "consumer", "healthcare"]
            .iter()
            .any(|s| sector.contains(s))
        {
            // widely known sectors, no extra difficulty
        } else if ["utilities", "real estate"].iter().any(|s| sector.contains(s)) {
            score += 1;
        } else {
            score += 2;
        }

        if score <= 4 {
            Difficulty::Easy
        } else if score <= 7 {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

/// Strips a trailing market suffix ("EQNR.OL" -> "EQNR"). Upper-cases first.
pub fn base_ticker(ticker: &str) -> String {
    let t = ticker.trim().to_uppercase();
    match t.find('.') {
        Some(i) => t[..i].to_string(),
        None => t,
    }
}

/// Buckets a raw market cap into the label format used throughout the game.
pub fn format_market_cap(value: f64) -> String {
    if value >= 1e12 {
        format!("{:.1} bill NOK", value / 1e12)
    } else if value >= 1e9 {
        format!("{:.1} mrd NOK", value / 1e9)
    } else {
        format!("{:.0} mill NOK", value / 1e6)
    }
}
