//! Chart layout engine: maps the normalized price series into pixel space
//! and places gridlines and labels without overlap. Recomputation is
//! idempotent; callers redraw from scratch on every viewport change.

use chrono::Datelike;
use serde_json::json;

use crate::logging::{log, obj, Domain, Level};
use crate::model::ChartPoint;
use crate::ticks::{optimize_ticks, TickScale};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// Vertical year gridline, positioned by elapsed calendar time.
#[derive(Debug, Clone, PartialEq)]
pub struct YearLine {
    pub x: f64,
    pub label: String,
}

/// Horizontal price gridline with its axis label.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLine {
    pub y: f64,
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub points: Vec<PixelPoint>,
    pub year_lines: Vec<YearLine>,
    pub price_lines: Vec<PriceLine>,
    /// Rightmost edge of the plot area; the "today" marker sits here.
    pub today_x: f64,
    pub scale: TickScale,
}

/// Viewports narrower than this get mobile treatment: wider relative
/// padding and fewer ticks.
const NARROW_WIDTH: f64 = 600.0;
const PAD_FRACTION_WIDE: f64 = 0.06;
const PAD_FRACTION_NARROW: f64 = 0.12;
const VERTICAL_PAD: f64 = 20.0;
const IDEAL_PX_PER_TICK: f64 = 40.0;
const MAX_TICKS_WIDE: usize = 8;
const MAX_TICKS_NARROW: usize = 5;
const HEADROOM: f64 = 1.05;
/// Minimum pixel gap between the first two year labels before the earliest
/// ("IPO") label is dropped.
const MIN_YEAR_LABEL_GAP: f64 = 50.0;

/// Computes the full layout, or `None` when the series or viewport is not
/// chartable yet. `None` is not an error; callers retry on the next render
/// opportunity.
pub fn layout(series: &[ChartPoint], width: f64, height: f64) -> Option<ChartLayout> {
    if series.len() < 2 || width <= 0.0 || height <= 0.0 {
        log(
            Level::Debug,
            Domain::Chart,
            "layout_deferred",
            obj(&[("points", json!(series.len())), ("w", json!(width)), ("h", json!(height))]),
        );
        return None;
    }

    let narrow = width < NARROW_WIDTH;
    let h_pad = width * if narrow { PAD_FRACTION_NARROW } else { PAD_FRACTION_WIDE };
    let plot_w = width - 2.0 * h_pad;
    let plot_h = height - 2.0 * VERTICAL_PAD;
    if plot_w <= 0.0 || plot_h <= 0.0 {
        return None;
    }

    let observed_max = series.iter().map(|p| p.price).fold(f64::MIN, f64::max);
    let tick_cap = if narrow { MAX_TICKS_NARROW } else { MAX_TICKS_WIDE };
    let target_ticks = ((plot_h / IDEAL_PX_PER_TICK) as usize).clamp(2, tick_cap);
    let scale = optimize_ticks(observed_max * HEADROOM, target_ticks);

    let y_of = |price: f64| height - VERTICAL_PAD - price / scale.axis_max * plot_h;

    // X positions are linear in index; year gridlines below use real
    // elapsed time instead.
    let n = series.len();
    let points: Vec<PixelPoint> = series
        .iter()
        .enumerate()
        .map(|(i, p)| PixelPoint {
            x: h_pad + i as f64 / (n - 1) as f64 * plot_w,
            y: y_of(p.price),
        })
        .collect();

    let price_lines: Vec<PriceLine> = (0..=scale.step_count)
        .map(|i| {
            let value = i as f64 * scale.interval;
            PriceLine { y: y_of(value), value, label: format_price(value, scale.interval) }
        })
        .collect();

    let year_lines = place_year_lines(series, h_pad, plot_w);

    Some(ChartLayout {
        points,
        year_lines,
        price_lines,
        today_x: h_pad + plot_w,
        scale,
    })
}

/// Year gridlines sit at the true elapsed-time fraction of each January 1
/// between the first and last data date, so unevenly sampled series still
/// place them correctly. The leading line marks the series start.
fn place_year_lines(series: &[ChartPoint], h_pad: f64, plot_w: f64) -> Vec<YearLine> {
    let first = series[0].date;
    let last = series[series.len() - 1].date;
    let span_days = (last - first).num_days();
    if span_days <= 0 {
        return Vec::new();
    }

    let mut lines = vec![YearLine { x: h_pad, label: first.year().to_string() }];
    for year in first.year() + 1..=last.year() {
        let jan1 = match chrono::NaiveDate::from_ymd_opt(year, 1, 1) {
            Some(d) if d > first && d <= last => d,
            _ => continue,
        };
        let frac = (jan1 - first).num_days() as f64 / span_days as f64;
        lines.push(YearLine { x: h_pad + frac * plot_w, label: year.to_string() });
    }

    // The earliest label loses when it would crowd its neighbor.
    if lines.len() >= 2 && lines[1].x - lines[0].x < MIN_YEAR_LABEL_GAP {
        lines.remove(0);
    }
    lines
}

fn format_price(value: f64, interval: f64) -> String {
    if interval >= 1.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pt(date: &str, price: f64) -> ChartPoint {
        ChartPoint {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            price,
        }
    }

    fn sample_series() -> Vec<ChartPoint> {
        vec![
            pt("2020-06-15", 80.0),
            pt("2021-03-01", 95.0),
            pt("2022-01-10", 120.0),
            pt("2023-07-01", 100.0),
            pt("2024-12-30", 140.0),
        ]
    }

    // ==========================================================================
    // Retry semantics
    // ==========================================================================

    #[test]
    fn test_too_few_points_defers() {
        assert!(layout(&[pt("2024-01-01", 10.0)], 800.0, 400.0).is_none());
        assert!(layout(&[], 800.0, 400.0).is_none());
    }

    #[test]
    fn test_zero_viewport_defers() {
        let series = sample_series();
        assert!(layout(&series, 0.0, 400.0).is_none());
        assert!(layout(&series, 800.0, 0.0).is_none());
    }

    #[test]
    fn test_idempotent_recompute() {
        let series = sample_series();
        let a = layout(&series, 800.0, 400.0).unwrap();
        let b = layout(&series, 800.0, 400.0).unwrap();
        assert_eq!(a, b);
    }

    // ==========================================================================
    // Geometry
    // ==========================================================================

    #[test]
    fn test_points_span_plot_area() {
        let series = sample_series();
        let l = layout(&series, 800.0, 400.0).unwrap();
        assert_eq!(l.points.len(), series.len());
        let pad = 800.0 * PAD_FRACTION_WIDE;
        assert!((l.points[0].x - pad).abs() < 1e-9);
        assert!((l.points.last().unwrap().x - (800.0 - pad)).abs() < 1e-9);
        assert!((l.today_x - (800.0 - pad)).abs() < 1e-9);
    }

    #[test]
    fn test_y_axis_covers_observed_max_with_headroom() {
        let series = sample_series();
        let l = layout(&series, 800.0, 400.0).unwrap();
        assert!(l.scale.axis_max >= 140.0 * HEADROOM - 1e-9);
        // All points inside the vertical plot area.
        for p in &l.points {
            assert!(p.y >= VERTICAL_PAD - 1e-9);
            assert!(p.y <= 400.0 - VERTICAL_PAD + 1e-9);
        }
    }

    #[test]
    fn test_narrow_viewport_gets_wider_padding_and_fewer_ticks() {
        let series = sample_series();
        let wide = layout(&series, 1000.0, 500.0).unwrap();
        let narrow = layout(&series, 320.0, 500.0).unwrap();
        let wide_pad = wide.points[0].x / 1000.0;
        let narrow_pad = narrow.points[0].x / 320.0;
        assert!(narrow_pad > wide_pad);
        assert!(narrow.price_lines.len() <= MAX_TICKS_NARROW + 1);
    }

    #[test]
    fn test_price_lines_match_scale() {
        let series = sample_series();
        let l = layout(&series, 800.0, 400.0).unwrap();
        assert_eq!(l.price_lines.len(), l.scale.step_count + 1);
        assert_eq!(l.price_lines[0].value, 0.0);
        let top = l.price_lines.last().unwrap();
        assert!((top.value - l.scale.axis_max).abs() < 1e-9);
        // y=0 price sits at the bottom of the plot, axis max at the top.
        assert!(l.price_lines[0].y > top.y);
    }

    // ==========================================================================
    // Year gridlines
    // ==========================================================================

    #[test]
    fn test_year_lines_positioned_by_elapsed_time() {
        // Uneven sampling: most points early, one late. Jan 1 2024 must land
        // at the date fraction, not the index fraction.
        let series = vec![
            pt("2023-01-01", 10.0),
            pt("2023-01-02", 11.0),
            pt("2023-01-03", 12.0),
            pt("2025-01-01", 20.0),
        ];
        let l = layout(&series, 1000.0, 400.0).unwrap();
        let line_2024 = l.year_lines.iter().find(|y| y.label == "2024").unwrap();
        let pad = 1000.0 * PAD_FRACTION_WIDE;
        let plot_w = 1000.0 - 2.0 * pad;
        let span = (NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
            - NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
        .num_days() as f64;
        let elapsed = (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
            - NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
        .num_days() as f64;
        let expected = pad + elapsed / span * plot_w;
        assert!((line_2024.x - expected).abs() < 1e-6);
    }

    #[test]
    fn test_crowded_first_label_dropped() {
        // Series starts late in December; the start label and the January
        // line would collide, so the start label goes.
        let series = vec![
            pt("2023-12-28", 10.0),
            pt("2024-06-01", 12.0),
            pt("2024-12-30", 15.0),
        ];
        let l = layout(&series, 800.0, 400.0).unwrap();
        assert!(l.year_lines.iter().all(|y| y.label != "2023"));
        assert!(l.year_lines.iter().any(|y| y.label == "2024"));
    }

    #[test]
    fn test_spaced_first_label_kept() {
        let series = sample_series();
        let l = layout(&series, 1200.0, 400.0).unwrap();
        assert_eq!(l.year_lines[0].label, "2020");
        assert!(l.year_lines.iter().any(|y| y.label == "2024"));
    }
}
