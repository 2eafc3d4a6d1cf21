//! Axis tick optimizer: picks a "nice" interval/axis-max pair for a value
//! range, Wilkinson-style. Pure; the chart layout is the only caller but the
//! scoring is useful on its own.

/// Resolved y-axis scale. `axis_min` is always 0 for price charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickScale {
    pub interval: f64,
    pub axis_min: f64,
    pub axis_max: f64,
    pub step_count: usize,
}

const BASES: [f64; 4] = [1.0, 2.0, 5.0, 10.0];
const POWER_RANGE: std::ops::RangeInclusive<i32> = -2..=6;
const MAX_TICKS: usize = 15;

const W_SIMPLICITY: f64 = 0.25;
const W_COVERAGE: f64 = 0.25;
const W_DENSITY: f64 = 0.45;
const W_OVERSHOOT: f64 = 0.05;

/// Chooses the interval/axis-max pair best balancing simplicity, coverage
/// and tick density for `max_value`. Falls back to a plain five-step split
/// when every candidate is filtered out.
pub fn optimize_ticks(max_value: f64, target_ticks: usize) -> TickScale {
    let mut best: Option<(f64, TickScale)> = None;

    if max_value > 0.0 {
        for power in POWER_RANGE {
            for (base_idx, base) in BASES.iter().enumerate() {
                let interval = base * 10f64.powi(power);
                if interval < 0.01 || interval > 2.0 * max_value {
                    continue;
                }
                let axis_max = (max_value / interval).ceil() * interval;
                let step_count = (axis_max / interval).round() as usize;
                let tick_count = step_count + 1;
                if tick_count > MAX_TICKS || step_count == 0 {
                    continue;
                }

                let simplicity = 1.0 - base_idx as f64 / (BASES.len() - 1) as f64;
                let coverage = max_value / axis_max;
                let density = {
                    let miss = (tick_count as f64 - target_ticks as f64).abs();
                    (1.0 - miss / target_ticks as f64).max(0.0)
                };
                let overshoot_ok = if axis_max > max_value * 1.2 { 0.0 } else { 1.0 };

                let score = W_SIMPLICITY * simplicity
                    + W_COVERAGE * coverage
                    + W_DENSITY * density
                    + W_OVERSHOOT * overshoot_ok;

                // Strict comparison keeps the first-generated candidate on ties.
                let beats = best.as_ref().map(|(s, _)| score > *s).unwrap_or(true);
                if beats {
                    best = Some((
                        score,
                        TickScale { interval, axis_min: 0.0, axis_max, step_count },
                    ));
                }
            }
        }
    }

    best.map(|(_, scale)| scale).unwrap_or_else(|| fallback(max_value))
}

fn fallback(max_value: f64) -> TickScale {
    let interval = (max_value / 5.0).ceil().max(1.0);
    TickScale {
        interval,
        axis_min: 0.0,
        axis_max: 5.0 * interval,
        step_count: 5,
    }
}
