//! Forecast uncertainty projector: linear-trend extrapolation with a
//! confidence band that grows with horizon and widens in a crisis regime.

use rand::Rng;
use serde::Serialize;

/// Named presets: six months of balance history each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Stable,
    Crisis,
    Growth,
    Cyclical,
}

impl Scenario {
    pub const ALL: [Scenario; 4] =
        [Scenario::Stable, Scenario::Crisis, Scenario::Growth, Scenario::Cyclical];

    pub fn history(&self) -> [f64; 6] {
        match self {
            Scenario::Stable => [4000.0, 4100.0, 3950.0, 4050.0, 4200.0, 4150.0],
            Scenario::Crisis => [5000.0, 4800.0, 4200.0, 3500.0, 2800.0, 2100.0],
            Scenario::Growth => [2000.0, 2500.0, 3100.0, 3800.0, 4600.0, 5500.0],
            Scenario::Cyclical => [3000.0, 4500.0, 3000.0, 4500.0, 3000.0, 4500.0],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Stable => "stable",
            Scenario::Crisis => "crisis",
            Scenario::Growth => "growth",
            Scenario::Cyclical => "cyclical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ForecastPoint {
    /// 1-based steps past the end of history.
    pub horizon: usize,
    pub value: f64,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectorConfig {
    /// Band growth per step under a non-negative trend.
    pub spread_normal: f64,
    /// Band growth per step when the historical trend is negative.
    pub spread_crisis: f64,
    /// Half-range of the uniform noise added to each projected value.
    pub noise: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self { spread_normal: 300.0, spread_crisis: 500.0, noise: 250.0 }
    }
}

/// Per-step linear trend of a history window.
pub fn trend(history: &[f64]) -> f64 {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) => (last - first) / history.len() as f64,
        _ => 0.0,
    }
}

/// Extrapolate `horizon` steps past the end of `history`.
///
/// Guarantees: `lower <= value <= upper`, all three non-negative, and the
/// band half-width is non-decreasing in the horizon.
pub fn project(
    history: &[f64],
    horizon: usize,
    cfg: &ProjectorConfig,
    rng: &mut impl Rng,
) -> Vec<ForecastPoint> {
    if history.is_empty() {
        return Vec::new();
    }
    let last = *history.last().expect("non-empty history");
    let step = trend(history);
    let spread = if step < 0.0 { cfg.spread_crisis } else { cfg.spread_normal };

    (1..=horizon)
        .map(|h| {
            let noise = (rng.gen::<f64>() - 0.5) * 2.0 * cfg.noise;
            let value = (last + step * h as f64 + noise).max(0.0).round();
            let uncertainty = h as f64 * spread;
            ForecastPoint {
                horizon: h,
                value,
                upper: (value + uncertainty).max(0.0).round(),
                lower: (value - uncertainty).max(0.0).round(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn growth_scenario_worked_example() {
        let history = Scenario::Growth.history();
        let t = trend(&history);
        assert!((t - 3500.0 / 6.0).abs() < 1e-9);

        let mut rng = StdRng::seed_from_u64(1);
        let points = project(&history, 4, &ProjectorConfig::default(), &mut rng);
        assert_eq!(points.len(), 4);
        // h=1 value ~ 5500 + 583.3, within the +-250 noise half-range
        let expected = 5500.0 + 3500.0 / 6.0;
        assert!((points[0].value - expected).abs() <= 251.0);
        // band at h=1 is +-300 around the value
        assert!((points[0].upper - points[0].value - 300.0).abs() < 1.0);
    }

    #[test]
    fn band_width_is_non_decreasing_and_bounds_ordered() {
        let mut rng = StdRng::seed_from_u64(2);
        for scenario in Scenario::ALL {
            let points = project(&scenario.history(), 8, &ProjectorConfig::default(), &mut rng);
            let mut prev_width = 0.0;
            for p in &points {
                assert!(p.lower >= 0.0);
                assert!(p.lower <= p.value && p.value <= p.upper, "{:?}", p);
                let width = p.upper - p.value;
                assert!(width + 1e-9 >= prev_width, "band shrank: {:?}", points);
                prev_width = width;
            }
        }
    }

    #[test]
    fn crisis_regime_widens_the_band() {
        let mut rng = StdRng::seed_from_u64(3);
        let cfg = ProjectorConfig::default();
        let crisis = project(&Scenario::Crisis.history(), 3, &cfg, &mut rng);
        let stable = project(&Scenario::Stable.history(), 3, &cfg, &mut rng);
        // crisis trend is negative, so per-step spread is 500 vs 300
        let crisis_width = crisis[2].upper - crisis[2].value;
        let stable_width = stable[2].upper - stable[2].value;
        assert!(crisis_width > stable_width);
    }

    #[test]
    fn lower_bound_never_negative_even_in_freefall() {
        let mut rng = StdRng::seed_from_u64(4);
        let history = [900.0, 700.0, 500.0, 300.0, 150.0, 50.0];
        let points = project(&history, 6, &ProjectorConfig::default(), &mut rng);
        assert!(points.iter().all(|p| p.lower >= 0.0 && p.value >= 0.0));
    }

    #[test]
    fn empty_history_projects_nothing() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(project(&[], 4, &ProjectorConfig::default(), &mut rng).is_empty());
    }
}
