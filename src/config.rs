//! Engine configuration with env-var overrides.
//!
//! Defaults mirror the constants the interactive lab was tuned with; every
//! knob can be overridden for experiments without recompiling.

#[derive(Clone, Debug)]
pub struct Config {
    /// Bounded telemetry log capacity (entries kept, oldest dropped first).
    pub telemetry_capacity: usize,

    // Seer (regression forecast) trainer
    pub seer_epochs: usize,
    pub seer_learning_rate: f64,
    pub seer_report_every: usize,
    pub seer_sample_count: usize,
    pub seer_horizon_days: usize,
    pub spend_spike_probability: f64,

    // Detective (fraud classifier) trainer
    pub detective_epochs: usize,
    pub detective_learning_rate: f64,
    pub detective_report_every: usize,
    pub detective_min_samples: usize,

    // Decision boundary grid
    pub grid_amount_max: f64,
    pub grid_amount_step: f64,
    pub grid_hour_max: f64,
    pub grid_hour_step: f64,

    // Oracle (forecast projector)
    pub forecast_horizon: usize,
    pub spread_normal: f64,
    pub spread_crisis: f64,
    pub forecast_noise: f64,

    // Strategist (trading loop)
    pub tick_ms: u64,
    pub history_capacity: usize,
    pub initial_cash: f64,
    pub start_price: f64,
    pub price_floor: f64,
    pub price_jitter: f64,
    pub action_base_rate: f64,
    pub propensity_weight: f64,
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Like `env_f64`, but an override that is zero, negative or non-finite
/// falls back to the default. Used for knobs that divide or drive loops.
fn env_f64_positive(key: &str, default: f64) -> f64 {
    let v = env_f64(key, default);
    if v > 0.0 && v.is_finite() {
        v
    } else {
        default
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            telemetry_capacity: env_usize("TELEMETRY_CAP", 6),
            seer_epochs: env_usize("SEER_EPOCHS", 200),
            seer_learning_rate: env_f64("SEER_LR", 0.015),
            seer_report_every: env_usize("SEER_REPORT_EVERY", 20),
            seer_sample_count: env_usize("SEER_SAMPLES", 50),
            seer_horizon_days: env_usize("SEER_HORIZON", 10),
            spend_spike_probability: env_f64("SPEND_SPIKE_PROB", 0.08),
            detective_epochs: env_usize("DETECTIVE_EPOCHS", 150),
            detective_learning_rate: env_f64("DETECTIVE_LR", 0.01),
            detective_report_every: env_usize("DETECTIVE_REPORT_EVERY", 30),
            detective_min_samples: env_usize("DETECTIVE_MIN_SAMPLES", 5),
            grid_amount_max: env_f64("GRID_AMOUNT_MAX", 2000.0),
            grid_amount_step: env_f64_positive("GRID_AMOUNT_STEP", 200.0),
            grid_hour_max: env_f64("GRID_HOUR_MAX", 24.0),
            grid_hour_step: env_f64_positive("GRID_HOUR_STEP", 3.0),
            forecast_horizon: env_usize("FORECAST_HORIZON", 4),
            spread_normal: env_f64("SPREAD_NORMAL", 300.0),
            spread_crisis: env_f64("SPREAD_CRISIS", 500.0),
            forecast_noise: env_f64("FORECAST_NOISE", 250.0),
            tick_ms: env_u64("TRADER_TICK_MS", 400),
            history_capacity: env_usize("TRADER_HISTORY_CAP", 30),
            initial_cash: env_f64("TRADER_INITIAL_CASH", 1000.0),
            start_price: env_f64("TRADER_START_PRICE", 100.0),
            price_floor: env_f64("TRADER_PRICE_FLOOR", 10.0),
            price_jitter: env_f64("TRADER_PRICE_JITTER", 5.0),
            action_base_rate: env_f64("TRADER_BASE_RATE", 0.2),
            propensity_weight: env_f64("TRADER_PROPENSITY_WEIGHT", 0.3),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lab_constants() {
        let cfg = Config::from_env();
        assert_eq!(cfg.seer_epochs, 200);
        assert_eq!(cfg.detective_epochs, 150);
        assert_eq!(cfg.tick_ms, 400);
        assert_eq!(cfg.history_capacity, 30);
        assert_eq!(cfg.telemetry_capacity, 6);
        assert!((cfg.initial_cash - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nonpositive_grid_steps_fall_back_to_defaults() {
        std::env::set_var("GRID_AMOUNT_STEP", "0");
        std::env::set_var("GRID_HOUR_STEP", "-3");
        let cfg = Config::from_env();
        std::env::remove_var("GRID_AMOUNT_STEP");
        std::env::remove_var("GRID_HOUR_STEP");
        assert!((cfg.grid_amount_step - 200.0).abs() < f64::EPSILON);
        assert!((cfg.grid_hour_step - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn grid_dimensions_are_consistent() {
        let cfg = Config::from_env();
        let cols = (cfg.grid_amount_max / cfg.grid_amount_step) as usize + 1;
        let rows = (cfg.grid_hour_max / cfg.grid_hour_step) as usize + 1;
        assert_eq!(cols * rows, 99);
    }
}
