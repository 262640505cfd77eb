//! Per-episode controllers.
//!
//! Each episode owns exactly one state object: its scenario, any model it
//! trained, and the derived artifacts the visualization sink reads. There
//! are no module-level singletons; controllers are passed by reference into
//! the pure step/evaluate functions. Regenerating or switching a scenario
//! recreates all derived state so nothing stale survives into a new run.

use crate::boundary::{self, BoundaryPoint, GridSpec};
use crate::categorizer::{LabelScore, LabelSet};
use crate::config::Config;
use crate::nn::Mlp;
use crate::oracle::{self, ForecastPoint, ProjectorConfig, Scenario};
use crate::perceptron::{self, Evaluation, LinePoint, Weights};
use crate::strategist::{self, PortfolioSnapshot, PortfolioState, RewardConfig, TraderHandle};
use crate::synth::{self, SpendPoint, SpendRecipe, TxSample};
use crate::telemetry::TelemetryLog;
use crate::trainer::{self, ProgressEvent, TrainConfig, TrainOutcome, TrainingRun, TrainingTask};
use anyhow::{bail, Result};
use rand::Rng;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Episode 1: the judge (perceptron)
// ---------------------------------------------------------------------------

pub struct JudgeLab {
    pub price: f64,
    pub need: f64,
    pub weights: Weights,
}

impl Default for JudgeLab {
    fn default() -> Self {
        Self { price: 500.0, need: 50.0, weights: Weights { w1: 0.1, w2: 0.5, bias: 20.0 } }
    }
}

impl JudgeLab {
    /// Weights are user-editable at any time; evaluation is pure.
    pub fn evaluate(&self) -> Evaluation {
        perceptron::evaluate(self.price, self.need, &self.weights)
    }

    pub fn boundary(&self) -> Vec<LinePoint> {
        perceptron::boundary_line(&self.weights)
    }
}

// ---------------------------------------------------------------------------
// Episode 2: the seer (gradient-trained spend forecaster)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ForecastSample {
    pub day: u32,
    pub forecast: f64,
}

struct SeerNorm {
    max_day: f64,
    max_val: f64,
    future_days: Vec<u32>,
}

pub struct SeerLab {
    cfg: Config,
    telemetry: TelemetryLog,
    pub data: Vec<SpendPoint>,
    pub run: Option<TrainingRun>,
    pub predictions: Vec<ForecastSample>,
    norm: Option<SeerNorm>,
}

fn seer_features(day: f64, max_day: f64) -> Vec<f64> {
    let d = day / max_day;
    vec![d, d * d, (day * std::f64::consts::PI / 3.5).sin()]
}

impl SeerLab {
    pub fn new(cfg: Config, telemetry: TelemetryLog, rng: &mut impl Rng) -> Self {
        let mut lab = Self {
            cfg,
            telemetry,
            data: Vec::new(),
            run: None,
            predictions: Vec::new(),
            norm: None,
        };
        lab.regenerate(rng);
        lab
    }

    /// Fresh scenario: new synthetic series, all derived state discarded.
    pub fn regenerate(&mut self, rng: &mut impl Rng) {
        let recipe = SpendRecipe {
            spike_probability: self.cfg.spend_spike_probability,
            ..SpendRecipe::default()
        };
        self.data = synth::generate_spend_series(&recipe, self.cfg.seer_sample_count, rng);
        self.predictions = Vec::new();
        self.run = None;
        self.norm = None;
        self.telemetry.push(format!("New scenario generated ({} points)", self.data.len()));
    }

    pub fn can_train(&self) -> bool {
        !self.data.is_empty() && !self.run.map(|r| r.active).unwrap_or(false)
    }

    /// Kick off a training run. The returned task streams progress events;
    /// feed them back through [`SeerLab::observe`].
    pub fn start_training(&mut self) -> Result<TrainingTask> {
        if !self.can_train() {
            bail!("seer training unavailable: no data or a run is active");
        }
        self.predictions = Vec::new();
        self.telemetry.push("Compiling forecast model...");

        let max_day = (self.data.len() + self.cfg.seer_horizon_days) as f64;
        let max_val = self.data.iter().map(|p| p.spent).fold(0.0_f64, f64::max) * 1.5;
        let max_val = if max_val > 0.0 { max_val } else { 1.0 };

        let inputs: Vec<Vec<f64>> =
            self.data.iter().map(|p| seer_features(p.day as f64, max_day)).collect();
        let targets: Vec<Vec<f64>> = self.data.iter().map(|p| vec![p.spent / max_val]).collect();

        let first_future = self.data.len() as u32 + 1;
        let future_days: Vec<u32> =
            (first_future..first_future + self.cfg.seer_horizon_days as u32).collect();
        let snapshot_inputs: Vec<Vec<f64>> =
            future_days.iter().map(|&d| seer_features(d as f64, max_day)).collect();

        let mut train_cfg = TrainConfig::seer(
            self.cfg.seer_epochs,
            self.cfg.seer_learning_rate,
            self.cfg.seer_report_every,
        );
        train_cfg.snapshot_inputs = snapshot_inputs;

        self.norm = Some(SeerNorm { max_day, max_val, future_days });
        self.run = Some(TrainingRun::started(self.cfg.seer_epochs));
        Ok(trainer::spawn(inputs, targets, train_cfg, self.telemetry.clone()))
    }

    /// Apply one progress event: update the run scalars and swap in the
    /// intermediate forecast so the chart shows the model learning.
    pub fn observe(&mut self, event: &ProgressEvent) {
        if let Some(run) = self.run.as_mut() {
            run.observe(event);
        }
        let Some(norm) = self.norm.as_ref() else { return };
        if let Some(snapshot) = &event.snapshot {
            self.predictions = norm
                .future_days
                .iter()
                .zip(snapshot)
                .map(|(&day, &p)| ForecastSample {
                    day,
                    forecast: (p * norm.max_val * 100.0).round() / 100.0,
                })
                .collect();
            self.telemetry
                .push(format!("Epoch {}: loss down to {:.6}", event.epoch, event.loss));
        }
    }

    pub fn finish(&mut self, outcome: &TrainOutcome) {
        if let Some(run) = self.run.as_mut() {
            run.finish();
        }
        if outcome.diverged {
            self.telemetry.push("Training ended early, keeping last stable state");
        } else {
            self.telemetry.push("Training finished");
        }
    }
}

// ---------------------------------------------------------------------------
// Episode 3: the detective (fraud boundary)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Transaction {
    pub amount: f64,
    pub hour: f64,
    /// 1.0 when the card was used abroad.
    pub foreign: f64,
}

/// A trained classifier and the decision map sampled from it. Stored as one
/// value so model and map can only ever be swapped together.
struct DetectiveModel {
    net: Mlp,
    map: Vec<BoundaryPoint>,
}

pub struct DetectiveLab {
    cfg: Config,
    telemetry: TelemetryLog,
    pub dataset: Vec<TxSample>,
    pub tx: Transaction,
    pub run: Option<TrainingRun>,
    /// 0.5 until a model exists: "don't know".
    pub risk_score: f64,
    model: Option<DetectiveModel>,
}

impl DetectiveLab {
    pub fn new(cfg: Config, telemetry: TelemetryLog, rng: &mut impl Rng) -> Self {
        let mut lab = Self {
            cfg,
            telemetry,
            dataset: Vec::new(),
            tx: Transaction { amount: 150.0, hour: 14.0, foreign: 0.0 },
            run: None,
            risk_score: 0.5,
            model: None,
        };
        lab.regenerate(rng);
        lab
    }

    /// Reset to a fresh two-cluster dataset; the detective forgets everything.
    pub fn regenerate(&mut self, rng: &mut impl Rng) {
        self.dataset = synth::generate_fraud_dataset(30, 10, rng);
        self.model = None;
        self.risk_score = 0.5;
        self.run = None;
        self.telemetry.push("Dataset reset, model discarded");
    }

    pub fn add_sample(&mut self, is_fraud: bool) {
        self.dataset.push(TxSample { amount: self.tx.amount, hour: self.tx.hour, is_fraud });
        self.telemetry.push(format!(
            "{} transaction added to the set",
            if is_fraud { "Fraudulent" } else { "Legitimate" }
        ));
    }

    pub fn can_train(&self) -> bool {
        self.dataset.len() >= self.cfg.detective_min_samples
            && !self.run.map(|r| r.active).unwrap_or(false)
    }

    fn normalize(&self, amount: f64, hour: f64, foreign: f64) -> Vec<f64> {
        vec![amount / self.cfg.grid_amount_max, hour / self.cfg.grid_hour_max, foreign]
    }

    pub fn start_training(&mut self) -> Result<TrainingTask> {
        if !self.can_train() {
            bail!(
                "detective training unavailable: need {} samples or a run is active",
                self.cfg.detective_min_samples
            );
        }
        self.telemetry.push("Starting deep training...");
        let inputs: Vec<Vec<f64>> = self
            .dataset
            .iter()
            .map(|s| self.normalize(s.amount, s.hour, self.tx.foreign))
            .collect();
        let targets: Vec<Vec<f64>> =
            self.dataset.iter().map(|s| vec![if s.is_fraud { 1.0 } else { 0.0 }]).collect();

        let train_cfg = TrainConfig::detective(
            self.cfg.detective_epochs,
            self.cfg.detective_learning_rate,
            self.cfg.detective_report_every,
        );
        self.run = Some(TrainingRun::started(self.cfg.detective_epochs));
        Ok(trainer::spawn(inputs, targets, train_cfg, self.telemetry.clone()))
    }

    pub fn observe(&mut self, event: &ProgressEvent) {
        if let Some(run) = self.run.as_mut() {
            run.observe(event);
        }
        self.telemetry.push(format!("Learning boundaries... epoch {}", event.epoch));
    }

    /// Install the trained model: sample the decision map from it and swap
    /// model + map in wholesale, then re-score the current transaction.
    pub fn finish(&mut self, outcome: TrainOutcome) {
        if let Some(run) = self.run.as_mut() {
            run.finish();
        }
        let spec = GridSpec {
            axis1_max: self.cfg.grid_amount_max,
            axis1_step: self.cfg.grid_amount_step,
            axis2_max: self.cfg.grid_hour_max,
            axis2_step: self.cfg.grid_hour_step,
            axis1_scale: self.cfg.grid_amount_max,
            axis2_scale: self.cfg.grid_hour_max,
            fixed_features: vec![self.tx.foreign],
        };
        let map = boundary::sample(&outcome.model, &spec);
        self.model = Some(DetectiveModel { net: outcome.model, map });
        self.rescore();
        if outcome.diverged {
            self.telemetry.push("Training ended early, boundary from last stable model");
        } else {
            self.telemetry.push("SYSTEM ACTIVE: the detective now recognizes patterns");
        }
    }

    pub fn decision_map(&self) -> &[BoundaryPoint] {
        self.model.as_ref().map(|m| m.map.as_slice()).unwrap_or(&[])
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Live inference on the current transaction; no-op until trained.
    pub fn rescore(&mut self) {
        if let Some(model) = &self.model {
            let input = self.normalize(self.tx.amount, self.tx.hour, self.tx.foreign);
            self.risk_score =
                model.net.predict(&input).first().copied().unwrap_or(0.5).clamp(0.0, 1.0);
        }
    }

    pub fn set_transaction(&mut self, tx: Transaction) {
        self.tx = tx;
        self.rescore();
    }
}

// ---------------------------------------------------------------------------
// Episode 4: the reader (zero-shot stand-in)
// ---------------------------------------------------------------------------

pub struct ReaderLab {
    pub set: LabelSet,
    pub text: String,
    telemetry: TelemetryLog,
}

impl ReaderLab {
    pub fn new(telemetry: TelemetryLog) -> Self {
        Self {
            set: LabelSet::new(&["Comida", "Transporte", "Suscripciones", "Salud"]),
            text: String::new(),
            telemetry,
        }
    }

    /// Changing the input invalidates the cached scores.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.set.clear_scores();
    }

    pub fn can_analyze(&self) -> bool {
        self.set.can_analyze()
    }

    pub fn analyze(&mut self, rng: &mut impl Rng) -> &[LabelScore] {
        if !self.can_analyze() {
            self.telemetry.push("Analysis disabled: no labels defined");
            return self.set.scores();
        }
        let text = self.text.clone();
        let scores = self.set.analyze(&text, rng);
        self.telemetry.push(format!("Text classified across {} labels", scores.len()));
        scores
    }
}

// ---------------------------------------------------------------------------
// Episode 5: the oracle (uncertainty projector)
// ---------------------------------------------------------------------------

pub struct OracleLab {
    cfg: ProjectorConfig,
    horizon: usize,
    telemetry: TelemetryLog,
    pub scenario: Scenario,
    pub forecast: Vec<ForecastPoint>,
}

impl OracleLab {
    pub fn new(cfg: &Config, telemetry: TelemetryLog) -> Self {
        Self {
            cfg: ProjectorConfig {
                spread_normal: cfg.spread_normal,
                spread_crisis: cfg.spread_crisis,
                noise: cfg.forecast_noise,
            },
            horizon: cfg.forecast_horizon,
            telemetry,
            scenario: Scenario::Growth,
            forecast: Vec::new(),
        }
    }

    /// Selecting a scenario replaces all derived state.
    pub fn set_scenario(&mut self, scenario: Scenario) {
        self.scenario = scenario;
        self.forecast = Vec::new();
        self.telemetry.push(format!("Scenario selected: {}", scenario.name()));
    }

    pub fn history(&self) -> [f64; 6] {
        self.scenario.history()
    }

    pub fn project(&mut self, rng: &mut impl Rng) -> &[ForecastPoint] {
        self.forecast = oracle::project(&self.scenario.history(), self.horizon, &self.cfg, rng);
        self.telemetry.push(format!("Projected {} steps ahead", self.forecast.len()));
        &self.forecast
    }
}

// ---------------------------------------------------------------------------
// Episode 6: the strategist (trading loop)
// ---------------------------------------------------------------------------

pub struct StrategistLab {
    cfg: Config,
    telemetry: TelemetryLog,
    pub reward: RewardConfig,
    trader: Option<TraderHandle>,
}

impl StrategistLab {
    pub fn new(cfg: Config, telemetry: TelemetryLog) -> Self {
        Self { cfg, telemetry, reward: RewardConfig::default(), trader: None }
    }

    pub fn is_running(&self) -> bool {
        self.trader.as_ref().map(|t| !t.is_stopped()).unwrap_or(false)
    }

    /// Start the loop; starting while one is running is a disabled action.
    pub fn start(&mut self, seed: Option<u64>) -> Result<()> {
        if self.is_running() {
            bail!("strategist already running");
        }
        self.trader =
            Some(strategist::start(self.cfg.clone(), self.reward, self.telemetry.clone(), seed));
        Ok(())
    }

    /// Stop and keep the portfolio for inspection; idempotent.
    pub async fn stop(&mut self) -> Result<Option<PortfolioState>> {
        match self.trader.as_mut() {
            Some(trader) => {
                let state = trader.stop().await?;
                if state.is_some() {
                    self.telemetry.push("Strategist stopped");
                }
                Ok(state)
            }
            None => Ok(None),
        }
    }

    /// Takes effect on the next scheduled tick.
    pub fn set_reward(&mut self, reward: RewardConfig) {
        self.reward = reward;
        if let Some(trader) = &self.trader {
            let _ = trader.params.send(reward);
        }
    }

    pub fn snapshot(&self) -> Option<PortfolioSnapshot> {
        self.trader.as_ref().map(|t| t.snapshots.borrow().clone())
    }

    /// Stop if needed and discard all portfolio state.
    pub async fn reset(&mut self) -> Result<()> {
        if let Some(trader) = self.trader.as_mut() {
            let _ = trader.stop().await?;
        }
        self.trader = None;
        self.telemetry.push("Strategist reset");
        Ok(())
    }
}
