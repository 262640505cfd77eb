//! Iterative trainer: a cancellable task that yields progress events.
//!
//! Instead of an inline callback, `spawn` hands back a [`TrainingTask`]:
//! the consumer drains an mpsc channel of `(epoch, loss, snapshot)` events
//! and awaits the join handle for the trained model. The loop yields to the
//! runtime between epochs so the host can repaint mid-run, checks a stop
//! flag each epoch, and finishes early with the last finite state if the
//! loss diverges.

use crate::nn::{fit_epoch, Activation, Adam, Loss, Mlp};
use crate::telemetry::TelemetryLog;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Report (and snapshot) every Nth epoch; the first epoch always reports.
    pub report_every: usize,
    pub loss: Loss,
    pub shape: Vec<(usize, Activation)>,
    pub input_dim: usize,
    /// Held-out inputs re-evaluated on the reporting cadence so the consumer
    /// can draw intermediate forecasts.
    pub snapshot_inputs: Vec<Vec<f64>>,
    /// Seed for weight init; None draws from the thread rng.
    pub seed: Option<u64>,
}

impl TrainConfig {
    /// Regression forecaster: 3 -> 32 relu -> 16 relu -> 1 linear, MSE.
    pub fn seer(epochs: usize, learning_rate: f64, report_every: usize) -> Self {
        Self {
            epochs,
            learning_rate,
            report_every,
            loss: Loss::MeanSquaredError,
            shape: vec![
                (32, Activation::Relu),
                (16, Activation::Relu),
                (1, Activation::Linear),
            ],
            input_dim: 3,
            snapshot_inputs: Vec::new(),
            seed: None,
        }
    }

    /// Fraud classifier: 3 -> 24 relu -> 12 relu -> 1 sigmoid, BCE.
    pub fn detective(epochs: usize, learning_rate: f64, report_every: usize) -> Self {
        Self {
            epochs,
            learning_rate,
            report_every,
            loss: Loss::BinaryCrossEntropy,
            shape: vec![
                (24, Activation::Relu),
                (12, Activation::Relu),
                (1, Activation::Sigmoid),
            ],
            input_dim: 3,
            snapshot_inputs: Vec::new(),
            seed: None,
        }
    }
}

/// Live progress pushed on the reporting cadence.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// 1-based epoch index.
    pub epoch: usize,
    pub loss: f64,
    /// Model outputs over `snapshot_inputs`, if any were configured.
    pub snapshot: Option<Vec<f64>>,
}

/// Mirror of the run the controller keeps for the UI scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingRun {
    pub planned: usize,
    pub current: usize,
    pub loss: Option<f64>,
    pub active: bool,
}

impl TrainingRun {
    pub fn started(planned: usize) -> Self {
        Self { planned, current: 0, loss: None, active: true }
    }

    pub fn observe(&mut self, event: &ProgressEvent) {
        self.current = event.epoch;
        self.loss = Some(event.loss);
    }

    pub fn finish(&mut self) {
        self.active = false;
    }
}

#[derive(Debug)]
pub struct TrainOutcome {
    pub model: Mlp,
    pub epochs_run: usize,
    pub final_loss: Option<f64>,
    pub diverged: bool,
    pub cancelled: bool,
}

/// Handle on a running training task.
pub struct TrainingTask {
    pub events: mpsc::Receiver<ProgressEvent>,
    stop: Arc<AtomicBool>,
    pub handle: JoinHandle<TrainOutcome>,
}

impl TrainingTask {
    /// Signal the trainer to halt before the remaining epochs. Idempotent;
    /// the model is left in its last-updated state, no rollback.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Drain remaining events and await the outcome.
    pub async fn join(mut self) -> anyhow::Result<TrainOutcome> {
        while self.events.recv().await.is_some() {}
        Ok(self.handle.await?)
    }
}

/// Start a training run over `(inputs, targets)` and return its handle.
///
/// The task owns every buffer it allocates; all scratch is dropped when the
/// task resolves, so repeated runs do not accumulate memory.
pub fn spawn(
    inputs: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
    cfg: TrainConfig,
    telemetry: TelemetryLog,
) -> TrainingTask {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    // Buffer sized so a slow consumer never blocks the training loop for long.
    let (tx, rx) = mpsc::channel(cfg.epochs / cfg.report_every.max(1) + 2);

    let handle = tokio::spawn(async move {
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut model = Mlp::new(cfg.input_dim, &cfg.shape, &mut rng);
        let mut opt = Adam::new(&model, cfg.learning_rate);
        let mut last_good: Option<(Mlp, f64, usize)> = None;
        let mut epochs_run = 0;
        let mut diverged = false;
        let mut cancelled = false;

        for epoch in 1..=cfg.epochs {
            if stop_flag.load(Ordering::SeqCst) {
                cancelled = true;
                telemetry.push(format!("Training stopped at epoch {}", epoch - 1));
                break;
            }

            // fit_epoch measures the loss of the weights it was handed and
            // then updates them. Snapshot those weights first: last_good must
            // pair the finite loss with the model it was measured on, not the
            // post-update model that may be mid-explosion.
            let pre_update = model.clone();
            let loss = fit_epoch(&mut model, &inputs, &targets, cfg.loss, &mut opt);
            epochs_run = epoch;

            if !loss.is_finite() {
                diverged = true;
                telemetry.error(format!("loss diverged at epoch {}", epoch));
                if last_good.is_none() {
                    // first-epoch divergence: hand back the initial weights
                    model = pre_update;
                }
                break;
            }
            last_good = Some((pre_update, loss, epoch));

            if epoch == 1 || epoch % cfg.report_every.max(1) == 0 || epoch == cfg.epochs {
                let snapshot = if cfg.snapshot_inputs.is_empty() {
                    None
                } else {
                    Some(
                        model
                            .predict_batch(&cfg.snapshot_inputs)
                            .into_iter()
                            .map(|out| out.first().copied().unwrap_or(f64::NAN))
                            .collect(),
                    )
                };
                // Drop the run silently if the consumer went away.
                let _ = tx.send(ProgressEvent { epoch, loss, snapshot }).await;
            }

            // Cooperative: give the host a chance to repaint between epochs.
            tokio::task::yield_now().await;
        }

        match last_good {
            Some((good_model, good_loss, good_epoch)) if diverged => TrainOutcome {
                model: good_model,
                epochs_run: good_epoch,
                final_loss: Some(good_loss),
                diverged,
                cancelled,
            },
            Some((_, good_loss, _)) => TrainOutcome {
                model,
                epochs_run,
                final_loss: Some(good_loss),
                diverged,
                cancelled,
            },
            // Divergence on the very first epoch: report the untrained net.
            None => TrainOutcome { model, epochs_run, final_loss: None, diverged, cancelled },
        }
    });

    TrainingTask { events: rx, stop, handle }
}
