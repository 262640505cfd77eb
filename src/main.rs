//! Headless runner: drives every episode of the lab once and emits the
//! engine's state transitions as JSON lines, one object per line.

use anyhow::Result;
use finneura::config::Config;
use finneura::lab::{
    DetectiveLab, JudgeLab, OracleLab, ReaderLab, SeerLab, StrategistLab, Transaction,
};
use finneura::logging::{json_log, obj, v_num, v_str};
use finneura::oracle::Scenario;
use finneura::strategist::RewardConfig;
use finneura::telemetry::TelemetryLog;
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let telemetry = TelemetryLog::new(cfg.telemetry_capacity);
    json_log("engine", obj(&[("status", v_str("starting"))]));

    run_judge();
    run_seer(&cfg, &telemetry).await?;
    run_detective(&cfg, &telemetry).await?;
    run_reader(&telemetry);
    run_oracle(&cfg, &telemetry);
    run_strategist(&cfg, &telemetry).await?;

    for entry in telemetry.entries() {
        json_log(
            "telemetry",
            obj(&[("ts", v_num(entry.ts as f64)), ("message", v_str(&entry.message))]),
        );
    }
    json_log("engine", obj(&[("status", v_str("done"))]));
    Ok(())
}

fn run_judge() {
    let judge = JudgeLab::default();
    let eval = judge.evaluate();
    json_log(
        "judge",
        obj(&[
            ("price", v_num(judge.price)),
            ("need", v_num(judge.need)),
            ("activation", v_num(eval.activation)),
            ("decision", v_num(eval.decision as f64)),
            ("boundary_points", v_num(judge.boundary().len() as f64)),
        ]),
    );
}

async fn run_seer(cfg: &Config, telemetry: &TelemetryLog) -> Result<()> {
    let mut rng = rand::thread_rng();
    let mut seer = SeerLab::new(cfg.clone(), telemetry.clone(), &mut rng);
    drop(rng);
    json_log("seer", obj(&[("samples", v_num(seer.data.len() as f64))]));

    let mut task = seer.start_training()?;
    while let Some(event) = task.events.recv().await {
        seer.observe(&event);
        json_log(
            "seer",
            obj(&[("epoch", v_num(event.epoch as f64)), ("loss", v_num(event.loss))]),
        );
    }
    let outcome = task.handle.await?;
    seer.finish(&outcome);
    if let Some(last) = seer.predictions.last() {
        json_log(
            "seer",
            obj(&[
                ("status", v_str("trained")),
                ("forecast_points", v_num(seer.predictions.len() as f64)),
                ("last_day", v_num(last.day as f64)),
                ("last_forecast", v_num(last.forecast)),
            ]),
        );
    }
    Ok(())
}

async fn run_detective(cfg: &Config, telemetry: &TelemetryLog) -> Result<()> {
    let mut rng = rand::thread_rng();
    let mut detective = DetectiveLab::new(cfg.clone(), telemetry.clone(), &mut rng);
    drop(rng);
    json_log("detective", obj(&[("dataset", v_num(detective.dataset.len() as f64))]));

    let mut task = detective.start_training()?;
    while let Some(event) = task.events.recv().await {
        detective.observe(&event);
    }
    let outcome = task.handle.await?;
    detective.finish(outcome);

    // Score one legitimate-looking and one suspicious transaction.
    detective.set_transaction(Transaction { amount: 150.0, hour: 14.0, foreign: 0.0 });
    let low = detective.risk_score;
    detective.set_transaction(Transaction { amount: 1600.0, hour: 3.0, foreign: 1.0 });
    json_log(
        "detective",
        obj(&[
            ("status", v_str("trained")),
            ("map_cells", v_num(detective.decision_map().len() as f64)),
            ("risk_daytime", v_num(low)),
            ("risk_small_hours", v_num(detective.risk_score)),
        ]),
    );
    Ok(())
}

fn run_reader(telemetry: &TelemetryLog) {
    let mut rng = rand::thread_rng();
    let mut reader = ReaderLab::new(telemetry.clone());
    reader.set_text("NETFLIX PREMIUM FAMILY PLAN");
    let scores = reader.analyze(&mut rng).to_vec();
    if let Some(top) = scores.first() {
        json_log(
            "reader",
            obj(&[("top_label", v_str(&top.label)), ("score", v_num(top.score))]),
        );
    }
}

fn run_oracle(cfg: &Config, telemetry: &TelemetryLog) {
    let mut rng = rand::thread_rng();
    let mut oracle = OracleLab::new(cfg, telemetry.clone());
    for scenario in Scenario::ALL {
        oracle.set_scenario(scenario);
        let forecast = oracle.project(&mut rng).to_vec();
        if let Some(last) = forecast.last() {
            json_log(
                "oracle",
                obj(&[
                    ("scenario", v_str(scenario.name())),
                    ("value", v_num(last.value)),
                    ("upper", v_num(last.upper)),
                    ("lower", v_num(last.lower)),
                ]),
            );
        }
    }
}

async fn run_strategist(cfg: &Config, telemetry: &TelemetryLog) -> Result<()> {
    let mut strategist = StrategistLab::new(cfg.clone(), telemetry.clone());
    strategist.set_reward(RewardConfig { ambition: 0.7, caution: 0.3 });
    strategist.start(None)?;
    for _ in 0..5 {
        sleep(Duration::from_millis(cfg.tick_ms * 2)).await;
        if let Some(snap) = strategist.snapshot() {
            json_log(
                "strategist",
                obj(&[
                    ("iterations", v_num(snap.iterations as f64)),
                    ("price", v_num(snap.last_price)),
                    ("cash", v_num(snap.cash)),
                    ("units", v_num(snap.units as f64)),
                    ("value", v_num(snap.total_value)),
                ]),
            );
        }
    }
    if let Some(state) = strategist.stop().await? {
        json_log(
            "strategist",
            obj(&[
                ("status", v_str("stopped")),
                ("iterations", v_num(state.iterations as f64)),
                ("profit", v_num(state.profit())),
            ]),
        );
    }
    Ok(())
}
