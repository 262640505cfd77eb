//! Single linear-threshold unit: the purchase judge.
//!
//! `activation = price * (-w1) + need * w2 + bias`, step function on top.
//! Price weight enters negated so larger w1 always means "more frugal".

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Weights {
    pub w1: f64,
    pub w2: f64,
    pub bias: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Evaluation {
    pub activation: f64,
    /// 1 = approved, 0 = rejected.
    pub decision: u8,
}

/// Stateless evaluation of one (price, need) input.
pub fn evaluate(price: f64, need: f64, weights: &Weights) -> Evaluation {
    let activation = price * (-weights.w1) + need * weights.w2 + weights.bias;
    let decision = if activation > 0.0 { 1 } else { 0 };
    Evaluation { activation, decision }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LinePoint {
    pub price: f64,
    pub need: f64,
}

/// The decision boundary (activation = 0) solved for `need` as a function of
/// `price`, sampled at a fixed step and clamped to the plotted range.
pub fn boundary_line(weights: &Weights) -> Vec<LinePoint> {
    let mut points = Vec::new();
    let mut price = 0.0;
    while price <= 1000.0 {
        let need = if weights.w2 != 0.0 {
            (price * weights.w1 - weights.bias) / weights.w2
        } else {
            0.0
        };
        points.push(LinePoint { price, need: need.clamp(-20.0, 120.0) });
        price += 100.0;
    }
    points
}
