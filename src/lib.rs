//! Simulation and inference engine behind a six-episode interactive lab:
//! a hand-tuned perceptron judge, a gradient-trained spend forecaster, a
//! fraud classifier with a rasterized decision boundary, a heuristic text
//! categorizer, an uncertainty-band projector and a reward-driven trading
//! loop. Controllers in [`lab`] own all per-episode state; everything below
//! them is a pure function over (state, config, rng).

pub mod boundary;
pub mod categorizer;
pub mod config;
pub mod lab;
pub mod logging;
pub mod nn;
pub mod oracle;
pub mod perceptron;
pub mod strategist;
pub mod synth;
pub mod telemetry;
pub mod trainer;
