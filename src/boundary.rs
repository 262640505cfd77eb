//! Decision-boundary sampler: rasterizes a trained classifier over a 2D
//! grid (with any extra features held fixed) into a risk heat-map.
//!
//! The whole grid goes through one batched inference call and the scores
//! are zipped back onto the coordinates in the same order, so the map is
//! always a single consistent snapshot of one model.

use crate::nn::Mlp;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BoundaryPoint {
    pub coord1: f64,
    pub coord2: f64,
    /// Classifier score in [0, 1].
    pub risk: f64,
}

#[derive(Debug, Clone)]
pub struct GridSpec {
    pub axis1_max: f64,
    pub axis1_step: f64,
    pub axis2_max: f64,
    pub axis2_step: f64,
    /// Divisors mapping raw coordinates into model input space.
    pub axis1_scale: f64,
    pub axis2_scale: f64,
    /// Remaining model inputs, already normalized, appended to every cell.
    pub fixed_features: Vec<f64>,
}

impl GridSpec {
    /// Inclusive sample count along an axis starting at 0.
    fn steps(max: f64, step: f64) -> usize {
        (max / step).floor() as usize + 1
    }

    pub fn cell_count(&self) -> usize {
        Self::steps(self.axis1_max, self.axis1_step) * Self::steps(self.axis2_max, self.axis2_step)
    }
}

/// Evaluate `model` over the full cartesian grid.
pub fn sample(model: &Mlp, spec: &GridSpec) -> Vec<BoundaryPoint> {
    let n1 = GridSpec::steps(spec.axis1_max, spec.axis1_step);
    let n2 = GridSpec::steps(spec.axis2_max, spec.axis2_step);

    let mut coords = Vec::with_capacity(n1 * n2);
    let mut batch = Vec::with_capacity(n1 * n2);
    for i in 0..n1 {
        let c1 = i as f64 * spec.axis1_step;
        for j in 0..n2 {
            let c2 = j as f64 * spec.axis2_step;
            coords.push((c1, c2));
            let mut input = Vec::with_capacity(2 + spec.fixed_features.len());
            input.push(c1 / spec.axis1_scale);
            input.push(c2 / spec.axis2_scale);
            input.extend_from_slice(&spec.fixed_features);
            batch.push(input);
        }
    }

    let scores = model.predict_batch(&batch);
    coords
        .into_iter()
        .zip(scores)
        .map(|((coord1, coord2), out)| BoundaryPoint {
            coord1,
            coord2,
            risk: out.first().copied().unwrap_or(0.0).clamp(0.0, 1.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Activation, Mlp};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fraud_grid() -> GridSpec {
        GridSpec {
            axis1_max: 2000.0,
            axis1_step: 200.0,
            axis2_max: 24.0,
            axis2_step: 3.0,
            axis1_scale: 2000.0,
            axis2_scale: 24.0,
            fixed_features: vec![0.0],
        }
    }

    fn untrained_classifier() -> Mlp {
        let mut rng = StdRng::seed_from_u64(21);
        Mlp::new(
            3,
            &[(24, Activation::Relu), (12, Activation::Relu), (1, Activation::Sigmoid)],
            &mut rng,
        )
    }

    #[test]
    fn grid_length_is_axis_product() {
        let spec = fraud_grid();
        let map = sample(&untrained_classifier(), &spec);
        assert_eq!(map.len(), spec.cell_count());
        assert_eq!(map.len(), 11 * 9);
    }

    #[test]
    fn scores_are_probabilities() {
        let map = sample(&untrained_classifier(), &fraud_grid());
        assert!(map.iter().all(|p| (0.0..=1.0).contains(&p.risk)));
    }

    #[test]
    fn grid_order_is_row_major_over_axis1() {
        let map = sample(&untrained_classifier(), &fraud_grid());
        assert_eq!((map[0].coord1, map[0].coord2), (0.0, 0.0));
        assert_eq!((map[1].coord1, map[1].coord2), (0.0, 3.0));
        assert_eq!((map[9].coord1, map[9].coord2), (200.0, 0.0));
        let last = map.last().expect("non-empty");
        assert_eq!((last.coord1, last.coord2), (2000.0, 24.0));
    }
}
