use crate::geometry::array::dot;
use crate::geometry::ArrayModel;
use crate::localization::gcc_phat::tdoa_vector;
use crate::prelude::{DirectionEstimator, DoaEstimate, EngineError, EngineResult};
use log::debug;
use ndarray::ArrayView2;

/// Scales the squared-seconds residual before mapping it to a confidence.
const RESIDUAL_SCALE: f64 = 1000.0;

/// Grid search that fits pairwise GCC-PHAT lags to the far-field model.
///
/// Costs O(grid points x pairs) per call, the heaviest estimator of the crate.
#[derive(Debug, Clone, Copy)]
pub struct LeastSquaresEstimator {
    phat_epsilon: f64,
}

impl LeastSquaresEstimator {
    pub fn new(phat_epsilon: f64) -> Self {
        Self { phat_epsilon }
    }

    /// Fits an already measured lag vector (samples, pair order of `model`).
    pub fn solve(&self, model: &ArrayModel, lags: &[i64]) -> EngineResult<DoaEstimate> {
        if lags.len() != model.pairs().len() {
            return Err(EngineError::InvalidInput(format!(
                "expected {} pair lags, got {}",
                model.pairs().len(),
                lags.len()
            )));
        }

        let geometry = model.geometry();
        let sample_rate = geometry.sample_rate();
        let speed_of_sound = geometry.speed_of_sound();
        let baselines: Vec<[f64; 3]> = model
            .pairs()
            .iter()
            .map(|&pair| geometry.baseline(pair))
            .collect();
        // a positive lag means the first capsule heard the wave later, so its lead is negative
        let observed_leads: Vec<f64> = lags.iter().map(|&lag| -(lag as f64) / sample_rate).collect();

        let mut best_index = 0;
        let mut best_residual = f64::INFINITY;
        for (index, point) in model.grid().points().iter().enumerate() {
            let residual: f64 = baselines
                .iter()
                .zip(&observed_leads)
                .map(|(baseline, observed)| {
                    let expected = dot(&point.unit, baseline) / speed_of_sound;
                    (observed - expected).powi(2)
                })
                .sum();
            if residual < best_residual {
                best_residual = residual;
                best_index = index;
            }
        }

        let point = model.grid().point(best_index);
        Ok(DoaEstimate {
            azimuth_deg: point.azimuth_deg,
            elevation_deg: point.elevation_deg,
            confidence: 1.0 / (1.0 + best_residual * RESIDUAL_SCALE),
        })
    }
}

impl DirectionEstimator for LeastSquaresEstimator {
    fn name(&self) -> &'static str {
        "tdoa-ls"
    }

    fn estimate(&self, model: &ArrayModel, block: ArrayView2<f64>) -> EngineResult<DoaEstimate> {
        let lags = tdoa_vector(model, block, self.phat_epsilon)?;
        let estimate = self.solve(model, &lags)?;
        debug!(
            "least squares lags {:?} -> az {:.1} el {:.1} conf {:.6}",
            lags, estimate.azimuth_deg, estimate.elevation_deg, estimate.confidence
        );
        Ok(estimate)
    }
}
