use crate::geometry::delay::DelayTable;
use crate::geometry::ArrayModel;
use crate::localization::gcc_phat::{channel_spectra, phat_cross_spectrum};
use crate::math::fft::FftHelper;
use crate::prelude::{DirectionEstimator, DoaEstimate, EngineResult};
use log::debug;
use ndarray::ArrayView2;

/// Steered response power over the direction grid using PHAT correlations.
///
/// One correlation per pair is sampled at the delay-table index of every grid
/// point; no per-pair peak picking is involved.
#[derive(Debug, Clone, Copy)]
pub struct SrpPhatEstimator {
    phat_epsilon: f64,
}

impl SrpPhatEstimator {
    pub fn new(phat_epsilon: f64) -> Self {
        Self { phat_epsilon }
    }

    /// Accumulated steered power of every grid point, in grid order.
    pub fn power_map(&self, model: &ArrayModel, block: ArrayView2<f64>) -> EngineResult<Vec<f64>> {
        model.check_block(block)?;

        let frames = block.nrows();
        let fft = FftHelper::new(frames);
        let spectra = channel_spectra(&fft, block);
        let mut power = vec![0.0; model.grid().len()];

        for (pair_index, pair) in model.pairs().iter().enumerate() {
            let cross =
                phat_cross_spectrum(&spectra[pair.first], &spectra[pair.second], self.phat_epsilon);
            let correlation = fft.inverse_real(&cross);
            for (accumulated, &lead) in power.iter_mut().zip(model.delays().pair_row(pair_index)) {
                *accumulated += correlation[DelayTable::correlation_index(lead, frames)];
            }
        }

        Ok(power)
    }
}

impl DirectionEstimator for SrpPhatEstimator {
    fn name(&self) -> &'static str {
        "srp-phat"
    }

    fn estimate(&self, model: &ArrayModel, block: ArrayView2<f64>) -> EngineResult<DoaEstimate> {
        let power = self.power_map(model, block)?;

        let mut best_index = 0;
        let mut best_power = f64::NEG_INFINITY;
        for (index, &value) in power.iter().enumerate() {
            if value > best_power {
                best_power = value;
                best_index = index;
            }
        }

        let point = model.grid().point(best_index);
        let estimate = DoaEstimate {
            azimuth_deg: point.azimuth_deg,
            elevation_deg: point.elevation_deg,
            confidence: best_power / model.pairs().len() as f64,
        };
        debug!(
            "srp-phat peak at az {:.1} el {:.1} conf {:.4}",
            estimate.azimuth_deg, estimate.elevation_deg, estimate.confidence
        );
        Ok(estimate)
    }
}
