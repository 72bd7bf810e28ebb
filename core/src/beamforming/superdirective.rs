use crate::beamforming::{mvdr_weights, raw_spectra, render, BinWeights};
use crate::geometry::array::{norm, sub};
use crate::geometry::{ArrayGeometry, ArrayModel};
use crate::interface::BeamformerMethod;
use crate::math::fft::{bin_frequency, half_spectrum_len, FftHelper};
use crate::math::matrix::MatrixHelper;
use crate::prelude::{
    BeamformMetadata, Beamformer, BeamformerOutput, Direction, EngineConfig, EngineError,
    EngineResult,
};
use log::debug;
use ndarray::{Array1, Array2, ArrayView2};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Normalised sinc, `sin(pi x) / (pi x)`.
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Spatial coherence of a spherically isotropic noise field at `frequency`.
pub fn diffuse_coherence(geometry: &ArrayGeometry, frequency: f64) -> Array2<Complex64> {
    let positions = geometry.positions();
    let speed_of_sound = geometry.speed_of_sound();
    Array2::from_shape_fn((positions.len(), positions.len()), |(i, j)| {
        if i == j {
            Complex64::new(1.0, 0.0)
        } else {
            let distance = norm(&sub(&positions[i], &positions[j]));
            Complex64::new(sinc(2.0 * distance * frequency / speed_of_sound), 0.0)
        }
    })
}

/// MVDR against a diffuse noise field instead of measured statistics.
///
/// Weights depend only on geometry, frequency and target, so they can be
/// computed once per look direction with [`SuperdirectiveBeamformer::precompute`].
#[derive(Debug, Clone, Copy)]
pub struct SuperdirectiveBeamformer {
    white_noise_loading: f64,
    weight_epsilon: f64,
    floor_hz: f64,
}

impl SuperdirectiveBeamformer {
    pub fn new(white_noise_loading: f64, weight_epsilon: f64, floor_hz: f64) -> Self {
        Self {
            white_noise_loading,
            weight_epsilon,
            floor_hz,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.white_noise_loading(),
            config.weight_epsilon,
            config.superdirective_floor_hz,
        )
    }

    /// Weights of one frequency; `None` below the floor or when the loaded coherence is singular.
    pub fn weights(
        &self,
        model: &ArrayModel,
        target: Direction,
        frequency: f64,
    ) -> Option<Array1<Complex64>> {
        if frequency < self.floor_hz {
            return None;
        }
        let mut coherence = diffuse_coherence(model.geometry(), frequency);
        MatrixHelper::load_diagonal(&mut coherence, self.white_noise_loading);
        let steering = model.steering().vector(target, frequency);
        mvdr_weights(coherence.view(), steering.view(), self.weight_epsilon)
    }

    /// Weights of every non-negative bin of a `frames`-sample block.
    pub fn precompute(&self, model: &ArrayModel, target: Direction, frames: usize) -> SuperdirectiveWeights {
        let mut failed_bins = 0;
        let bins = (0..=half_spectrum_len(frames))
            .map(|bin| {
                let frequency = bin_frequency(bin, frames, model.sample_rate());
                if bin == 0 || frequency < self.floor_hz {
                    return BinWeights::ChannelAverage;
                }
                match self.weights(model, target, frequency) {
                    Some(w) => BinWeights::Weighted(w),
                    None => {
                        failed_bins += 1;
                        BinWeights::ChannelAverage
                    }
                }
            })
            .collect();
        if failed_bins > 0 {
            debug!("superdirective design left {} bins on the channel average", failed_bins);
        }

        SuperdirectiveWeights {
            target,
            frames,
            bins,
            failed_bins,
        }
    }
}

impl Beamformer for SuperdirectiveBeamformer {
    fn method(&self) -> BeamformerMethod {
        BeamformerMethod::Superdirective
    }

    fn beamform(
        &self,
        model: &ArrayModel,
        block: ArrayView2<f64>,
        target: Direction,
    ) -> EngineResult<BeamformerOutput> {
        model.check_block(block)?;
        Ok(self.precompute(model, target, block.nrows()).filter_block(block))
    }
}

/// Superdirective weights fixed for one target and block length.
#[derive(Debug, Clone)]
pub struct SuperdirectiveWeights {
    target: Direction,
    frames: usize,
    bins: Vec<BinWeights>,
    failed_bins: usize,
}

impl SuperdirectiveWeights {
    pub fn target(&self) -> Direction {
        self.target
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn bins(&self) -> &[BinWeights] {
        &self.bins
    }

    pub fn apply(&self, model: &ArrayModel, block: ArrayView2<f64>) -> EngineResult<BeamformerOutput> {
        model.check_block(block)?;
        if block.nrows() != self.frames {
            return Err(EngineError::InvalidInput(format!(
                "weights were designed for {} frames, block has {}",
                self.frames,
                block.nrows()
            )));
        }
        Ok(self.filter_block(block))
    }

    /// Applies the weights to a block already known to match the array and length.
    fn filter_block(&self, block: ArrayView2<f64>) -> BeamformerOutput {
        let fft = FftHelper::new(self.frames);
        let spectra = raw_spectra(&fft, block);
        BeamformerOutput {
            samples: render(&fft, &spectra, &self.bins),
            metadata: BeamformMetadata {
                method: BeamformerMethod::Superdirective,
                target: self.target,
                fallback_bins: self.failed_bins,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beamforming::test_support::*;
    use crate::beamforming::DelayAndSumBeamformer;

    fn beamformer() -> SuperdirectiveBeamformer {
        SuperdirectiveBeamformer::from_config(&EngineConfig::default())
    }

    #[test]
    fn coherence_is_symmetric_with_unit_diagonal() {
        let model = model();
        let coherence = diffuse_coherence(model.geometry(), 1_500.0);
        for i in 0..4 {
            assert_eq!(coherence[[i, i]], Complex64::new(1.0, 0.0));
            for j in 0..4 {
                assert_eq!(coherence[[i, j]], coherence[[j, i]]);
                assert!(coherence[[i, j]].re <= 1.0);
            }
        }
        // at DC the field is fully coherent
        let dc = diffuse_coherence(model.geometry(), 0.0);
        assert!(dc.iter().all(|value| (value.re - 1.0).abs() < 1e-12));
    }

    #[test]
    fn sinc_zero_crossing() {
        assert_eq!(sinc(0.0), 1.0);
        assert!(sinc(1.0).abs() < 1e-12);
        assert!((sinc(0.5) - 2.0 / PI).abs() < 1e-12);
    }

    #[test]
    fn suppresses_low_frequency_interferer_better_than_delay_and_sum() {
        let model = model();
        let block = two_source_block(&model);
        let superdirective = beamformer().beamform(&model, block.view(), target()).unwrap();
        let fixed = DelayAndSumBeamformer::new()
            .beamform(&model, block.view(), target())
            .unwrap();

        let ratio = interference_ratio(&superdirective.samples);
        assert!(ratio < interference_ratio(&fixed.samples));
        assert!(ratio < 0.3, "ratio {}", ratio);
    }

    #[test]
    fn weights_are_distortionless_toward_target() {
        let model = model();
        let frequency = bin_frequency(TARGET_BIN, FRAMES, model.sample_rate());
        let weights = beamformer().weights(&model, target(), frequency).unwrap();
        let steering = model.steering().compute(target(), frequency);
        let response = MatrixHelper::inner(weights.view(), steering.view());
        assert!((response - Complex64::new(1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn floor_bins_fall_back() {
        let model = model();
        assert!(beamformer().weights(&model, target(), 5.0).is_none());
        let weights = beamformer().precompute(&model, target(), 8192);
        // 5.4 Hz bin 1 sits below the 10 Hz floor
        assert!(matches!(weights.bins()[1], BinWeights::ChannelAverage));
        assert!(matches!(weights.bins()[2], BinWeights::Weighted(_)));
    }

    #[test]
    fn precomputed_weights_match_direct_call() {
        let model = model();
        let block = two_source_block(&model);
        let weights = beamformer().precompute(&model, target(), FRAMES);
        let applied = weights.apply(&model, block.view()).unwrap();
        let direct = beamformer().beamform(&model, block.view(), target()).unwrap();
        assert_eq!(applied.samples, direct.samples);
        assert_eq!(weights.target(), target());
    }

    #[test]
    fn precomputed_weights_reject_other_block_lengths() {
        let model = model();
        let weights = beamformer().precompute(&model, target(), 512);
        let block = target_tone(&model, FRAMES, TARGET_BIN);
        assert!(matches!(
            weights.apply(&model, block.view()),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
