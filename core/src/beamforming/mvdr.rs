use crate::beamforming::{mvdr_weights, raw_spectra, render, snapshot, BinWeights};
use crate::geometry::ArrayModel;
use crate::interface::BeamformerMethod;
use crate::math::fft::{bin_frequency, half_spectrum_len, FftHelper};
use crate::math::matrix::MatrixHelper;
use crate::prelude::{
    BeamformMetadata, Beamformer, BeamformerOutput, Direction, EngineConfig, EngineResult,
};
use log::trace;
use ndarray::ArrayView2;

/// Frequency pass band shared by the adaptive beamformers; DC is always excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl PassBand {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            low_hz: config.band_low_hz,
            high_hz: config.band_high_hz,
        }
    }

    pub fn contains(&self, bin: usize, frequency: f64) -> bool {
        bin != 0 && frequency >= self.low_hz && frequency <= self.high_hz
    }
}

/// Narrowband MVDR built from the block's own single-snapshot covariance.
///
/// With one snapshot per bin the covariance is rank one; the diagonal loading
/// is what makes it invertible. Out-of-band bins pass the channel average.
#[derive(Debug, Clone, Copy)]
pub struct MvdrBeamformer {
    diagonal_loading: f64,
    weight_epsilon: f64,
    band: PassBand,
}

impl MvdrBeamformer {
    pub fn new(diagonal_loading: f64, weight_epsilon: f64, band: PassBand) -> Self {
        Self {
            diagonal_loading,
            weight_epsilon,
            band,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.diagonal_loading,
            config.weight_epsilon,
            PassBand::from_config(config),
        )
    }
}

impl Beamformer for MvdrBeamformer {
    fn method(&self) -> BeamformerMethod {
        BeamformerMethod::Mvdr
    }

    fn beamform(
        &self,
        model: &ArrayModel,
        block: ArrayView2<f64>,
        target: Direction,
    ) -> EngineResult<BeamformerOutput> {
        model.check_block(block)?;

        let frames = block.nrows();
        let fft = FftHelper::new(frames);
        let spectra = raw_spectra(&fft, block);
        let mut fallback_bins = 0;

        let weights: Vec<BinWeights> = (0..=half_spectrum_len(frames))
            .map(|bin| {
                let frequency = bin_frequency(bin, frames, model.sample_rate());
                if !self.band.contains(bin, frequency) {
                    return BinWeights::ChannelAverage;
                }
                let x = snapshot(&spectra, bin);
                let mut covariance = MatrixHelper::outer(x.view());
                MatrixHelper::load_diagonal(&mut covariance, self.diagonal_loading);
                let steering = model.steering().vector(target, frequency);
                match mvdr_weights(covariance.view(), steering.view(), self.weight_epsilon) {
                    Some(w) => BinWeights::Weighted(w),
                    None => {
                        trace!("mvdr bin {} ({:.1} Hz) is singular", bin, frequency);
                        fallback_bins += 1;
                        BinWeights::ChannelAverage
                    }
                }
            })
            .collect();

        Ok(BeamformerOutput {
            samples: render(&fft, &spectra, &weights),
            metadata: BeamformMetadata {
                method: self.method(),
                target,
                fallback_bins,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beamforming::test_support::*;
    use crate::beamforming::DelayAndSumBeamformer;
    use crate::math::StatsHelper;
    use ndarray::Array2;

    #[test]
    fn pass_band_excludes_dc() {
        let band = PassBand {
            low_hz: 0.0,
            high_hz: 4000.0,
        };
        assert!(!band.contains(0, 0.0));
        assert!(band.contains(1, 43.0));
        assert!(!band.contains(200, 8613.0));
    }

    #[test]
    fn suppresses_interferer_better_than_delay_and_sum() {
        let model = model();
        let block = two_source_block(&model);
        let config = EngineConfig::default();

        let adaptive = MvdrBeamformer::from_config(&config)
            .beamform(&model, block.view(), target())
            .unwrap();
        let fixed = DelayAndSumBeamformer::new()
            .beamform(&model, block.view(), target())
            .unwrap();

        assert!(interference_ratio(&adaptive.samples) < interference_ratio(&fixed.samples));
        assert!(interference_ratio(&adaptive.samples) < 0.1);
        assert_eq!(adaptive.metadata.fallback_bins, 0);
    }

    #[test]
    fn target_passes_nearly_undistorted() {
        let model = model();
        let block = target_tone(&model, FRAMES, TARGET_BIN);
        let output = MvdrBeamformer::from_config(&EngineConfig::default())
            .beamform(&model, block.view(), target())
            .unwrap();
        let gain = magnitude_at(&output.samples, TARGET_BIN) / (FRAMES as f64 / 2.0);
        assert!((gain - 1.0).abs() < 1e-3, "gain {}", gain);
    }

    #[test]
    fn unloaded_covariance_falls_back_to_channel_mean() {
        let config = EngineConfig {
            diagonal_loading: 0.0,
            ..Default::default()
        };
        let model = model_with(&config);
        let block = two_source_block(&model);
        let output = MvdrBeamformer::from_config(&config)
            .beamform(&model, block.view(), target())
            .unwrap();

        let band = PassBand::from_config(&config);
        let in_band = (0..=FRAMES / 2)
            .filter(|&bin| band.contains(bin, bin_frequency(bin, FRAMES, model.sample_rate())))
            .count();
        assert_eq!(output.metadata.fallback_bins, in_band);

        let mean = StatsHelper::channel_mean(block.view());
        for (sample, expected) in output.samples.iter().zip(&mean) {
            assert!((sample - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn silent_block_stays_silent() {
        let model = model();
        let block = Array2::<f64>::zeros((128, 4));
        let output = MvdrBeamformer::from_config(&EngineConfig::default())
            .beamform(&model, block.view(), target())
            .unwrap();
        assert_eq!(output.samples.len(), 128);
        assert!(output.samples.iter().all(|sample| sample.abs() < 1e-12));
        assert_eq!(output.metadata.fallback_bins, 0);
    }
}
