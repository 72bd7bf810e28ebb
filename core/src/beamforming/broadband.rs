use crate::beamforming::mvdr::PassBand;
use crate::beamforming::{raw_spectra, render, snapshot, weights_from_inverse, BinWeights};
use crate::geometry::ArrayModel;
use crate::interface::BeamformerMethod;
use crate::math::fft::{bin_frequency, half_spectrum_len, FftHelper};
use crate::math::matrix::MatrixHelper;
use crate::prelude::{
    BeamformMetadata, Beamformer, BeamformerOutput, Direction, EngineConfig, EngineResult,
};
use log::{debug, trace};
use ndarray::{s, Array2, ArrayView2};
use num_complex::Complex64;

/// MVDR whose covariance is averaged over sub-blocks and over every bin.
///
/// A single loaded inverse serves all frequencies; only the steering vector
/// changes per bin. The block is then processed sub-block by sub-block and
/// the outputs are concatenated, so there is no overlap-add smoothing.
#[derive(Debug, Clone, Copy)]
pub struct BroadbandMvdrBeamformer {
    sub_block: usize,
    diagonal_loading: f64,
    weight_epsilon: f64,
    band: PassBand,
}

impl BroadbandMvdrBeamformer {
    pub fn new(sub_block: usize, diagonal_loading: f64, weight_epsilon: f64, band: PassBand) -> Self {
        Self {
            sub_block: sub_block.max(1),
            diagonal_loading,
            weight_epsilon,
            band,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.broadband_block_size,
            config.diagonal_loading,
            config.weight_epsilon,
            PassBand::from_config(config),
        )
    }

    /// Bin-and-block averaged spatial covariance plus diagonal loading.
    pub fn averaged_covariance(&self, block: ArrayView2<f64>, size: usize) -> Array2<Complex64> {
        let channels = block.ncols();
        let fft = FftHelper::new(size);
        let mut covariance = Array2::<Complex64>::zeros((channels, channels));
        let mut snapshots = 0usize;

        for start in (0..block.nrows()).step_by(size) {
            if start + size > block.nrows() {
                break;
            }
            let spectra = raw_spectra(&fft, block.slice(s![start..start + size, ..]));
            for bin in 0..=half_spectrum_len(size) {
                let x = snapshot(&spectra, bin);
                covariance += &MatrixHelper::outer(x.view());
                snapshots += 1;
            }
        }

        if snapshots > 0 {
            covariance.mapv_inplace(|value| value / snapshots as f64);
        }
        MatrixHelper::load_diagonal(&mut covariance, self.diagonal_loading);
        covariance
    }
}

impl Beamformer for BroadbandMvdrBeamformer {
    fn method(&self) -> BeamformerMethod {
        BeamformerMethod::BroadbandMvdr
    }

    fn beamform(
        &self,
        model: &ArrayModel,
        block: ArrayView2<f64>,
        target: Direction,
    ) -> EngineResult<BeamformerOutput> {
        model.check_block(block)?;

        let frames = block.nrows();
        let size = self.sub_block.min(frames);
        let fft = FftHelper::new(size);
        let inverse = MatrixHelper::invert(self.averaged_covariance(block, size).view());
        if inverse.is_none() {
            debug!("broadband covariance is singular, passing the channel average");
        }

        let mut fallback_bins = 0;
        let weights: Vec<BinWeights> = (0..=half_spectrum_len(size))
            .map(|bin| {
                let frequency = bin_frequency(bin, size, model.sample_rate());
                if !self.band.contains(bin, frequency) {
                    return BinWeights::ChannelAverage;
                }
                let steering = model.steering().vector(target, frequency);
                let weights = inverse.as_ref().and_then(|inverse| {
                    weights_from_inverse(inverse.view(), steering.view(), self.weight_epsilon)
                });
                match weights {
                    Some(w) => BinWeights::Weighted(w),
                    None => {
                        trace!("broadband bin {} ({:.1} Hz) falls back", bin, frequency);
                        fallback_bins += 1;
                        BinWeights::ChannelAverage
                    }
                }
            })
            .collect();

        let mut samples = Vec::with_capacity(frames);
        for start in (0..frames).step_by(size) {
            let end = (start + size).min(frames);
            // the tail is zero-padded to the sub-block length, then truncated
            let spectra = raw_spectra(&fft, block.slice(s![start..end, ..]));
            let rendered = render(&fft, &spectra, &weights);
            samples.extend_from_slice(&rendered[..end - start]);
        }

        Ok(BeamformerOutput {
            samples,
            metadata: BeamformMetadata {
                method: self.method(),
                target,
                fallback_bins,
            },
        })
    }
}
