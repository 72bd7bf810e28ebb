use crate::geometry::array::dot;
use crate::geometry::ArrayModel;
use crate::interface::BeamformerMethod;
use crate::math::fft::{bin_frequency, half_spectrum_len, mirror_hermitian, FftHelper};
use crate::prelude::{BeamformMetadata, Beamformer, BeamformerOutput, Direction, EngineResult};
use ndarray::{ArrayView2, Axis};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Fractional-delay alignment toward the look direction followed by the channel mean.
///
/// Each channel is delayed by `dot(u, p_m) / c` through a linear phase ramp,
/// which undoes its plane-wave arrival offset exactly (circularly).
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayAndSumBeamformer;

impl DelayAndSumBeamformer {
    pub fn new() -> Self {
        Self
    }
}

impl Beamformer for DelayAndSumBeamformer {
    fn method(&self) -> BeamformerMethod {
        BeamformerMethod::DelayAndSum
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
        let sample_rate = model.sample_rate();
        let speed_of_sound = model.geometry().speed_of_sound();
        let unit = target.unit_vector();
        let mut summed = vec![0.0; frames];

        for (column, position) in block.axis_iter(Axis(1)).zip(model.geometry().positions()) {
            let delay = dot(&unit, position) / speed_of_sound;
            let mut spectrum = fft.forward(column.iter().copied());
            for (bin, value) in spectrum
                .iter_mut()
                .enumerate()
                .take(half_spectrum_len(frames) + 1)
            {
                let frequency = bin_frequency(bin, frames, sample_rate);
                *value *= Complex64::from_polar(1.0, -2.0 * PI * frequency * delay);
            }
            mirror_hermitian(&mut spectrum);
            for (total, sample) in summed.iter_mut().zip(fft.inverse_real(&spectrum)) {
                *total += sample;
            }
        }

        let channels = model.num_mics() as f64;
        summed.iter_mut().for_each(|sample| *sample /= channels);

        Ok(BeamformerOutput {
            samples: summed,
            metadata: BeamformMetadata {
                method: self.method(),
                target,
                fallback_bins: 0,
            },
        })
    }
}
