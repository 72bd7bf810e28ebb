//! Frequency-domain beamformers sharing one per-bin weighting path.

pub mod broadband;
pub mod delay_sum;
pub mod mvdr;
pub mod steering;
pub mod superdirective;

pub use broadband::BroadbandMvdrBeamformer;
pub use delay_sum::DelayAndSumBeamformer;
pub use mvdr::MvdrBeamformer;
pub use steering::{SteeringCache, SteeringModel};
pub use superdirective::{SuperdirectiveBeamformer, SuperdirectiveWeights};

use crate::math::fft::{half_spectrum_len, mirror_hermitian, FftHelper};
use crate::math::matrix::MatrixHelper;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;

/// How one frequency bin of the output is formed.
#[derive(Debug, Clone)]
pub enum BinWeights {
    /// Plain mean of the channel spectra.
    ChannelAverage,
    /// Output bin is `wᴴ x`.
    Weighted(Array1<Complex64>),
}

/// Unwindowed spectra of every channel, zero-padded to the plan length.
pub(crate) fn raw_spectra(fft: &FftHelper, block: ArrayView2<f64>) -> Vec<Vec<Complex64>> {
    block
        .axis_iter(Axis(1))
        .map(|column| fft.forward(column.iter().copied()))
        .collect()
}

pub(crate) fn snapshot(spectra: &[Vec<Complex64>], bin: usize) -> Array1<Complex64> {
    spectra.iter().map(|spectrum| spectrum[bin]).collect()
}

pub(crate) fn channel_average(x: ArrayView1<Complex64>) -> Complex64 {
    x.sum() / x.len().max(1) as f64
}

/// MVDR weights `R⁻¹a / (aᴴR⁻¹a + eps)` from an already inverted matrix.
pub(crate) fn weights_from_inverse(
    inverse: ArrayView2<Complex64>,
    steering: ArrayView1<Complex64>,
    epsilon: f64,
) -> Option<Array1<Complex64>> {
    let projected = MatrixHelper::mat_vec(inverse, steering);
    let denominator = MatrixHelper::inner(steering, projected.view()) + epsilon;
    if !denominator.re.is_finite() || !denominator.im.is_finite() || denominator.norm() == 0.0 {
        return None;
    }
    let weights = projected.mapv(|value| value / denominator);
    weights
        .iter()
        .all(|value| value.re.is_finite() && value.im.is_finite())
        .then_some(weights)
}

/// Inverts `matrix` and forms MVDR weights; `None` when the inversion fails.
pub(crate) fn mvdr_weights(
    matrix: ArrayView2<Complex64>,
    steering: ArrayView1<Complex64>,
    epsilon: f64,
) -> Option<Array1<Complex64>> {
    let inverse = MatrixHelper::invert(matrix)?;
    weights_from_inverse(inverse.view(), steering, epsilon)
}

/// Applies per-bin weights to the non-negative half and resynthesises a real signal.
pub(crate) fn render(fft: &FftHelper, spectra: &[Vec<Complex64>], weights: &[BinWeights]) -> Vec<f64> {
    let size = fft.len();
    let mut output = vec![Complex64::new(0.0, 0.0); size];
    for (bin, bin_weights) in weights.iter().enumerate().take(half_spectrum_len(size) + 1) {
        let x = snapshot(spectra, bin);
        output[bin] = match bin_weights {
            BinWeights::ChannelAverage => channel_average(x.view()),
            BinWeights::Weighted(w) => MatrixHelper::inner(w.view(), x.view()),
        };
    }
    mirror_hermitian(&mut output);
    fft.inverse_real(&output)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::geometry::array::TETRAHEDRAL_HALF_EDGE_M;
    use crate::geometry::{ArrayGeometry, ArrayModel};
    use crate::math::FftHelper;
    use crate::prelude::{Direction, EngineConfig};
    use crate::signal::{bin_frequency, plane_wave_block, tone};
    use ndarray::Array2;

    pub const FRAMES: usize = 1024;
    pub const TARGET_BIN: usize = 23;
    pub const INTERFERER_BIN: usize = 12;

    pub fn target() -> Direction {
        Direction::new(45.0, 30.0)
    }

    pub fn interferer() -> Direction {
        Direction::new(-135.0, -30.0)
    }

    pub fn model_with(config: &EngineConfig) -> ArrayModel {
        let geometry =
            ArrayGeometry::tetrahedral(TETRAHEDRAL_HALF_EDGE_M, 44_100.0, 343.0).unwrap();
        ArrayModel::build(geometry, config).unwrap()
    }

    pub fn model() -> ArrayModel {
        model_with(&EngineConfig::default())
    }

    pub fn target_tone(model: &ArrayModel, frames: usize, bin: usize) -> Array2<f64> {
        let frequency = bin_frequency(bin, frames, model.sample_rate());
        plane_wave_block(model.geometry(), target(), frames, tone(frequency, 1.0))
    }

    /// Target tone at `TARGET_BIN` plus an equally loud interferer at `INTERFERER_BIN`.
    pub fn two_source_block(model: &ArrayModel) -> Array2<f64> {
        two_source_block_at(model, TARGET_BIN, INTERFERER_BIN)
    }

    pub fn two_source_block_at(model: &ArrayModel, target_bin: usize, interferer_bin: usize) -> Array2<f64> {
        let interfering = bin_frequency(interferer_bin, FRAMES, model.sample_rate());
        target_tone(model, FRAMES, target_bin)
            + plane_wave_block(model.geometry(), interferer(), FRAMES, tone(interfering, 1.0))
    }

    pub fn magnitude_at(signal: &[f64], bin: usize) -> f64 {
        FftHelper::new(signal.len()).forward(signal.iter().copied())[bin].norm()
    }

    /// Interferer magnitude relative to the target magnitude.
    pub fn interference_ratio(signal: &[f64]) -> f64 {
        interference_ratio_at(signal, TARGET_BIN, INTERFERER_BIN)
    }

    pub fn interference_ratio_at(signal: &[f64], target_bin: usize, interferer_bin: usize) -> f64 {
        magnitude_at(signal, interferer_bin) / magnitude_at(signal, target_bin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn weights_keep_unit_response_toward_steering() {
        let steering = array![
            Complex64::from_polar(1.0, 0.3),
            Complex64::from_polar(1.0, -1.2),
            Complex64::from_polar(1.0, 2.0)
        ];
        let mut matrix = MatrixHelper::outer(steering.view());
        MatrixHelper::load_diagonal(&mut matrix, 0.5);
        let weights = mvdr_weights(matrix.view(), steering.view(), 1e-12).unwrap();
        let response = MatrixHelper::inner(weights.view(), steering.view());
        assert!((response - Complex64::new(1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn singular_matrix_yields_no_weights() {
        let steering = array![Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)];
        let matrix = MatrixHelper::outer(steering.view());
        assert!(mvdr_weights(matrix.view(), steering.view(), 1e-12).is_none());
    }

    #[test]
    fn render_with_averages_returns_channel_mean() {
        let fft = FftHelper::new(8);
        let a = [1.0, 2.0, 0.0, -1.0, 0.5, 0.0, 3.0, 1.0];
        let b = [0.0, 1.0, 1.0, 1.0, -0.5, 2.0, 1.0, 0.0];
        let spectra = vec![fft.forward(a.iter().copied()), fft.forward(b.iter().copied())];
        let weights = vec![BinWeights::ChannelAverage; 5];
        let output = render(&fft, &spectra, &weights);
        for (index, value) in output.iter().enumerate() {
            assert!((value - (a[index] + b[index]) / 2.0).abs() < 1e-12);
        }
    }
}
