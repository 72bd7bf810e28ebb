use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Helper that wraps a forward/inverse `rustfft` plan pair of one length.
pub struct FftHelper {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        Self {
            forward,
            inverse,
            size,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Full complex spectrum of a real signal, zero-padded or truncated to the plan length.
    pub fn forward<I>(&self, input: I) -> Vec<Complex64>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut buffer: Vec<Complex64> = input
            .into_iter()
            .take(self.size)
            .map(|value| Complex64::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::zero());
        self.forward.process(&mut buffer);
        buffer
    }

    /// Real part of the normalised inverse transform.
    ///
    /// Callers pass Hermitian-symmetric spectra, for which the discarded
    /// imaginary part is rounding noise.
    pub fn inverse_real(&self, spectrum: &[Complex64]) -> Vec<f64> {
        let mut buffer = spectrum.to_vec();
        buffer.resize(self.size, Complex64::zero());
        self.inverse.process(&mut buffer);
        let scale = 1.0 / self.size.max(1) as f64;
        buffer.iter().map(|value| value.re * scale).collect()
    }
}

/// Symmetric Hann (cosine-squared) taper.
pub fn hann_window(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let denom = (len.saturating_sub(1)) as f64;
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / denom).cos())
        .collect()
}

/// Index of the last non-negative-frequency bin.
pub fn half_spectrum_len(size: usize) -> usize {
    size / 2
}

/// Frequency in Hz of bin `bin` for bins up to the Nyquist index.
pub fn bin_frequency(bin: usize, size: usize, sample_rate: f64) -> f64 {
    bin as f64 * sample_rate / size as f64
}

/// Overwrites the negative-frequency half with conjugates of the positive half.
pub fn mirror_hermitian(spectrum: &mut [Complex64]) {
    let size = spectrum.len();
    for bin in half_spectrum_len(size) + 1..size {
        spectrum[bin] = spectrum[size - bin].conj();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_helper_returns_same_length() {
        let helper = FftHelper::new(4);
        let output = helper.forward([1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 4);
        assert!((output[1].re - 2.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_restores_real_signal() {
        let helper = FftHelper::new(8);
        let signal = [0.5, -1.0, 2.0, 0.0, 3.0, -0.25, 1.0, 0.75];
        let spectrum = helper.forward(signal.iter().copied());
        let restored = helper.inverse_real(&spectrum);
        for (a, b) in signal.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn hann_window_tapers_to_zero() {
        let window = hann_window(5);
        assert_eq!(window.len(), 5);
        assert!(window[0].abs() < 1e-12);
        assert!((window[2] - 1.0).abs() < 1e-12);
        assert!(window[4].abs() < 1e-12);
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn mirror_hermitian_makes_inverse_real() {
        let mut spectrum = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.5, 0.25),
            Complex64::new(-0.5, 1.0),
            Complex64::new(9.0, 9.0),
            Complex64::new(2.0, 0.0),
            Complex64::new(9.0, 9.0),
            Complex64::new(9.0, 9.0),
            Complex64::new(9.0, 9.0),
        ];
        mirror_hermitian(&mut spectrum);
        assert_eq!(spectrum[7], Complex64::new(0.5, -0.25));
        assert_eq!(spectrum[5], Complex64::new(9.0, -9.0));

        let mut buffer = spectrum.clone();
        FftPlanner::new().plan_fft_inverse(8).process(&mut buffer);
        assert!(buffer.iter().all(|value| value.im.abs() < 1e-9));
    }
}
