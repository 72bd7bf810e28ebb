use crate::geometry::ArrayModel;
use crate::math::fft::{hann_window, FftHelper};
use crate::prelude::{EngineError, EngineResult};
use ndarray::{ArrayView2, Axis};
use num_complex::Complex64;

/// Pairwise correlation result: winning signed lag plus the circular sequence.
///
/// A positive lag means the first signal is a delayed copy of the second.
#[derive(Debug, Clone)]
pub struct PairCorrelation {
    pub lag: i64,
    pub peak: f64,
    pub correlation: Vec<f64>,
}

/// Generalised cross-correlation with phase transform.
#[derive(Debug, Clone, Copy)]
pub struct GccPhat {
    epsilon: f64,
    max_lag: usize,
}

impl GccPhat {
    pub fn new(epsilon: f64, max_lag: usize) -> Self {
        Self { epsilon, max_lag }
    }

    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    /// Correlates two equal-length signals and picks the bounded peak.
    pub fn correlate(&self, a: &[f64], b: &[f64]) -> EngineResult<PairCorrelation> {
        if a.len() != b.len() {
            return Err(EngineError::InvalidInput(format!(
                "signal lengths differ: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        if a.is_empty() {
            return Err(EngineError::InvalidInput("signals are empty".into()));
        }

        let fft = FftHelper::new(a.len());
        let window = hann_window(a.len());
        let spectrum_a = fft.forward(a.iter().zip(&window).map(|(x, w)| x * w));
        let spectrum_b = fft.forward(b.iter().zip(&window).map(|(x, w)| x * w));
        let correlation = fft.inverse_real(&phat_cross_spectrum(
            &spectrum_a,
            &spectrum_b,
            self.epsilon,
        ));
        let (lag, peak) = pick_peak(&correlation, self.max_lag);

        Ok(PairCorrelation {
            lag,
            peak,
            correlation,
        })
    }
}

/// `A conj(B) / (|A conj(B)| + eps)` bin by bin.
pub fn phat_cross_spectrum(a: &[Complex64], b: &[Complex64], epsilon: f64) -> Vec<Complex64> {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let cross = x * y.conj();
            cross / (cross.norm() + epsilon)
        })
        .collect()
}

/// Windowed spectra of every channel of a `[frames x channels]` block.
pub fn channel_spectra(fft: &FftHelper, block: ArrayView2<f64>) -> Vec<Vec<Complex64>> {
    let window = hann_window(block.nrows());
    block
        .axis_iter(Axis(1))
        .map(|column| fft.forward(column.iter().zip(&window).map(|(x, w)| x * w)))
        .collect()
}

/// Signed lag of the correlation peak within `±min(max_lag, len / 2)`.
///
/// A candidate lag qualifies only as a strict local maximum against its
/// circular neighbours, so lags -1 and the bound itself are reachable. The
/// non-negative side is scanned before the wrapped negative side and a later
/// candidate must beat the current best strictly. Zero lag is the fallback.
pub fn pick_peak(correlation: &[f64], max_lag: usize) -> (i64, f64) {
    let len = correlation.len();
    if len == 0 {
        return (0, 0.0);
    }
    let allowed = max_lag.min(len / 2) as i64;
    let at = |lag: i64| correlation[lag.rem_euclid(len as i64) as usize];

    let mut best_lag = 0i64;
    let mut best_value = correlation[0];
    let candidates = (1..=allowed).chain((1..=allowed).map(|lag| -lag));
    for lag in candidates {
        let value = at(lag);
        if value > at(lag - 1) && value > at(lag + 1) && value > best_value {
            best_lag = lag;
            best_value = value;
        }
    }

    (best_lag, best_value)
}

/// Winning lag of every microphone pair, in pair enumeration order.
pub fn tdoa_vector(model: &ArrayModel, block: ArrayView2<f64>, epsilon: f64) -> EngineResult<Vec<i64>> {
    model.check_block(block)?;

    let fft = FftHelper::new(block.nrows());
    let spectra = channel_spectra(&fft, block);
    let lags = model
        .pairs()
        .iter()
        .map(|pair| {
            let cross = phat_cross_spectrum(&spectra[pair.first], &spectra[pair.second], epsilon);
            let correlation = fft.inverse_real(&cross);
            pick_peak(&correlation, model.max_lag()).0
        })
        .collect();

    Ok(lags)
}
