use doacore::signal::{bin_frequency, harmonic_complex, tone};
use serde::{Deserialize, Serialize};

/// Source waveform of a simulated plane wave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Waveform {
    /// Sine at a fixed frequency.
    Tone { frequency_hz: f64 },
    /// Unit cosines on every block bin in `first_bin..=last_bin`; `None` runs up to just below Nyquist.
    Harmonic {
        first_bin: usize,
        last_bin: Option<usize>,
    },
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Harmonic {
            first_bin: 1,
            last_bin: None,
        }
    }
}

impl Waveform {
    /// Continuous-time waveform for blocks of `frames` samples at `sample_rate`.
    pub fn build(&self, frames: usize, sample_rate: f64, amplitude: f64) -> Box<dyn Fn(f64) -> f64> {
        match *self {
            Waveform::Tone { frequency_hz } => Box::new(tone(frequency_hz, amplitude)),
            Waveform::Harmonic {
                first_bin,
                last_bin,
            } => {
                let fundamental = bin_frequency(1, frames.max(1), sample_rate);
                let last = last_bin.unwrap_or_else(|| (frames / 2).saturating_sub(1));
                let partials = harmonic_complex(fundamental, first_bin.max(1), last);
                Box::new(move |t| amplitude * partials(t))
            }
        }
    }
}
