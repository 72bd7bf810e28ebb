//! Far-field test-signal synthesis.
//!
//! Every capsule receives the same waveform shifted by its exact (fractional)
//! arrival offset, so blocks built here match the engine's propagation model.

use crate::geometry::ArrayGeometry;
use crate::prelude::Direction;
use ndarray::Array2;
use std::f64::consts::PI;

/// `[frames x channels]` block of a plane wave from `direction` carrying `waveform(t)`.
pub fn plane_wave_block<F>(
    geometry: &ArrayGeometry,
    direction: Direction,
    frames: usize,
    waveform: F,
) -> Array2<f64>
where
    F: Fn(f64) -> f64,
{
    let offsets = geometry.arrival_offsets(&direction.unit_vector());
    let sample_rate = geometry.sample_rate();
    Array2::from_shape_fn((frames, geometry.num_mics()), |(frame, channel)| {
        waveform(frame as f64 / sample_rate - offsets[channel])
    })
}

pub use crate::math::fft::bin_frequency;

pub fn tone(frequency: f64, amplitude: f64) -> impl Fn(f64) -> f64 {
    move |t| amplitude * (2.0 * PI * frequency * t).sin()
}

/// Sum of unit cosines at `fundamental * k` for `k` in `first..=last` with fixed pseudo-random phases.
pub fn harmonic_complex(fundamental: f64, first: usize, last: usize) -> impl Fn(f64) -> f64 {
    let partials: Vec<(f64, f64)> = (first..=last)
        .map(|k| {
            let phase = (k as f64 * k as f64 * 0.7).rem_euclid(2.0 * PI);
            (fundamental * k as f64, phase)
        })
        .collect();
    move |t| {
        partials
            .iter()
            .map(|&(frequency, phase)| (2.0 * PI * frequency * t + phase).cos())
            .sum()
    }
}
