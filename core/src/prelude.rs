use crate::geometry::ArrayModel;
use crate::interface::BeamformerMethod;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Tunables shared by every estimator and beamformer of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub azimuth_step_deg: f64,
    pub elevation_step_deg: f64,
    /// Added to the geometric maximum lag before capping.
    pub lag_margin_samples: usize,
    pub lag_cap_samples: usize,
    /// Regulariser of the PHAT magnitude normalisation.
    pub phat_epsilon: f64,
    /// Diagonal loading added to the single-snapshot and averaged covariances.
    pub diagonal_loading: f64,
    /// Regulariser of the MVDR weight denominator.
    pub weight_epsilon: f64,
    pub band_low_hz: f64,
    pub band_high_hz: f64,
    /// Upper white-noise-gain bound of the superdirective design, in dB.
    pub white_noise_gain_db: f64,
    pub broadband_block_size: usize,
    pub superdirective_floor_hz: f64,
    /// Number of steering vectors kept between calls; 0 disables caching.
    pub steering_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            azimuth_step_deg: 5.0,
            elevation_step_deg: 5.0,
            lag_margin_samples: 5,
            lag_cap_samples: 50,
            phat_epsilon: 1e-12,
            diagonal_loading: 1e-3,
            weight_epsilon: 1e-12,
            band_low_hz: 200.0,
            band_high_hz: 4000.0,
            white_noise_gain_db: -10.0,
            broadband_block_size: 256,
            superdirective_floor_hz: 10.0,
            steering_cache_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        };

        positive("azimuth_step_deg", self.azimuth_step_deg)?;
        positive("elevation_step_deg", self.elevation_step_deg)?;
        positive("phat_epsilon", self.phat_epsilon)?;
        positive("weight_epsilon", self.weight_epsilon)?;

        if !(self.diagonal_loading.is_finite() && self.diagonal_loading >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "diagonal_loading must be non-negative, got {}",
                self.diagonal_loading
            )));
        }
        if !(self.band_low_hz >= 0.0 && self.band_low_hz < self.band_high_hz) {
            return Err(EngineError::InvalidConfig(format!(
                "pass band [{}, {}] Hz is empty",
                self.band_low_hz, self.band_high_hz
            )));
        }
        if !self.white_noise_gain_db.is_finite() {
            return Err(EngineError::InvalidConfig(
                "white_noise_gain_db must be finite".into(),
            ));
        }
        if !(self.superdirective_floor_hz.is_finite() && self.superdirective_floor_hz >= 0.0) {
            return Err(EngineError::InvalidConfig(
                "superdirective_floor_hz must be non-negative".into(),
            ));
        }
        if self.broadband_block_size < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "broadband_block_size must be at least 2, got {}",
                self.broadband_block_size
            )));
        }
        Ok(())
    }

    /// Linear diagonal term of the superdirective white-noise-gain constraint.
    pub fn white_noise_loading(&self) -> f64 {
        10f64.powf(self.white_noise_gain_db / 10.0)
    }
}

/// Look direction in degrees; azimuth counter-clockwise from +x, elevation above the xy plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl Direction {
    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
        }
    }

    pub fn unit_vector(&self) -> [f64; 3] {
        let az = self.azimuth_deg.to_radians();
        let el = self.elevation_deg.to_radians();
        [el.cos() * az.cos(), el.cos() * az.sin(), el.sin()]
    }
}

/// Result of one direction-estimator call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoaEstimate {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    /// Method-specific scale, higher is better.
    pub confidence: f64,
}

impl DoaEstimate {
    pub fn direction(&self) -> Direction {
        Direction::new(self.azimuth_deg, self.elevation_deg)
    }
}

/// Metadata produced next to every beamformed waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamformMetadata {
    pub method: BeamformerMethod,
    pub target: Direction,
    /// Frequency bins that took the channel-average branch after a failed inversion.
    pub fallback_bins: usize,
}

/// Single-channel waveform with the same frame count as the input block.
#[derive(Debug, Clone)]
pub struct BeamformerOutput {
    pub samples: Vec<f64>,
    pub metadata: BeamformMetadata,
}

/// Common error type for engine construction and per-block calls.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("channel mismatch: expected {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Estimates where sound comes from given one `[frames x channels]` block.
pub trait DirectionEstimator {
    fn name(&self) -> &'static str;
    fn estimate(&self, model: &ArrayModel, block: ArrayView2<f64>) -> EngineResult<DoaEstimate>;
}

/// Steers the array toward `target` and reduces the block to one channel.
pub trait Beamformer {
    fn method(&self) -> BeamformerMethod;
    fn beamform(
        &self,
        model: &ArrayModel,
        block: ArrayView2<f64>,
        target: Direction,
    ) -> EngineResult<BeamformerOutput>;
}
