use crate::prelude::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Half edge of the reference tetrahedral capsule layout, in metres.
pub const TETRAHEDRAL_HALF_EDGE_M: f64 = 0.025;

pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Unordered microphone pair, always stored with `first < second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MicPair {
    pub first: usize,
    pub second: usize,
}

/// Rigid array description: capsule positions in metres plus the acoustic context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayGeometry {
    positions: Vec<[f64; 3]>,
    sample_rate: f64,
    speed_of_sound: f64,
}

impl ArrayGeometry {
    pub fn new(positions: Vec<[f64; 3]>, sample_rate: f64, speed_of_sound: f64) -> EngineResult<Self> {
        let geometry = Self {
            positions,
            sample_rate,
            speed_of_sound,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Four capsules on alternating cube corners `(±a, ±a, ±a)`.
    pub fn tetrahedral(half_edge: f64, sample_rate: f64, speed_of_sound: f64) -> EngineResult<Self> {
        let a = half_edge;
        Self::new(
            vec![[a, a, a], [a, -a, -a], [-a, a, -a], [-a, -a, a]],
            sample_rate,
            speed_of_sound,
        )
    }

    /// Re-checks invariants; deserialised geometries bypass `new`.
    pub fn validate(&self) -> EngineResult<()> {
        if self.positions.len() < 2 {
            return Err(EngineError::InvalidGeometry(format!(
                "at least 2 microphones required, got {}",
                self.positions.len()
            )));
        }
        if self
            .positions
            .iter()
            .flatten()
            .any(|coordinate| !coordinate.is_finite())
        {
            return Err(EngineError::InvalidGeometry(
                "microphone coordinates must be finite".into(),
            ));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !(self.speed_of_sound.is_finite() && self.speed_of_sound > 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "speed of sound must be positive, got {}",
                self.speed_of_sound
            )));
        }
        if self.max_pair_distance() <= 0.0 {
            return Err(EngineError::InvalidGeometry(
                "all microphones share one position".into(),
            ));
        }
        Ok(())
    }

    pub fn num_mics(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.speed_of_sound
    }

    /// Same capsules at another sample rate.
    pub fn with_sample_rate(&self, sample_rate: f64) -> EngineResult<Self> {
        Self::new(self.positions.clone(), sample_rate, self.speed_of_sound)
    }

    /// All `N(N-1)/2` pairs ordered by first index, then second.
    pub fn pairs(&self) -> Vec<MicPair> {
        let n = self.num_mics();
        (0..n)
            .flat_map(|first| (first + 1..n).map(move |second| MicPair { first, second }))
            .collect()
    }

    /// `position[first] - position[second]`.
    pub fn baseline(&self, pair: MicPair) -> [f64; 3] {
        sub(&self.positions[pair.first], &self.positions[pair.second])
    }

    pub fn pair_distance(&self, pair: MicPair) -> f64 {
        norm(&self.baseline(pair))
    }

    pub fn max_pair_distance(&self) -> f64 {
        self.pairs()
            .into_iter()
            .map(|pair| self.pair_distance(pair))
            .fold(0.0, f64::max)
    }

    /// Longest possible inter-capsule propagation time, in seconds.
    pub fn max_time_delay(&self) -> f64 {
        self.max_pair_distance() / self.speed_of_sound
    }

    /// Peak-search bound: ceil(max delay in samples) + margin, capped.
    pub fn max_lag_samples(&self, margin: usize, cap: usize) -> usize {
        let geometric = (self.max_time_delay() * self.sample_rate).ceil() as usize;
        (geometric + margin).min(cap)
    }

    /// Arrival offset of a plane wave from `unit` at every capsule, in seconds.
    ///
    /// Capsules closer to the source hear it earlier (negative offset).
    pub fn arrival_offsets(&self, unit: &[f64; 3]) -> Vec<f64> {
        self.positions
            .iter()
            .map(|position| -dot(unit, position) / self.speed_of_sound)
            .collect()
    }

    /// True when every edge length lies within `tolerance` (relative) of the mean edge.
    pub fn is_regular_tetrahedron(&self, tolerance: f64) -> bool {
        if self.num_mics() != 4 {
            return false;
        }
        let edges: Vec<f64> = self
            .pairs()
            .into_iter()
            .map(|pair| self.pair_distance(pair))
            .collect();
        let mean = edges.iter().sum::<f64>() / edges.len() as f64;
        mean > 0.0 && edges.iter().all(|edge| (edge - mean).abs() / mean <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetra() -> ArrayGeometry {
        ArrayGeometry::tetrahedral(TETRAHEDRAL_HALF_EDGE_M, 44_100.0, 343.0).unwrap()
    }

    #[test]
    fn pairs_follow_fixed_enumeration() {
        let pairs = tetra().pairs();
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[0], MicPair { first: 0, second: 1 });
        assert_eq!(pairs[2], MicPair { first: 0, second: 3 });
        assert_eq!(pairs[5], MicPair { first: 2, second: 3 });
        assert!(pairs.iter().all(|pair| pair.first < pair.second));
    }

    #[test]
    fn max_lag_adds_margin_and_caps() {
        let geometry = tetra();
        // 2*sqrt(2)*25 mm / 343 m/s * 44.1 kHz = 9.09 samples
        assert_eq!(geometry.max_lag_samples(5, 50), 15);
        assert_eq!(geometry.max_lag_samples(5, 12), 12);

        let wide = ArrayGeometry::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], 48_000.0, 343.0)
            .unwrap();
        assert_eq!(wide.max_lag_samples(5, 50), 50);
    }

    #[test]
    fn degenerate_geometries_are_rejected() {
        assert!(matches!(
            ArrayGeometry::new(vec![[0.0, 0.0, 0.0]], 44_100.0, 343.0),
            Err(EngineError::InvalidGeometry(_))
        ));
        assert!(ArrayGeometry::new(vec![[0.0; 3], [0.0; 3]], 44_100.0, 343.0).is_err());
        assert!(ArrayGeometry::new(vec![[0.0; 3], [0.1, 0.0, 0.0]], 0.0, 343.0).is_err());
        assert!(ArrayGeometry::new(vec![[0.0; 3], [f64::NAN, 0.0, 0.0]], 16_000.0, 343.0).is_err());
    }

    #[test]
    fn tetrahedral_preset_is_regular() {
        let geometry = tetra();
        assert!(geometry.is_regular_tetrahedron(0.01));
        let skewed = ArrayGeometry::new(
            vec![[0.0, 0.0, 0.0], [0.05, 0.0, 0.0], [0.0, 0.05, 0.0], [0.0, 0.0, 0.08]],
            44_100.0,
            343.0,
        )
        .unwrap();
        assert!(!skewed.is_regular_tetrahedron(0.01));
    }

    #[test]
    fn arrival_offsets_lead_toward_source() {
        let geometry =
            ArrayGeometry::new(vec![[0.1, 0.0, 0.0], [-0.1, 0.0, 0.0]], 16_000.0, 343.0).unwrap();
        let offsets = geometry.arrival_offsets(&[1.0, 0.0, 0.0]);
        assert!(offsets[0] < 0.0);
        assert!((offsets[0] + offsets[1]).abs() < 1e-15);
    }

    #[test]
    fn sample_rate_change_keeps_positions() {
        let geometry = tetra().with_sample_rate(16_000.0).unwrap();
        assert_eq!(geometry.positions(), tetra().positions());
        assert_eq!(geometry.max_lag_samples(5, 50), 9);
    }
}
