use crate::geometry::array::dot;
use crate::prelude::{Direction, EngineError, EngineResult};

/// Highest elevation magnitude sampled; the poles have no defined azimuth.
pub const ELEVATION_LIMIT_DEG: f64 = 85.0;

const STEP_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub unit: [f64; 3],
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl GridPoint {
    pub fn direction(&self) -> Direction {
        Direction::new(self.azimuth_deg, self.elevation_deg)
    }
}

/// Spherical search grid, enumerated elevation-major from the lowest ring up.
#[derive(Debug, Clone)]
pub struct DirectionGrid {
    points: Vec<GridPoint>,
    azimuth_step_deg: f64,
    elevation_step_deg: f64,
}

impl DirectionGrid {
    pub fn new(azimuth_step_deg: f64, elevation_step_deg: f64) -> EngineResult<Self> {
        if !(azimuth_step_deg > 0.0 && elevation_step_deg > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "grid steps must be positive, got {} / {}",
                azimuth_step_deg, elevation_step_deg
            )));
        }

        let azimuth_count = (360.0 / azimuth_step_deg - STEP_SLACK).ceil().max(1.0) as usize;
        let elevation_count =
            ((2.0 * ELEVATION_LIMIT_DEG) / elevation_step_deg + STEP_SLACK).floor() as usize + 1;

        let mut points = Vec::with_capacity(azimuth_count * elevation_count);
        for el_index in 0..elevation_count {
            let elevation_deg = -ELEVATION_LIMIT_DEG + el_index as f64 * elevation_step_deg;
            for az_index in 0..azimuth_count {
                let azimuth_deg = -180.0 + az_index as f64 * azimuth_step_deg;
                let unit = Direction::new(azimuth_deg, elevation_deg).unit_vector();
                points.push(GridPoint {
                    unit,
                    azimuth_deg,
                    elevation_deg,
                });
            }
        }

        Ok(Self {
            points,
            azimuth_step_deg,
            elevation_step_deg,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> &GridPoint {
        &self.points[index]
    }

    pub fn azimuth_step_deg(&self) -> f64 {
        self.azimuth_step_deg
    }

    pub fn elevation_step_deg(&self) -> f64 {
        self.elevation_step_deg
    }

    /// Index of the grid point with the largest cosine similarity to `direction`.
    pub fn nearest(&self, direction: Direction) -> usize {
        let target = direction.unit_vector();
        let mut best = 0;
        let mut best_cos = f64::NEG_INFINITY;
        for (index, point) in self.points.iter().enumerate() {
            let cos = dot(&point.unit, &target);
            if cos > best_cos {
                best_cos = cos;
                best = index;
            }
        }
        best
    }
}

/// Maps any azimuth into `[-180, 180)`.
pub fn wrap_azimuth(azimuth_deg: f64) -> f64 {
    (azimuth_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Smallest absolute difference between two azimuths, across the ±180° seam.
pub fn azimuth_distance(a: f64, b: f64) -> f64 {
    wrap_azimuth(a - b).abs()
}
