use crate::beamforming::steering::SteeringModel;
use crate::geometry::array::{ArrayGeometry, MicPair};
use crate::geometry::delay::DelayTable;
use crate::geometry::grid::DirectionGrid;
use crate::prelude::{EngineConfig, EngineError, EngineResult};
use ndarray::ArrayView2;

/// Geometry together with every table derived from it.
///
/// Immutable once built; a sample-rate change produces a fresh model.
pub struct ArrayModel {
    geometry: ArrayGeometry,
    pairs: Vec<MicPair>,
    grid: DirectionGrid,
    delays: DelayTable,
    max_lag: usize,
    steering: SteeringModel,
}

impl ArrayModel {
    pub fn build(geometry: ArrayGeometry, config: &EngineConfig) -> EngineResult<Self> {
        geometry.validate()?;
        config.validate()?;

        let pairs = geometry.pairs();
        let grid = DirectionGrid::new(config.azimuth_step_deg, config.elevation_step_deg)?;
        let delays = DelayTable::build(&geometry, &grid);
        let max_lag = geometry.max_lag_samples(config.lag_margin_samples, config.lag_cap_samples);
        let steering = SteeringModel::new(&geometry, config.steering_cache_capacity);

        Ok(Self {
            geometry,
            pairs,
            grid,
            delays,
            max_lag,
            steering,
        })
    }

    pub fn geometry(&self) -> &ArrayGeometry {
        &self.geometry
    }

    pub fn pairs(&self) -> &[MicPair] {
        &self.pairs
    }

    pub fn grid(&self) -> &DirectionGrid {
        &self.grid
    }

    pub fn delays(&self) -> &DelayTable {
        &self.delays
    }

    /// GCC-PHAT search bound in samples.
    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    pub fn steering(&self) -> &SteeringModel {
        &self.steering
    }

    pub fn num_mics(&self) -> usize {
        self.geometry.num_mics()
    }

    pub fn sample_rate(&self) -> f64 {
        self.geometry.sample_rate()
    }

    /// Rejects blocks whose channel count differs from the array, that hold no
    /// frames, or that carry non-finite samples.
    pub fn check_block(&self, block: ArrayView2<f64>) -> EngineResult<()> {
        let (frames, channels) = block.dim();
        if channels != self.num_mics() {
            return Err(EngineError::ChannelMismatch {
                expected: self.num_mics(),
                actual: channels,
            });
        }
        if frames == 0 {
            return Err(EngineError::InvalidInput("block holds no frames".into()));
        }
        if let Some(((frame, channel), _)) = block.indexed_iter().find(|(_, value)| !value.is_finite()) {
            return Err(EngineError::InvalidInput(format!(
                "non-finite sample at frame {} channel {}",
                frame, channel
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::array::TETRAHEDRAL_HALF_EDGE_M;
    use ndarray::Array2;

    fn model() -> ArrayModel {
        let geometry =
            ArrayGeometry::tetrahedral(TETRAHEDRAL_HALF_EDGE_M, 44_100.0, 343.0).unwrap();
        ArrayModel::build(geometry, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn model_derives_all_tables() {
        let model = model();
        assert_eq!(model.pairs().len(), 6);
        assert_eq!(model.delays().num_pairs(), 6);
        assert_eq!(model.delays().num_points(), model.grid().len());
        assert_eq!(model.max_lag(), 15);
        assert_eq!(model.steering().num_mics(), 4);
    }

    #[test]
    fn check_block_rejects_wrong_channel_count() {
        let model = model();
        let block = Array2::<f64>::zeros((64, 3));
        match model.check_block(block.view()) {
            Err(EngineError::ChannelMismatch { expected, actual }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(model.check_block(Array2::<f64>::zeros((0, 4)).view()).is_err());
        assert!(model.check_block(Array2::<f64>::zeros((64, 4)).view()).is_ok());
    }

    #[test]
    fn check_block_rejects_non_finite_samples() {
        let model = model();
        let mut block = Array2::<f64>::zeros((64, 4));
        block[[10, 2]] = f64::NAN;
        assert!(matches!(
            model.check_block(block.view()),
            Err(EngineError::InvalidInput(_))
        ));
        block[[10, 2]] = f64::INFINITY;
        assert!(model.check_block(block.view()).is_err());
    }

    #[test]
    fn invalid_config_fails_build() {
        let geometry =
            ArrayGeometry::tetrahedral(TETRAHEDRAL_HALF_EDGE_M, 44_100.0, 343.0).unwrap();
        let config = EngineConfig {
            weight_epsilon: 0.0,
            ..Default::default()
        };
        assert!(ArrayModel::build(geometry, &config).is_err());
    }
}
