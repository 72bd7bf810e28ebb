use crate::geometry::array::{dot, ArrayGeometry};
use crate::geometry::grid::DirectionGrid;
use ndarray::{Array2, ArrayView1};

/// Integer inter-capsule leads for every `(pair, grid point)`.
///
/// Entry `[p, g]` is `round(dot(u_g, baseline_p) * fs / c)`: the number of
/// samples by which the pair's first capsule hears a wavefront from grid
/// point `g` ahead of its second capsule.
#[derive(Debug, Clone)]
pub struct DelayTable {
    delays: Array2<i64>,
}

impl DelayTable {
    pub fn build(geometry: &ArrayGeometry, grid: &DirectionGrid) -> Self {
        let pairs = geometry.pairs();
        let scale = geometry.sample_rate() / geometry.speed_of_sound();
        let baselines: Vec<[f64; 3]> = pairs.iter().map(|&pair| geometry.baseline(pair)).collect();

        let delays = Array2::from_shape_fn((pairs.len(), grid.len()), |(pair_index, grid_index)| {
            let unit = &grid.point(grid_index).unit;
            (dot(unit, &baselines[pair_index]) * scale).round() as i64
        });

        Self { delays }
    }

    pub fn num_pairs(&self) -> usize {
        self.delays.nrows()
    }

    pub fn num_points(&self) -> usize {
        self.delays.ncols()
    }

    pub fn lead(&self, pair_index: usize, grid_index: usize) -> i64 {
        self.delays[[pair_index, grid_index]]
    }

    pub fn pair_row(&self, pair_index: usize) -> ArrayView1<'_, i64> {
        self.delays.row(pair_index)
    }

    /// Correlation index a GCC-PHAT sequence of length `len` peaks at for this entry.
    ///
    /// The cross-correlation peaks at the delay of the first capsule relative
    /// to the second, i.e. the negated lead, wrapped circularly.
    pub fn correlation_index(lead: i64, len: usize) -> usize {
        (-lead).rem_euclid(len as i64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::array::TETRAHEDRAL_HALF_EDGE_M;
    use crate::prelude::Direction;

    #[test]
    fn table_shape_matches_pairs_and_grid() {
        let geometry =
            ArrayGeometry::tetrahedral(TETRAHEDRAL_HALF_EDGE_M, 44_100.0, 343.0).unwrap();
        let grid = DirectionGrid::new(5.0, 5.0).unwrap();
        let table = DelayTable::build(&geometry, &grid);
        assert_eq!(table.num_pairs(), 6);
        assert_eq!(table.num_points(), grid.len());
        let bound = (geometry.max_time_delay() * geometry.sample_rate()).ceil() as i64;
        assert!(table.pair_row(0).iter().all(|lead| lead.abs() <= bound));
    }

    #[test]
    fn endfire_lead_matches_aperture() {
        let geometry =
            ArrayGeometry::new(vec![[0.343, 0.0, 0.0], [0.0, 0.0, 0.0]], 1_000.0, 343.0).unwrap();
        let grid = DirectionGrid::new(90.0, 85.0).unwrap();
        let table = DelayTable::build(&geometry, &grid);
        let front = grid.nearest(Direction::new(0.0, 0.0));
        let back = grid.nearest(Direction::new(-180.0, 0.0));
        assert_eq!(table.lead(0, front), 1);
        assert_eq!(table.lead(0, back), -1);
    }

    #[test]
    fn correlation_index_wraps_negative_lags() {
        assert_eq!(DelayTable::correlation_index(0, 16), 0);
        assert_eq!(DelayTable::correlation_index(3, 16), 13);
        assert_eq!(DelayTable::correlation_index(-3, 16), 3);
        assert_eq!(DelayTable::correlation_index(20, 16), 12);
    }
}
