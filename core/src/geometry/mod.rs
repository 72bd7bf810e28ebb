pub mod array;
pub mod delay;
pub mod grid;
pub mod model;

pub use array::{ArrayGeometry, MicPair};
pub use delay::DelayTable;
pub use grid::{DirectionGrid, GridPoint};
pub use model::ArrayModel;
