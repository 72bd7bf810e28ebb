//! Direction-of-arrival estimation and beamforming for rigid microphone arrays.
//!
//! A [`DoaEngine`] owns the array model (pairs, direction grid, delay table,
//! steering model) and dispatches single blocks to the GCC-PHAT based
//! estimators and to the frequency-domain beamformers.

pub mod beamforming;
pub mod engine;
pub mod geometry;
pub mod interface;
pub mod localization;
pub mod math;
pub mod prelude;
pub mod signal;
pub mod telemetry;

pub use engine::DoaEngine;
pub use geometry::{ArrayGeometry, ArrayModel};
pub use interface::{BeamformerMethod, DoaMethod};
pub use prelude::{
    BeamformMetadata, Beamformer, BeamformerOutput, Direction, DirectionEstimator, DoaEstimate,
    EngineConfig, EngineError, EngineResult,
};
