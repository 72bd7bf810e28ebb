use crate::beamforming::{
    BroadbandMvdrBeamformer, DelayAndSumBeamformer, MvdrBeamformer, SuperdirectiveBeamformer,
    SuperdirectiveWeights,
};
use crate::geometry::{ArrayGeometry, ArrayModel};
use crate::interface::{BeamformerMethod, DoaMethod};
use crate::localization::{tdoa_vector, LeastSquaresEstimator, SrpPhatEstimator};
use crate::prelude::{
    Beamformer, BeamformerOutput, Direction, DirectionEstimator, DoaEstimate, EngineConfig,
    EngineError, EngineResult,
};
use crate::telemetry::{LogManager, Metrics, MetricsRecorder};
use ndarray::ArrayView2;

/// Entry point tying one array model to every estimator and beamformer.
///
/// Calls are synchronous and share nothing mutable apart from the steering
/// cache and the metric counters, both behind mutexes.
pub struct DoaEngine {
    model: ArrayModel,
    config: EngineConfig,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl DoaEngine {
    pub fn new(geometry: ArrayGeometry, config: EngineConfig) -> EngineResult<Self> {
        let model = ArrayModel::build(geometry, &config)?;
        let engine = Self {
            model,
            config,
            metrics: MetricsRecorder::new(),
            logger: LogManager::default(),
        };
        engine.log_summary("initialised");
        Ok(engine)
    }

    fn log_summary(&self, event: &str) {
        self.logger.record(&format!(
            "{}: {} mics, {} pairs, {} grid points, max lag {} samples at {} Hz",
            event,
            self.model.num_mics(),
            self.model.pairs().len(),
            self.model.grid().len(),
            self.model.max_lag(),
            self.model.sample_rate()
        ));
    }

    /// Rebuilds every geometry-derived table for a new sample rate.
    ///
    /// The replacement model is built completely before it is swapped in; on
    /// error the engine keeps its previous state.
    pub fn reinitialize(&mut self, sample_rate: f64) -> EngineResult<()> {
        let geometry = self.model.geometry().with_sample_rate(sample_rate)?;
        let model = ArrayModel::build(geometry, &self.config)?;
        self.model = model;
        self.log_summary("reinitialised");
        Ok(())
    }

    pub fn model(&self) -> &ArrayModel {
        &self.model
    }

    pub fn geometry(&self) -> &ArrayGeometry {
        self.model.geometry()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Counts and logs a block the algorithm refused; each algorithm validates its own input.
    fn rejecting<T>(&self, result: EngineResult<T>) -> EngineResult<T> {
        result.map_err(|err| {
            self.metrics.record_rejected();
            self.logger.warn(&format!("rejected block: {}", err));
            err
        })
    }

    /// Winning GCC-PHAT lag of every microphone pair.
    pub fn tdoa(&self, block: ArrayView2<f64>) -> EngineResult<Vec<i64>> {
        self.rejecting(tdoa_vector(&self.model, block, self.config.phat_epsilon))
    }

    pub fn estimator(&self, method: DoaMethod) -> Box<dyn DirectionEstimator> {
        match method {
            DoaMethod::SrpPhat => Box::new(SrpPhatEstimator::new(self.config.phat_epsilon)),
            DoaMethod::LeastSquares => {
                Box::new(LeastSquaresEstimator::new(self.config.phat_epsilon))
            }
        }
    }

    pub fn beamformer(&self, method: BeamformerMethod) -> Box<dyn Beamformer> {
        match method {
            BeamformerMethod::DelayAndSum => Box::new(DelayAndSumBeamformer::new()),
            BeamformerMethod::Mvdr => Box::new(MvdrBeamformer::from_config(&self.config)),
            BeamformerMethod::BroadbandMvdr => {
                Box::new(BroadbandMvdrBeamformer::from_config(&self.config))
            }
            BeamformerMethod::Superdirective => {
                Box::new(SuperdirectiveBeamformer::from_config(&self.config))
            }
        }
    }

    pub fn estimate(&self, method: DoaMethod, block: ArrayView2<f64>) -> EngineResult<DoaEstimate> {
        let estimate = self.rejecting(self.estimator(method).estimate(&self.model, block))?;
        self.metrics.record_estimate();
        self.logger.detail(&format!(
            "{} -> az {:.1} el {:.1} conf {:.4}",
            method, estimate.azimuth_deg, estimate.elevation_deg, estimate.confidence
        ));
        Ok(estimate)
    }

    pub fn beamform(
        &self,
        method: BeamformerMethod,
        block: ArrayView2<f64>,
        target: Direction,
    ) -> EngineResult<BeamformerOutput> {
        let output = self.rejecting(self.beamformer(method).beamform(&self.model, block, target))?;
        self.finish_beamform(&output);
        Ok(output)
    }

    /// Superdirective weights for a fixed target, designed outside the per-block path.
    pub fn superdirective_weights(&self, target: Direction, frames: usize) -> EngineResult<SuperdirectiveWeights> {
        if frames == 0 {
            return Err(EngineError::InvalidInput("block has no frames".into()));
        }
        Ok(SuperdirectiveBeamformer::from_config(&self.config).precompute(&self.model, target, frames))
    }

    pub fn apply_superdirective(
        &self,
        weights: &SuperdirectiveWeights,
        block: ArrayView2<f64>,
    ) -> EngineResult<BeamformerOutput> {
        let output = self.rejecting(weights.apply(&self.model, block))?;
        self.finish_beamform(&output);
        Ok(output)
    }

    /// Estimates the source direction and steers the beamformer toward it.
    pub fn process(
        &self,
        doa: DoaMethod,
        beamformer: BeamformerMethod,
        block: ArrayView2<f64>,
    ) -> EngineResult<(DoaEstimate, BeamformerOutput)> {
        let estimate = self.estimate(doa, block)?;
        let output = self.beamform(beamformer, block, estimate.direction())?;
        Ok((estimate, output))
    }

    fn finish_beamform(&self, output: &BeamformerOutput) {
        let fallback_bins = output.metadata.fallback_bins;
        self.metrics.record_beamformed(fallback_bins);
        if fallback_bins > 0 {
            self.logger.warn(&format!(
                "{} fell back to channel averaging on {} bins",
                output.metadata.method, fallback_bins
            ));
        }
    }
}
