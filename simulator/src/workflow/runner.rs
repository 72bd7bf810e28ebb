use crate::generator::profile::BlockGenerator;
use crate::workflow::config::ScenarioConfig;
use anyhow::Context;
use doacore::interface::{BeamformRecord, DoaRecord};
use doacore::math::StatsHelper;
use doacore::telemetry::Metrics;
use doacore::DoaEngine;
use log::{debug, warn};
use serde::Serialize;
use std::time::Instant;

/// Timing of one processed block relative to its real-time duration.
#[derive(Debug, Clone, Serialize)]
pub struct BlockTiming {
    pub processing_s: f64,
    pub block_s: f64,
    pub real_time_factor: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub scenario: String,
    pub estimates: Vec<DoaRecord>,
    pub beamformed: Vec<BeamformRecord>,
    /// Per-channel RMS of the last synthesised block.
    pub input_rms: Vec<f64>,
    pub timings: Vec<BlockTiming>,
    pub metrics: Metrics,
}

impl WorkflowResult {
    pub fn overruns(&self) -> usize {
        self.timings
            .iter()
            .filter(|timing| timing.real_time_factor > 1.0)
            .count()
    }

    pub fn mean_real_time_factor(&self) -> f64 {
        if self.timings.is_empty() {
            return 0.0;
        }
        self.timings
            .iter()
            .map(|timing| timing.real_time_factor)
            .sum::<f64>()
            / self.timings.len() as f64
    }
}

#[derive(Clone)]
pub struct Runner {
    config: ScenarioConfig,
}

impl Runner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let geometry = self.config.array.resolve()?;
        if geometry.num_mics() == 4 && !geometry.is_regular_tetrahedron(0.01) {
            warn!("four-capsule array is not a regular tetrahedron");
        }
        let engine = DoaEngine::new(geometry.clone(), self.config.engine.clone())
            .context("constructing DOA engine")?;
        let mut generator = BlockGenerator::new(self.config.generator.clone(), geometry)
            .context("preparing block generator")?;

        let block_s = self.config.generator.frames as f64 / engine.model().sample_rate();
        let truth = self.config.generator.source.direction();
        let mut estimates = Vec::new();
        let mut beamformed = Vec::new();
        let mut timings = Vec::new();
        let mut input_rms = Vec::new();

        for index in 0..self.config.generator.blocks.max(1) {
            let timestamp = generator.timestamp();
            let block = generator
                .next_block()
                .with_context(|| format!("synthesising block {}", index))?;
            input_rms = StatsHelper::channel_rms(block.view());

            let started = Instant::now();
            let estimate = engine
                .estimate(self.config.doa_method, block.view())
                .with_context(|| format!("estimating direction of block {}", index))?;
            let target = if self.config.steer_to_truth {
                truth
            } else {
                estimate.direction()
            };
            let output = engine
                .beamform(self.config.beamformer, block.view(), target)
                .with_context(|| format!("beamforming block {}", index))?;
            let processing_s = started.elapsed().as_secs_f64();

            let timing = BlockTiming {
                processing_s,
                block_s,
                real_time_factor: processing_s / block_s,
            };
            if timing.real_time_factor > 1.0 {
                warn!(
                    "block {} took {:.2} ms for {:.2} ms of audio",
                    index,
                    processing_s * 1e3,
                    block_s * 1e3
                );
            }
            debug!("block {} processed in {:.3} ms", index, processing_s * 1e3);

            estimates.push(DoaRecord::new(timestamp, self.config.doa_method, &estimate));
            beamformed.push(BeamformRecord::new(
                timestamp,
                &output,
                StatsHelper::rms(&output.samples),
            ));
            timings.push(timing);
        }

        Ok(WorkflowResult {
            scenario: self.config.name.clone(),
            estimates,
            beamformed,
            input_rms,
            timings,
            metrics: engine.metrics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doacore::geometry::grid::azimuth_distance;
    use doacore::{BeamformerMethod, DoaMethod};

    #[test]
    fn runner_executes_workflow() {
        let cfg = ScenarioConfig::from_args(
            45.0,
            30.0,
            1024,
            2,
            0.0,
            DoaMethod::SrpPhat,
            BeamformerMethod::DelayAndSum,
        );
        let result = Runner::new(cfg).execute().unwrap();
        assert_eq!(result.estimates.len(), 2);
        assert_eq!(result.beamformed.len(), 2);
        assert_eq!(result.timings.len(), 2);
        assert_eq!(result.input_rms.len(), 4);
        assert_eq!(result.metrics.estimates, 2);
        for estimate in &result.estimates {
            assert!(azimuth_distance(estimate.azimuth_deg, 45.0) <= 5.0);
            assert!((estimate.elevation_deg - 30.0).abs() <= 5.0);
        }
        assert!(result.beamformed.iter().all(|record| record.frames == 1024));
    }

    #[test]
    fn steering_to_truth_uses_source_direction() {
        let mut cfg = ScenarioConfig::from_args(
            -120.0,
            10.0,
            512,
            1,
            0.05,
            DoaMethod::LeastSquares,
            BeamformerMethod::Superdirective,
        );
        cfg.steer_to_truth = true;
        let result = Runner::new(cfg).execute().unwrap();
        assert_eq!(result.beamformed[0].target_azimuth_deg, -120.0);
        assert_eq!(result.beamformed[0].target_elevation_deg, 10.0);
    }

    #[test]
    fn invalid_engine_config_is_reported() {
        let mut cfg = ScenarioConfig::default();
        cfg.engine.azimuth_step_deg = 0.0;
        let err = Runner::new(cfg).execute().unwrap_err();
        assert!(format!("{:#}", err).contains("constructing DOA engine"));
    }
}
