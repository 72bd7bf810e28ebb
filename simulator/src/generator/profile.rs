use crate::generator::template::Waveform;
use anyhow::Context;
use doacore::signal::plane_wave_block;
use doacore::{ArrayGeometry, Direction};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One far-field source of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub amplitude: f64,
    pub waveform: Waveform,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            azimuth_deg: 45.0,
            elevation_deg: 30.0,
            amplitude: 1.0,
            waveform: Waveform::default(),
        }
    }
}

impl SourceConfig {
    pub fn direction(&self) -> Direction {
        Direction::new(self.azimuth_deg, self.elevation_deg)
    }
}

/// Synthesis settings for the multichannel blocks fed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub frames: usize,
    pub blocks: usize,
    pub source: SourceConfig,
    pub interferer: Option<SourceConfig>,
    /// Half-width of the uniform sensor noise added to every sample.
    pub noise: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            frames: 1024,
            blocks: 4,
            source: SourceConfig::default(),
            interferer: None,
            noise: 0.0,
            seed: 0,
        }
    }
}

/// Produces consecutive blocks of one continuous simulated recording.
pub struct BlockGenerator {
    config: GeneratorConfig,
    geometry: ArrayGeometry,
    rng: StdRng,
    next_block: usize,
}

impl BlockGenerator {
    pub fn new(config: GeneratorConfig, geometry: ArrayGeometry) -> anyhow::Result<Self> {
        anyhow::ensure!(config.frames > 0, "generator needs at least one frame per block");
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            geometry,
            rng,
            next_block: 0,
        })
    }

    /// Start time of the next block in seconds.
    pub fn timestamp(&self) -> f64 {
        (self.next_block * self.config.frames) as f64 / self.geometry.sample_rate()
    }

    fn source_block(&self, source: &SourceConfig, start: f64) -> Array2<f64> {
        let waveform = source.waveform.build(
            self.config.frames,
            self.geometry.sample_rate(),
            source.amplitude,
        );
        plane_wave_block(
            &self.geometry,
            source.direction(),
            self.config.frames,
            move |t| waveform(t + start),
        )
    }

    pub fn next_block(&mut self) -> anyhow::Result<Array2<f64>> {
        let start = self.timestamp();
        let mut block = self.source_block(&self.config.source, start);
        if let Some(interferer) = &self.config.interferer {
            block += &self.source_block(interferer, start);
        }
        if self.config.noise > 0.0 {
            let noise = self.config.noise;
            let rng = &mut self.rng;
            block.mapv_inplace(|sample| sample + rng.gen_range(-noise..noise));
        }
        self.next_block = self
            .next_block
            .checked_add(1)
            .context("block counter overflow")?;
        Ok(block)
    }
}
