use crate::generator::profile::{GeneratorConfig, SourceConfig};
use anyhow::Context;
use doacore::geometry::array::TETRAHEDRAL_HALF_EDGE_M;
use doacore::{ArrayGeometry, BeamformerMethod, DoaMethod, EngineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the array description comes from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArraySpec {
    /// Four-capsule tetrahedron with the given half edge.
    Tetrahedral {
        half_edge_m: f64,
        sample_rate: f64,
        speed_of_sound: f64,
    },
    /// Positions listed inline.
    Inline(ArrayGeometry),
    /// JSON array description file.
    File { path: PathBuf },
}

impl Default for ArraySpec {
    fn default() -> Self {
        ArraySpec::Tetrahedral {
            half_edge_m: TETRAHEDRAL_HALF_EDGE_M,
            sample_rate: 44_100.0,
            speed_of_sound: 343.0,
        }
    }
}

impl ArraySpec {
    pub fn resolve(&self) -> anyhow::Result<ArrayGeometry> {
        match self {
            ArraySpec::Tetrahedral {
                half_edge_m,
                sample_rate,
                speed_of_sound,
            } => ArrayGeometry::tetrahedral(*half_edge_m, *sample_rate, *speed_of_sound)
                .context("building tetrahedral array"),
            ArraySpec::Inline(geometry) => {
                geometry.validate().context("validating inline array")?;
                Ok(geometry.clone())
            }
            ArraySpec::File { path } => load_geometry(path),
        }
    }
}

/// Reads a `{positions, sample_rate, speed_of_sound}` JSON description.
pub fn load_geometry<P: AsRef<Path>>(path: P) -> anyhow::Result<ArrayGeometry> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("reading array description {}", path_ref.display()))?;
    let geometry: ArrayGeometry = serde_json::from_str(&contents)
        .with_context(|| format!("parsing array description {}", path_ref.display()))?;
    geometry
        .validate()
        .with_context(|| format!("validating array description {}", path_ref.display()))?;
    Ok(geometry)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub array: ArraySpec,
    pub engine: EngineConfig,
    pub generator: GeneratorConfig,
    pub doa_method: DoaMethod,
    pub beamformer: BeamformerMethod,
    /// Steer toward the simulated source instead of the estimate.
    pub steer_to_truth: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            array: ArraySpec::default(),
            engine: EngineConfig::default(),
            generator: GeneratorConfig::default(),
            doa_method: DoaMethod::SrpPhat,
            beamformer: BeamformerMethod::DelayAndSum,
            steer_to_truth: false,
        }
    }
}

impl ScenarioConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scenario {}", path_ref.display()))?;
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        azimuth_deg: f64,
        elevation_deg: f64,
        frames: usize,
        blocks: usize,
        noise: f64,
        doa_method: DoaMethod,
        beamformer: BeamformerMethod,
    ) -> Self {
        Self {
            name: "cli".into(),
            generator: GeneratorConfig {
                frames,
                blocks,
                noise,
                source: SourceConfig {
                    azimuth_deg,
                    elevation_deg,
                    ..Default::default()
                },
                ..Default::default()
            },
            doa_method,
            beamformer,
            ..Default::default()
        }
    }
}
