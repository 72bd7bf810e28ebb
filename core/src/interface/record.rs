use crate::interface::mode::{BeamformerMethod, DoaMethod};
use crate::prelude::{BeamformerOutput, DoaEstimate, EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Serialises one record as a single JSON line (no trailing newline).
pub fn to_json_line<T: Serialize>(record: &T) -> EngineResult<String> {
    serde_json::to_string(record)
        .map_err(|err| EngineError::InvalidInput(format!("record is not serialisable: {}", err)))
}

/// Serialisable direction estimate stamped with the block time it was computed for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoaRecord {
    pub timestamp: f64,
    pub method: DoaMethod,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub confidence: f64,
}

impl DoaRecord {
    pub fn new(timestamp: f64, method: DoaMethod, estimate: &DoaEstimate) -> Self {
        Self {
            timestamp,
            method,
            azimuth_deg: estimate.azimuth_deg,
            elevation_deg: estimate.elevation_deg,
            confidence: estimate.confidence,
        }
    }
}

/// Summary of one beamformed block; the waveform itself is not serialised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamformRecord {
    pub timestamp: f64,
    pub method: BeamformerMethod,
    pub target_azimuth_deg: f64,
    pub target_elevation_deg: f64,
    pub frames: usize,
    pub fallback_bins: usize,
    pub output_rms: f64,
}

impl BeamformRecord {
    pub fn new(timestamp: f64, output: &BeamformerOutput, output_rms: f64) -> Self {
        Self {
            timestamp,
            method: output.metadata.method,
            target_azimuth_deg: output.metadata.target.azimuth_deg,
            target_elevation_deg: output.metadata.target.elevation_deg,
            frames: output.samples.len(),
            fallback_bins: output.metadata.fallback_bins,
            output_rms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{BeamformMetadata, Direction};

    #[test]
    fn doa_record_serialises_on_one_line() {
        let estimate = DoaEstimate {
            azimuth_deg: 45.0,
            elevation_deg: 30.0,
            confidence: 0.8,
        };
        let line = to_json_line(&DoaRecord::new(0.5, DoaMethod::SrpPhat, &estimate)).unwrap();
        assert!(!line.contains('\n'));
        let parsed: DoaRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.method, DoaMethod::SrpPhat);
        assert_eq!(parsed.azimuth_deg, 45.0);
    }

    #[test]
    fn beamform_record_copies_metadata() {
        let output = BeamformerOutput {
            samples: vec![0.0; 64],
            metadata: BeamformMetadata {
                method: BeamformerMethod::Mvdr,
                target: Direction::new(-10.0, 5.0),
                fallback_bins: 2,
            },
        };
        let record = BeamformRecord::new(1.0, &output, 0.25);
        assert_eq!(record.frames, 64);
        assert_eq!(record.fallback_bins, 2);
        assert_eq!(record.target_azimuth_deg, -10.0);
    }
}
