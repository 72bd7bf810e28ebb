use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub estimates: usize,
    pub beamformed_blocks: usize,
    pub fallback_bins: usize,
    pub rejected_blocks: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_estimate(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.estimates += 1;
        }
    }

    pub fn record_beamformed(&self, fallback_bins: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.beamformed_blocks += 1;
            metrics.fallback_bins += fallback_bins;
        }
    }

    pub fn record_rejected(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.rejected_blocks += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            Metrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let recorder = MetricsRecorder::new();
        recorder.record_estimate();
        recorder.record_beamformed(3);
        recorder.record_beamformed(0);
        recorder.record_rejected();
        assert_eq!(
            recorder.snapshot(),
            Metrics {
                estimates: 1,
                beamformed_blocks: 2,
                fallback_bins: 3,
                rejected_blocks: 1,
            }
        );
    }
}
