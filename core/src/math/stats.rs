use ndarray::{ArrayView2, Axis};

pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    /// RMS level of every column of a `[frames x channels]` block.
    pub fn channel_rms(block: ArrayView2<f64>) -> Vec<f64> {
        block
            .axis_iter(Axis(1))
            .map(|column| {
                let samples: Vec<f64> = column.iter().copied().collect();
                Self::rms(&samples)
            })
            .collect()
    }

    /// Per-frame average across channels.
    pub fn channel_mean(block: ArrayView2<f64>) -> Vec<f64> {
        match block.mean_axis(Axis(1)) {
            Some(mean) => mean.to_vec(),
            None => vec![0.0; block.nrows()],
        }
    }
}
