//! Step-wise training metrics produced by a finished customization job.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const METRICS_FILE_NAME: &str = "step_wise_training_metrics.csv";

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetric {
    pub step_number: u64,
    pub epoch_number: u64,
    pub training_loss: f64,
}

/// Read the metrics CSV, ordered by step.
pub fn read_step_metrics(path: &Path) -> TrainingResult<Vec<StepMetric>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut steps = Vec::new();
    for row in reader.deserialize::<StepMetric>() {
        steps.push(row?);
    }
    if steps.is_empty() {
        return Err(TrainingError::Metrics(format!("no metrics rows in {}", path.display())));
    }
    steps.sort_by_key(|s| s.step_number);
    Ok(steps)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochSummary {
    pub epoch: u64,
    pub first_step: u64,
    pub last_step: u64,
    pub steps: usize,
    pub mean_loss: f64,
    pub min_loss: f64,
    pub min_step: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossDelta {
    pub step_number: u64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Everything the `metrics` command reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub total_steps: usize,
    pub first_loss: f64,
    pub final_loss: f64,
    pub epochs: Vec<EpochSummary>,
    pub deltas: Vec<LossDelta>,
    pub outlier_bounds: Option<OutlierBounds>,
    pub outliers_removed: usize,
    pub histogram: Vec<HistogramBucket>,
}

impl MetricsReport {
    /// Build the report. With `include_outliers = false` the histogram only
    /// covers losses inside the 1.5×IQR fences.
    pub fn analyze(steps: &[StepMetric], include_outliers: bool, buckets: usize) -> TrainingResult<Self> {
        let (Some(first), Some(last)) = (steps.first(), steps.last()) else {
            return Err(TrainingError::Metrics("no metrics to analyze".to_string()));
        };

        let losses: Vec<f64> = steps.iter().map(|s| s.training_loss).collect();
        let (kept, outlier_bounds) = if include_outliers {
            (losses.clone(), None)
        } else {
            let bounds = iqr_bounds(&losses);
            let kept = losses.iter().copied().filter(|l| (bounds.lower..=bounds.upper).contains(l)).collect();
            (kept, Some(bounds))
        };

        Ok(Self {
            total_steps: steps.len(),
            first_loss: first.training_loss,
            final_loss: last.training_loss,
            epochs: epoch_summaries(steps),
            deltas: loss_deltas(steps),
            outliers_removed: losses.len() - kept.len(),
            outlier_bounds,
            histogram: histogram(&kept, buckets),
        })
    }

    pub fn losses_sparkline(steps: &[StepMetric]) -> String {
        sparkline(&steps.iter().map(|s| s.training_loss).collect::<Vec<_>>())
    }
}

pub fn epoch_summaries(steps: &[StepMetric]) -> Vec<EpochSummary> {
    let mut by_epoch: BTreeMap<u64, Vec<&StepMetric>> = BTreeMap::new();
    for step in steps {
        by_epoch.entry(step.epoch_number).or_default().push(step);
    }

    by_epoch
        .into_iter()
        .filter_map(|(epoch, group)| {
            let first_step = group.iter().map(|s| s.step_number).min()?;
            let last_step = group.iter().map(|s| s.step_number).max()?;
            let min = group.iter().min_by(|a, b| a.training_loss.total_cmp(&b.training_loss))?;
            let mean_loss = group.iter().map(|s| s.training_loss).sum::<f64>() / group.len() as f64;
            Some(EpochSummary {
                epoch,
                first_step,
                last_step,
                steps: group.len(),
                mean_loss,
                min_loss: min.training_loss,
                min_step: min.step_number,
            })
        })
        .collect()
}

/// Change in loss relative to the previous step.
pub fn loss_deltas(steps: &[StepMetric]) -> Vec<LossDelta> {
    steps
        .windows(2)
        .map(|w| LossDelta { step_number: w[1].step_number, change: w[1].training_loss - w[0].training_loss })
        .collect()
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

pub fn iqr_bounds(values: &[f64]) -> OutlierBounds {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    OutlierBounds { q1, q3, lower: 1.5f64.mul_add(-iqr, q1), upper: 1.5f64.mul_add(iqr, q3) }
}

/// Equal-width buckets over `[min, max]`; the last bucket is closed.
pub fn histogram(values: &[f64], buckets: usize) -> Vec<HistogramBucket> {
    if values.is_empty() || buckets == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / buckets as f64;

    let mut out: Vec<HistogramBucket> = (0..buckets)
        .map(|i| HistogramBucket {
            lower: (i as f64).mul_add(width, min),
            upper: ((i + 1) as f64).mul_add(width, min),
            count: 0,
        })
        .collect();

    for &v in values {
        let idx = if width > 0.0 { (((v - min) / width) as usize).min(buckets - 1) } else { 0 };
        out[idx].count += 1;
    }
    out
}

pub fn sparkline(values: &[f64]) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let top = (SPARK_BARS.len() - 1) as f64;

    values
        .iter()
        .map(|&v| {
            let level = if span > 0.0 { ((v - min) / span * top).round() as usize } else { 0 };
            SPARK_BARS[level.min(SPARK_BARS.len() - 1)]
        })
        .collect()
}
