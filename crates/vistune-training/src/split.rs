//! Train/test split of a JSONL dataset.

use crate::error::{TrainingError, TrainingResult};
use crate::jsonl::{read_jsonl_values, JsonlWriter};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const TRAIN_FILE_NAME: &str = "train_data.jsonl";
pub const TEST_FILE_NAME: &str = "test_data.jsonl";

#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Fraction of samples that go to the test file, in `[0, 1)`.
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self { test_ratio: 0.1, seed: 42 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_samples: usize,
    pub test_samples: usize,
}

/// Shuffle `input` with a seeded RNG and write train/test files into `output_dir`.
///
/// The same input and seed always produce the same split. Every non-empty
/// dataset keeps at least one training sample.
pub fn split_dataset(input: &Path, output_dir: &Path, options: &SplitOptions) -> TrainingResult<SplitOutcome> {
    if !(0.0..1.0).contains(&options.test_ratio) {
        return Err(TrainingError::Dataset(format!(
            "test ratio must be in [0, 1), got {}",
            options.test_ratio
        )));
    }

    let mut samples = read_jsonl_values(input)?;
    if samples.is_empty() {
        return Err(TrainingError::Dataset(format!("dataset is empty: {}", input.display())));
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    samples.shuffle(&mut rng);

    let test_count = ((samples.len() as f64) * options.test_ratio).round() as usize;
    let test_count = test_count.min(samples.len() - 1);
    let train = samples.split_off(test_count);
    let test = samples;

    let train_path = output_dir.join(TRAIN_FILE_NAME);
    let test_path = output_dir.join(TEST_FILE_NAME);

    let mut writer = JsonlWriter::create(&train_path)?;
    for value in &train {
        writer.write_value(value)?;
    }
    let train_samples = writer.finish()?;

    let mut writer = JsonlWriter::create(&test_path)?;
    for value in &test {
        writer.write_value(value)?;
    }
    let test_samples = writer.finish()?;

    Ok(SplitOutcome { train_path, test_path, train_samples, test_samples })
}
