//! Label tables: two-column CSV files pairing an image file name with its label.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Header names of the image and label columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelColumns {
    pub image: String,
    pub label: String,
}

impl Default for LabelColumns {
    fn default() -> Self {
        // "Image name" / "Seller"
        Self { image: "图片名称".to_string(), label: "销售方".to_string() }
    }
}

/// One data row. Fields are `None` when the row is too short to contain them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    /// 1-based data row number (the header is row 0).
    pub row: usize,
    pub image_name: Option<String>,
    pub label: Option<String>,
}

/// Streaming reader over a label table.
pub struct LabelReader {
    reader: csv::Reader<File>,
    image_idx: usize,
    label_idx: usize,
}

impl LabelReader {
    /// Open `path` and resolve the configured columns from its header.
    ///
    /// A header without either column is a setup error.
    pub fn open(path: &Path, columns: &LabelColumns) -> TrainingResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path).map_err(|e| {
            TrainingError::LabelTable(format!("failed to open {}: {}", path.display(), e))
        })?;

        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| {
                    TrainingError::LabelTable(format!(
                        "column '{}' not found in {} (columns: {})",
                        name,
                        path.display(),
                        headers.iter().collect::<Vec<_>>().join(", ")
                    ))
                })
        };

        let image_idx = find(&columns.image)?;
        let label_idx = find(&columns.label)?;
        Ok(Self { reader, image_idx, label_idx })
    }

    /// Lazily yield rows. A row that fails to decode yields an error item and
    /// iteration continues.
    pub fn rows(self) -> impl Iterator<Item = TrainingResult<LabelRow>> {
        let Self { reader, image_idx, label_idx } = self;
        reader.into_records().enumerate().map(move |(idx, record)| {
            let record = record?;
            Ok(LabelRow {
                row: idx + 1,
                image_name: record.get(image_idx).map(str::to_string),
                label: record.get(label_idx).map(str::to_string),
            })
        })
    }
}

/// Writer for label tables produced by the labelling step.
pub struct LabelWriter {
    writer: csv::Writer<File>,
    rows: usize,
}

impl LabelWriter {
    pub fn create(path: &Path, columns: &LabelColumns) -> TrainingResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([columns.image.as_str(), columns.label.as_str()])?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write_row(&mut self, image_name: &str, label: &str) -> TrainingResult<()> {
        self.writer.write_record([image_name, label])?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> TrainingResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the number of data rows written.
    pub fn finish(mut self) -> TrainingResult<usize> {
        self.flush()?;
        Ok(self.rows)
    }
}
