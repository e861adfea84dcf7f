//! JSON Lines input/output for training datasets.

use crate::error::{TrainingError, TrainingResult};
use crate::record::TrainingRecord;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Append-only writer: one compact JSON object per line.
pub struct JsonlWriter<W: Write> {
    out: BufWriter<W>,
    lines: usize,
}

impl JsonlWriter<File> {
    /// Create (truncate) `path`, creating parent directories as needed.
    pub fn create(path: &Path) -> TrainingResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { out: BufWriter::new(inner), lines: 0 }
    }

    pub fn write_record(&mut self, record: &TrainingRecord) -> TrainingResult<()> {
        self.write_line(&record.to_json_line()?)
    }

    pub fn write_value(&mut self, value: &Value) -> TrainingResult<()> {
        self.write_line(&serde_json::to_string(value)?)
    }

    fn write_line(&mut self, line: &str) -> TrainingResult<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush and return the number of lines written.
    pub fn finish(mut self) -> TrainingResult<usize> {
        self.out.flush()?;
        Ok(self.lines)
    }
}

/// A parsed line of a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlLine {
    /// 1-based line number.
    pub number: usize,
    pub value: Result<Value, String>,
}

/// Parse every non-blank line, keeping parse failures as per-line errors.
pub fn read_jsonl_lines(path: &Path) -> TrainingResult<Vec<JsonlLine>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str::<Value>(&line).map_err(|e| e.to_string());
        lines.push(JsonlLine { number: idx + 1, value });
    }

    Ok(lines)
}

/// Parse every non-blank line; the first malformed line is an error.
pub fn read_jsonl_values(path: &Path) -> TrainingResult<Vec<Value>> {
    read_jsonl_lines(path)?
        .into_iter()
        .map(|line| {
            line.value.map_err(|e| {
                TrainingError::Dataset(format!("Line {}: invalid JSON syntax - {}", line.number, e))
            })
        })
        .collect()
}

/// Parse every line; a blank line is a syntax error like any other malformed line.
///
/// The newline ending the last record does not count as a line.
pub fn read_jsonl_values_strict(path: &Path) -> TrainingResult<Vec<Value>> {
    let reader = BufReader::new(File::open(path)?);
    let mut values = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let value = if line.trim().is_empty() {
            Err("empty line".to_string())
        } else {
            serde_json::from_str::<Value>(&line).map_err(|e| e.to_string())
        };
        let value = value
            .map_err(|e| TrainingError::Dataset(format!("Line {}: invalid JSON syntax - {}", idx + 1, e)))?;
        values.push(value);
    }

    Ok(values)
}

/// Read typed records from a JSONL file.
pub fn read_jsonl_records(path: &Path) -> TrainingResult<Vec<TrainingRecord>> {
    read_jsonl_values(path)?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(TrainingError::from))
        .collect()
}

/// SHA-256 of a file's bytes, hex-encoded. Used to identify an uploaded dataset.
pub fn file_digest(path: &Path) -> TrainingResult<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        hasher.update(buf);
        let len = buf.len();
        reader.consume(len);
    }
    Ok(hex::encode(hasher.finalize()))
}
