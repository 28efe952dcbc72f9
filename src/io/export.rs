//! Append submissions to a CSV log.
//!
//! One row per submission: the eleven feature columns in model order, then
//! the prediction and its display status. The header is written only when the
//! file is new or empty, so repeated runs accumulate into one table.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::domain::{Feature, FeatureValue};
use crate::report::{Outcome, Presentation};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to open export CSV '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write export CSV '{path}': {source}")]
    Write { path: PathBuf, source: csv::Error },
    #[error("failed to flush export CSV '{path}': {source}")]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Column names written by [`append_submission`].
pub fn export_header() -> Vec<&'static str> {
    let mut header: Vec<&'static str> = Feature::ALL.iter().map(|f| f.column()).collect();
    header.extend(["prediction", "status"]);
    header
}

/// Append one submission row to `path`, creating the file if needed.
pub fn append_submission(path: &Path, presentation: &Presentation) -> Result<(), ExportError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| ExportError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let needs_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);

    let write_err = |source: csv::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        writer.write_record(export_header()).map_err(write_err)?;
    }

    let (prediction, status) = match &presentation.outcome {
        Outcome::Predicted { label, prediction } => (prediction.to_string(), label.clone()),
        Outcome::Failed { message } => (String::new(), message.clone()),
    };

    let mut row: Vec<String> = presentation
        .record
        .features()
        .into_iter()
        .map(|(_, value)| cell(&value))
        .collect();
    row.push(prediction);
    row.push(status);
    writer.write_record(&row).map_err(write_err)?;

    writer.flush().map_err(|source| ExportError::Flush {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "appended submission");
    Ok(())
}

/// Floats are written with full precision, unlike the on-screen summary.
fn cell(value: &FeatureValue) -> String {
    match value {
        FeatureValue::Float(v) => v.to_string(),
        other => other.to_string(),
    }
}
