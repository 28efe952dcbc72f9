//! Load-once access to the model and the reference dataset.
//!
//! Each artifact is read the first time it is asked for and the result,
//! success or failure, is kept for the lifetime of the store. Failures are
//! logged, recorded as user-facing diagnostics, and replaced by a sentinel
//! (no model, empty dataset) so the caller decides what to do next.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use crate::io::ReferenceDataset;
use crate::models::{Classifier, load_classifier};

pub const DEFAULT_MODEL_PATH: &str = "xgboost_model.json";
pub const DEFAULT_DATA_PATH: &str = "train.csv";

/// Where the artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub data: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            data: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

pub struct ArtifactStore {
    paths: ArtifactPaths,
    model: OnceLock<Option<Arc<dyn Classifier>>>,
    dataset: OnceLock<Arc<ReferenceDataset>>,
    diagnostics: Mutex<Vec<String>>,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            model: OnceLock::new(),
            dataset: OnceLock::new(),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// The trained classifier, or `None` if it could not be loaded.
    pub fn model(&self) -> Option<Arc<dyn Classifier>> {
        self.model
            .get_or_init(|| {
                let path = &self.paths.model;
                match load_classifier(path) {
                    Ok(model) => {
                        let model: Arc<dyn Classifier> = Arc::new(model);
                        tracing::info!(path = %path.display(), model = %model.describe(), "loaded model");
                        Some(model)
                    }
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "failed to load model");
                        self.record(format!("Error loading model: {e}"));
                        None
                    }
                }
            })
            .clone()
    }

    /// The reference dataset; empty if it could not be read.
    pub fn dataset(&self) -> Arc<ReferenceDataset> {
        self.dataset
            .get_or_init(|| {
                let path = &self.paths.data;
                match ReferenceDataset::from_path(path) {
                    Ok(data) => {
                        tracing::info!(
                            path = %path.display(),
                            rows = data.len(),
                            skipped = data.row_errors().len(),
                            "loaded reference dataset"
                        );
                        Arc::new(data)
                    }
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "failed to load reference dataset");
                        self.record(format!("Error loading data: {e}"));
                        Arc::new(ReferenceDataset::empty())
                    }
                }
            })
            .clone()
    }

    /// User-facing load messages, in the order they occurred.
    pub fn diagnostics(&self) -> Vec<String> {
        match self.diagnostics.lock() {
            Ok(d) => d.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, message: String) {
        match self.diagnostics.lock() {
            Ok(mut d) => d.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}
