//! Classifier abstraction and the XGBoost JSON implementation.
//!
//! The rest of the crate only sees [`Classifier`]; the tree evaluator behind it
//! is an implementation detail of the model artifact.

use std::path::{Path, PathBuf};

use crate::domain::{InputRecord, Prediction};

pub mod xgboost;

pub use xgboost::XgbClassifier;

/// Errors raised while loading or validating a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported booster `{0}` (only gbtree and dart are supported)")]
    UnsupportedBooster(String),
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {tree}: array `{field}` has {actual} entries, expected {expected}")]
    MalformedTree {
        tree: usize,
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error("tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes")]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree} is assigned to output group {group} but the model has {n_groups}")]
    InvalidTreeGroup { tree: usize, group: i32, n_groups: usize },
}

/// Errors raised by a single prediction call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error("model expects feature `{0}`, which the input record does not provide")]
    MissingFeature(String),
    #[error("model expects {expected} features but the input record has {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("tree {tree} references feature index {index} beyond the {n_features} supplied features")]
    FeatureIndex {
        tree: usize,
        index: usize,
        n_features: usize,
    },
    #[error("model produced a non-finite score")]
    NonFinite,
}

/// Anything that can turn one feature row into a label.
pub trait Classifier: Send + Sync {
    fn predict(&self, record: &InputRecord) -> Result<Prediction, PredictError>;

    /// Short description for status lines and logs.
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Load the model artifact at `path`.
pub fn load_classifier(path: &Path) -> Result<XgbClassifier, ModelError> {
    XgbClassifier::from_path(path)
}
