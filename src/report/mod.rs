//! Prediction and presentation of a submitted form.
//!
//! `present` is the only place the classifier is called. Every failure mode
//! ends up as a user-visible [`Outcome::Failed`]; nothing here returns an error
//! to the caller.

use serde::Serialize;

use crate::domain::{InputRecord, Prediction};
use crate::form::Collected;
use crate::models::Classifier;

pub mod format;

pub use format::*;

pub const APPROVED: &str = "Approved";
pub const NOT_APPROVED: &str = "Not Approved";
pub const MODEL_UNAVAILABLE: &str = "Model could not be loaded.";

/// One row of the echoed input summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub column: &'static str,
    pub value: String,
}

/// Result of the prediction step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Predicted { label: String, prediction: Prediction },
    Failed { message: String },
}

impl Outcome {
    /// The line shown under "Prediction" (or as the error).
    pub fn message(&self) -> String {
        match self {
            Outcome::Predicted { label, .. } => format!("Predicted Loan Status: {label}"),
            Outcome::Failed { message } => message.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Everything shown after a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub record: InputRecord,
    #[serde(skip)]
    pub summary: Vec<SummaryRow>,
    pub outcome: Outcome,
}

/// Map a model output to its display label.
///
/// Only outputs equal to `0` or `1` have names, whether they come back as a
/// class or as a score; anything else is shown verbatim.
pub fn status_label(prediction: Prediction) -> String {
    match prediction {
        Prediction::Class(0) => NOT_APPROVED.to_string(),
        Prediction::Class(1) => APPROVED.to_string(),
        Prediction::Score(s) if s == 0.0 => NOT_APPROVED.to_string(),
        Prediction::Score(s) if s == 1.0 => APPROVED.to_string(),
        other => other.to_string(),
    }
}

/// Echo the record as name/value rows in model order.
pub fn summarize(record: &InputRecord) -> Vec<SummaryRow> {
    record
        .features()
        .into_iter()
        .map(|(feature, value)| SummaryRow {
            column: feature.column(),
            value: value.to_string(),
        })
        .collect()
}

/// Predict and present a collected form; `None` unless it was submitted.
pub fn present(collected: &Collected, model: Option<&dyn Classifier>) -> Option<Presentation> {
    if !collected.submitted {
        return None;
    }

    let record = collected.record.clone();
    let summary = summarize(&record);

    let outcome = match model {
        None => {
            tracing::error!("prediction requested but no model is loaded");
            Outcome::Failed {
                message: MODEL_UNAVAILABLE.to_string(),
            }
        }
        Some(model) => match model.predict(&record) {
            Ok(prediction) => {
                let label = status_label(prediction);
                tracing::info!(%prediction, %label, "prediction complete");
                Outcome::Predicted { label, prediction }
            }
            Err(e) => {
                tracing::error!(error = %e, "prediction failed");
                Outcome::Failed {
                    message: format!("An error occurred during prediction: {e}"),
                }
            }
        },
    };

    Some(Presentation {
        record,
        summary,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredictError, XgbClassifier};
    use crate::test_support::{binary_model_json, record};

    /// Returns a fixed answer regardless of input.
    struct Fixed(Result<Prediction, PredictError>);

    impl Classifier for Fixed {
        fn predict(&self, _record: &InputRecord) -> Result<Prediction, PredictError> {
            self.0.clone()
        }
    }

    fn submitted() -> Collected {
        Collected {
            record: record(),
            submitted: true,
        }
    }

    #[test]
    fn nothing_happens_until_submitted() {
        let collected = Collected {
            record: record(),
            submitted: false,
        };
        let model = Fixed(Ok(Prediction::Class(1)));
        assert!(present(&collected, Some(&model)).is_none());
    }

    #[test]
    fn labels_map_zero_and_one() {
        for (class, expected) in [
            (0, "Predicted Loan Status: Not Approved"),
            (1, "Predicted Loan Status: Approved"),
            (2, "Predicted Loan Status: 2"),
        ] {
            let model = Fixed(Ok(Prediction::Class(class)));
            let p = present(&submitted(), Some(&model)).unwrap();
            assert_eq!(p.outcome.message(), expected);
            assert!(!p.outcome.is_error());
        }
    }

    #[test]
    fn scores_equal_to_zero_or_one_get_labels() {
        assert_eq!(status_label(Prediction::Score(0.0)), NOT_APPROVED);
        assert_eq!(status_label(Prediction::Score(1.0)), APPROVED);
    }

    #[test]
    fn other_scores_are_shown_verbatim() {
        assert_eq!(status_label(Prediction::Score(0.25)), "0.25");
        assert_eq!(status_label(Prediction::Score(0.123456789)), "0.123456789");

        let model = Fixed(Ok(Prediction::Score(0.123456789)));
        let p = present(&submitted(), Some(&model)).unwrap();
        assert_eq!(p.outcome.message(), "Predicted Loan Status: 0.123456789");
    }

    #[test]
    fn prediction_errors_become_messages() {
        let model = Fixed(Err(PredictError::NonFinite));
        let p = present(&submitted(), Some(&model)).unwrap();
        assert!(p.outcome.is_error());
        assert_eq!(
            p.outcome.message(),
            "An error occurred during prediction: model produced a non-finite score"
        );
    }

    #[test]
    fn absent_model_is_reported_without_predicting() {
        let p = present(&submitted(), None).unwrap();
        assert_eq!(p.outcome.message(), MODEL_UNAVAILABLE);
        // The input summary is still echoed.
        assert_eq!(p.summary.len(), 11);
    }

    #[test]
    fn submissions_are_independent() {
        let model = XgbClassifier::from_json_str(&binary_model_json(1, 50_000.0, -1.0, 1.0)).unwrap();

        let mut low = submitted();
        low.record.person_income = 10_000;
        let mut high = submitted();
        high.record.person_income = 90_000;

        let first = present(&low, Some(&model)).unwrap();
        let second = present(&high, Some(&model)).unwrap();
        let again = present(&low, Some(&model)).unwrap();

        assert_eq!(first.outcome.message(), "Predicted Loan Status: Not Approved");
        assert_eq!(second.outcome.message(), "Predicted Loan Status: Approved");
        assert_eq!(first, again);
        assert_ne!(first.summary, second.summary);
    }

    #[test]
    fn presentation_serializes_outcome_with_status_tag() {
        let model = Fixed(Ok(Prediction::Class(1)));
        let p = present(&submitted(), Some(&model)).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["outcome"]["status"], "predicted");
        assert_eq!(json["outcome"]["label"], "Approved");
        assert_eq!(json["outcome"]["prediction"], 1);
        assert_eq!(json["record"]["loan_grade"], "B");
    }
}
