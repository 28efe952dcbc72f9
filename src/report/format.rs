//! Plain-text rendering for the CLI subcommands and the TUI panels.

use crate::form::{FormSpec, WidgetKind};
use crate::report::{Presentation, SummaryRow};

pub const TITLE: &str = "Loan Prediction App";
pub const SUBTITLE: &str =
    "This app predicts the loan status based on your input using a pre-trained XGBoost model.";
pub const FORM_HEADER: &str = "Input Features";
pub const SUMMARY_HEADER: &str = "Input Summary";
pub const PREDICTING: &str = "Predicting...";
pub const ABOUT_HEADER: &str = "About this App";
pub const ABOUT_TEXT: &str = "This Loan Prediction App uses a pre-trained XGBoost model to determine \
whether a loan is likely to be approved or not. The model was trained on historical loan data and \
leverages features like age, income, home ownership, employment length, and loan-specific details. \
Use the sidebar to adjust the inputs and click \"Predict\" to see the outcome.";

/// Format a submission: the input summary followed by the outcome line.
pub fn format_presentation(p: &Presentation) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {SUMMARY_HEADER} ===\n"));
    out.push_str(&format_summary(&p.summary));
    out.push('\n');
    out.push_str(&p.outcome.message());
    out.push('\n');

    out
}

/// Two-column name/value table.
pub fn format_summary(rows: &[SummaryRow]) -> String {
    let width = rows.iter().map(|r| r.column.len()).max().unwrap_or(0);
    let mut out = String::new();
    for r in rows {
        out.push_str(format!("{:<width$}  {}", r.column, r.value).trim_end());
        out.push('\n');
    }
    out
}

/// Describe every widget: label, range or options, and default.
pub fn format_form(spec: &FormSpec) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {TITLE}: {FORM_HEADER} ===\n"));
    out.push_str(format!("{:<28} {:<10} {:<12} {}", "field", "widget", "default", "range").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<28} {:-<10} {:-<12} {:-<5}", "", "", "", "").trim_end());
    out.push('\n');

    for w in spec.widgets() {
        let kind = match &w.kind {
            WidgetKind::Slider { .. } => "slider",
            WidgetKind::IntInput { .. } | WidgetKind::FloatInput { .. } => "number",
            WidgetKind::Select { .. } => "select",
        };
        out.push_str(
            format!(
                "{:<28} {:<10} {:<12} {}",
                w.feature.column(),
                kind,
                w.format_value(w.default),
                w.describe()
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}
