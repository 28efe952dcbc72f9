//! Command-line parsing for the loan prediction form.
//!
//! Parsing and dispatch stay separate from the form and model code; handlers
//! live in `crate::app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::artifacts::{ArtifactPaths, DEFAULT_DATA_PATH, DEFAULT_MODEL_PATH};
use crate::domain::Feature;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "loanform",
    version,
    about = "Loan Prediction App: predict loan approval with a pre-trained XGBoost model"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive form (the default).
    Tui(CommonArgs),
    /// Submit one set of inputs without the terminal UI.
    ///
    /// Fields that are not given take the form's default value.
    Predict(PredictArgs),
    /// Print the form's derived widgets: bounds, defaults and options.
    Inspect(CommonArgs),
}

/// Artifact locations and logging, shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Trained model (XGBoost JSON).
    #[arg(long, env = "LOANFORM_MODEL", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Reference dataset the widget bounds are derived from.
    #[arg(long, env = "LOANFORM_DATA", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Directory for `loanform.log`.
    #[arg(long, env = "LOANFORM_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

impl CommonArgs {
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model.clone(),
            data: self.data.clone(),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long)]
    pub person_age: Option<String>,
    #[arg(long)]
    pub person_income: Option<String>,
    #[arg(long)]
    pub person_home_ownership: Option<String>,
    #[arg(long)]
    pub person_emp_length: Option<String>,
    #[arg(long)]
    pub loan_intent: Option<String>,
    #[arg(long)]
    pub loan_grade: Option<String>,
    #[arg(long)]
    pub loan_amnt: Option<String>,
    #[arg(long)]
    pub loan_int_rate: Option<String>,
    #[arg(long)]
    pub cb_person_default_on_file: Option<String>,
    #[arg(long)]
    pub cb_person_cred_hist_length: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Append the submission to a CSV file.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

impl PredictArgs {
    /// Fields given on the command line, in form order.
    pub fn overrides(&self) -> Vec<(Feature, &str)> {
        [
            (Feature::PersonAge, &self.person_age),
            (Feature::PersonIncome, &self.person_income),
            (Feature::PersonHomeOwnership, &self.person_home_ownership),
            (Feature::PersonEmpLength, &self.person_emp_length),
            (Feature::LoanIntent, &self.loan_intent),
            (Feature::LoanGrade, &self.loan_grade),
            (Feature::LoanAmnt, &self.loan_amnt),
            (Feature::LoanIntRate, &self.loan_int_rate),
            (Feature::CbPersonDefaultOnFile, &self.cb_person_default_on_file),
            (Feature::CbPersonCredHistLength, &self.cb_person_cred_hist_length),
        ]
        .into_iter()
        .filter_map(|(feature, value)| value.as_deref().map(|v| (feature, v)))
        .collect()
    }
}
