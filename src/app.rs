//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - loads the artifacts and derives the form
//! - hands off to the TUI or a headless subcommand

use std::path::Path;

use clap::Parser;

use crate::artifacts::ArtifactStore;
use crate::cli::{Cli, Command, CommonArgs, PredictArgs};
use crate::error::AppError;
use crate::form::{FormSpec, FormState, collect};

/// Entry point for the `loanform` binary.
pub fn run() -> Result<(), AppError> {
    // Missing `.env` is the normal case.
    let _ = dotenvy::dotenv();

    // `loanform` and `loanform --data x.csv` behave like `loanform tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Predict(args) => handle_predict(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn handle_tui(args: CommonArgs) -> Result<(), AppError> {
    init_logging(&args.log_dir, false);
    let store = ArtifactStore::new(args.artifact_paths());
    let spec = load_form(&store)?;
    crate::tui::run(&store, spec)
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    init_logging(&args.common.log_dir, true);
    let store = ArtifactStore::new(args.common.artifact_paths());
    let spec = load_form(&store)?;

    let mut state = FormState::from_spec(&spec);
    for (feature, value) in args.overrides() {
        state
            .set_field(&spec, feature, value)
            .map_err(|e| AppError::usage(format!("--{}: {e}", feature.column().replace('_', "-"))))?;
    }

    let collected = collect(&spec, &state, true)?;
    tracing::info!(record = ?collected.record, "submitting form");

    let model = store.model();
    for diagnostic in store.diagnostics() {
        eprintln!("{diagnostic}");
    }

    let Some(presentation) = crate::report::present(&collected, model.as_deref()) else {
        return Ok(());
    };

    if args.json {
        let json = serde_json::to_string_pretty(&presentation)
            .map_err(|e| AppError::runtime(format!("Failed to serialize result: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", crate::report::format_presentation(&presentation));
    }

    if let Some(path) = &args.export {
        crate::io::append_submission(path, &presentation)
            .map_err(|e| AppError::runtime(e.to_string()))?;
    }

    Ok(())
}

fn handle_inspect(args: CommonArgs) -> Result<(), AppError> {
    init_logging(&args.log_dir, true);
    let store = ArtifactStore::new(args.artifact_paths());
    let spec = load_form(&store)?;

    let model = match store.model() {
        Some(model) => model.describe(),
        None => "unavailable".to_string(),
    };
    let dataset = store.dataset();

    print!("{}", crate::report::format_form(&spec));
    println!();
    println!("Model: {model} ({})", store.paths().model.display());
    println!(
        "Reference rows: {} ({} skipped) from {}",
        dataset.len(),
        dataset.row_errors().len(),
        store.paths().data.display()
    );
    for diagnostic in store.diagnostics() {
        eprintln!("{diagnostic}");
    }
    Ok(())
}

/// Load the reference dataset and derive the widgets, or halt the flow.
///
/// Nothing is rendered from an empty dataset; the load diagnostics become the
/// error message. The model is loaded here too, so a model failure is
/// reported before the first submission.
pub fn load_form(store: &ArtifactStore) -> Result<FormSpec, AppError> {
    let dataset = store.dataset();
    if dataset.is_empty() {
        let mut lines = store.diagnostics();
        if lines.is_empty() {
            lines.push(format!(
                "Error loading data: '{}' has no usable rows",
                store.paths().data.display()
            ));
        }
        tracing::error!("reference dataset is empty; halting");
        return Err(AppError::data(lines.join("\n")));
    }
    let spec = FormSpec::derive(&dataset)?;
    if store.model().is_none() {
        tracing::warn!("continuing without a model; predictions are disabled");
    }
    Ok(spec)
}

fn init_logging(log_dir: &Path, to_stderr: bool) {
    if let Err(e) = crate::logging::init(log_dir, to_stderr) {
        eprintln!("warning: {e}; continuing without log file");
    }
}

/// Rewrite argv so `loanform` defaults to `loanform tui`.
///
/// Rules:
/// - `loanform`                       -> `loanform tui`
/// - `loanform --model m.json ...`    -> `loanform tui --model m.json ...`
/// - `loanform --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}
