//! `loan-form` library crate.
//!
//! The binary (`loanform`) is a thin wrapper around this library so that:
//!
//! - the form, prediction and presentation logic is testable without a terminal
//! - the TUI and the headless subcommands share one flow

pub mod app;
pub mod artifacts;
pub mod cli;
pub mod domain;
pub mod error;
pub mod form;
pub mod io;
pub mod logging;
pub mod models;
pub mod report;
pub mod tui;

#[cfg(test)]
mod test_support;
