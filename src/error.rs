//! Top-level application error.
//!
//! Component modules define their own `thiserror` enums; they are converted
//! into an `AppError` (message + process exit code) at the boundary where the
//! flow decides to stop.

/// Usage or configuration problem (bad flag value, unknown category, ...).
pub const EXIT_USAGE: u8 = 2;
/// The reference dataset is unusable, so the form cannot be built.
pub const EXIT_DATA: u8 = 3;
/// Terminal or other runtime failure.
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(EXIT_DATA, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<crate::domain::RecordError> for AppError {
    fn from(err: crate::domain::RecordError) -> Self {
        AppError::usage(err.to_string())
    }
}

impl From<crate::io::DatasetError> for AppError {
    fn from(err: crate::io::DatasetError) -> Self {
        AppError::data(err.to_string())
    }
}
