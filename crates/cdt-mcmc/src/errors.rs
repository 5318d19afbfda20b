use std::path::Path;

use cdt_core::errors::{CdtError, ErrorInfo};

pub(crate) fn move_error(code: &str, message: &str) -> CdtError {
    CdtError::Move(ErrorInfo::new(code, message))
}

pub(crate) fn precision_error(code: &str, message: impl Into<String>) -> CdtError {
    CdtError::Precision(ErrorInfo::new(code, message))
}

pub(crate) fn config_error(code: &str, message: &str) -> CdtError {
    CdtError::Config(ErrorInfo::new(code, message))
}

pub(crate) fn io_error(code: &str, err: impl ToString, path: &Path) -> CdtError {
    CdtError::Serde(ErrorInfo::new(code, err.to_string()).with_context("path", path.display()))
}

pub(crate) trait ContextExt {
    fn with_context(self, key: &str, value: impl ToString) -> CdtError;
}

impl ContextExt for CdtError {
    fn with_context(self, key: &str, value: impl ToString) -> CdtError {
        match self {
            CdtError::Move(info) => CdtError::Move(info.with_context(key, value)),
            CdtError::Precision(info) => CdtError::Precision(info.with_context(key, value)),
            CdtError::Config(info) => CdtError::Config(info.with_context(key, value)),
            CdtError::Serde(info) => CdtError::Serde(info.with_context(key, value)),
            other => other,
        }
    }
}
